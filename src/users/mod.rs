pub mod handlers;

use axum::{extract::FromRef, middleware::from_fn_with_state, routing::get, Router};

use crate::{
    auth::{
        jwt::TokenService,
        middleware::{require_auth, require_roles, RoleGate},
        role::Role,
    },
    state::AppState,
};

/// Routes behind the bearer-token guard. Admin routes add the role gate.
pub fn router(state: &AppState) -> Router<AppState> {
    let tokens = TokenService::from_ref(state);

    let admin = Router::new()
        .route("/api/admin/users/:id", get(handlers::get_user))
        .route_layer(from_fn_with_state(RoleGate::new([Role::Admin]), require_roles));

    Router::new()
        .route("/api/users/profile", get(handlers::profile))
        .merge(admin)
        .route_layer(from_fn_with_state(tokens, require_auth))
}
