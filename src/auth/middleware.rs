//! Request guards for protected routes.
//!
//! `require_auth` verifies the bearer token and stores its [`Claims`] in the
//! request extensions; `require_roles` runs after it and checks the role.
//! Each guard either forwards the request or returns a single rejection.
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/admin", get(handler))
//!     .route_layer(from_fn_with_state(RoleGate::new([Role::Admin]), require_roles))
//!     .route_layer(from_fn_with_state(tokens, require_auth));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{claims::Claims, jwt::TokenService, role::Role};
use crate::error::AppError;

pub const NO_TOKEN: &str = "no token";
pub const TOKEN_FAILED: &str = "token failed";
pub const ROLE_DENIED: &str = "Access denied. You do not have the required role.";

/// Returns the token from `Authorization: Bearer <token>`, if any.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(
    State(tokens): State<TokenService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(req.headers()) else {
        warn!(uri = %req.uri(), "request without bearer token");
        return Err(AppError::Unauthorized(NO_TOKEN.into()));
    };

    let claims = tokens.verify(token).map_err(|e| {
        warn!(error = %e, uri = %req.uri(), "token verification failed");
        AppError::Unauthorized(TOKEN_FAILED.into())
    })?;

    debug!(user_id = %claims.user_id, role = %claims.role, "request authenticated");
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Set of roles allowed through [`require_roles`].
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    pub fn permits(&self, claims: Option<&Claims>) -> bool {
        claims.is_some_and(|c| self.allowed.contains(&c.role))
    }
}

pub async fn require_roles(
    State(gate): State<RoleGate>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req.extensions().get::<Claims>();
    if !gate.permits(claims) {
        warn!(
            user_id = ?claims.map(|c| c.user_id),
            role = ?claims.map(|c| c.role),
            allowed = ?gate.allowed,
            "role gate denied request"
        );
        return Err(AppError::Forbidden(ROLE_DENIED.into()));
    }
    Ok(next.run(req).await)
}
