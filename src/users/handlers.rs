use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{ProfileResponse, UserDetails},
        extractors::CurrentUser,
    },
    error::AppError,
    state::AppState,
};

#[instrument(skip_all)]
pub async fn profile(CurrentUser(claims): CurrentUser) -> Json<ProfileResponse> {
    debug!(user_id = %claims.user_id, "profile requested");
    Json(ProfileResponse {
        message: "Access granted to protected profile!".into(),
        user: claims,
    })
}

#[instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserDetails>, AppError> {
    let Path(id) = id.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found.")))?;

    info!(admin_id = %admin.user_id, user_id = %user.id, "admin looked up user");
    Ok(Json(UserDetails::from(user)))
}
