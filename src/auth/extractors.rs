use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{claims::Claims, middleware::NO_TOKEN};
use crate::error::AppError;

/// Claims attached by `require_auth`. Handlers behind the auth layer take
/// this instead of re-reading the token.
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.into()))
    }
}
