use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse},
        services::{login_user, register_user},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(payload) = payload?;
    let user = register_user(state.users.as_ref(), &state.hasher, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully. Please verify your email.".into(),
            user_id: user.id,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let (token, user) =
        login_user(state.users.as_ref(), &state.hasher, &state.tokens, payload).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
        user: PublicUser::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::failing::{LosesRace, Unavailable, UNAVAILABLE};
    use std::sync::Arc;
    use axum::{body::Body, http::Request, response::Response};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app(state: &AppState) -> Router {
        auth_routes().with_state(state.clone())
    }

    fn alice() -> Value {
        json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "password1",
            "role": "customer"
        })
    }

    #[tokio::test]
    async fn register_returns_created_with_user_id() {
        let state = AppState::fake();
        let res = app(&state)
            .oneshot(post_json("/auth/register", alice()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let body = body_json(res).await;
        assert!(body["userId"].is_string());
        assert!(body["message"].as_str().unwrap().contains("registered"));
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_stores_one_user() {
        let state = AppState::fake();
        let first = app(&state)
            .oneshot(post_json("/auth/register", alice()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app(&state)
            .oneshot(post_json("/auth/register", alice()))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(second).await["error"], "Conflict");

        let stored = state
            .users
            .find_by_email_or_username("alice@example.com", "nobody")
            .await
            .unwrap();
        assert!(stored.is_some());
        let other = state
            .users
            .find_by_email_or_username("nobody@example.com", "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(other.id, stored.unwrap().id);
    }

    #[tokio::test]
    async fn admin_self_registration_is_rejected() {
        let state = AppState::fake();
        let mut body = alice();
        body["role"] = json!("admin");
        let res = app(&state)
            .oneshot(post_json("/auth/register", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["details"], "Invalid role specified.");
        assert!(state.users.find_by_email("alice@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_fields_and_bad_json_are_bad_requests() {
        let state = AppState::fake();
        let res = app(&state)
            .oneshot(post_json("/auth/register", json!({ "username": "alice" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["details"], "All fields are required.");

        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app(&state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "Bad Request");
    }

    #[tokio::test]
    async fn login_returns_token_and_public_user() {
        let state = AppState::fake();
        app(&state)
            .oneshot(post_json("/auth/register", alice()))
            .await
            .unwrap();

        let res = app(&state)
            .oneshot(post_json(
                "/auth/login",
                json!({ "email": "alice@example.com", "password": "password1" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["email"], "alice@example.com");
        assert_eq!(body["user"]["role"], "customer");
        assert!(body["user"].get("passwordHash").is_none());

        let claims = state.tokens.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.user_id.to_string(), body["user"]["userId"].as_str().unwrap());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let state = AppState::fake();
        app(&state)
            .oneshot(post_json("/auth/register", alice()))
            .await
            .unwrap();

        let wrong = app(&state)
            .oneshot(post_json(
                "/auth/login",
                json!({ "email": "alice@example.com", "password": "password2" }),
            ))
            .await
            .unwrap();
        let unknown = app(&state)
            .oneshot(post_json(
                "/auth/login",
                json!({ "email": "ghost@example.com", "password": "password1" }),
            ))
            .await
            .unwrap();

        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(wrong).await, body_json(unknown).await);
    }

    #[tokio::test]
    async fn lost_insert_race_is_conflict() {
        let state = AppState::fake_with_users(Arc::new(LosesRace));
        let res = app(&state)
            .oneshot(post_json("/auth/register", alice()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["error"], "Conflict");
    }

    #[tokio::test]
    async fn store_failure_is_internal_server_error() {
        let state = AppState::fake_with_users(Arc::new(Unavailable));
        let res = app(&state)
            .oneshot(post_json("/auth/register", alice()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["details"], UNAVAILABLE);
    }
}
