use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest},
    jwt::TokenService,
    password::PasswordHasher,
    repo_types::{NewUser, User},
    role::Role,
    store::{UserStore, DUPLICATE_USER},
};
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*@([A-Za-z0-9_-]+\.)+[A-Za-z]{2,7}$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration input that passed validation.
#[derive(Debug, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Checks, in order: presence, email format, password length, role.
pub fn validate_registration(req: RegisterRequest) -> Result<Registration, AppError> {
    let (Some(username), Some(email), Some(password), Some(role)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
        non_empty(req.role),
    ) else {
        return Err(AppError::BadRequest("All fields are required.".into()));
    };

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email format.".into()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        )));
    }

    let role = Role::parse_self_assignable(&role)
        .ok_or_else(|| AppError::BadRequest("Invalid role specified.".into()))?;

    Ok(Registration {
        username: username.trim().to_string(),
        email,
        password,
        role,
    })
}

/// validate -> check uniqueness -> hash -> persist.
pub async fn register_user(
    store: &dyn UserStore,
    hasher: &PasswordHasher,
    req: RegisterRequest,
) -> Result<User, AppError> {
    let reg = validate_registration(req).map_err(|e| {
        warn!(details = %e, "registration rejected");
        e
    })?;

    if store
        .find_by_email_or_username(&reg.email, &reg.username)
        .await?
        .is_some()
    {
        warn!(email = %reg.email, username = %reg.username, "user already exists");
        return Err(AppError::Conflict(DUPLICATE_USER.into()));
    }

    let password_hash = hasher.hash(&reg.password).map_err(AppError::internal)?;

    let now = OffsetDateTime::now_utc();
    let user = store
        .create(NewUser {
            username: reg.username,
            email: reg.email,
            password_hash,
            role: reg.role,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    Ok(user)
}

/// Checks credentials and issues an access token. Unknown email and wrong
/// password produce the same error.
pub async fn login_user(
    store: &dyn UserStore,
    hasher: &PasswordHasher,
    tokens: &TokenService,
    req: LoginRequest,
) -> Result<(String, User), AppError> {
    let password = req.password.filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (non_empty(req.email), password) else {
        return Err(AppError::BadRequest("Email and password are required.".into()));
    };
    let email = normalize_email(&email);

    let Some(user) = store.find_by_email(&email).await? else {
        hasher.verify_dummy(&password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !hasher.verify(&password, &user.password_hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = tokens.issue(user.id, user.role).map_err(AppError::internal)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((token, user))
}
