use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password::hash_password_blocking,
        repo_types::NewUser,
    },
    error::ApiError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are compared case-insensitively by storing them lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates the account, then logs in with the plaintext still in hand and
/// returns a fresh token.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<String, ApiError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();

    if !is_valid_email(&email) {
        warn!(email = %email, "register rejected: invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "register rejected: email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let password_hash = hash_password_blocking(&req.password).await?;
    let user = state
        .users
        .create(NewUser {
            email: email.clone(),
            name,
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    let principal = state.authenticator.authenticate(&email, &req.password).await?;
    issue_token(state, principal.subject())
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<String, ApiError> {
    let login = normalize_email(&req.login);
    if login.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Login and password are required".into()));
    }

    let principal = state.authenticator.authenticate(&login, &req.password).await?;
    info!(user_id = %principal.user.id, "user logged in");
    issue_token(state, principal.subject())
}

fn issue_token(state: &AppState, subject: &str) -> Result<String, ApiError> {
    state
        .keys
        .issue(subject, OffsetDateTime::now_utc())
        .map_err(|e| {
            error!(error = %e, "jwt issue failed");
            ApiError::Internal(e.into())
        })
}
