use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{authenticator::AuthError, resolver::ResolutionError},
    db::StoreError,
};

/// Every error a handler can return. The body only ever carries a fixed
/// message; details stay in the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),

    #[error("internal: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::StoreUnavailable(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::InvalidCredentials => "Invalid credentials".into(),
            ApiError::Unauthorized => "Unauthorized".into(),
            ApiError::Forbidden => "Forbidden".into(),
            ApiError::NotFound(what) => format!("{} not found", what),
            ApiError::DuplicateEmail => "Account already exists".into(),
            ApiError::StoreUnavailable(_) | ApiError::Internal(_) => {
                "Internal server error".into()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::Unavailable(e) => ApiError::StoreUnavailable(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Store(e) => e.into(),
            AuthError::Integrity(e) => ApiError::Internal(e),
        }
    }
}

impl From<ResolutionError> for ApiError {
    fn from(e: ResolutionError) -> Self {
        match e {
            ResolutionError::MissingToken
            | ResolutionError::InvalidToken(_)
            | ResolutionError::UnknownSubject => ApiError::Unauthorized,
            ResolutionError::Store(e) => e.into(),
        }
    }
}
