use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest, TokenResponse, UserResponse},
        extractors::AuthUser,
        services,
    },
    error::ApiError,
    state::AppState,
};

/// Reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Must sit behind the auth gate.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/user/:id", get(get_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = services::register(&state, payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = services::login(&state, payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(principal): AuthUser) -> Json<UserResponse> {
    Json(principal.user.into())
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    match state.users.find_by_id(id).await? {
        Some(user) => Ok(Json(user.into())),
        None => {
            warn!(%id, "user not found");
            Err(ApiError::NotFound("User"))
        }
    }
}
