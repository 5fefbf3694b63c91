use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;
use tracing::{error, warn};

use crate::{
    auth::resolver::{Principal, ResolutionError},
    error::ApiError,
    state::AppState,
};

/// Gate for every protected router: resolves the caller once and hands the
/// principal to the handler through request extensions. Any failure stops
/// the request with 401 before the handler (or its body extractors) run.
pub async fn require_principal(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Owned copies: the request body is not Sync, so nothing borrowed from
    // `req` may be held across the await.
    let raw = bearer_token(req.headers()).map(str::to_owned);
    let uri = req.uri().clone();

    let principal = state
        .resolver
        .resolve(raw.as_deref(), OffsetDateTime::now_utc())
        .await
        .map_err(|e| {
            match &e {
                ResolutionError::Store(inner) => error!(error = %inner, "identity lookup failed"),
                reason => warn!(%reason, %uri, "request rejected"),
            }
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Accepts both `Authorization: Bearer <token>` and a bare `Authorization: <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value);
    Some(token)
}

/// The principal resolved by [`require_principal`]. On a route that is not
/// behind the gate there is no principal and the request is refused.
pub struct AuthUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                error!(uri = %parts.uri, "AuthUser used on a route without the auth gate");
                ApiError::Unauthorized
            })
    }
}
