use crate::state::AppState;
use axum::Router;

pub mod authenticator;
mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod resolver;
mod services;

pub fn public_router() -> Router<AppState> {
    handlers::public_routes()
}

pub fn protected_router() -> Router<AppState> {
    handlers::protected_routes()
}
