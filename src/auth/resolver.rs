use std::sync::Arc;

use time::OffsetDateTime;
use tracing::warn;

use crate::{
    auth::{
        jwt::{JwtKeys, TokenError},
        repo::UserStore,
        repo_types::User,
    },
    db::StoreError,
};

/// The authenticated caller of one request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
}

impl Principal {
    /// The email the token was issued for.
    pub fn subject(&self) -> &str {
        &self.user.email
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self { user }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("token subject does not exist")]
    UnknownSubject,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns a raw bearer token into the calling user.
#[derive(Clone)]
pub struct IdentityResolver {
    keys: Arc<JwtKeys>,
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    pub fn new(keys: Arc<JwtKeys>, users: Arc<dyn UserStore>) -> Self {
        Self { keys, users }
    }

    pub async fn resolve(
        &self,
        raw_token: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Principal, ResolutionError> {
        let token = match raw_token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ResolutionError::MissingToken),
        };

        let subject = self.keys.verify(token, now)?;

        match self.users.find_by_email(&subject).await? {
            Some(user) => Ok(Principal::from(user)),
            None => {
                warn!(subject = %subject, "token subject no longer exists");
                Err(ResolutionError::UnknownSubject)
            }
        }
    }
}
