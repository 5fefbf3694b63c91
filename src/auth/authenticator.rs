use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::warn;

use crate::{
    auth::{password, repo::UserStore, repo_types::User, resolver::Principal},
    db::StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown login and wrong password both end up here.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("credential integrity: {0:#}")]
    Integrity(anyhow::Error),
}

/// What the authenticator needs from a user backend.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn lookup_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;
    /// Checks `plain` against a stored digest. Blocking; Argon2 work.
    fn verify_password(&self, plain: &str, digest: &str) -> anyhow::Result<bool>;
}

/// Users from the credential store, passwords checked with Argon2.
pub struct StoreCredentials {
    users: Arc<dyn UserStore>,
}

impl StoreCredentials {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialSource for StoreCredentials {
    async fn lookup_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.users.find_by_email(login).await
    }

    fn verify_password(&self, plain: &str, digest: &str) -> anyhow::Result<bool> {
        password::verify_password(plain, digest)
    }
}

#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<dyn CredentialSource>,
}

impl Authenticator {
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self { credentials }
    }

    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Principal, AuthError> {
        let user = self.credentials.lookup_by_login(login).await?;

        // An unknown login still pays for one verification, against the decoy.
        let digest = match &user {
            Some(u) => u.password_hash.clone(),
            None => password::decoy_digest().to_owned(),
        };
        let verified = self.verify_blocking(password, digest).await;

        let Some(user) = user else {
            warn!(login = %login, "login rejected: unknown login");
            return Err(AuthError::InvalidCredentials);
        };

        if !verified.map_err(AuthError::Integrity)? {
            warn!(login = %login, user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Principal::from(user))
    }

    async fn verify_blocking(&self, plain: &str, digest: String) -> anyhow::Result<bool> {
        let credentials = self.credentials.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || credentials.verify_password(&plain, &digest))
            .await
            .context("password verification task")?
    }
}
