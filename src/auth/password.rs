use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    /// Digest checked against when a login matches no user, so that an unknown
    /// login costs the same Argon2 work as a wrong password.
    static ref DECOY_DIGEST: String =
        hash_password("rental-app decoy password").unwrap_or_default();
}

pub fn decoy_digest() -> &'static str {
    &DECOY_DIGEST
}

/// Hashes `plain` with a fresh random salt into an Argon2 PHC string.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow!("hash password: {}", e)
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch. A digest that does not parse is an integrity
/// problem with the stored row and comes back as `Err`.
pub fn verify_password(plain: &str, digest: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        error!(error = %e, "stored password digest is malformed");
        anyhow!("malformed password digest: {}", e)
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// [`hash_password`] on the blocking pool; Argon2 is too slow for a runtime worker.
pub async fn hash_password_blocking(plain: &str) -> anyhow::Result<String> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("password hashing task")?
}
