use anyhow::Context;
use serde::Deserialize;

/// Minimum HS256 key length accepted at startup.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub upload_max_bytes: usize,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "rental-app".into()),
            ttl_hours: env_parse("JWT_TTL_HOURS", 24),
        };
        jwt.validate()?;

        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT is not set")?,
            bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "rentals".into()),
            access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY is not set")?,
            secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY is not set")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
            upload_max_bytes: env_parse("UPLOAD_MAX_BYTES", 10 * 1024 * 1024),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 8080),
        })
    }
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.secret.len() >= MIN_SECRET_LEN,
            "JWT_SECRET must be at least {} bytes",
            MIN_SECRET_LEN
        );
        anyhow::ensure!(self.ttl_hours > 0, "JWT_TTL_HOURS must be positive");
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
