use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig};

/// The only algorithm issued or accepted.
const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("unexpected algorithm")]
    Algorithm,
    #[error("unexpected issuer")]
    Issuer,
    #[error("token expired")]
    Expired,
    #[error("encode token: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::Algorithm,
            ErrorKind::InvalidIssuer => TokenError::Issuer,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Token codec. Built once from config at startup and shared read-only.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl: Duration::hours(cfg.ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            iat: numeric_date(now),
            exp: numeric_date(now + self.ttl),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        debug!(subject = %subject, exp = claims.exp, "jwt issued");
        Ok(token)
    }

    /// Returns the subject of a token signed by this key that is still
    /// valid at `now`.
    pub fn verify(&self, token: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        self.verify_claims(token, now).map(|c| c.sub)
    }

    pub fn verify_claims(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["iss", "sub", "iat", "exp"]);
        validation.validate_aud = false;
        // Expiry is checked below against the caller's clock, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        // Signature and algorithm are checked before any claim is looked at.
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;

        if numeric_date(now) >= claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(subject = %claims.sub, "jwt verified");
        Ok(claims)
    }
}

/// Unix seconds, keeping the fraction so a token lives for exactly its TTL.
fn numeric_date(t: OffsetDateTime) -> f64 {
    t.unix_timestamp_nanos() as f64 / 1_000_000_000.0
}
