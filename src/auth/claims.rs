use serde::{Deserialize, Serialize};

/// JWT payload. `iat` and `exp` are fractional NumericDates (unix seconds
/// with the sub-second part kept).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String, // issuer
    pub sub: String, // user email
    pub iat: f64,    // issued at
    pub exp: f64,    // expires at
}
