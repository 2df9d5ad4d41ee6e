//! JSON Web Token expiry checks.
//!
//! Tokens are decoded without verifying the signature: the services that accept them
//! do the verification, this only tells a batch job early that its token has lapsed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Environment variable read by [`check_token`] when none is given
pub const DEFAULT_TOKEN_ENV: &str = "JACS_JWT";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing JSON Web Token - set in {0} environment variable")]
    Missing(String),

    #[error("JSON Web Token failed validation: {0}")]
    Malformed(String),

    #[error("JSON Web Token has no expiration")]
    MissingExpiry,

    #[error("Your JSON Web Token is expired")]
    Expired,
}

/// Header and claims of an unexpired token
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: Value,
    pub claims: Value,
}

impl DecodedToken {
    /// Expiry as a UTC timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        exp_claim(&self.claims).and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Check the token held in `env` (default `JACS_JWT`)
pub fn check_token(env: Option<&str>) -> Result<DecodedToken, TokenError> {
    let env = env.unwrap_or(DEFAULT_TOKEN_ENV);
    let token = std::env::var(env)
        .ok()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| TokenError::Missing(env.to_string()))?;

    inspect_expiry(&token, Utc::now())
}

/// Decode `token` and fail if it has expired at `now`
pub fn inspect_expiry(token: &str, now: DateTime<Utc>) -> Result<DecodedToken, TokenError> {
    let mut segments = token.trim().split('.');
    let (Some(header), Some(claims), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed("expected three segments".to_string()));
    };

    let decoded = DecodedToken {
        header: decode_segment(header)?,
        claims: decode_segment(claims)?,
    };

    let exp = exp_claim(&decoded.claims).ok_or(TokenError::MissingExpiry)?;
    if now.timestamp() >= exp {
        return Err(TokenError::Expired);
    }
    Ok(decoded)
}

fn decode_segment(segment: &str) -> Result<Value, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(TokenError::Malformed("segment is not a JSON object".to_string()));
    }
    Ok(value)
}

fn exp_claim(claims: &Value) -> Option<i64> {
    let exp = claims.get("exp")?;
    exp.as_i64().or_else(|| exp.as_f64().map(|exp| exp as i64))
}
