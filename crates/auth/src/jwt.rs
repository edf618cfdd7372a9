//! HS256 access tokens.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, UserAccount, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("malformed or unsigned token: {0}")]
    Decode(String),

    #[error("could not sign token: {0}")]
    Encode(String),

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Validates bearer tokens presented to the API.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// Symmetric HS256 signer/validator sharing one secret.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    /// Sign an access token for `account`, valid from `now` for the configured TTL.
    pub fn issue(&self, account: &UserAccount, now: DateTime<Utc>) -> Result<(String, JwtClaims), JwtError> {
        let expires_at = now
            .checked_add_signed(self.access_ttl)
            .ok_or(JwtError::ExpiryOutOfRange)?;
        let claims = JwtClaims {
            sub: account.id,
            email: account.email.clone(),
            roles: account.roles.clone(),
            issued_at: now,
            expires_at,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| JwtError::Encode(e.to_string()))?;
        Ok((token, claims))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        // The claim set uses RFC 3339 timestamps, so the registered `exp`
        // check is replaced by `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| JwtError::Decode(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
