use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not hash password: {0}")]
pub struct PasswordHashError(String);

/// Argon2id password hash in PHC string form.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    phc: String,
}

impl PasswordHash {
    pub fn new(password: &str) -> Result<Self, PasswordHashError> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| PasswordHashError(e.to_string()))?;
        let phc = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordHashError(e.to_string()))?
            .to_string();
        Ok(Self { phc })
    }

    pub fn verify(&self, password: &str) -> bool {
        match PhcString::new(&self.phc) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Password policy violations (empty when acceptable).
pub fn password_violations(password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("password must contain a digit".to_string());
    }
    if !password.chars().any(char::is_alphabetic) {
        errors.push("password must contain a letter".to_string());
    }
    errors
}

/// One-way digest for stored tokens (confirmation, reset, refresh).
pub(crate) fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time check of a presented token against a stored digest.
pub(crate) fn token_matches(stored_digest: &str, presented: &str) -> bool {
    token_digest(presented)
        .as_bytes()
        .ct_eq(stored_digest.as_bytes())
        .into()
}

/// Fresh unguessable token.
pub(crate) fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}
