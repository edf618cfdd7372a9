use serde::{Deserialize, Serialize};

use shiptrack_core::{DomainError, DomainResult, ValueObject};

/// Shortest accepted port code.
pub const MIN_LEN: usize = 2;
/// Longest accepted port code.
pub const MAX_LEN: usize = 10;

/// Short alphanumeric port identifier (e.g. `SGSIN`, `NLRTM`).
///
/// Stored upper-cased, so equality and hashing are case-insensitive with
/// respect to the raw input. Uniqueness is enforced by the port registry,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortCode(String);

impl PortCode {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_ascii_uppercase();

        if normalized.is_empty() {
            return Err(DomainError::validation("port code is required"));
        }
        if normalized.len() < MIN_LEN || normalized.len() > MAX_LEN {
            return Err(DomainError::validation(format!(
                "port code must be {MIN_LEN}-{MAX_LEN} characters"
            )));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::validation(
                "port code must contain only letters and digits",
            ));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against an unvalidated code.
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl ValueObject for PortCode {}

impl core::fmt::Display for PortCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PortCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PortCode> for String {
    fn from(value: PortCode) -> Self {
        value.0
    }
}

impl core::str::FromStr for PortCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
