//! Tracking number value object: `VTX-YYYYMM-NNNN`.

use serde::{Deserialize, Serialize};

use shiptrack_core::{DomainError, DomainResult, ValueObject};

/// Fixed prefix of every tracking number.
pub const PREFIX: &str = "VTX";

/// Highest sequence number available within one month.
pub const MAX_SEQUENCE: u32 = 9999;

const INVALID: &str = "tracking number must match VTX-YYYYMM-NNNN with a month between 01 and 12";

/// Shipment tracking number, e.g. `VTX-202501-0001`.
///
/// Always stored upper-cased, so two tracking numbers are equal iff their
/// normalized strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingNumber(String);

impl TrackingNumber {
    /// Validate and normalize a raw tracking number.
    ///
    /// Input is trimmed and upper-cased first. Any structural deviation fails
    /// with the same validation error.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("tracking number is required"));
        }

        let mut segments = normalized.split('-');
        let (Some(prefix), Some(period), Some(sequence), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(DomainError::validation(INVALID));
        };

        if prefix != PREFIX || !is_digits(period, 6) || !is_digits(sequence, 4) {
            return Err(DomainError::validation(INVALID));
        }

        let month: u32 = period[4..].parse().map_err(|_| DomainError::validation(INVALID))?;
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(INVALID));
        }

        Ok(Self(normalized))
    }

    /// Build the tracking number for a given month and sequence.
    pub fn generate(year: i32, month: u32, sequence: u32) -> DomainResult<Self> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(DomainError::validation(INVALID));
        }
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(DomainError::validation(format!(
                "tracking number sequence for {year:04}-{month:02} exhausted (max {MAX_SEQUENCE})"
            )));
        }
        Ok(Self(format!("{}{:04}", period_prefix(year, month), sequence)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sequence(&self) -> u32 {
        self.0[11..15].parse().unwrap_or_default()
    }
}

/// Common prefix of all tracking numbers issued in a month (`VTX-YYYYMM-`).
pub fn period_prefix(year: i32, month: u32) -> String {
    format!("{PREFIX}-{year:04}{month:02}-")
}

fn is_digits(segment: &str, len: usize) -> bool {
    segment.len() == len && segment.bytes().all(|b| b.is_ascii_digit())
}

impl ValueObject for TrackingNumber {}

impl core::fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for TrackingNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrackingNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingNumber> for String {
    fn from(value: TrackingNumber) -> Self {
        value.0
    }
}
