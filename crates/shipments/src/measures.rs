//! Cargo metrics: weight (kg) and volume (cbm).
//!
//! Both wrap an exact `Decimal`; values keep every digit they were given.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shiptrack_core::{DomainError, DomainResult, ValueObject};

macro_rules! positive_decimal {
    ($(#[$meta:meta])* $t:ident, $label:literal, $unit:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "Decimal", into = "Decimal")]
        pub struct $t(Decimal);

        impl $t {
            /// Construct from an exact decimal. Zero and negative values are rejected.
            pub fn from_decimal(value: Decimal) -> DomainResult<Self> {
                if value <= Decimal::ZERO {
                    return Err(DomainError::validation(concat!(
                        $label,
                        " must be greater than zero"
                    )));
                }
                Ok(Self(value.normalize()))
            }

            pub fn value(&self) -> Decimal {
                self.0
            }
        }

        impl ValueObject for $t {}

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{} {}", self.0, $unit)
            }
        }

        impl TryFrom<Decimal> for $t {
            type Error = DomainError;

            fn try_from(value: Decimal) -> Result<Self, Self::Error> {
                Self::from_decimal(value)
            }
        }

        impl From<$t> for Decimal {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

positive_decimal!(
    /// Gross cargo weight in kilograms.
    Weight,
    "weight",
    "kg"
);

positive_decimal!(
    /// Cargo volume in cubic metres.
    Volume,
    "volume",
    "cbm"
);

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn negative_weight_is_rejected() {
        assert!(matches!(
            Weight::from_decimal(dec("-1")),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn zero_volume_is_rejected() {
        assert!(matches!(
            Volume::from_decimal(Decimal::ZERO),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn small_positive_weight_is_accepted() {
        let w = Weight::from_decimal(dec("0.1")).unwrap();
        assert_eq!(w.value(), dec("0.1"));
    }

    #[test]
    fn no_upper_bound_is_enforced() {
        assert!(Weight::from_decimal(dec("99999999999.999")).is_ok());
    }

    #[test]
    fn fractional_digits_are_kept_exactly() {
        assert_eq!(Weight::from_decimal(dec("1.2345")).unwrap().value(), dec("1.2345"));
        assert_eq!(Volume::from_decimal(dec("0.0001")).unwrap().value(), dec("0.0001"));
    }

    #[test]
    fn display_includes_unit() {
        assert_eq!(Volume::from_decimal(dec("2.50")).unwrap().to_string(), "2.5 cbm");
    }

    #[test]
    fn deserialization_validates() {
        let w: Weight = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(w.value(), dec("12.5"));
        assert!(serde_json::from_str::<Weight>("\"0\"").is_err());
    }
}
