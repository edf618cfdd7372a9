use serde::{Deserialize, Serialize};

use shiptrack_core::{DomainError, DomainResult};

/// Lifecycle stage of a shipment.
///
/// The happy path runs `Received` through `Delivered`; `Returned` and
/// `Cancelled` branch off from any non-terminal stage. The order is advisory:
/// the status history accepts any value at any time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipmentStatus {
    Received,
    Packed,
    AtOriginPort,
    OnVessel,
    ArrivedToPort,
    CustomsCleared,
    OutForDelivery,
    Delivered,
    Returned,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 10] = [
        ShipmentStatus::Received,
        ShipmentStatus::Packed,
        ShipmentStatus::AtOriginPort,
        ShipmentStatus::OnVessel,
        ShipmentStatus::ArrivedToPort,
        ShipmentStatus::CustomsCleared,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Returned,
        ShipmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Received => "Received",
            ShipmentStatus::Packed => "Packed",
            ShipmentStatus::AtOriginPort => "AtOriginPort",
            ShipmentStatus::OnVessel => "OnVessel",
            ShipmentStatus::ArrivedToPort => "ArrivedToPort",
            ShipmentStatus::CustomsCleared => "CustomsCleared",
            ShipmentStatus::OutForDelivery => "OutForDelivery",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Returned => "Returned",
            ShipmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Delivered | ShipmentStatus::Returned | ShipmentStatus::Cancelled
        )
    }

    /// Case-insensitive lookup by name (`"onvessel"`, `"OnVessel"`).
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| DomainError::validation(format!("unknown shipment status '{raw}'")))
    }
}

impl core::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ShipmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ShipmentStatus::parse("onvessel").unwrap(), ShipmentStatus::OnVessel);
        assert_eq!(
            ShipmentStatus::parse(" CustomsCleared ").unwrap(),
            ShipmentStatus::CustomsCleared
        );
        assert!(ShipmentStatus::parse("Lost").is_err());
    }

    #[test]
    fn every_status_round_trips_through_its_name() {
        for status in ShipmentStatus::ALL {
            assert_eq!(ShipmentStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = ShipmentStatus::ALL
            .into_iter()
            .filter(ShipmentStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![
                ShipmentStatus::Delivered,
                ShipmentStatus::Returned,
                ShipmentStatus::Cancelled
            ]
        );
    }
}
