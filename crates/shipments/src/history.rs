use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shiptrack_core::{Entity, StatusEntryId, UserId};

use crate::ShipmentStatus;

/// One immutable lifecycle event of a shipment.
///
/// `event_time` is the business time the status applies to and is the
/// ordering key. `sequence` records insertion order within the shipment and
/// only breaks ties between equal event times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: StatusEntryId,
    pub status: ShipmentStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_time: DateTime<Utc>,
    pub sequence: u32,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Option<UserId>,
}

impl StatusHistoryEntry {
    /// Ordering key: event time first, insertion order second.
    pub fn sort_key(&self) -> (DateTime<Utc>, u32) {
        (self.event_time, self.sequence)
    }
}

impl Entity for StatusHistoryEntry {
    type Id = StatusEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
