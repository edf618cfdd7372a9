//! Audit timestamps carried by every aggregate root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Who created/last modified an aggregate, and when.
///
/// `created_by`/`updated_by` are optional: seed data and system processes
/// act without a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<UserId>,
}

impl AuditTrail {
    pub fn created(at: DateTime<Utc>, by: Option<UserId>) -> Self {
        Self {
            created_at: at,
            created_by: by,
            updated_at: None,
            updated_by: None,
        }
    }

    pub fn touch(&mut self, at: DateTime<Utc>, by: Option<UserId>) {
        self.updated_at = Some(at);
        self.updated_by = by;
    }
}
