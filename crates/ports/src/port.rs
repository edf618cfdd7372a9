use chrono::{DateTime, Utc};

use shiptrack_core::{AggregateRoot, AuditTrail, DomainError, DomainResult, PortId, UserId};

use crate::PortCode;

/// Longest accepted port name.
pub const MAX_NAME_LEN: usize = 200;

/// Aggregate root: a port registry record (PortMaster).
///
/// # Invariants
/// - The code never changes after registration.
/// - Name and country are non-empty.
/// - Ports are deactivated, never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    id: PortId,
    code: PortCode,
    name: String,
    country: String,
    is_active: bool,
    version: u64,
    audit: AuditTrail,
}

impl Port {
    /// Register a new, active port.
    pub fn register(
        id: PortId,
        code: PortCode,
        name: &str,
        country: &str,
        at: DateTime<Utc>,
        by: Option<UserId>,
    ) -> DomainResult<Self> {
        let (name, country) = validate_details(name, country)?;
        Ok(Self {
            id,
            code,
            name,
            country,
            is_active: true,
            version: 1,
            audit: AuditTrail::created(at, by),
        })
    }

    /// Rebuild a port from persisted state.
    pub fn restore(
        id: PortId,
        code: PortCode,
        name: String,
        country: String,
        is_active: bool,
        version: u64,
        audit: AuditTrail,
    ) -> Self {
        Self {
            id,
            code,
            name,
            country,
            is_active,
            version,
            audit,
        }
    }

    pub fn id_typed(&self) -> PortId {
        self.id
    }

    pub fn code(&self) -> &PortCode {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Change the descriptive fields. The code is immutable.
    pub fn update_details(
        &mut self,
        name: &str,
        country: &str,
        at: DateTime<Utc>,
        by: Option<UserId>,
    ) -> DomainResult<()> {
        let (name, country) = validate_details(name, country)?;
        self.name = name;
        self.country = country;
        self.audit.touch(at, by);
        self.version += 1;
        Ok(())
    }

    /// Mark the port inactive.
    ///
    /// Returns `false` (and leaves the version untouched) when the port was
    /// already inactive. Whether shipments still reference the port is the
    /// caller's concern.
    pub fn deactivate(&mut self, at: DateTime<Utc>, by: Option<UserId>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.audit.touch(at, by);
        self.version += 1;
        true
    }
}

impl AggregateRoot for Port {
    type Id = PortId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn validate_details(name: &str, country: &str) -> DomainResult<(String, String)> {
    let name = name.trim();
    let country = country.trim();
    if name.is_empty() {
        return Err(DomainError::validation("port name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "port name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if country.is_empty() {
        return Err(DomainError::validation("country cannot be empty"));
    }
    Ok((name.to_string(), country.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_port() -> Port {
        Port::register(
            PortId::new(),
            PortCode::parse("SGSIN").unwrap(),
            "Singapore",
            "SG",
            Utc::now(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn register_creates_active_port_at_version_one() {
        let port = test_port();
        assert!(port.is_active());
        assert_eq!(port.version(), 1);
        assert_eq!(port.code().as_str(), "SGSIN");
        assert!(port.audit().updated_at.is_none());
    }

    #[test]
    fn register_rejects_blank_name() {
        let err = Port::register(
            PortId::new(),
            PortCode::parse("SGSIN").unwrap(),
            "   ",
            "SG",
            Utc::now(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_details_trims_and_bumps_version() {
        let mut port = test_port();
        let by = UserId::new();
        port.update_details("  Singapore Port ", " SG ", Utc::now(), Some(by))
            .unwrap();
        assert_eq!(port.name(), "Singapore Port");
        assert_eq!(port.country(), "SG");
        assert_eq!(port.version(), 2);
        assert_eq!(port.audit().updated_by, Some(by));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut port = test_port();
        assert!(port.deactivate(Utc::now(), None));
        assert!(!port.is_active());
        assert_eq!(port.version(), 2);

        assert!(!port.deactivate(Utc::now(), None));
        assert_eq!(port.version(), 2);
    }
}
