use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConnectionStatus, Role};

/// A single named permission bit within a connection edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewMedications,
    ViewVitals,
    ViewAppointments,
    ReceiveAlerts,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewMedications => "view_medications",
            Self::ViewVitals => "view_vitals",
            Self::ViewAppointments => "view_appointments",
            Self::ReceiveAlerts => "receive_alerts",
        }
    }
}

/// Capability flags carried by a connection edge. All-true on creation;
/// only the data owner may change them afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub view_medications: bool,
    pub view_vitals: bool,
    pub view_appointments: bool,
    pub receive_alerts: bool,
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self {
            view_medications: true,
            view_vitals: true,
            view_appointments: true,
            receive_alerts: true,
        }
    }
}

impl CapabilitySet {
    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewMedications => self.view_medications,
            Capability::ViewVitals => self.view_vitals,
            Capability::ViewAppointments => self.view_appointments,
            Capability::ReceiveAlerts => self.receive_alerts,
        }
    }
}

/// Directed data-sharing grant: the owner allows the grantee to act on the
/// owner's data with the edge's capability set. Stored once per direction;
/// the reverse grant, if any, is an independent row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEdge {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Resolved once the grantee has an account; pending edges created by
    /// email may carry None until then.
    pub grantee_id: Option<Uuid>,
    pub grantee_email: String,
    pub grantee_role: Role,
    pub relationship: String,
    pub status: ConnectionStatus,
    pub capabilities: CapabilitySet,
    pub created_at: NaiveDateTime,
    pub accepted_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

impl ConnectionEdge {
    /// Active and not expired as of `now`.
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        self.status == ConnectionStatus::Active
            && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn edge(status: ConnectionStatus, expires_at: Option<NaiveDateTime>) -> ConnectionEdge {
        ConnectionEdge {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            grantee_id: Some(Uuid::new_v4()),
            grantee_email: "kin@example.com".into(),
            grantee_role: Role::Family,
            relationship: "daughter".into(),
            status,
            capabilities: CapabilitySet::default(),
            created_at: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            accepted_at: None,
            expires_at,
        }
    }

    #[test]
    fn default_capabilities_all_granted() {
        let caps = CapabilitySet::default();
        for cap in [
            Capability::ViewMedications,
            Capability::ViewVitals,
            Capability::ViewAppointments,
            Capability::ReceiveAlerts,
        ] {
            assert!(caps.grants(cap));
        }
    }

    #[test]
    fn pending_edge_is_not_active() {
        let now = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert!(!edge(ConnectionStatus::Pending, None).is_active_at(now));
        assert!(edge(ConnectionStatus::Active, None).is_active_at(now));
    }

    #[test]
    fn expired_edge_is_not_active() {
        let now = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let past = now - chrono::Duration::hours(1);
        let future = now + chrono::Duration::hours(1);
        assert!(!edge(ConnectionStatus::Active, Some(past)).is_active_at(now));
        assert!(edge(ConnectionStatus::Active, Some(future)).is_active_at(now));
    }
}
