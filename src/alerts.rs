//! Alert routing: turns a trigger into the set of notification drafts to
//! emit. Pure over the owner's connection edges: the permission graph is
//! the routing table, the notification store is the sink.

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::config::APPOINTMENT_REMINDER_LEAD_MINUTES;
use crate::models::{
    ConnectionEdge, NotificationAction, NotificationDraft, NotificationKind, Priority,
    RelatedRefs, VitalAlertKind,
};

/// Internally generated event that the router converts into notifications.
#[derive(Debug, Clone)]
pub enum Trigger {
    DoseMissed {
        owner_id: Uuid,
        medication_id: Uuid,
        medication_name: String,
    },
    LowStock {
        owner_id: Uuid,
        medication_id: Uuid,
        medication_name: String,
        pill_count: u32,
    },
    CriticalVital {
        owner_id: Uuid,
        reading_id: Uuid,
        subtype: VitalAlertKind,
    },
    AppointmentReminder {
        owner_id: Uuid,
        appointment_id: Uuid,
        title: String,
        starts_at: NaiveDateTime,
    },
    EmergencyAlert {
        subject_id: Uuid,
        message: String,
    },
}

/// Compute the (recipient, notification) fan-out for a trigger.
///
/// `edges` are the connection edges granted by the subject account.
/// Missed-dose, low-stock and critical-vital triggers reach the owner plus
/// every active connection that opted into alerts; emergencies reach every
/// active connection regardless of the opt-out, since safety outranks
/// preference. Appointment reminders go to the patient alone.
pub fn route(trigger: &Trigger, edges: &[ConnectionEdge], now: NaiveDateTime) -> Vec<NotificationDraft> {
    match trigger {
        Trigger::DoseMissed { owner_id, medication_id, medication_name } => {
            let mut drafts = vec![NotificationDraft {
                recipient_id: *owner_id,
                kind: NotificationKind::DoseMissed,
                title: "Missed dose".into(),
                message: format!("You missed a dose of {medication_name}"),
                priority: Priority::High,
                related: RelatedRefs::medication(*medication_id),
                actions: vec![
                    NotificationAction::new("take_now", "Take now"),
                    NotificationAction::new("snooze", "Snooze"),
                ],
                scheduled_for: None,
                expires_at: None,
            }];
            for grantee in alert_recipients(edges, now, false) {
                drafts.push(NotificationDraft {
                    recipient_id: grantee,
                    kind: NotificationKind::DoseMissed,
                    title: "Missed dose".into(),
                    message: format!("A scheduled dose of {medication_name} was missed"),
                    priority: Priority::High,
                    related: RelatedRefs::medication(*medication_id),
                    actions: vec![NotificationAction::new("view_medication", "View medication")],
                    scheduled_for: None,
                    expires_at: None,
                });
            }
            drafts
        }

        Trigger::LowStock { owner_id, medication_id, medication_name, pill_count } => {
            let mut drafts = vec![NotificationDraft {
                recipient_id: *owner_id,
                kind: NotificationKind::LowStock,
                title: "Low medication stock".into(),
                message: format!("Only {pill_count} doses of {medication_name} remain"),
                priority: Priority::Medium,
                related: RelatedRefs::medication(*medication_id),
                actions: vec![NotificationAction::new("refill", "Request refill")],
                scheduled_for: None,
                expires_at: None,
            }];
            for grantee in alert_recipients(edges, now, false) {
                drafts.push(NotificationDraft {
                    recipient_id: grantee,
                    kind: NotificationKind::LowStock,
                    title: "Low medication stock".into(),
                    message: format!("{medication_name} is running low ({pill_count} doses left)"),
                    priority: Priority::Medium,
                    related: RelatedRefs::medication(*medication_id),
                    actions: vec![NotificationAction::new("view_medication", "View medication")],
                    scheduled_for: None,
                    expires_at: None,
                });
            }
            drafts
        }

        Trigger::CriticalVital { owner_id, reading_id, subtype } => {
            let message = critical_vital_message(*subtype);
            let mut recipients = vec![*owner_id];
            recipients.extend(alert_recipients(edges, now, false));
            recipients
                .into_iter()
                .map(|recipient_id| NotificationDraft {
                    recipient_id,
                    kind: NotificationKind::CriticalVital,
                    title: "Critical vital sign".into(),
                    message: message.to_string(),
                    priority: Priority::Urgent,
                    related: RelatedRefs::vital(*reading_id),
                    actions: vec![NotificationAction::new("view_reading", "View reading")],
                    scheduled_for: None,
                    expires_at: None,
                })
                .collect()
        }

        Trigger::AppointmentReminder { owner_id, appointment_id, title, starts_at } => {
            vec![NotificationDraft {
                recipient_id: *owner_id,
                kind: NotificationKind::AppointmentReminder,
                title: "Upcoming appointment".into(),
                message: format!("{title} starts at {}", starts_at.format("%H:%M on %Y-%m-%d")),
                priority: Priority::Medium,
                related: RelatedRefs::appointment(*appointment_id),
                actions: vec![NotificationAction::new("view_appointment", "View appointment")],
                scheduled_for: Some(
                    *starts_at - Duration::minutes(APPOINTMENT_REMINDER_LEAD_MINUTES),
                ),
                // A reminder is moot once the appointment has started.
                expires_at: Some(*starts_at),
            }]
        }

        Trigger::EmergencyAlert { subject_id, message } => {
            let mut recipients = vec![*subject_id];
            recipients.extend(alert_recipients(edges, now, true));
            recipients
                .into_iter()
                .map(|recipient_id| NotificationDraft {
                    recipient_id,
                    kind: NotificationKind::EmergencyAlert,
                    title: "Emergency alert".into(),
                    message: message.clone(),
                    priority: Priority::Urgent,
                    related: RelatedRefs::default(),
                    actions: vec![NotificationAction::new("acknowledge", "Acknowledge")],
                    scheduled_for: None,
                    expires_at: None,
                })
                .collect()
        }
    }
}

/// Grantees eligible for alert fan-out: active, unexpired edges with a
/// resolved grantee. `bypass_opt_out` is the emergency path.
fn alert_recipients(
    edges: &[ConnectionEdge],
    now: NaiveDateTime,
    bypass_opt_out: bool,
) -> Vec<Uuid> {
    edges
        .iter()
        .filter(|edge| edge.is_active_at(now))
        .filter(|edge| bypass_opt_out || edge.capabilities.receive_alerts)
        .filter_map(|edge| edge.grantee_id)
        .collect()
}

/// Fixed message lookup per critical-vital subtype. Anything unrecognized
/// gets the generic message rather than failing.
fn critical_vital_message(subtype: VitalAlertKind) -> &'static str {
    match subtype {
        VitalAlertKind::HighBp => "Blood pressure reading is critically high",
        VitalAlertKind::LowBp => "Blood pressure reading is unusually low",
        VitalAlertKind::HighGlucose => "Blood sugar reading is critically high",
        VitalAlertKind::LowGlucose => "Blood sugar reading is critically low",
        VitalAlertKind::IrregularHr => "Heart rate reading is outside the expected range",
        VitalAlertKind::Unusual => "Unusual vital signs were recorded",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CapabilitySet, ConnectionStatus, Role};
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn edge(
        owner: Uuid,
        grantee: Option<Uuid>,
        status: ConnectionStatus,
        receive_alerts: bool,
    ) -> ConnectionEdge {
        ConnectionEdge {
            id: Uuid::new_v4(),
            owner_id: owner,
            grantee_id: grantee,
            grantee_email: "kin@example.com".into(),
            grantee_role: Role::Family,
            relationship: "family member".into(),
            status,
            capabilities: CapabilitySet { receive_alerts, ..CapabilitySet::default() },
            created_at: ts(2026, 1, 1),
            accepted_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn dose_missed_fans_out_to_opted_in_connections() {
        let owner = Uuid::new_v4();
        let listening = Uuid::new_v4();
        let muted = Uuid::new_v4();
        let edges = vec![
            edge(owner, Some(listening), ConnectionStatus::Active, true),
            edge(owner, Some(muted), ConnectionStatus::Active, false),
        ];

        let trigger = Trigger::DoseMissed {
            owner_id: owner,
            medication_id: Uuid::new_v4(),
            medication_name: "Lisinopril".into(),
        };
        let drafts = route(&trigger, &edges, ts(2026, 3, 1));

        let recipients: Vec<Uuid> = drafts.iter().map(|d| d.recipient_id).collect();
        assert_eq!(recipients, vec![owner, listening]);
        assert!(drafts.iter().all(|d| d.kind == NotificationKind::DoseMissed));
        assert!(drafts.iter().all(|d| d.priority == Priority::High));
    }

    #[test]
    fn pending_and_expired_edges_are_excluded() {
        let owner = Uuid::new_v4();
        let pending = Uuid::new_v4();
        let expired = Uuid::new_v4();
        let mut expired_edge = edge(owner, Some(expired), ConnectionStatus::Active, true);
        expired_edge.expires_at = Some(ts(2026, 2, 1));
        let edges = vec![
            edge(owner, Some(pending), ConnectionStatus::Pending, true),
            expired_edge,
        ];

        let trigger = Trigger::DoseMissed {
            owner_id: owner,
            medication_id: Uuid::new_v4(),
            medication_name: "Lisinopril".into(),
        };
        let drafts = route(&trigger, &edges, ts(2026, 3, 1));
        assert_eq!(drafts.len(), 1, "only the owner should be notified");
        assert_eq!(drafts[0].recipient_id, owner);
    }

    #[test]
    fn unresolved_grantee_is_skipped() {
        let owner = Uuid::new_v4();
        let edges = vec![edge(owner, None, ConnectionStatus::Active, true)];

        let trigger = Trigger::LowStock {
            owner_id: owner,
            medication_id: Uuid::new_v4(),
            medication_name: "Metformin".into(),
            pill_count: 3,
        };
        let drafts = route(&trigger, &edges, ts(2026, 3, 1));
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn low_stock_owner_message_names_the_count() {
        let owner = Uuid::new_v4();
        let trigger = Trigger::LowStock {
            owner_id: owner,
            medication_id: Uuid::new_v4(),
            medication_name: "Metformin".into(),
            pill_count: 4,
        };
        let drafts = route(&trigger, &[], ts(2026, 3, 1));
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].message.contains("4 doses"));
        assert_eq!(drafts[0].priority, Priority::Medium);
    }

    #[test]
    fn critical_vital_is_urgent_with_subtype_message() {
        let owner = Uuid::new_v4();
        let kin = Uuid::new_v4();
        let edges = vec![edge(owner, Some(kin), ConnectionStatus::Active, true)];

        let trigger = Trigger::CriticalVital {
            owner_id: owner,
            reading_id: Uuid::new_v4(),
            subtype: VitalAlertKind::HighGlucose,
        };
        let drafts = route(&trigger, &edges, ts(2026, 3, 1));
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|d| d.priority == Priority::Urgent));
        assert!(drafts.iter().all(|d| d.message.contains("Blood sugar")));
    }

    #[test]
    fn unknown_vital_subtype_falls_back_to_generic_message() {
        let trigger = Trigger::CriticalVital {
            owner_id: Uuid::new_v4(),
            reading_id: Uuid::new_v4(),
            subtype: VitalAlertKind::Unusual,
        };
        let drafts = route(&trigger, &[], ts(2026, 3, 1));
        assert!(drafts[0].message.contains("Unusual vital signs"));
    }

    #[test]
    fn appointment_reminder_goes_to_patient_only_one_hour_before() {
        let owner = Uuid::new_v4();
        let kin = Uuid::new_v4();
        let edges = vec![edge(owner, Some(kin), ConnectionStatus::Active, true)];
        let starts_at = ts(2026, 4, 1);

        let trigger = Trigger::AppointmentReminder {
            owner_id: owner,
            appointment_id: Uuid::new_v4(),
            title: "Cardiology follow-up".into(),
            starts_at,
        };
        let drafts = route(&trigger, &edges, ts(2026, 3, 1));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].recipient_id, owner);
        assert_eq!(drafts[0].scheduled_for, Some(starts_at - Duration::minutes(60)));
        assert_eq!(drafts[0].expires_at, Some(starts_at));
    }

    #[test]
    fn emergency_bypasses_the_alert_opt_out() {
        let subject = Uuid::new_v4();
        let muted = Uuid::new_v4();
        let listening = Uuid::new_v4();
        let edges = vec![
            edge(subject, Some(muted), ConnectionStatus::Active, false),
            edge(subject, Some(listening), ConnectionStatus::Active, true),
        ];

        let trigger = Trigger::EmergencyAlert {
            subject_id: subject,
            message: "Fall detected".into(),
        };
        let drafts = route(&trigger, &edges, ts(2026, 3, 1));

        let recipients: Vec<Uuid> = drafts.iter().map(|d| d.recipient_id).collect();
        assert_eq!(recipients, vec![subject, muted, listening]);
        assert!(drafts.iter().all(|d| d.priority == Priority::Urgent));
    }

    #[test]
    fn emergency_still_excludes_inactive_edges() {
        let subject = Uuid::new_v4();
        let revoked = Uuid::new_v4();
        let edges = vec![edge(subject, Some(revoked), ConnectionStatus::Inactive, true)];

        let trigger = Trigger::EmergencyAlert {
            subject_id: subject,
            message: "Fall detected".into(),
        };
        let drafts = route(&trigger, &edges, ts(2026, 3, 1));
        assert_eq!(drafts.len(), 1);
    }
}
