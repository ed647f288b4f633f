//! Command facade: the one layer callers talk to. Every command checks
//! authorization against the permission graph, performs the business
//! write, then fans out whatever notifications the write triggered.
//! Notification fan-out is best effort and never fails the write.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::adherence::{self, AdherenceTrigger, DoseOutcome};
use crate::alerts::{self, Trigger};
use crate::db::repository::{appointment, connection, dose_event, medication, notification, vital};
use crate::error::CareError;
use crate::models::{
    Appointment, AppointmentStatus, Capability, CapabilitySet, ConnectionEdge, DoseStatus,
    Frequency, Interaction, InteractionKind, Medication, MedicationStatus, Notification,
    NotificationAction, NotificationDraft, NotificationKind, Priority, RelatedRefs, Role,
    VitalReading, VitalReadingInput, VitalSeverity,
};
use crate::notifications;
use crate::permissions;
use crate::rate_limit::RateLimiter;
use crate::vitals;

// ═══════════════════════════════════════════════════════════
// Medications and doses
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct NewMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub pill_count: u32,
    pub low_stock_threshold: u32,
    pub first_dose: Option<NaiveDateTime>,
}

pub fn add_medication(
    conn: &Connection,
    owner_id: &Uuid,
    input: NewMedication,
    now: NaiveDateTime,
) -> Result<Medication, CareError> {
    if input.name.trim().is_empty() {
        return Err(CareError::Validation("Medication name is required".into()));
    }

    let med = Medication {
        id: Uuid::new_v4(),
        owner_id: *owner_id,
        name: input.name,
        dosage: input.dosage,
        frequency: input.frequency,
        pill_count: input.pill_count,
        low_stock_threshold: input.low_stock_threshold,
        next_dose: input.first_dose,
        adherence: 0,
        total_doses: 0,
        taken_doses: 0,
        missed_doses: 0,
        status: MedicationStatus::Active,
        created_at: now,
    };
    medication::insert_medication(conn, &med)?;
    tracing::info!(medication = %med.id, owner = %owner_id, "Medication added");
    Ok(med)
}

/// Record a dose and fan out the resulting alerts. Only the owner records
/// their own doses; connections observe, they do not act.
///
/// Taking a dose also supersedes any still-undelivered missed-dose
/// reminders for the medication, so a reminder never lands after the
/// problem it reports is resolved.
pub fn record_dose(
    conn: &Connection,
    actor_id: &Uuid,
    medication_id: &Uuid,
    status: DoseStatus,
    at: NaiveDateTime,
    note: Option<String>,
) -> Result<DoseOutcome, CareError> {
    let med = medication::get_medication(conn, medication_id)?
        .ok_or_else(|| CareError::not_found("Medication", medication_id))?;
    if med.owner_id != *actor_id {
        return Err(CareError::Unauthorized(
            "Only the medication owner may record doses".into(),
        ));
    }

    let outcome = adherence::record_dose(conn, medication_id, status, at, note)?;

    if status == DoseStatus::Taken {
        supersede_stale_reminders(conn, medication_id);
    }

    let edges = connection::active_edges_for_owner(conn, actor_id)?;
    for trigger in &outcome.triggers {
        let trigger = match trigger {
            AdherenceTrigger::DoseMissed => Trigger::DoseMissed {
                owner_id: *actor_id,
                medication_id: *medication_id,
                medication_name: outcome.medication.name.clone(),
            },
            AdherenceTrigger::LowStock => Trigger::LowStock {
                owner_id: *actor_id,
                medication_id: *medication_id,
                medication_name: outcome.medication.name.clone(),
                pill_count: outcome.medication.pill_count,
            },
        };
        let drafts = alerts::route(&trigger, &edges, at);
        notifications::create_all(conn, drafts, at);
    }
    Ok(outcome)
}

fn supersede_stale_reminders(conn: &Connection, medication_id: &Uuid) {
    let stale = match notification::undelivered_for_medication(
        conn,
        medication_id,
        NotificationKind::DoseMissed,
    ) {
        Ok(stale) => stale,
        Err(e) => {
            tracing::warn!(medication = %medication_id, error = %e, "Stale reminder lookup failed");
            return;
        }
    };
    for reminder in stale {
        if let Err(e) = notifications::mark_superseded(conn, &reminder.id) {
            tracing::warn!(notification = %reminder.id, error = %e, "Failed to supersede reminder");
        }
    }
}

/// Pause, resume, or stop a medication. Owner-only; a stopped or paused
/// medication rejects new doses until set active again.
pub fn set_medication_status(
    conn: &Connection,
    actor_id: &Uuid,
    medication_id: &Uuid,
    status: MedicationStatus,
) -> Result<Medication, CareError> {
    let med = medication::get_medication(conn, medication_id)?
        .ok_or_else(|| CareError::not_found("Medication", medication_id))?;
    if med.owner_id != *actor_id {
        return Err(CareError::Unauthorized(
            "Only the medication owner may change its status".into(),
        ));
    }

    medication::update_medication_status(conn, medication_id, status)?;
    tracing::info!(medication = %medication_id, status = status.as_str(), "Medication status changed");
    medication::get_medication(conn, medication_id)?
        .ok_or_else(|| CareError::not_found("Medication", medication_id))
}

pub fn list_dose_events(
    conn: &Connection,
    actor_id: &Uuid,
    medication_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<crate::models::DoseEvent>, CareError> {
    let med = medication::get_medication(conn, medication_id)?
        .ok_or_else(|| CareError::not_found("Medication", medication_id))?;
    permissions::require_access(conn, actor_id, &med.owner_id, Capability::ViewMedications, now)?;
    Ok(dose_event::events_for_medication(conn, medication_id)?)
}

pub fn list_medications(
    conn: &Connection,
    actor_id: &Uuid,
    owner_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<Medication>, CareError> {
    permissions::require_access(conn, actor_id, owner_id, Capability::ViewMedications, now)?;
    Ok(medication::medications_for_owner(conn, owner_id)?)
}

pub fn adherence_streak(
    conn: &Connection,
    actor_id: &Uuid,
    owner_id: &Uuid,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<u32, CareError> {
    permissions::require_access(conn, actor_id, owner_id, Capability::ViewMedications, now)?;
    adherence::compute_streak(conn, owner_id, today)
}

// ═══════════════════════════════════════════════════════════
// Vital readings
// ═══════════════════════════════════════════════════════════

/// Save a vital reading. Categories and alerts are always computed here
/// from the raw values, so a reading can never arrive pre-classified.
/// Critical alerts fan out to the care circle.
pub fn add_vital_reading(
    conn: &Connection,
    owner_id: &Uuid,
    input: &VitalReadingInput,
    recorded_at: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<VitalReading, CareError> {
    let measurements = vitals::classify(input);
    if measurements == Default::default() {
        return Err(CareError::Validation(
            "A vital reading needs at least one measurement".into(),
        ));
    }
    let alerts = vitals::evaluate_alerts(&measurements);

    let reading = VitalReading {
        id: Uuid::new_v4(),
        owner_id: *owner_id,
        recorded_at,
        measurements,
        alerts,
        created_at: now,
    };
    vital::insert_reading(conn, &reading)?;

    let critical: Vec<_> = reading
        .alerts
        .iter()
        .filter(|a| a.severity == VitalSeverity::Critical)
        .collect();
    if !critical.is_empty() {
        let edges = connection::active_edges_for_owner(conn, owner_id)?;
        for alert in critical {
            let trigger = Trigger::CriticalVital {
                owner_id: *owner_id,
                reading_id: reading.id,
                subtype: alert.kind,
            };
            let drafts = alerts::route(&trigger, &edges, now);
            notifications::create_all(conn, drafts, now);
        }
    }

    tracing::debug!(reading = %reading.id, alerts = reading.alerts.len(), "Vital reading saved");
    Ok(reading)
}

/// Fetch one reading, for the deep link a critical-vital notification
/// carries. Gated like the listing.
pub fn get_vital_reading(
    conn: &Connection,
    actor_id: &Uuid,
    reading_id: &Uuid,
    now: NaiveDateTime,
) -> Result<VitalReading, CareError> {
    let reading = vital::get_reading(conn, reading_id)?
        .ok_or_else(|| CareError::not_found("VitalReading", reading_id))?;
    permissions::require_access(conn, actor_id, &reading.owner_id, Capability::ViewVitals, now)?;
    Ok(reading)
}

pub fn list_vital_readings(
    conn: &Connection,
    actor_id: &Uuid,
    owner_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<VitalReading>, CareError> {
    permissions::require_access(conn, actor_id, owner_id, Capability::ViewVitals, now)?;
    Ok(vital::readings_for_owner(conn, owner_id)?)
}

// ═══════════════════════════════════════════════════════════
// Connections
// ═══════════════════════════════════════════════════════════

/// Rate-limited connection request. The target gets a connection-request
/// notification; the edge itself stays pending until they respond.
pub fn request_connection(
    conn: &Connection,
    limiter: &mut RateLimiter,
    requester_id: &Uuid,
    target: &str,
    requester_role: Role,
    relationship: &str,
    now: NaiveDateTime,
) -> Result<ConnectionEdge, CareError> {
    limiter.check(*requester_id, "request_connection", now)?;

    let edge =
        permissions::request_connection(conn, requester_id, target, requester_role, relationship, now)?;

    let draft = NotificationDraft {
        recipient_id: edge.owner_id,
        kind: NotificationKind::ConnectionRequest,
        title: "New connection request".into(),
        message: format!("{} would like to connect as your {relationship}", edge.grantee_email),
        priority: Priority::Medium,
        related: RelatedRefs::connection(edge.id),
        actions: vec![
            NotificationAction::new("accept", "Accept"),
            NotificationAction::new("decline", "Decline"),
        ],
        scheduled_for: None,
        expires_at: None,
    };
    notifications::create_all(conn, vec![draft], now);
    Ok(edge)
}

pub fn respond_to_connection(
    conn: &Connection,
    owner_id: &Uuid,
    edge_id: &Uuid,
    accept: bool,
    now: NaiveDateTime,
) -> Result<ConnectionEdge, CareError> {
    permissions::respond_to_connection(conn, owner_id, edge_id, accept, now)
}

pub fn update_connection_capabilities(
    conn: &Connection,
    owner_id: &Uuid,
    edge_id: &Uuid,
    capabilities: CapabilitySet,
) -> Result<ConnectionEdge, CareError> {
    permissions::update_capabilities(conn, owner_id, edge_id, capabilities)
}

pub fn revoke_connection(
    conn: &Connection,
    owner_id: &Uuid,
    edge_id: &Uuid,
) -> Result<(), CareError> {
    permissions::revoke_connection(conn, owner_id, edge_id)
}

pub fn list_connections(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<ConnectionEdge>, CareError> {
    Ok(connection::edges_for_owner(conn, owner_id)?)
}

pub fn list_granted_connections(
    conn: &Connection,
    grantee_id: &Uuid,
) -> Result<Vec<ConnectionEdge>, CareError> {
    Ok(connection::edges_for_grantee(conn, grantee_id)?)
}

// ═══════════════════════════════════════════════════════════
// Appointments
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub title: String,
    pub provider: Option<String>,
    pub location: Option<String>,
    pub starts_at: NaiveDateTime,
}

/// Create an appointment and queue its reminder, scheduled one hour before
/// the start and moot once the appointment begins.
pub fn schedule_appointment(
    conn: &Connection,
    owner_id: &Uuid,
    input: NewAppointment,
    now: NaiveDateTime,
) -> Result<Appointment, CareError> {
    if input.starts_at <= now {
        return Err(CareError::Validation("Appointment must be in the future".into()));
    }

    let appt = Appointment {
        id: Uuid::new_v4(),
        owner_id: *owner_id,
        title: input.title,
        provider: input.provider,
        location: input.location,
        starts_at: input.starts_at,
        status: AppointmentStatus::Upcoming,
        created_at: now,
    };
    appointment::insert_appointment(conn, &appt)?;

    let trigger = Trigger::AppointmentReminder {
        owner_id: *owner_id,
        appointment_id: appt.id,
        title: appt.title.clone(),
        starts_at: appt.starts_at,
    };
    let drafts = alerts::route(&trigger, &[], now);
    notifications::create_all(conn, drafts, now);
    Ok(appt)
}

/// Complete or cancel an appointment. Owner-only. Cancelling supersedes a
/// reminder that has not gone out yet.
pub fn set_appointment_status(
    conn: &Connection,
    actor_id: &Uuid,
    appointment_id: &Uuid,
    status: AppointmentStatus,
) -> Result<Appointment, CareError> {
    let appt = appointment::get_appointment(conn, appointment_id)?
        .ok_or_else(|| CareError::not_found("Appointment", appointment_id))?;
    if appt.owner_id != *actor_id {
        return Err(CareError::Unauthorized(
            "Only the appointment owner may change its status".into(),
        ));
    }

    appointment::update_appointment_status(conn, appointment_id, status)?;
    if status == AppointmentStatus::Cancelled {
        supersede_stale_appointment_reminders(conn, appointment_id);
    }
    appointment::get_appointment(conn, appointment_id)?
        .ok_or_else(|| CareError::not_found("Appointment", appointment_id))
}

fn supersede_stale_appointment_reminders(conn: &Connection, appointment_id: &Uuid) {
    let stale = match notification::undelivered_for_appointment(conn, appointment_id) {
        Ok(stale) => stale,
        Err(e) => {
            tracing::warn!(appointment = %appointment_id, error = %e, "Stale reminder lookup failed");
            return;
        }
    };
    for reminder in stale {
        if let Err(e) = notifications::mark_superseded(conn, &reminder.id) {
            tracing::warn!(notification = %reminder.id, error = %e, "Failed to supersede reminder");
        }
    }
}

pub fn list_appointments(
    conn: &Connection,
    actor_id: &Uuid,
    owner_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<Appointment>, CareError> {
    permissions::require_access(conn, actor_id, owner_id, Capability::ViewAppointments, now)?;
    Ok(appointment::appointments_for_owner(conn, owner_id)?)
}

// ═══════════════════════════════════════════════════════════
// Emergencies and notifications
// ═══════════════════════════════════════════════════════════

/// Rate-limited emergency broadcast to the whole care circle. Emergencies
/// ignore the per-connection alert opt-out.
pub fn raise_emergency_alert(
    conn: &Connection,
    limiter: &mut RateLimiter,
    subject_id: &Uuid,
    message: &str,
    now: NaiveDateTime,
) -> Result<Vec<Notification>, CareError> {
    limiter.check(*subject_id, "emergency_alert", now)?;

    let edges = connection::active_edges_for_owner(conn, subject_id)?;
    let trigger = Trigger::EmergencyAlert {
        subject_id: *subject_id,
        message: message.to_string(),
    };
    let drafts = alerts::route(&trigger, &edges, now);
    tracing::info!(subject = %subject_id, recipients = drafts.len(), "Emergency alert raised");
    Ok(notifications::create_all(conn, drafts, now))
}

/// A recipient's own notification feed. Notifications are never shared
/// across accounts, so there is no graph check to make.
pub fn list_notifications(
    conn: &Connection,
    recipient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<Notification>, CareError> {
    notifications::list_active(conn, recipient_id, now)
}

pub fn mark_notification_read(
    conn: &Connection,
    actor_id: &Uuid,
    notification_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Notification, CareError> {
    notifications::mark_read(conn, notification_id, actor_id, now)
}

pub fn record_notification_interaction(
    conn: &Connection,
    actor_id: &Uuid,
    notification_id: &Uuid,
    kind: InteractionKind,
    data: Option<serde_json::Value>,
    now: NaiveDateTime,
) -> Result<Interaction, CareError> {
    notifications::add_interaction(conn, notification_id, actor_id, kind, data, now)
}
