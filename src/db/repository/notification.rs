use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_ts_opt, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{
    DeliveryStatus, Interaction, InteractionKind, Notification, NotificationAction,
    NotificationKind, Priority, RelatedRefs,
};

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, title, message, priority, category,
     is_read, read_at, delivery_json, related_json, actions_json,
     scheduled_for, expires_at, superseded, created_at";

pub fn insert_notification(
    conn: &Connection,
    notification: &Notification,
) -> Result<(), DatabaseError> {
    let delivery_json = to_json(&notification.delivery)?;
    let related_json = to_json(&notification.related)?;
    let actions_json = to_json(&notification.actions)?;

    conn.execute(
        "INSERT INTO notifications (id, recipient_id, kind, title, message, priority,
         category, is_read, read_at, delivery_json, related_json, actions_json,
         scheduled_for, expires_at, superseded, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            notification.id.to_string(),
            notification.recipient_id.to_string(),
            notification.kind.as_str(),
            notification.title,
            notification.message,
            notification.priority.as_str(),
            notification.category,
            notification.is_read as i32,
            notification.read_at.map(fmt_ts),
            delivery_json,
            related_json,
            actions_json,
            notification.scheduled_for.map(fmt_ts),
            notification.expires_at.map(fmt_ts),
            notification.superseded as i32,
            fmt_ts(notification.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_notification(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Notification>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
            params![id.to_string()],
            map_row,
        )
        .optional()?;
    row.map(notification_from_row).transpose()
}

/// Candidates for the delivery driver: due (or immediate), not superseded,
/// not expired. The nothing-sent-yet filter lives in the store because the
/// per-channel flags are inside delivery_json.
pub fn due_candidates(
    conn: &Connection,
    now: NaiveDateTime,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE (scheduled_for IS NULL OR scheduled_for <= ?1)
           AND superseded = 0
           AND (expires_at IS NULL OR expires_at >= ?1)
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![fmt_ts(now)], map_row)?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(notification_from_row(row?)?);
    }
    Ok(notifications)
}

/// Active listing for a recipient: everything not yet expired. Read and
/// superseded notifications stay listed (audit trail).
pub fn active_for_recipient(
    conn: &Connection,
    recipient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE recipient_id = ?1
           AND (expires_at IS NULL OR expires_at >= ?2)
         ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![recipient_id.to_string(), fmt_ts(now)], map_row)?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(notification_from_row(row?)?);
    }
    Ok(notifications)
}

/// Undelivered, unsuperseded notifications of one kind tied to a medication.
/// Used to mark stale reminders moot when the dose gets taken.
pub fn undelivered_for_medication(
    conn: &Connection,
    medication_id: &Uuid,
    kind: NotificationKind,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE kind = ?1 AND superseded = 0"
    ))?;
    let rows = stmt.query_map(params![kind.as_str()], map_row)?;

    let mut notifications = Vec::new();
    for row in rows {
        let notification = notification_from_row(row?)?;
        if notification.related.medication_id == Some(*medication_id)
            && !notification.delivery.any_sent()
        {
            notifications.push(notification);
        }
    }
    Ok(notifications)
}

/// Undelivered, unsuperseded reminders tied to an appointment. Used to mark
/// the reminder moot when the appointment is cancelled.
pub fn undelivered_for_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE kind = ?1 AND superseded = 0"
    ))?;
    let rows = stmt.query_map(params![NotificationKind::AppointmentReminder.as_str()], map_row)?;

    let mut notifications = Vec::new();
    for row in rows {
        let notification = notification_from_row(row?)?;
        if notification.related.appointment_id == Some(*appointment_id)
            && !notification.delivery.any_sent()
        {
            notifications.push(notification);
        }
    }
    Ok(notifications)
}

pub fn update_delivery(
    conn: &Connection,
    id: &Uuid,
    delivery: &DeliveryStatus,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE notifications SET delivery_json = ?1 WHERE id = ?2",
        params![to_json(delivery)?, id.to_string()],
    )?;
    Ok(())
}

pub fn mark_read_row(
    conn: &Connection,
    id: &Uuid,
    read_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE notifications SET is_read = 1, read_at = ?1 WHERE id = ?2",
        params![fmt_ts(read_at), id.to_string()],
    )?;
    Ok(())
}

pub fn mark_superseded_row(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE notifications SET superseded = 1 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}

pub fn insert_interaction(
    conn: &Connection,
    interaction: &Interaction,
) -> Result<(), DatabaseError> {
    let data_json = interaction
        .data
        .as_ref()
        .map(|d| to_json(d))
        .transpose()?;
    conn.execute(
        "INSERT INTO notification_interactions (id, notification_id, kind, data_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            interaction.id.to_string(),
            interaction.notification_id.to_string(),
            interaction.kind.as_str(),
            data_json,
            fmt_ts(interaction.created_at),
        ],
    )?;
    Ok(())
}

pub fn interactions_for_notification(
    conn: &Connection,
    notification_id: &Uuid,
) -> Result<Vec<Interaction>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, notification_id, kind, data_json, created_at
         FROM notification_interactions WHERE notification_id = ?1
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![notification_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut interactions = Vec::new();
    for row in rows {
        let (id, notification_id, kind, data_json, created_at) = row?;
        let data = data_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid interaction data: {e}")))?;
        interactions.push(Interaction {
            id: parse_uuid(&id)?,
            notification_id: parse_uuid(&notification_id)?,
            kind: InteractionKind::from_str(&kind)?,
            data,
            created_at: parse_ts(&created_at)?,
        });
    }
    Ok(interactions)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

type NotificationRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    i32,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    i32,
    String,
);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
        row.get(14)?,
        row.get(15)?,
    ))
}

fn notification_from_row(row: NotificationRow) -> Result<Notification, DatabaseError> {
    let (
        id,
        recipient_id,
        kind,
        title,
        message,
        priority,
        category,
        is_read,
        read_at,
        delivery_json,
        related_json,
        actions_json,
        scheduled_for,
        expires_at,
        superseded,
        created_at,
    ) = row;

    let delivery: DeliveryStatus = serde_json::from_str(&delivery_json)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid delivery status: {e}")))?;
    let related: RelatedRefs = serde_json::from_str(&related_json)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid related refs: {e}")))?;
    let actions: Vec<NotificationAction> = serde_json::from_str(&actions_json)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid actions: {e}")))?;

    Ok(Notification {
        id: parse_uuid(&id)?,
        recipient_id: parse_uuid(&recipient_id)?,
        kind: NotificationKind::from_str(&kind)?,
        title,
        message,
        priority: Priority::from_str(&priority)?,
        category,
        is_read: is_read != 0,
        read_at: parse_ts_opt(read_at)?,
        delivery,
        related,
        actions,
        scheduled_for: parse_ts_opt(scheduled_for)?,
        expires_at: parse_ts_opt(expires_at)?,
        superseded: superseded != 0,
        created_at: parse_ts(&created_at)?,
    })
}
