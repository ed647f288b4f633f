//! Notification lifecycle: creation, delivery bookkeeping, read state,
//! interaction logging, expiry. Expired and superseded notifications are
//! excluded from the relevant queries but never deleted (audit trail).

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::notification as repo;
use crate::error::CareError;
use crate::models::{
    Channel, Interaction, InteractionKind, Notification, NotificationDraft,
};

/// Persist a draft. A future `scheduled_for` leaves it pending; otherwise
/// it is immediately eligible for delivery.
pub fn create(
    conn: &Connection,
    draft: NotificationDraft,
    now: NaiveDateTime,
) -> Result<Notification, CareError> {
    let notification = Notification {
        id: Uuid::new_v4(),
        recipient_id: draft.recipient_id,
        category: draft.kind.category().to_string(),
        kind: draft.kind,
        title: draft.title,
        message: draft.message,
        priority: draft.priority,
        is_read: false,
        read_at: None,
        delivery: Default::default(),
        related: draft.related,
        actions: draft.actions,
        scheduled_for: draft.scheduled_for,
        expires_at: draft.expires_at,
        superseded: false,
        created_at: now,
    };
    repo::insert_notification(conn, &notification)?;
    Ok(notification)
}

/// Persist a batch of drafts, one notification per recipient. A failure on
/// one draft is logged and skipped: fan-out must never take down the
/// triggering business write.
pub fn create_all(
    conn: &Connection,
    drafts: Vec<NotificationDraft>,
    now: NaiveDateTime,
) -> Vec<Notification> {
    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let recipient = draft.recipient_id;
        match create(conn, draft, now) {
            Ok(notification) => created.push(notification),
            Err(e) => {
                tracing::warn!(recipient = %recipient, error = %e, "Failed to create notification");
            }
        }
    }
    created
}

/// Notifications the delivery driver should pick up: due (or immediate),
/// nothing sent on any channel yet, not expired, not superseded.
pub fn due_for_delivery(
    conn: &Connection,
    now: NaiveDateTime,
) -> Result<Vec<Notification>, CareError> {
    let candidates = repo::due_candidates(conn, now)?;
    Ok(candidates
        .into_iter()
        .filter(|n| !n.delivery.any_sent())
        .collect())
}

/// Record one delivery attempt on one channel. `sent` is set regardless of
/// the outcome, because the attempt happened; `delivered` only on success. Retry
/// policy belongs to the external driver, not here.
pub fn record_delivery_attempt(
    conn: &Connection,
    id: &Uuid,
    channel: Channel,
    success: bool,
    now: NaiveDateTime,
) -> Result<Notification, CareError> {
    let mut notification = repo::get_notification(conn, id)?
        .ok_or_else(|| CareError::not_found("Notification", id))?;

    let entry = notification.delivery.channel_mut(channel);
    entry.sent = true;
    entry.sent_at = Some(now);
    if success {
        entry.delivered = true;
        entry.delivered_at = Some(now);
    }
    repo::update_delivery(conn, id, &notification.delivery)?;
    Ok(notification)
}

/// Mark read by the recipient. Idempotent: a second call leaves `read_at`
/// untouched.
pub fn mark_read(
    conn: &Connection,
    id: &Uuid,
    actor_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Notification, CareError> {
    let notification = repo::get_notification(conn, id)?
        .ok_or_else(|| CareError::not_found("Notification", id))?;

    if notification.recipient_id != *actor_id {
        return Err(CareError::Unauthorized(
            "Only the recipient may mark a notification read".into(),
        ));
    }
    if notification.is_read {
        return Ok(notification);
    }

    repo::mark_read_row(conn, id, now)?;
    repo::get_notification(conn, id)?.ok_or_else(|| CareError::not_found("Notification", id))
}

/// Append to the interaction log. `viewed` mirrors mark-read semantics;
/// other interactions leave the read state alone.
pub fn add_interaction(
    conn: &Connection,
    id: &Uuid,
    actor_id: &Uuid,
    kind: InteractionKind,
    data: Option<serde_json::Value>,
    now: NaiveDateTime,
) -> Result<Interaction, CareError> {
    let notification = repo::get_notification(conn, id)?
        .ok_or_else(|| CareError::not_found("Notification", id))?;

    if notification.recipient_id != *actor_id {
        return Err(CareError::Unauthorized(
            "Only the recipient may interact with a notification".into(),
        ));
    }

    let interaction = Interaction {
        id: Uuid::new_v4(),
        notification_id: *id,
        kind,
        data,
        created_at: now,
    };
    repo::insert_interaction(conn, &interaction)?;

    if kind == InteractionKind::Viewed && !notification.is_read {
        repo::mark_read_row(conn, id, now)?;
    }
    Ok(interaction)
}

/// Mark a still-undelivered notification moot so the delivery driver skips
/// it. Once any channel has been attempted it is too late to supersede.
pub fn mark_superseded(conn: &Connection, id: &Uuid) -> Result<(), CareError> {
    let notification = repo::get_notification(conn, id)?
        .ok_or_else(|| CareError::not_found("Notification", id))?;

    if notification.delivery.any_sent() {
        return Err(CareError::InvalidState(
            "Cannot supersede a notification that has already been sent".into(),
        ));
    }
    repo::mark_superseded_row(conn, id)?;
    Ok(())
}

/// Active listing for a recipient: everything not yet expired.
pub fn list_active(
    conn: &Connection,
    recipient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<Notification>, CareError> {
    Ok(repo::active_for_recipient(conn, recipient_id, now)?)
}

pub fn interactions(
    conn: &Connection,
    notification_id: &Uuid,
) -> Result<Vec<Interaction>, CareError> {
    Ok(repo::interactions_for_notification(conn, notification_id)?)
}
