//! Delivery seam. The engine never talks to email/push/SMS directly; it
//! hands notifications to a `DeliverySink` and records the outcome. A
//! failed attempt is degraded-but-recoverable: logged, never propagated.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::CareError;
use crate::models::{Channel, Notification};
use crate::notifications;

/// Result of one bounded send attempt on one channel.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self { success: true, message_id: Some(message_id.into()), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, message_id: None, error: Some(error.into()) }
    }
}

/// External transport collaborator. Implementations are expected to be
/// bounded (their own timeouts) and to answer with an outcome, not panic.
pub trait DeliverySink {
    fn send(&self, channel: Channel, recipient: &Uuid, notification: &Notification) -> DeliveryOutcome;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: u32,
    pub delivered: u32,
}

/// Pull-style delivery pass, intended to be invoked by an external
/// periodic driver. One attempt per due notification per channel; every
/// attempt is recorded, failures are logged and skipped.
pub fn deliver_due(
    conn: &Connection,
    sink: &dyn DeliverySink,
    channels: &[Channel],
    now: NaiveDateTime,
) -> Result<DeliveryReport, CareError> {
    let due = notifications::due_for_delivery(conn, now)?;
    let mut report = DeliveryReport::default();

    for notification in due {
        for &channel in channels {
            let outcome = sink.send(channel, &notification.recipient_id, &notification);
            report.attempted += 1;
            if outcome.success {
                report.delivered += 1;
            } else {
                tracing::warn!(
                    notification = %notification.id,
                    channel = channel.as_str(),
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Delivery attempt failed"
                );
            }
            notifications::record_delivery_attempt(
                conn,
                &notification.id,
                channel,
                outcome.success,
                now,
            )?;
        }
    }
    Ok(report)
}
