use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Channel, InteractionKind, NotificationKind, Priority};

/// Per-channel delivery bookkeeping. `sent` records that an attempt was
/// made; `delivered` only that the attempt succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelDelivery {
    pub sent: bool,
    pub sent_at: Option<NaiveDateTime>,
    pub delivered: bool,
    pub delivered_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub push: ChannelDelivery,
    pub email: ChannelDelivery,
    pub sms: ChannelDelivery,
}

impl DeliveryStatus {
    pub fn channel(&self, channel: Channel) -> &ChannelDelivery {
        match channel {
            Channel::Push => &self.push,
            Channel::Email => &self.email,
            Channel::Sms => &self.sms,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelDelivery {
        match channel {
            Channel::Push => &mut self.push,
            Channel::Email => &mut self.email,
            Channel::Sms => &mut self.sms,
        }
    }

    pub fn any_sent(&self) -> bool {
        self.push.sent || self.email.sent || self.sms.sent
    }
}

/// Typed back-references to the entity that triggered the notification,
/// for client-side deep-linking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedRefs {
    pub medication_id: Option<Uuid>,
    pub vital_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub connection_id: Option<Uuid>,
}

impl RelatedRefs {
    pub fn medication(id: Uuid) -> Self {
        Self { medication_id: Some(id), ..Self::default() }
    }

    pub fn vital(id: Uuid) -> Self {
        Self { vital_id: Some(id), ..Self::default() }
    }

    pub fn appointment(id: Uuid) -> Self {
        Self { appointment_id: Some(id), ..Self::default() }
    }

    pub fn connection(id: Uuid) -> Self {
        Self { connection_id: Some(id), ..Self::default() }
    }
}

/// Recipient-facing affordance shown with the notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub label: String,
}

impl NotificationAction {
    pub fn new(id: &str, label: &str) -> Self {
        Self { id: id.into(), label: label.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub category: String,
    pub is_read: bool,
    pub read_at: Option<NaiveDateTime>,
    pub delivery: DeliveryStatus,
    pub related: RelatedRefs,
    pub actions: Vec<NotificationAction>,
    /// None means deliver immediately.
    pub scheduled_for: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
    /// Moot marker: the delivery driver skips superseded notifications.
    pub superseded: bool,
    pub created_at: NaiveDateTime,
}

/// What the alert router produces; the store turns it into a Notification.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub related: RelatedRefs,
    pub actions: Vec<NotificationAction>,
    pub scheduled_for: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

impl NotificationKind {
    /// Listing category derived from the trigger kind.
    pub fn category(&self) -> &'static str {
        match self {
            NotificationKind::DoseMissed | NotificationKind::LowStock => "medication",
            NotificationKind::CriticalVital => "vitals",
            NotificationKind::AppointmentReminder => "appointment",
            NotificationKind::EmergencyAlert => "safety",
            NotificationKind::ConnectionRequest => "social",
            NotificationKind::System => "system",
        }
    }
}

/// Append-only interaction log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub kind: InteractionKind,
    pub data: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}
