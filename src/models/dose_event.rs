use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DoseStatus;

/// Append-only dose log entry. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseEvent {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub scheduled_time: NaiveDateTime,
    pub taken_at: Option<NaiveDateTime>,
    pub status: DoseStatus,
    /// Optional verification evidence reference.
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}
