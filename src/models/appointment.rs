use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub provider: Option<String>,
    pub location: Option<String>,
    pub starts_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub created_at: NaiveDateTime,
}
