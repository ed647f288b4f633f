use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Frequency, MedicationStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    /// Remaining stock; clamped at zero on consumption.
    pub pill_count: u32,
    pub low_stock_threshold: u32,
    pub next_dose: Option<NaiveDateTime>,
    /// Derived: round(taken_doses / total_doses * 100), 0 before any dose.
    pub adherence: u8,
    pub total_doses: u32,
    pub taken_doses: u32,
    pub missed_doses: u32,
    pub status: MedicationStatus,
    pub created_at: NaiveDateTime,
}

impl Medication {
    pub fn is_low_stock(&self) -> bool {
        self.pill_count <= self.low_stock_threshold
    }
}
