use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BpCategory, GlucoseCategory, GlucoseTestType, VitalAlertKind, VitalSeverity};

/// Blood pressure group with its category derived at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
    pub category: BpCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodSugar {
    pub value: f64,
    pub test_type: GlucoseTestType,
    pub category: GlucoseCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRate {
    pub bpm: u16,
}

/// Structured bag of optional measurement groups, one reading per save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub blood_pressure: Option<BloodPressure>,
    pub heart_rate: Option<HeartRate>,
    pub blood_sugar: Option<BloodSugar>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<f64>,
    pub respiratory_rate: Option<u16>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

/// Alert computed from raw values at save time. The list on a reading is
/// always fully replaced, never appended to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalAlert {
    pub severity: VitalSeverity,
    pub kind: VitalAlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalReading {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub recorded_at: NaiveDateTime,
    pub measurements: Measurements,
    pub alerts: Vec<VitalAlert>,
    pub created_at: NaiveDateTime,
}

// ── Write-path input ──────────────────────────────────────

/// Caller-supplied raw values. Carries no category or alert fields, so
/// clients cannot set either; classification happens on the write path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VitalReadingInput {
    pub blood_pressure: Option<BloodPressureInput>,
    pub heart_rate: Option<u16>,
    pub blood_sugar: Option<BloodSugarInput>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<f64>,
    pub respiratory_rate: Option<u16>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BloodPressureInput {
    pub systolic: u16,
    pub diastolic: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BloodSugarInput {
    pub value: f64,
    pub test_type: GlucoseTestType,
}
