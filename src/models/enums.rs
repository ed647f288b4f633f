use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Family => "family",
    Caregiver => "caregiver",
    Doctor => "doctor",
});

str_enum!(ConnectionStatus {
    Pending => "pending",
    Active => "active",
    Declined => "declined",
    Inactive => "inactive",
});

str_enum!(Frequency {
    OnceDaily => "once_daily",
    TwiceDaily => "twice_daily",
    ThriceDaily => "thrice_daily",
    FourTimesDaily => "four_times_daily",
    Weekly => "weekly",
    Monthly => "monthly",
    AsNeeded => "as_needed",
});

impl Frequency {
    /// Lenient parse for externally supplied frequency strings: anything
    /// unrecognized falls back to once-daily so scheduling stays total.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Frequency::OnceDaily)
    }
}

str_enum!(MedicationStatus {
    Active => "active",
    Paused => "paused",
    Stopped => "stopped",
});

str_enum!(DoseStatus {
    Taken => "taken",
    Missed => "missed",
    Skipped => "skipped",
});

str_enum!(NotificationKind {
    DoseMissed => "dose_missed",
    LowStock => "low_stock",
    CriticalVital => "critical_vital",
    AppointmentReminder => "appointment_reminder",
    EmergencyAlert => "emergency_alert",
    ConnectionRequest => "connection_request",
    System => "system",
});

str_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

str_enum!(Channel {
    Push => "push",
    Email => "email",
    Sms => "sms",
});

str_enum!(InteractionKind {
    Viewed => "viewed",
    Clicked => "clicked",
    Dismissed => "dismissed",
    Snoozed => "snoozed",
    Shared => "shared",
});

str_enum!(AppointmentStatus {
    Upcoming => "upcoming",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(BpCategory {
    Low => "low",
    Normal => "normal",
    Elevated => "elevated",
    HighStage1 => "high_stage1",
    HighStage2 => "high_stage2",
    Crisis => "crisis",
});

str_enum!(GlucoseTestType {
    Fasting => "fasting",
    Random => "random",
    PostMeal => "post_meal",
    Other => "other",
});

str_enum!(GlucoseCategory {
    Low => "low",
    Normal => "normal",
    PreDiabetic => "pre_diabetic",
    Diabetic => "diabetic",
});

str_enum!(VitalSeverity {
    Critical => "critical",
    Warning => "warning",
    Info => "info",
});

str_enum!(VitalAlertKind {
    HighBp => "high_bp",
    LowBp => "low_bp",
    HighGlucose => "high_glucose",
    LowGlucose => "low_glucose",
    IrregularHr => "irregular_hr",
    Unusual => "unusual",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for (variant, s) in [
            (Role::Patient, "patient"),
            (Role::Family, "family"),
            (Role::Caregiver, "caregiver"),
            (Role::Doctor, "doctor"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Role::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn connection_status_round_trip() {
        for (variant, s) in [
            (ConnectionStatus::Pending, "pending"),
            (ConnectionStatus::Active, "active"),
            (ConnectionStatus::Declined, "declined"),
            (ConnectionStatus::Inactive, "inactive"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ConnectionStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn frequency_round_trip() {
        for (variant, s) in [
            (Frequency::OnceDaily, "once_daily"),
            (Frequency::TwiceDaily, "twice_daily"),
            (Frequency::ThriceDaily, "thrice_daily"),
            (Frequency::FourTimesDaily, "four_times_daily"),
            (Frequency::Weekly, "weekly"),
            (Frequency::Monthly, "monthly"),
            (Frequency::AsNeeded, "as_needed"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Frequency::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn frequency_lenient_parse_defaults_to_once_daily() {
        assert_eq!(Frequency::parse_lenient("every_fortnight"), Frequency::OnceDaily);
        assert_eq!(Frequency::parse_lenient(""), Frequency::OnceDaily);
        assert_eq!(Frequency::parse_lenient("twice_daily"), Frequency::TwiceDaily);
    }

    #[test]
    fn notification_kind_round_trip() {
        for (variant, s) in [
            (NotificationKind::DoseMissed, "dose_missed"),
            (NotificationKind::LowStock, "low_stock"),
            (NotificationKind::CriticalVital, "critical_vital"),
            (NotificationKind::AppointmentReminder, "appointment_reminder"),
            (NotificationKind::EmergencyAlert, "emergency_alert"),
            (NotificationKind::ConnectionRequest, "connection_request"),
            (NotificationKind::System, "system"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(NotificationKind::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&BpCategory::HighStage1).unwrap(),
            "\"high_stage1\""
        );
        assert_eq!(
            serde_json::to_string(&VitalAlertKind::IrregularHr).unwrap(),
            "\"irregular_hr\""
        );
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Role::from_str("admin").is_err());
        assert!(Priority::from_str("critical").is_err());
        assert!(Channel::from_str("").is_err());
    }
}
