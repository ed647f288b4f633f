//! Vital-sign classification: threshold tables mapping raw values to
//! categories, plus the alert evaluation run on every save. Stateless and
//! total; unknown inputs fall into a default branch instead of erroring.

use crate::models::{
    BloodPressure, BloodSugar, BpCategory, GlucoseCategory, GlucoseTestType, HeartRate,
    Measurements, VitalAlert, VitalAlertKind, VitalReadingInput, VitalSeverity,
};

/// Blood pressure category, first match wins. Boundary values belong to
/// the lower category: 120/79 is elevated because normal requires
/// systolic strictly below 120.
pub fn classify_blood_pressure(systolic: u16, diastolic: u16) -> BpCategory {
    if systolic < 90 || diastolic < 60 {
        BpCategory::Low
    } else if systolic < 120 && diastolic < 80 {
        BpCategory::Normal
    } else if systolic < 130 && diastolic < 80 {
        BpCategory::Elevated
    } else if systolic < 140 && diastolic < 90 {
        BpCategory::HighStage1
    } else if systolic < 180 || diastolic < 120 {
        BpCategory::HighStage2
    } else {
        BpCategory::Crisis
    }
}

/// Blood sugar category. Bands depend on the test type; test types without
/// defined bands classify as normal, no classification attempted.
pub fn classify_blood_sugar(value: f64, test_type: GlucoseTestType) -> GlucoseCategory {
    match test_type {
        GlucoseTestType::Fasting => {
            if value < 70.0 {
                GlucoseCategory::Low
            } else if value < 100.0 {
                GlucoseCategory::Normal
            } else if value < 126.0 {
                GlucoseCategory::PreDiabetic
            } else {
                GlucoseCategory::Diabetic
            }
        }
        GlucoseTestType::Random | GlucoseTestType::PostMeal => {
            if value < 70.0 {
                GlucoseCategory::Low
            } else if value < 140.0 {
                GlucoseCategory::Normal
            } else if value < 200.0 {
                GlucoseCategory::PreDiabetic
            } else {
                GlucoseCategory::Diabetic
            }
        }
        GlucoseTestType::Other => GlucoseCategory::Normal,
    }
}

/// Build the classified measurement bag from raw caller input. Categories
/// are always derived here. The input type has no field for them.
pub fn classify(input: &VitalReadingInput) -> Measurements {
    Measurements {
        blood_pressure: input.blood_pressure.as_ref().map(|bp| BloodPressure {
            systolic: bp.systolic,
            diastolic: bp.diastolic,
            category: classify_blood_pressure(bp.systolic, bp.diastolic),
        }),
        heart_rate: input.heart_rate.map(|bpm| HeartRate { bpm }),
        blood_sugar: input.blood_sugar.as_ref().map(|bs| BloodSugar {
            value: bs.value,
            test_type: bs.test_type,
            category: classify_blood_sugar(bs.value, bs.test_type),
        }),
        temperature: input.temperature,
        oxygen_saturation: input.oxygen_saturation,
        respiratory_rate: input.respiratory_rate,
        weight: input.weight,
        height: input.height,
    }
}

/// Critical-alert triggers, evaluated on every write independently of the
/// categories. The returned list replaces whatever a previous reading had.
pub fn evaluate_alerts(measurements: &Measurements) -> Vec<VitalAlert> {
    let mut alerts = Vec::new();

    if let Some(bp) = &measurements.blood_pressure {
        match bp.category {
            BpCategory::Crisis => alerts.push(VitalAlert {
                severity: VitalSeverity::Critical,
                kind: VitalAlertKind::HighBp,
                message: format!(
                    "Blood pressure {}/{} is in hypertensive crisis range",
                    bp.systolic, bp.diastolic
                ),
            }),
            BpCategory::Low => alerts.push(VitalAlert {
                severity: VitalSeverity::Warning,
                kind: VitalAlertKind::LowBp,
                message: format!(
                    "Blood pressure {}/{} is below the normal range",
                    bp.systolic, bp.diastolic
                ),
            }),
            _ => {}
        }
    }

    if let Some(bs) = &measurements.blood_sugar {
        if bs.value < 70.0 {
            alerts.push(VitalAlert {
                severity: VitalSeverity::Critical,
                kind: VitalAlertKind::LowGlucose,
                message: format!("Blood sugar {} mg/dL is dangerously low", bs.value),
            });
        } else if bs.value > 400.0 {
            alerts.push(VitalAlert {
                severity: VitalSeverity::Critical,
                kind: VitalAlertKind::HighGlucose,
                message: format!("Blood sugar {} mg/dL is dangerously high", bs.value),
            });
        }
    }

    if let Some(hr) = &measurements.heart_rate {
        if hr.bpm < 50 || hr.bpm > 150 {
            alerts.push(VitalAlert {
                severity: VitalSeverity::Warning,
                kind: VitalAlertKind::IrregularHr,
                message: format!("Heart rate {} bpm is outside the expected range", hr.bpm),
            });
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodPressureInput, BloodSugarInput};

    #[test]
    fn bp_reference_values() {
        assert_eq!(classify_blood_pressure(119, 79), BpCategory::Normal);
        assert_eq!(classify_blood_pressure(120, 79), BpCategory::Elevated);
        assert_eq!(classify_blood_pressure(135, 85), BpCategory::HighStage1);
        assert_eq!(classify_blood_pressure(185, 70), BpCategory::HighStage2);
        assert_eq!(classify_blood_pressure(200, 130), BpCategory::Crisis);
    }

    #[test]
    fn bp_low_takes_precedence() {
        assert_eq!(classify_blood_pressure(85, 70), BpCategory::Low);
        assert_eq!(classify_blood_pressure(110, 55), BpCategory::Low);
    }

    #[test]
    fn bp_boundaries_belong_to_lower_category() {
        // Systolic exactly 130 with low diastolic: elevated branch needs <130.
        assert_eq!(classify_blood_pressure(130, 75), BpCategory::HighStage1);
        assert_eq!(classify_blood_pressure(129, 79), BpCategory::Elevated);
        assert_eq!(classify_blood_pressure(180, 121), BpCategory::Crisis);
    }

    #[test]
    fn fasting_glucose_reference_values() {
        assert_eq!(classify_blood_sugar(65.0, GlucoseTestType::Fasting), GlucoseCategory::Low);
        assert_eq!(classify_blood_sugar(90.0, GlucoseTestType::Fasting), GlucoseCategory::Normal);
        assert_eq!(
            classify_blood_sugar(110.0, GlucoseTestType::Fasting),
            GlucoseCategory::PreDiabetic
        );
        assert_eq!(
            classify_blood_sugar(200.0, GlucoseTestType::Fasting),
            GlucoseCategory::Diabetic
        );
    }

    #[test]
    fn random_glucose_uses_wider_bands() {
        assert_eq!(classify_blood_sugar(130.0, GlucoseTestType::Random), GlucoseCategory::Normal);
        assert_eq!(
            classify_blood_sugar(150.0, GlucoseTestType::PostMeal),
            GlucoseCategory::PreDiabetic
        );
        assert_eq!(classify_blood_sugar(210.0, GlucoseTestType::Random), GlucoseCategory::Diabetic);
    }

    #[test]
    fn other_test_type_defaults_to_normal() {
        assert_eq!(classify_blood_sugar(300.0, GlucoseTestType::Other), GlucoseCategory::Normal);
    }

    #[test]
    fn crisis_bp_raises_critical_alert() {
        let input = VitalReadingInput {
            blood_pressure: Some(BloodPressureInput { systolic: 200, diastolic: 130 }),
            ..Default::default()
        };
        let alerts = evaluate_alerts(&classify(&input));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, VitalSeverity::Critical);
        assert_eq!(alerts[0].kind, VitalAlertKind::HighBp);
    }

    #[test]
    fn low_bp_raises_warning() {
        let input = VitalReadingInput {
            blood_pressure: Some(BloodPressureInput { systolic: 85, diastolic: 55 }),
            ..Default::default()
        };
        let alerts = evaluate_alerts(&classify(&input));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, VitalSeverity::Warning);
        assert_eq!(alerts[0].kind, VitalAlertKind::LowBp);
    }

    #[test]
    fn glucose_extremes_raise_critical_alerts() {
        let low = VitalReadingInput {
            blood_sugar: Some(BloodSugarInput { value: 55.0, test_type: GlucoseTestType::Fasting }),
            ..Default::default()
        };
        let alerts = evaluate_alerts(&classify(&low));
        assert_eq!(alerts[0].kind, VitalAlertKind::LowGlucose);
        assert_eq!(alerts[0].severity, VitalSeverity::Critical);

        let high = VitalReadingInput {
            blood_sugar: Some(BloodSugarInput { value: 420.0, test_type: GlucoseTestType::Random }),
            ..Default::default()
        };
        let alerts = evaluate_alerts(&classify(&high));
        assert_eq!(alerts[0].kind, VitalAlertKind::HighGlucose);
        assert_eq!(alerts[0].severity, VitalSeverity::Critical);
    }

    #[test]
    fn heart_rate_extremes_raise_warning() {
        for bpm in [45u16, 160] {
            let input = VitalReadingInput { heart_rate: Some(bpm), ..Default::default() };
            let alerts = evaluate_alerts(&classify(&input));
            assert_eq!(alerts.len(), 1, "bpm {bpm}");
            assert_eq!(alerts[0].kind, VitalAlertKind::IrregularHr);
            assert_eq!(alerts[0].severity, VitalSeverity::Warning);
        }
        let input = VitalReadingInput { heart_rate: Some(72), ..Default::default() };
        assert!(evaluate_alerts(&classify(&input)).is_empty());
    }

    #[test]
    fn normal_reading_produces_no_alerts() {
        let input = VitalReadingInput {
            blood_pressure: Some(BloodPressureInput { systolic: 118, diastolic: 76 }),
            heart_rate: Some(70),
            blood_sugar: Some(BloodSugarInput { value: 92.0, test_type: GlucoseTestType::Fasting }),
            temperature: Some(36.7),
            oxygen_saturation: Some(98.0),
            ..Default::default()
        };
        assert!(evaluate_alerts(&classify(&input)).is_empty());
    }

    #[test]
    fn multiple_groups_alert_independently() {
        let input = VitalReadingInput {
            blood_pressure: Some(BloodPressureInput { systolic: 190, diastolic: 125 }),
            heart_rate: Some(160),
            blood_sugar: Some(BloodSugarInput { value: 60.0, test_type: GlucoseTestType::Fasting }),
            ..Default::default()
        };
        let alerts = evaluate_alerts(&classify(&input));
        assert_eq!(alerts.len(), 3);
    }
}
