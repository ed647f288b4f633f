//! Adherence tracking: consumes dose events against a medication,
//! maintains the counters, derived adherence percentage, and streaks.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::STREAK_SCAN_CAP_DAYS;
use crate::db::repository::{dose_event, medication};
use crate::error::CareError;
use crate::models::{DoseEvent, DoseStatus, Medication, MedicationStatus};
use crate::scheduling;

/// Trigger raised by a recorded dose event, fired exactly once per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdherenceTrigger {
    DoseMissed,
    LowStock,
}

/// Result of recording a dose: the updated medication, the appended event,
/// and whatever triggers the event raised.
#[derive(Debug)]
pub struct DoseOutcome {
    pub medication: Medication,
    pub event: DoseEvent,
    pub triggers: Vec<AdherenceTrigger>,
}

/// Derived adherence percentage, divide-by-zero guarded.
pub fn adherence_percent(taken_doses: u32, total_doses: u32) -> u8 {
    if total_doses == 0 {
        0
    } else {
        (taken_doses as f64 / total_doses as f64 * 100.0).round() as u8
    }
}

/// Record a dose event against a medication and apply the counter updates
/// atomically (one transaction per medication).
///
/// Taken: consume a pill (clamped at zero), advance the schedule.
/// Missed: count the miss; the schedule deliberately stays put so the miss
/// keeps surfacing instead of silently drifting forward.
/// Skipped: logged only, counters untouched.
pub fn record_dose(
    conn: &Connection,
    medication_id: &Uuid,
    status: DoseStatus,
    at: NaiveDateTime,
    note: Option<String>,
) -> Result<DoseOutcome, CareError> {
    let mut med = medication::get_medication(conn, medication_id)?
        .ok_or_else(|| CareError::not_found("Medication", medication_id))?;

    if med.status != MedicationStatus::Active {
        return Err(CareError::InvalidState(format!(
            "Cannot record a dose against a {} medication",
            med.status.as_str()
        )));
    }

    let event = DoseEvent {
        id: Uuid::new_v4(),
        medication_id: *medication_id,
        scheduled_time: med.next_dose.unwrap_or(at),
        taken_at: (status == DoseStatus::Taken).then_some(at),
        status,
        note,
        created_at: at,
    };

    let mut triggers = Vec::new();
    match status {
        DoseStatus::Taken => {
            med.taken_doses += 1;
            med.total_doses += 1;
            med.pill_count = med.pill_count.saturating_sub(1);
            med.next_dose = scheduling::next_dose(med.frequency, at);
            if med.is_low_stock() {
                triggers.push(AdherenceTrigger::LowStock);
            }
        }
        DoseStatus::Missed => {
            med.missed_doses += 1;
            med.total_doses += 1;
            triggers.push(AdherenceTrigger::DoseMissed);
        }
        DoseStatus::Skipped => {}
    }
    med.adherence = adherence_percent(med.taken_doses, med.total_doses);

    let tx = conn.unchecked_transaction().map_err(crate::db::DatabaseError::from)?;
    dose_event::insert_dose_event(&tx, &event)?;
    medication::update_dose_tracking(&tx, &med)?;
    tx.commit().map_err(crate::db::DatabaseError::from)?;

    tracing::debug!(
        medication = %med.id,
        status = status.as_str(),
        adherence = med.adherence,
        pill_count = med.pill_count,
        "Dose recorded"
    );

    Ok(DoseOutcome { medication: med, event, triggers })
}

/// Consecutive fully adherent days, walking backward from `today`.
///
/// A day counts only when every active daily-frequency medication has at
/// least its required number of taken doses that day. Strict by design:
/// partial adherence on any single medication breaks the day. Capped at
/// 365 days to bound the scan. Accounts with no daily-frequency
/// medications have no streak to speak of, so 0.
pub fn compute_streak(
    conn: &Connection,
    owner_id: &Uuid,
    today: NaiveDate,
) -> Result<u32, CareError> {
    let medications = medication::active_medications_for_owner(conn, owner_id)?;
    let requirements: Vec<(Uuid, u32)> = medications
        .iter()
        .filter_map(|med| {
            let required = scheduling::doses_per_day(med.frequency);
            (required > 0).then_some((med.id, required))
        })
        .collect();

    if requirements.is_empty() {
        return Ok(0);
    }

    let mut streak = 0;
    for offset in 0..STREAK_SCAN_CAP_DAYS {
        let day = today - Duration::days(offset as i64);
        let mut day_complete = true;
        for (medication_id, required) in &requirements {
            if dose_event::taken_count_on_day(conn, medication_id, day)? < *required {
                day_complete = false;
                break;
            }
        }
        if !day_complete {
            break;
        }
        streak += 1;
    }
    Ok(streak)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::account::insert_account;
    use crate::db::repository::medication::insert_medication;
    use crate::models::{Account, Frequency, Role};
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn setup_account(conn: &Connection) -> Uuid {
        let account = Account {
            id: Uuid::new_v4(),
            name: "Maria".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            role: Role::Patient,
            created_at: ts(2026, 1, 1, 0),
        };
        insert_account(conn, &account).unwrap();
        account.id
    }

    fn setup_medication(
        conn: &Connection,
        owner_id: Uuid,
        frequency: Frequency,
        pill_count: u32,
    ) -> Medication {
        let med = Medication {
            id: Uuid::new_v4(),
            owner_id,
            name: "Metformin".into(),
            dosage: "500mg".into(),
            frequency,
            pill_count,
            low_stock_threshold: 5,
            next_dose: Some(ts(2026, 3, 10, 8)),
            adherence: 0,
            total_doses: 0,
            taken_doses: 0,
            missed_doses: 0,
            status: MedicationStatus::Active,
            created_at: ts(2026, 1, 1, 0),
        };
        insert_medication(conn, &med).unwrap();
        med
    }

    #[test]
    fn adherence_percent_guards_divide_by_zero() {
        assert_eq!(adherence_percent(0, 0), 0);
        assert_eq!(adherence_percent(1, 2), 50);
        assert_eq!(adherence_percent(2, 3), 67);
        assert_eq!(adherence_percent(3, 3), 100);
    }

    #[test]
    fn taken_dose_updates_counters_and_schedule() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::TwiceDaily, 30);

        let at = ts(2026, 3, 10, 8);
        let outcome = record_dose(&conn, &med.id, DoseStatus::Taken, at, None).unwrap();

        assert_eq!(outcome.medication.taken_doses, 1);
        assert_eq!(outcome.medication.total_doses, 1);
        assert_eq!(outcome.medication.pill_count, 29);
        assert_eq!(outcome.medication.adherence, 100);
        assert_eq!(outcome.medication.next_dose, Some(ts(2026, 3, 10, 20)));
        assert!(outcome.triggers.is_empty());
    }

    #[test]
    fn missed_dose_counts_but_does_not_advance_schedule() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::OnceDaily, 30);
        let before = med.next_dose;

        let outcome =
            record_dose(&conn, &med.id, DoseStatus::Missed, ts(2026, 3, 10, 9), None).unwrap();

        assert_eq!(outcome.medication.missed_doses, 1);
        assert_eq!(outcome.medication.total_doses, 1);
        assert_eq!(outcome.medication.pill_count, 30);
        assert_eq!(outcome.medication.adherence, 0);
        assert_eq!(outcome.medication.next_dose, before, "missed dose must stall the schedule");
        assert_eq!(outcome.triggers, vec![AdherenceTrigger::DoseMissed]);
    }

    #[test]
    fn skipped_dose_is_logged_without_counter_impact() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::OnceDaily, 30);

        let outcome =
            record_dose(&conn, &med.id, DoseStatus::Skipped, ts(2026, 3, 10, 9), None).unwrap();

        assert_eq!(outcome.medication.total_doses, 0);
        assert_eq!(outcome.medication.adherence, 0);
        assert!(outcome.triggers.is_empty());
        let events = dose_event::events_for_medication(&conn, &med.id).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn adherence_matches_counters_after_mixed_doses() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::OnceDaily, 30);

        record_dose(&conn, &med.id, DoseStatus::Taken, ts(2026, 3, 10, 8), None).unwrap();
        record_dose(&conn, &med.id, DoseStatus::Missed, ts(2026, 3, 11, 8), None).unwrap();
        let outcome =
            record_dose(&conn, &med.id, DoseStatus::Taken, ts(2026, 3, 12, 8), None).unwrap();

        let med = outcome.medication;
        assert_eq!(med.adherence, adherence_percent(med.taken_doses, med.total_doses));
        assert_eq!(med.adherence, 67);
    }

    #[test]
    fn pill_count_clamps_at_zero() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::FourTimesDaily, 2);

        let mut at = ts(2026, 3, 10, 6);
        for _ in 0..4 {
            record_dose(&conn, &med.id, DoseStatus::Taken, at, None).unwrap();
            at += Duration::hours(6);
        }

        let med = medication::get_medication(&conn, &med.id).unwrap().unwrap();
        assert_eq!(med.pill_count, 0);
        assert_eq!(med.taken_doses, 4);
    }

    #[test]
    fn low_stock_trigger_fires_when_threshold_reached() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::OnceDaily, 6);

        let outcome =
            record_dose(&conn, &med.id, DoseStatus::Taken, ts(2026, 3, 10, 8), None).unwrap();
        assert_eq!(outcome.triggers, vec![AdherenceTrigger::LowStock]);
    }

    #[test]
    fn paused_medication_rejects_dose() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::OnceDaily, 30);
        medication::update_medication_status(&conn, &med.id, MedicationStatus::Paused).unwrap();

        let result = record_dose(&conn, &med.id, DoseStatus::Taken, ts(2026, 3, 10, 8), None);
        assert!(matches!(result, Err(CareError::InvalidState(_))));
    }

    #[test]
    fn unknown_medication_is_not_found() {
        let conn = open_memory_database().unwrap();
        let result =
            record_dose(&conn, &Uuid::new_v4(), DoseStatus::Taken, ts(2026, 3, 10, 8), None);
        assert!(matches!(result, Err(CareError::NotFound { .. })));
    }

    // ── Streaks ──────────────────────────────────────────

    #[test]
    fn streak_counts_consecutive_complete_days() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let med = setup_medication(&conn, owner, Frequency::OnceDaily, 30);

        for day in 8..=10 {
            record_dose(&conn, &med.id, DoseStatus::Taken, ts(2026, 3, day, 8), None).unwrap();
        }

        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(compute_streak(&conn, &owner, today).unwrap(), 3);
    }

    #[test]
    fn partial_day_on_any_medication_breaks_streak() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let once = setup_medication(&conn, owner, Frequency::OnceDaily, 30);
        let twice = setup_medication(&conn, owner, Frequency::TwiceDaily, 30);

        // Yesterday: both fully taken. Today: twice-daily only half taken.
        record_dose(&conn, &once.id, DoseStatus::Taken, ts(2026, 3, 9, 8), None).unwrap();
        record_dose(&conn, &twice.id, DoseStatus::Taken, ts(2026, 3, 9, 8), None).unwrap();
        record_dose(&conn, &twice.id, DoseStatus::Taken, ts(2026, 3, 9, 20), None).unwrap();
        record_dose(&conn, &once.id, DoseStatus::Taken, ts(2026, 3, 10, 8), None).unwrap();
        record_dose(&conn, &twice.id, DoseStatus::Taken, ts(2026, 3, 10, 8), None).unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(compute_streak(&conn, &owner, today).unwrap(), 0);

        // Complete today and the streak reaches back through yesterday.
        record_dose(&conn, &twice.id, DoseStatus::Taken, ts(2026, 3, 10, 20), None).unwrap();
        assert_eq!(compute_streak(&conn, &owner, today).unwrap(), 2);
    }

    #[test]
    fn weekly_medication_does_not_gate_daily_streak() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        let daily = setup_medication(&conn, owner, Frequency::OnceDaily, 30);
        setup_medication(&conn, owner, Frequency::Weekly, 10);

        record_dose(&conn, &daily.id, DoseStatus::Taken, ts(2026, 3, 10, 8), None).unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(compute_streak(&conn, &owner, today).unwrap(), 1);
    }

    #[test]
    fn no_daily_medications_means_no_streak() {
        let conn = open_memory_database().unwrap();
        let owner = setup_account(&conn);
        setup_medication(&conn, owner, Frequency::AsNeeded, 30);

        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(compute_streak(&conn, &owner, today).unwrap(), 0);
    }
}
