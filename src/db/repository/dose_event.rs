use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_ts_opt, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{DoseEvent, DoseStatus};

pub fn insert_dose_event(conn: &Connection, event: &DoseEvent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO dose_events (id, medication_id, scheduled_time, taken_at, status, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.id.to_string(),
            event.medication_id.to_string(),
            fmt_ts(event.scheduled_time),
            event.taken_at.map(fmt_ts),
            event.status.as_str(),
            event.note,
            fmt_ts(event.created_at),
        ],
    )?;
    Ok(())
}

pub fn events_for_medication(
    conn: &Connection,
    medication_id: &Uuid,
) -> Result<Vec<DoseEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medication_id, scheduled_time, taken_at, status, note, created_at
         FROM dose_events WHERE medication_id = ?1
         ORDER BY scheduled_time DESC",
    )?;
    let rows = stmt.query_map(params![medication_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (id, medication_id, scheduled_time, taken_at, status, note, created_at) = row?;
        events.push(DoseEvent {
            id: parse_uuid(&id)?,
            medication_id: parse_uuid(&medication_id)?,
            scheduled_time: parse_ts(&scheduled_time)?,
            taken_at: parse_ts_opt(taken_at)?,
            status: DoseStatus::from_str(&status)?,
            note,
            created_at: parse_ts(&created_at)?,
        });
    }
    Ok(events)
}

/// Count of doses taken for a medication on a calendar day (by taken_at).
pub fn taken_count_on_day(
    conn: &Connection,
    medication_id: &Uuid,
    day: NaiveDate,
) -> Result<u32, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM dose_events
         WHERE medication_id = ?1 AND status = 'taken' AND date(taken_at) = ?2",
        params![medication_id.to_string(), day.format("%Y-%m-%d").to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}
