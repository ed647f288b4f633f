use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_ts_opt, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Frequency, Medication, MedicationStatus};

const MED_COLUMNS: &str = "id, owner_id, name, dosage, frequency, pill_count, low_stock_threshold,
     next_dose, adherence, total_doses, taken_doses, missed_doses, status, created_at";

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, owner_id, name, dosage, frequency, pill_count,
         low_stock_threshold, next_dose, adherence, total_doses, taken_doses,
         missed_doses, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            med.id.to_string(),
            med.owner_id.to_string(),
            med.name,
            med.dosage,
            med.frequency.as_str(),
            med.pill_count,
            med.low_stock_threshold,
            med.next_dose.map(fmt_ts),
            med.adherence,
            med.total_doses,
            med.taken_doses,
            med.missed_doses,
            med.status.as_str(),
            fmt_ts(med.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_medication(conn: &Connection, id: &Uuid) -> Result<Option<Medication>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {MED_COLUMNS} FROM medications WHERE id = ?1"),
            params![id.to_string()],
            map_row,
        )
        .optional()?;
    row.map(medication_from_row).transpose()
}

/// Rewrite the dose-tracking fields after a recorded dose. Counters,
/// stock, schedule and adherence move together in one statement.
pub fn update_dose_tracking(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE medications SET pill_count = ?1, next_dose = ?2, adherence = ?3,
         total_doses = ?4, taken_doses = ?5, missed_doses = ?6 WHERE id = ?7",
        params![
            med.pill_count,
            med.next_dose.map(fmt_ts),
            med.adherence,
            med.total_doses,
            med.taken_doses,
            med.missed_doses,
            med.id.to_string(),
        ],
    )?;
    Ok(())
}

pub fn update_medication_status(
    conn: &Connection,
    id: &Uuid,
    status: MedicationStatus,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE medications SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    Ok(())
}

pub fn medications_for_owner(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MED_COLUMNS} FROM medications
         WHERE owner_id = ?1
         ORDER BY CASE status
             WHEN 'active' THEN 1
             WHEN 'paused' THEN 2
             WHEN 'stopped' THEN 3
           END ASC,
           created_at DESC"
    ))?;
    let rows = stmt.query_map(params![owner_id.to_string()], map_row)?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row?)?);
    }
    Ok(meds)
}

/// Active medications only, the set that participates in streak math.
pub fn active_medications_for_owner(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MED_COLUMNS} FROM medications
         WHERE owner_id = ?1 AND status = 'active'
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![owner_id.to_string()], map_row)?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row?)?);
    }
    Ok(meds)
}

type MedRow = (
    String,
    String,
    String,
    String,
    String,
    u32,
    u32,
    Option<String>,
    u8,
    u32,
    u32,
    u32,
    String,
    String,
);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MedRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
    ))
}

fn medication_from_row(row: MedRow) -> Result<Medication, DatabaseError> {
    let (
        id,
        owner_id,
        name,
        dosage,
        frequency,
        pill_count,
        low_stock_threshold,
        next_dose,
        adherence,
        total_doses,
        taken_doses,
        missed_doses,
        status,
        created_at,
    ) = row;

    Ok(Medication {
        id: parse_uuid(&id)?,
        owner_id: parse_uuid(&owner_id)?,
        name,
        dosage,
        frequency: Frequency::from_str(&frequency)?,
        pill_count,
        low_stock_threshold,
        next_dose: parse_ts_opt(next_dose)?,
        adherence,
        total_doses,
        taken_doses,
        missed_doses,
        status: MedicationStatus::from_str(&status)?,
        created_at: parse_ts(&created_at)?,
    })
}
