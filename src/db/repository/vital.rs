use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Measurements, VitalAlert, VitalReading};

pub fn insert_reading(conn: &Connection, reading: &VitalReading) -> Result<(), DatabaseError> {
    let measurements_json = serde_json::to_string(&reading.measurements)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let alerts_json = serde_json::to_string(&reading.alerts)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

    conn.execute(
        "INSERT INTO vital_readings (id, owner_id, recorded_at, measurements_json, alerts_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            reading.id.to_string(),
            reading.owner_id.to_string(),
            fmt_ts(reading.recorded_at),
            measurements_json,
            alerts_json,
            fmt_ts(reading.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_reading(conn: &Connection, id: &Uuid) -> Result<Option<VitalReading>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, owner_id, recorded_at, measurements_json, alerts_json, created_at
             FROM vital_readings WHERE id = ?1",
            params![id.to_string()],
            map_row,
        )
        .optional()?;
    row.map(reading_from_row).transpose()
}

pub fn readings_for_owner(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<VitalReading>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, recorded_at, measurements_json, alerts_json, created_at
         FROM vital_readings WHERE owner_id = ?1
         ORDER BY recorded_at DESC",
    )?;
    let rows = stmt.query_map(params![owner_id.to_string()], map_row)?;

    let mut readings = Vec::new();
    for row in rows {
        readings.push(reading_from_row(row?)?);
    }
    Ok(readings)
}

type ReadingRow = (String, String, String, String, String, String);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadingRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn reading_from_row(row: ReadingRow) -> Result<VitalReading, DatabaseError> {
    let (id, owner_id, recorded_at, measurements_json, alerts_json, created_at) = row;

    let measurements: Measurements = serde_json::from_str(&measurements_json)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid measurements: {e}")))?;
    let alerts: Vec<VitalAlert> = serde_json::from_str(&alerts_json)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid alerts: {e}")))?;

    Ok(VitalReading {
        id: parse_uuid(&id)?,
        owner_id: parse_uuid(&owner_id)?,
        recorded_at: parse_ts(&recorded_at)?,
        measurements,
        alerts,
        created_at: parse_ts(&created_at)?,
    })
}
