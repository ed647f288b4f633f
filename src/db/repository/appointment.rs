use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentStatus};

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, owner_id, title, provider, location, starts_at, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.owner_id.to_string(),
            appt.title,
            appt.provider,
            appt.location,
            fmt_ts(appt.starts_at),
            appt.status.as_str(),
            fmt_ts(appt.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, owner_id, title, provider, location, starts_at, status, created_at
             FROM appointments WHERE id = ?1",
            params![id.to_string()],
            map_row,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

pub fn appointments_for_owner(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, title, provider, location, starts_at, status, created_at
         FROM appointments WHERE owner_id = ?1
         ORDER BY starts_at ASC",
    )?;
    let rows = stmt.query_map(params![owner_id.to_string()], map_row)?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    Ok(())
}

type ApptRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApptRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn appointment_from_row(row: ApptRow) -> Result<Appointment, DatabaseError> {
    let (id, owner_id, title, provider, location, starts_at, status, created_at) = row;
    Ok(Appointment {
        id: parse_uuid(&id)?,
        owner_id: parse_uuid(&owner_id)?,
        title,
        provider,
        location,
        starts_at: parse_ts(&starts_at)?,
        status: AppointmentStatus::from_str(&status)?,
        created_at: parse_ts(&created_at)?,
    })
}
