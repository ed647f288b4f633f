use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_ts_opt, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{CapabilitySet, ConnectionEdge, ConnectionStatus, Role};

const EDGE_COLUMNS: &str = "id, owner_id, grantee_id, grantee_email, grantee_role, relationship,
     status, view_medications, view_vitals, view_appointments, receive_alerts,
     created_at, accepted_at, expires_at";

pub fn insert_edge(conn: &Connection, edge: &ConnectionEdge) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO connections (id, owner_id, grantee_id, grantee_email, grantee_role,
         relationship, status, view_medications, view_vitals, view_appointments,
         receive_alerts, created_at, accepted_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            edge.id.to_string(),
            edge.owner_id.to_string(),
            edge.grantee_id.map(|id| id.to_string()),
            edge.grantee_email,
            edge.grantee_role.as_str(),
            edge.relationship,
            edge.status.as_str(),
            edge.capabilities.view_medications as i32,
            edge.capabilities.view_vitals as i32,
            edge.capabilities.view_appointments as i32,
            edge.capabilities.receive_alerts as i32,
            fmt_ts(edge.created_at),
            edge.accepted_at.map(fmt_ts),
            edge.expires_at.map(fmt_ts),
        ],
    )?;
    Ok(())
}

pub fn get_edge(conn: &Connection, id: &Uuid) -> Result<Option<ConnectionEdge>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {EDGE_COLUMNS} FROM connections WHERE id = ?1"),
            params![id.to_string()],
            map_row,
        )
        .optional()?;
    row.map(edge_from_row).transpose()
}

/// Any pending or active edge between the pair, matched by resolved grantee
/// id or by grantee email. Used for duplicate-request detection.
pub fn find_open_edge(
    conn: &Connection,
    owner_id: &Uuid,
    grantee_id: &Uuid,
    grantee_email: &str,
) -> Result<Option<ConnectionEdge>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM connections
                 WHERE owner_id = ?1
                   AND (grantee_id = ?2 OR grantee_email = ?3 COLLATE NOCASE)
                   AND status IN ('pending', 'active')
                 LIMIT 1"
            ),
            params![owner_id.to_string(), grantee_id.to_string(), grantee_email],
            map_row,
        )
        .optional()?;
    row.map(edge_from_row).transpose()
}

/// The active edge the owner granted to this actor, if any.
pub fn find_active_edge(
    conn: &Connection,
    owner_id: &Uuid,
    grantee_id: &Uuid,
) -> Result<Option<ConnectionEdge>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM connections
                 WHERE owner_id = ?1 AND grantee_id = ?2 AND status = 'active'
                 LIMIT 1"
            ),
            params![owner_id.to_string(), grantee_id.to_string()],
            map_row,
        )
        .optional()?;
    row.map(edge_from_row).transpose()
}

/// All active edges granted by this owner, i.e. the alert fan-out set.
pub fn active_edges_for_owner(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<ConnectionEdge>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM connections
         WHERE owner_id = ?1 AND status = 'active'
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![owner_id.to_string()], map_row)?;

    let mut edges = Vec::new();
    for row in rows {
        edges.push(edge_from_row(row?)?);
    }
    Ok(edges)
}

/// Edges where this account is the grantee (grants held + requests sent).
pub fn edges_for_grantee(
    conn: &Connection,
    grantee_id: &Uuid,
) -> Result<Vec<ConnectionEdge>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM connections
         WHERE grantee_id = ?1
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![grantee_id.to_string()], map_row)?;

    let mut edges = Vec::new();
    for row in rows {
        edges.push(edge_from_row(row?)?);
    }
    Ok(edges)
}

/// All edges granted by this owner, any status (audit listing).
pub fn edges_for_owner(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<ConnectionEdge>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM connections
         WHERE owner_id = ?1
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map(params![owner_id.to_string()], map_row)?;

    let mut edges = Vec::new();
    for row in rows {
        edges.push(edge_from_row(row?)?);
    }
    Ok(edges)
}

pub fn update_edge_status(
    conn: &Connection,
    id: &Uuid,
    status: ConnectionStatus,
    accepted_at: Option<NaiveDateTime>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE connections SET status = ?1, accepted_at = COALESCE(?2, accepted_at)
         WHERE id = ?3",
        params![status.as_str(), accepted_at.map(fmt_ts), id.to_string()],
    )?;
    Ok(())
}

pub fn update_edge_capabilities(
    conn: &Connection,
    id: &Uuid,
    capabilities: &CapabilitySet,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE connections SET view_medications = ?1, view_vitals = ?2,
         view_appointments = ?3, receive_alerts = ?4 WHERE id = ?5",
        params![
            capabilities.view_medications as i32,
            capabilities.view_vitals as i32,
            capabilities.view_appointments as i32,
            capabilities.receive_alerts as i32,
            id.to_string(),
        ],
    )?;
    Ok(())
}

type EdgeRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    i32,
    i32,
    i32,
    i32,
    String,
    Option<String>,
    Option<String>,
);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EdgeRow> {
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

fn edge_from_row(row: EdgeRow) -> Result<ConnectionEdge, DatabaseError> {
    let (
        id,
        owner_id,
        grantee_id,
        grantee_email,
        grantee_role,
        relationship,
        status,
        view_medications,
        view_vitals,
        view_appointments,
        receive_alerts,
        created_at,
        accepted_at,
        expires_at,
    ) = row;

    Ok(ConnectionEdge {
        id: parse_uuid(&id)?,
        owner_id: parse_uuid(&owner_id)?,
        grantee_id: grantee_id.as_deref().map(parse_uuid).transpose()?,
        grantee_email,
        grantee_role: Role::from_str(&grantee_role)?,
        relationship,
        status: ConnectionStatus::from_str(&status)?,
        capabilities: CapabilitySet {
            view_medications: view_medications != 0,
            view_vitals: view_vitals != 0,
            view_appointments: view_appointments != 0,
            receive_alerts: receive_alerts != 0,
        },
        created_at: parse_ts(&created_at)?,
        accepted_at: parse_ts_opt(accepted_at)?,
        expires_at: parse_ts_opt(expires_at)?,
    })
}
