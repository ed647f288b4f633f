use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Account, Role};

pub fn insert_account(conn: &Connection, account: &Account) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO accounts (id, name, email, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            account.id.to_string(),
            account.name,
            account.email,
            account.role.as_str(),
            fmt_ts(account.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_account(conn: &Connection, id: &Uuid) -> Result<Option<Account>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, role, created_at FROM accounts WHERE id = ?1",
            params![id.to_string()],
            map_row,
        )
        .optional()?;
    row.map(account_from_row).transpose()
}

pub fn get_account_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<Account>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, role, created_at FROM accounts WHERE email = ?1 COLLATE NOCASE",
            params![email],
            map_row,
        )
        .optional()?;
    row.map(account_from_row).transpose()
}

type AccountRow = (String, String, String, String, String);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn account_from_row(row: AccountRow) -> Result<Account, DatabaseError> {
    let (id, name, email, role, created_at) = row;
    Ok(Account {
        id: parse_uuid(&id)?,
        name,
        email,
        role: Role::from_str(&role)?,
        created_at: parse_ts(&created_at)?,
    })
}
