pub mod account;
pub mod appointment;
pub mod connection;
pub mod dose_event;
pub mod medication;
pub mod notification;
pub mod vital;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn parse_ts(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid timestamp {s:?}: {e}")))
}

pub(crate) fn parse_ts_opt(s: Option<String>) -> Result<Option<NaiveDateTime>, DatabaseError> {
    s.as_deref().map(parse_ts).transpose()
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid uuid {s:?}: {e}")))
}
