//! Database row types: these map directly to SQLite rows.
//! Distinct from pigeon-types models to keep the DB layer independent.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub created_at: String,
}

pub struct FriendshipRow {
    pub user_a: String,
    pub user_b: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub read_status: bool,
    pub deleted_for_sender: bool,
    pub deleted_for_recipient: bool,
    pub date_sent: String,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS[.fff]" without timezone;
/// they are always UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| anyhow!("Bad timestamp '{}': {}", raw, e))
}
