//! SQLite pool bootstrap, schema and timestamp encoding.
//!
//! Timestamps are stored as INTEGER microseconds since the Unix epoch.

use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::shared::error::{PlatformError, Result};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        full_name TEXT,
        hashed_password TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        is_superuser INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_user_email ON user(email)",
    r#"
    CREATE TABLE IF NOT EXISTS item (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        condition TEXT NOT NULL,
        location TEXT NOT NULL,
        photo_url TEXT,
        owner_email TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        is_claimed INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_item_created_at ON item(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_item_owner_email ON item(owner_email)",
    r#"
    CREATE TABLE IF NOT EXISTS request (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'open',
        priority INTEGER NOT NULL DEFAULT 3,
        requester_email TEXT NOT NULL,
        item_id INTEGER REFERENCES item(id) ON DELETE SET NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_request_status ON request(status)",
    "CREATE INDEX IF NOT EXISTS idx_request_priority ON request(priority)",
    "CREATE INDEX IF NOT EXISTS idx_request_requester_email ON request(requester_email)",
    "CREATE INDEX IF NOT EXISTS idx_request_created_at ON request(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_request_item_id ON request(item_id)",
];

/// Open a pool against a file or URL, creating the database if missing.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!(url, max_connections, "Connected to SQLite");
    Ok(pool)
}

/// Private in-memory database on a single long-lived connection.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create tables and indexes. Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Initialized SQLite schema");
    Ok(())
}

/// Current time at storage precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| PlatformError::internal(format!("Invalid stored timestamp: {}", micros)))
}
