pub mod error;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod rewards;

pub use error::LedgerError;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Single-connection SQLite handle. Every write path goes through the one
/// connection, so multi-statement writes only need a transaction, not locks.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// A panic mid-transaction poisons the mutex, but the transaction was
    /// rolled back when it dropped, so the connection is still sound.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("DB lock was poisoned by a panic; recovering");
            poisoned.into_inner()
        })
    }
}

/// Parse a timestamp as stored by SQLite (`YYYY-MM-DD HH:MM:SS[.fff]`, UTC)
/// or as RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

/// Fresh row id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
