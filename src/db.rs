//! Database module for the ledger bot
//!
//! Persists the sender allow-list.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database lock poisoned")]
    LockPoisoned,
    #[error("Failed to read legacy allow-list {path}: {source}")]
    LegacyRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid legacy allow-list {path}: {source}")]
    LegacyFormat {
        path: String,
        source: serde_json::Error,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== Allow-list Operations ====================

    /// All authorized senders, oldest first
    pub fn load_authorized_senders(&self) -> DbResult<Vec<AuthorizedSender>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT sender_id, authorized_at FROM authorized_senders
             ORDER BY authorized_at ASC, sender_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AuthorizedSender {
                sender_id: row.get(0)?,
                authorized_at: parse_datetime(&row.get::<_, String>(1)?),
            })
        })?;
        let senders = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(senders)
    }

    /// Record a sender. Returns false if it was already on the list.
    pub fn add_authorized_sender(&self, sender_id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO authorized_senders (sender_id, authorized_at) VALUES (?1, ?2)",
            params![sender_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    /// Merge a JSON array of sender ids into the allow-list.
    /// Returns how many were new.
    pub fn import_legacy_allow_list(&self, path: &Path) -> DbResult<usize> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| DbError::LegacyRead {
            path: display.clone(),
            source,
        })?;
        let senders: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| DbError::LegacyFormat {
                path: display,
                source,
            })?;

        let mut added = 0;
        for sender in senders.iter().filter(|s| !s.is_empty()) {
            if self.add_authorized_sender(sender)? {
                added += 1;
            }
        }
        Ok(added)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
