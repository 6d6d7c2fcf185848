//! Database schema and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS authorized_senders (
    sender_id TEXT PRIMARY KEY,
    authorized_at TEXT NOT NULL
);
";

/// A sender that has presented the shared secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedSender {
    pub sender_id: String,
    pub authorized_at: DateTime<Utc>,
}
