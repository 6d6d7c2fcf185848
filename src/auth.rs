//! Shared-secret authentication gate
//!
//! A sender becomes authorized by sending the shared secret as a text
//! message. Authorization is permanent and survives restarts.

use crate::db::{Database, DbResult};
use std::collections::HashSet;
use std::sync::RwLock;

/// Outcome of gating one text message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The message was the secret; the sender is now authorized
    KeyAccepted,
    /// Authorized sender, hand the message to the dialog
    Pass,
    Rejected,
}

pub struct AuthGate {
    secret: String,
    authorized: RwLock<HashSet<String>>,
    db: Database,
}

impl AuthGate {
    /// Build the gate from the persisted allow-list
    pub fn load(secret: impl Into<String>, db: Database) -> DbResult<Self> {
        let authorized: HashSet<String> = db
            .load_authorized_senders()?
            .into_iter()
            .map(|s| s.sender_id)
            .collect();
        tracing::info!(count = authorized.len(), "Loaded allow-list");
        Ok(Self {
            secret: secret.into(),
            authorized: RwLock::new(authorized),
            db,
        })
    }

    /// Gate a trimmed text message. The secret is checked first, so an
    /// authorized sender re-sending it gets the success reply again.
    pub fn check(&self, sender: &str, text: &str) -> GateDecision {
        if text == self.secret {
            self.authorize(sender);
            GateDecision::KeyAccepted
        } else if self.is_authorized(sender) {
            GateDecision::Pass
        } else {
            GateDecision::Rejected
        }
    }

    pub fn is_authorized(&self, sender: &str) -> bool {
        self.authorized
            .read()
            .map_or(false, |set| set.contains(sender))
    }

    pub fn authorized_count(&self) -> usize {
        self.authorized.read().map_or(0, |set| set.len())
    }

    /// Add to the in-memory set and persist. A failed write is logged; the
    /// sender stays authorized until restart.
    fn authorize(&self, sender: &str) {
        match self.authorized.write() {
            Ok(mut set) => {
                set.insert(sender.to_string());
            }
            Err(_) => {
                tracing::error!(sender, "Allow-list lock poisoned");
                return;
            }
        }
        if let Err(e) = self.db.add_authorized_sender(sender) {
            tracing::error!(sender, error = %e, "Failed to persist authorized sender");
        }
    }
}
