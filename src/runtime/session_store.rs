//! Per-sender session store
//!
//! Each sender owns one slot. A slot is a mutex, so every handling turn for a
//! sender runs as a critical section while other senders proceed in parallel.

use crate::workflow::{AccountingSession, Session, SessionChange, SheetCreationSession};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// The at-most-one session of a single sender
#[derive(Debug, Default)]
pub struct SessionSlot {
    session: Option<Session>,
}

impl SessionSlot {
    pub fn active(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Open the sheet dialog. No-op if any dialog is already open.
    pub fn start_sheet_creation(&mut self) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(Session::SheetCreation(
            SheetCreationSession::ChoosingCategory,
        ));
        true
    }

    /// Open the accounting dialog. No-op if any dialog is already open.
    pub fn start_accounting(&mut self, sheets: Vec<String>) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(Session::Accounting(AccountingSession::new(sheets)));
        true
    }

    /// Mutate the open session in place. Returns false when there is none.
    pub fn advance(&mut self, mutator: impl FnOnce(&mut Session)) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                mutator(session);
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self) -> Option<Session> {
        self.session.take()
    }

    /// Apply the outcome of a transition
    pub fn apply(&mut self, change: SessionChange) {
        match change {
            SessionChange::Unchanged => {}
            SessionChange::StartSheetCreation => {
                if !self.start_sheet_creation() {
                    tracing::debug!("Sheet dialog not started, another dialog is open");
                }
            }
            SessionChange::StartAccounting { sheets } => {
                if !self.start_accounting(sheets) {
                    tracing::debug!("Accounting dialog not started, another dialog is open");
                }
            }
            SessionChange::Update(next) => {
                if !self.advance(|session| *session = next) {
                    tracing::warn!("Dropped session update, no dialog is open");
                }
            }
            SessionChange::Clear => {
                self.cancel();
            }
        }
    }
}

/// Exclusive access to one sender's slot for the length of a handling turn
pub type SessionGuard = OwnedMutexGuard<SessionSlot>;

/// Process-wide map from sender identity to its slot
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<String, Arc<Mutex<SessionSlot>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the sender's slot and wait for exclusive access to it
    pub async fn lock(&self, sender: &str) -> SessionGuard {
        let existing = self.slots.read().await.get(sender).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .slots
                .write()
                .await
                .entry(sender.to_string())
                .or_default()
                .clone(),
        };
        slot.lock_owned().await
    }

    /// Snapshot of the sender's open dialog
    pub async fn get_active(&self, sender: &str) -> Option<Session> {
        let slot = self.slots.read().await.get(sender).cloned()?;
        let guard = slot.lock().await;
        guard.active().cloned()
    }

    /// Senders with an open dialog. Slots busy with a turn count as open.
    pub async fn active_count(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.try_lock().map_or(true, |s| s.active().is_some()))
            .count()
    }
}
