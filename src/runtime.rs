//! Runtime for handling chat events
//!
//! The [`Dispatcher`] owns the auth gate, the session store and the
//! collaborators. Each inbound event is gated, turned into a workflow event,
//! run through the executor under the sender's slot lock, and answered once
//! the lock is released.

mod debts;
mod delivery;
mod executor;
mod finalizer;
mod intake;
mod session_store;
mod sheet_recipes;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use debts::{aggregate_debts, DebtEntry, DebtReport};
pub use delivery::{Courier, Outgoing, RetryPolicy};
pub use executor::{Collaborators, TurnExecutor, TurnOutput};
pub use finalizer::{FinalizeFailure, FinalizeReport, Finalizer};
pub use intake::{stage_image, IntakeError};
pub use session_store::{SessionGuard, SessionSlot, SessionStore};
pub use traits::*;

use crate::auth::{AuthGate, GateDecision};
use crate::workflow::{replies, Event, Session};
use std::path::PathBuf;

/// One inbound chat event, already decoded from the webhook payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Group id when the event came from a group, otherwise the user id
    pub sender: Option<String>,
    pub reply_token: Option<String>,
    pub message: InboundMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Text(String),
    Image { message_id: String },
    /// Stickers, video, location and the like
    Unsupported { kind: String },
}

/// Dispatches inbound events to per-sender dialogs
pub struct Dispatcher {
    gate: AuthGate,
    sessions: SessionStore,
    collaborators: Collaborators,
    courier: Courier,
    staging_dir: PathBuf,
    root_folder_id: String,
}

impl Dispatcher {
    pub fn new(
        gate: AuthGate,
        collaborators: Collaborators,
        policy: RetryPolicy,
        staging_dir: PathBuf,
        root_folder_id: String,
    ) -> Self {
        let courier = Courier::new(collaborators.gateway.clone(), policy);
        Self {
            gate,
            sessions: SessionStore::new(),
            collaborators,
            courier,
            staging_dir,
            root_folder_id,
        }
    }

    /// Handle every event of one webhook call, in order
    pub async fn handle_batch(&self, events: Vec<Inbound>) {
        for inbound in events {
            self.handle_event(inbound).await;
        }
    }

    pub async fn handle_event(&self, inbound: Inbound) {
        let reply_token = inbound.reply_token.as_deref();

        let Some(sender) = inbound.sender.as_deref() else {
            tracing::warn!("Event without a group or user id");
            self.reply_once(reply_token, None, replies::UNSUPPORTED_SOURCE)
                .await;
            return;
        };

        let event = match inbound.message {
            InboundMessage::Text(raw) => {
                let text = raw.trim();
                match self.gate.check(sender, text) {
                    GateDecision::KeyAccepted => {
                        tracing::info!(sender, "Sender authorized");
                        self.reply_once(reply_token, Some(sender), replies::AUTH_SUCCEEDED)
                            .await;
                        return;
                    }
                    GateDecision::Rejected => {
                        tracing::info!(sender, "Rejected message from unauthorized sender");
                        self.reply_once(reply_token, Some(sender), replies::AUTH_REQUIRED)
                            .await;
                        return;
                    }
                    GateDecision::Pass => Event::text(text),
                }
            }
            InboundMessage::Image { message_id } => {
                if !self.gate.is_authorized(sender) {
                    tracing::info!(sender, "Rejected image from unauthorized sender");
                    self.reply_once(reply_token, Some(sender), replies::AUTH_REQUIRED)
                        .await;
                    return;
                }
                self.handle_image(sender, reply_token, &message_id).await;
                return;
            }
            InboundMessage::Unsupported { kind } => {
                tracing::debug!(sender, kind = %kind, "Ignoring unsupported message type");
                return;
            }
        };

        let output = self.run_turn(sender, event).await;
        self.courier
            .deliver_all(&output.into_outgoing(reply_token, sender))
            .await;
    }

    /// Run one event under the sender's slot lock. The lock is released
    /// before anything is delivered.
    async fn run_turn(&self, sender: &str, event: Event) -> TurnOutput {
        tracing::debug!(sender, event = event.name(), "Handling event");
        let mut slot = self.sessions.lock(sender).await;
        TurnExecutor::new(&self.collaborators, &self.root_folder_id)
            .run(&mut slot, sender, event)
            .await
    }

    /// Stage an image and feed it to the dialog. The slot is held across the
    /// download so a sender's images are recorded in arrival order.
    async fn handle_image(&self, sender: &str, reply_token: Option<&str>, message_id: &str) {
        let mut slot = self.sessions.lock(sender).await;
        let staged = match stage_image(
            self.collaborators.gateway.as_ref(),
            &self.staging_dir,
            message_id,
        )
        .await
        {
            Ok(staged) => staged,
            Err(e) => {
                drop(slot);
                tracing::error!(sender, message_id, error = %e, "Image intake failed");
                self.reply_once(reply_token, Some(sender), replies::IMAGE_FETCH_FAILED)
                    .await;
                return;
            }
        };

        tracing::debug!(sender, message_id, "Handling image event");
        let output = TurnExecutor::new(&self.collaborators, &self.root_folder_id)
            .run(&mut slot, sender, Event::Image(staged))
            .await;
        drop(slot);
        self.courier
            .deliver_all(&output.into_outgoing(reply_token, sender))
            .await;
    }

    async fn reply_once(&self, reply_token: Option<&str>, sender: Option<&str>, text: &str) {
        let message = match (reply_token, sender) {
            (Some(token), _) => Outgoing::Reply {
                reply_token: token.to_string(),
                text: text.to_string(),
            },
            (None, Some(to)) => Outgoing::Push {
                to: to.to_string(),
                text: text.to_string(),
            },
            (None, None) => return,
        };
        self.courier.deliver(&message).await;
    }

    /// Senders with an open dialog
    pub async fn active_sessions(&self) -> usize {
        self.sessions.active_count().await
    }

    pub async fn session(&self, sender: &str) -> Option<Session> {
        self.sessions.get_active(sender).await
    }

    pub fn authorized_senders(&self) -> usize {
        self.gate.authorized_count()
    }
}
