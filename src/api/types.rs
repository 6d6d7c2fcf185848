//! Webhook payload and response types

use crate::runtime::{Inbound, InboundMessage};
use serde::{Deserialize, Serialize};

/// Batch of events delivered by the chat platform
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: EventSource,
    /// Absent for follow, join and other non-message events
    pub message: Option<WireMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
    pub group_id: Option<String>,
}

impl EventSource {
    /// Group id takes priority so a whole group shares one dialog
    pub fn sender(&self) -> Option<String> {
        [&self.group_id, &self.user_id]
            .into_iter()
            .flatten()
            .find(|id| !id.is_empty())
            .cloned()
    }
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    pub text: Option<String>,
}

impl WebhookEvent {
    /// Decode into the dispatcher's event type. Non-message events yield `None`.
    pub fn into_inbound(self) -> Option<Inbound> {
        let Some(message) = self.message else {
            tracing::debug!(event_type = %self.event_type, "Skipping non-message event");
            return None;
        };
        let sender = self.source.sender();
        let message = match (message.kind.as_str(), message.text) {
            ("text", Some(text)) => InboundMessage::Text(text),
            ("image", _) => InboundMessage::Image {
                message_id: message.id,
            },
            (kind, _) => InboundMessage::Unsupported {
                kind: kind.to_string(),
            },
        };
        Some(Inbound {
            sender,
            reply_token: self.reply_token,
            message,
        })
    }
}

/// Webhook acknowledgment
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
    pub authorized_senders: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
