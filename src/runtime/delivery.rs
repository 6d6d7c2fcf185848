//! Outbound message delivery with bounded retry

use super::traits::ChatGateway;
use crate::clients::CollaboratorError;
use std::sync::Arc;
use std::time::Duration;

/// Fixed-backoff retry policy for outbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// A message waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Reply { reply_token: String, text: String },
    Push { to: String, text: String },
}

/// Sends outgoing messages, retrying transient failures.
///
/// Delivery never fails the caller: exhausted or permanent failures are
/// logged and dropped.
pub struct Courier {
    gateway: Arc<dyn ChatGateway>,
    policy: RetryPolicy,
}

impl Courier {
    pub fn new(gateway: Arc<dyn ChatGateway>, policy: RetryPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Returns whether the message was accepted by the gateway
    pub async fn deliver(&self, message: &Outgoing) -> bool {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.send_once(message).await {
                Ok(()) => return true,
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Message delivery failed, retrying"
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => {
                    tracing::error!(
                        attempt,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Message delivery abandoned"
                    );
                    return false;
                }
            }
        }
        false
    }

    pub async fn deliver_all(&self, messages: &[Outgoing]) {
        for message in messages {
            self.deliver(message).await;
        }
    }

    async fn send_once(&self, message: &Outgoing) -> Result<(), CollaboratorError> {
        match message {
            Outgoing::Reply { reply_token, text } => self.gateway.reply(reply_token, text).await,
            Outgoing::Push { to, text } => self.gateway.push(to, text).await,
        }
    }
}
