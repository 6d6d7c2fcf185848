//! Collaborator error types

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the chat gateway, the ledger or receipt storage
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    pub kind: CollaboratorErrorKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(kind: CollaboratorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::Network, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::NotFound, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(CollaboratorErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP response
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
        let kind = match status.as_u16() {
            401 | 403 => CollaboratorErrorKind::Auth,
            404 => CollaboratorErrorKind::NotFound,
            408 => CollaboratorErrorKind::Network,
            429 => CollaboratorErrorKind::RateLimit,
            400..=499 => CollaboratorErrorKind::InvalidRequest,
            500..=599 => CollaboratorErrorKind::ServerError,
            _ => CollaboratorErrorKind::Unknown,
        };
        Self::new(kind, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::network(e.to_string())
        } else if e.is_decode() {
            Self::unknown(format!("Unexpected response body: {e}"))
        } else {
            Self::unknown(e.to_string())
        }
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorErrorKind {
    /// Network issues, timeouts - retryable
    Network,
    /// Rate limited (429) - retryable
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Bad request (400), e.g. an expired reply token - not retryable
    InvalidRequest,
    /// Missing sheet, folder or file - not retryable
    NotFound,
    /// Unknown error
    Unknown,
}

impl CollaboratorErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
