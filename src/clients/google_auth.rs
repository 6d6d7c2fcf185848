//! Bearer tokens for the ledger and storage APIs

use super::CollaboratorError;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Tokens minted by the command are reused for this long
pub const TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

/// Where access tokens come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Fixed token, e.g. from the environment
    Static(String),
    /// Program printing a fresh token on stdout
    Command { program: String, args: Vec<String> },
}

impl TokenSource {
    /// Split a command line on whitespace
    pub fn command(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(TokenSource::Command {
            program,
            args: parts.collect(),
        })
    }
}

struct CachedToken {
    value: String,
    fetched_at: Instant,
}

/// Caches tokens from a [`TokenSource`]
pub struct GoogleAuth {
    source: TokenSource,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleAuth {
    pub fn new(source: TokenSource) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    pub async fn bearer(&self) -> Result<String, CollaboratorError> {
        let (program, args) = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Command { program, args } => (program, args),
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.fetched_at.elapsed() < TOKEN_TTL {
                return Ok(token.value.clone());
            }
        }

        let value = run_token_command(program, args).await?;
        tracing::info!(program = %program, "Refreshed Google access token");
        *cached = Some(CachedToken {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop the cached token so the next call mints a new one
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

async fn run_token_command(program: &str, args: &[String]) -> Result<String, CollaboratorError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| CollaboratorError::auth(format!("Failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CollaboratorError::auth(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(CollaboratorError::auth(format!("{program} printed no token")));
    }
    Ok(token)
}
