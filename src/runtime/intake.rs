//! Receipt image staging

use super::traits::ChatGateway;
use crate::clients::CollaboratorError;
use crate::workflow::StagedImage;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Message id {0:?} is not usable as a file name")]
    InvalidMessageId(String),
    #[error("Failed to fetch image content: {0}")]
    Fetch(#[from] CollaboratorError),
    #[error("Failed to write staged image: {0}")]
    Write(#[from] std::io::Error),
}

/// Fetch an inbound image and write it to `<staging_dir>/<message_id>.jpg`
pub async fn stage_image(
    gateway: &dyn ChatGateway,
    staging_dir: &Path,
    message_id: &str,
) -> Result<StagedImage, IntakeError> {
    if !is_safe_message_id(message_id) {
        return Err(IntakeError::InvalidMessageId(message_id.to_string()));
    }
    let bytes = gateway.fetch_content(message_id).await?;

    tokio::fs::create_dir_all(staging_dir).await?;
    let path = staging_dir.join(format!("{message_id}.jpg"));
    tokio::fs::write(&path, &bytes).await?;

    tracing::debug!(message_id, path = %path.display(), size = bytes.len(), "Staged image");
    Ok(StagedImage {
        message_id: message_id.to_string(),
        path,
    })
}

/// Platform message ids are opaque tokens; anything beyond `[A-Za-z0-9_-]`
/// could escape the staging directory.
fn is_safe_message_id(message_id: &str) -> bool {
    !message_id.is_empty()
        && message_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
