//! HTTP clients for the chat gateway, the ledger spreadsheet and receipt
//! storage

mod drive;
mod error;
mod google_auth;
mod line;
mod sheets;

pub use drive::DriveStorage;
pub use error::{CollaboratorError, CollaboratorErrorKind};
pub use google_auth::{GoogleAuth, TokenSource};
pub use line::LineGateway;
pub use sheets::SheetsLedger;

use reqwest::{Client, Response, Url};
use std::time::Duration;

fn http_client(timeout: Duration) -> Result<Client, CollaboratorError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CollaboratorError::unknown(format!("Failed to create HTTP client: {e}")))
}

/// Parse a base URL and append path segments, percent-encoding each one
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, CollaboratorError> {
    let mut url = Url::parse(base)
        .map_err(|e| CollaboratorError::invalid_request(format!("Bad base URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| CollaboratorError::invalid_request(format!("Base URL {base} cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Body of a successful response, or the classified failure
async fn checked_text(response: Response) -> Result<String, CollaboratorError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CollaboratorError::network(format!("Failed to read response: {e}")))?;
    if !status.is_success() {
        return Err(CollaboratorError::from_status(status, &body));
    }
    Ok(body)
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, CollaboratorError> {
    serde_json::from_str(body).map_err(|e| {
        CollaboratorError::unknown(format!("Failed to parse response: {e} - body: {body}"))
    })
}
