//! Google Drive v3 receipt storage

use super::{checked_text, endpoint, http_client, parse_json, CollaboratorError, GoogleAuth};
use crate::runtime::ReceiptStorage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const API_BASE: &str = "https://www.googleapis.com";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileId>,
}

#[derive(Debug, Deserialize)]
struct FileId {
    id: String,
}

/// Shareable viewer link for an uploaded file
pub fn share_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view?usp=sharing")
}

/// Quote a value for a Drive search query
fn query_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn folder_query(name: &str, parent_id: &str) -> String {
    format!(
        "name = {} and {} in parents and mimeType = '{FOLDER_MIME}' and trashed = false",
        query_literal(name),
        query_literal(parent_id)
    )
}

/// `multipart/related` upload body: JSON metadata, then the file bytes
fn multipart_body(boundary: &str, metadata: &str, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
             --{boundary}\r\nContent-Type: {mime_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

pub struct DriveStorage {
    client: Client,
    auth: Arc<GoogleAuth>,
    api_base: String,
}

impl DriveStorage {
    pub fn new(auth: Arc<GoogleAuth>) -> Result<Self, CollaboratorError> {
        Self::with_base_url(auth, API_BASE)
    }

    pub fn with_base_url(auth: Arc<GoogleAuth>, api_base: &str) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(TIMEOUT)?,
            auth,
            api_base: api_base.to_string(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, CollaboratorError> {
        let token = self.auth.bearer().await?;
        let response = request.bearer_auth(token).send().await?;
        let result = checked_text(response).await;
        if matches!(&result, Err(e) if e.kind == super::CollaboratorErrorKind::Auth) {
            self.auth.invalidate().await;
        }
        result
    }

    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>, CollaboratorError> {
        let url = endpoint(&self.api_base, &["drive", "v3", "files"])?;
        let query = folder_query(name, parent_id);
        let body = self
            .send(
                self.client
                    .get(url)
                    .query(&[("q", query.as_str()), ("fields", "files(id)")]),
            )
            .await?;
        let list: FileList = parse_json(&body)?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, CollaboratorError> {
        let url = endpoint(&self.api_base, &["drive", "v3", "files"])?;
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id],
        });
        let body = self
            .send(self.client.post(url).query(&[("fields", "id")]).json(&metadata))
            .await?;
        let created: FileId = parse_json(&body)?;
        tracing::info!(folder = %name, id = %created.id, "Created receipt folder");
        Ok(created.id)
    }
}

#[async_trait]
impl ReceiptStorage for DriveStorage {
    async fn find_or_create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<String, CollaboratorError> {
        match self.find_folder(name, parent_id).await? {
            Some(id) => Ok(id),
            None => self.create_folder(name, parent_id).await,
        }
    }

    async fn upload(
        &self,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, CollaboratorError> {
        let url = endpoint(&self.api_base, &["upload", "drive", "v3", "files"])?;
        let boundary = format!("receipt-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({"name": file_name, "parents": [folder_id]}).to_string();
        let body = multipart_body(&boundary, &metadata, mime_type, &bytes);

        let response = self
            .send(
                self.client
                    .post(url)
                    .query(&[("uploadType", "multipart"), ("fields", "id")])
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={boundary}"),
                    )
                    .body(body),
            )
            .await?;
        let file: FileId = parse_json(&response)?;
        Ok(share_link(&file.id))
    }
}
