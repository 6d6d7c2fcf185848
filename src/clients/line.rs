//! LINE Messaging API gateway

use super::{checked_text, endpoint, http_client, CollaboratorError};
use crate::runtime::ChatGateway;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const API_BASE: &str = "https://api.line.me";
const DATA_API_BASE: &str = "https://api-data.line.me";
const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    r#type: &'static str,
    text: &'a str,
}

impl<'a> TextMessage<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            r#type: "text",
            text,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

pub struct LineGateway {
    client: Client,
    channel_token: String,
    api_base: String,
    data_api_base: String,
}

impl LineGateway {
    pub fn new(channel_token: String) -> Result<Self, CollaboratorError> {
        Self::with_base_urls(channel_token, API_BASE, DATA_API_BASE)
    }

    /// Point the gateway somewhere other than the public API
    pub fn with_base_urls(
        channel_token: String,
        api_base: &str,
        data_api_base: &str,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(TIMEOUT)?,
            channel_token,
            api_base: api_base.to_string(),
            data_api_base: data_api_base.to_string(),
        })
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        path: &[&str],
        body: &T,
    ) -> Result<(), CollaboratorError> {
        let url = endpoint(&self.api_base, path)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.channel_token)
            .json(body)
            .send()
            .await?;
        checked_text(response).await.map(|_| ())
    }
}

#[async_trait]
impl ChatGateway for LineGateway {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), CollaboratorError> {
        let body = ReplyRequest {
            reply_token,
            messages: [TextMessage::new(text)],
        };
        self.post_json(&["v2", "bot", "message", "reply"], &body).await
    }

    async fn push(&self, to: &str, text: &str) -> Result<(), CollaboratorError> {
        let body = PushRequest {
            to,
            messages: [TextMessage::new(text)],
        };
        self.post_json(&["v2", "bot", "message", "push"], &body).await
    }

    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, CollaboratorError> {
        let url = endpoint(
            &self.data_api_base,
            &["v2", "bot", "message", message_id, "content"],
        )?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.channel_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::from_status(status, &body));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CollaboratorError::network(format!("Failed to read content: {e}")))?;
        Ok(bytes.to_vec())
    }
}
