//! History fetch: `GET /api/chat/messages`.

use async_trait::async_trait;
use frames::ChatMessage;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Where the session's initial message log comes from.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Recent messages, oldest first.
    async fn fetch(&self) -> Result<Vec<ChatMessage>, ClientError>;
}

/// Fetches history from the chat server over HTTP.
pub struct HttpHistory {
    client: reqwest::Client,
    url: String,
}

impl HttpHistory {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(config.history_timeout).build()?;
        Ok(Self { client, url: config.history_url() })
    }
}

#[async_trait]
impl HistorySource for HttpHistory {
    async fn fetch(&self) -> Result<Vec<ChatMessage>, ClientError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus(status.as_u16()));
        }
        let messages: Vec<ChatMessage> = response.json().await?;
        debug!(count = messages.len(), "history: fetched");
        Ok(messages)
    }
}
