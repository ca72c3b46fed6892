//! Client configuration: where the chat server lives and how to reconnect.

use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(10);
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

const HISTORY_PATH: &str = "/api/chat/messages";
const WS_PATH: &str = "/api/ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP base URL of the chat server, e.g. `https://example.com`.
    pub base_url: String,
    /// First reconnect delay; doubles after every failed attempt.
    pub reconnect_initial: Duration,
    /// Upper bound for the reconnect delay.
    pub reconnect_max: Duration,
    /// Timeout for the history request.
    pub history_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            reconnect_initial: DEFAULT_RECONNECT_INITIAL,
            reconnect_max: DEFAULT_RECONNECT_MAX,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
        }
    }

    /// Read `VAPECHAT_BASE_URL`, falling back to the local default.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("VAPECHAT_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map_or_else(Self::default, |url| Self::new(url.trim()))
    }

    /// `GET` endpoint returning the recent message log.
    #[must_use]
    pub fn history_url(&self) -> String {
        format!("{}{HISTORY_PATH}", self.base_url)
    }

    /// Websocket endpoint derived from the HTTP base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] unless the base URL is
    /// `http://` or `https://`.
    pub fn ws_url(&self) -> Result<String, ClientError> {
        if let Some(rest) = self.base_url.strip_prefix("http://") {
            return Ok(format!("ws://{rest}{WS_PATH}"));
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            return Ok(format!("wss://{rest}{WS_PATH}"));
        }

        Err(ClientError::InvalidBaseUrl(self.base_url.clone()))
    }

    /// Delay before the reconnect attempt that follows `current`.
    #[must_use]
    pub fn next_backoff(&self, current: Duration) -> Duration {
        (current * 2).min(self.reconnect_max)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
