//! Server configuration parsed from environment variables.
//!
//! Every setting has a default so the server starts with an empty
//! environment. Without `DATABASE_URL` the room runs on the in-memory store.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 500;
pub const DEFAULT_RATE_LIMIT: usize = 5;
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 10;

/// Limits applied by the chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLimits {
    /// Most recent messages returned by the history endpoint.
    pub history_limit: i64,
    /// Maximum message length in characters, after trimming.
    pub max_message_len: usize,
    /// Messages allowed per client within `rate_window`.
    pub rate_limit: usize,
    pub rate_window: Duration,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: Duration::from_secs(DEFAULT_RATE_WINDOW_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub chat: ChatLimits,
}

impl Config {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: Postgres URL; in-memory store when absent
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `CHAT_HISTORY_LIMIT`: default 100
    /// - `CHAT_MAX_MESSAGE_LEN`: default 500
    /// - `CHAT_RATE_LIMIT`: default 5 messages
    /// - `CHAT_RATE_WINDOW_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL")
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());

        let chat = ChatLimits {
            history_limit: parse_or(&lookup, "CHAT_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT).max(1),
            max_message_len: parse_or(&lookup, "CHAT_MAX_MESSAGE_LEN", DEFAULT_MAX_MESSAGE_LEN).max(1),
            rate_limit: parse_or(&lookup, "CHAT_RATE_LIMIT", DEFAULT_RATE_LIMIT).max(1),
            rate_window: Duration::from_secs(parse_or(&lookup, "CHAT_RATE_WINDOW_SECS", DEFAULT_RATE_WINDOW_SECS)),
        };

        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            chat,
        }
    }
}

/// Parse `key` or fall back to `default`, warning when a present value is malformed.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse::<T>().unwrap_or_else(|_| {
        warn!(key, value = %raw, "invalid config value, using default");
        default
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
