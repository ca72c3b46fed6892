//! Message storage: Postgres in production, in-memory otherwise.
//!
//! ARCHITECTURE
//! ============
//! The chat service only needs two operations: append a message (the store
//! assigns `id` and `createdAt`) and read the most recent N in insertion
//! order. Both backends sit behind [`ChatStore`] so the websocket layer and
//! tests never depend on a live database.

use std::sync::Mutex;

use async_trait::async_trait;
use frames::{ChatMessage, UserId};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        "E_DATABASE"
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// A validated message ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub user_id: Option<UserId>,
    pub nick_name: String,
    pub message: String,
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Append a message, returning it with server-assigned `id` and `createdAt`.
    async fn insert(&self, new: NewMessage) -> Result<ChatMessage, StoreError>;

    /// The most recent `limit` messages, oldest first.
    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type MessageRow = (Uuid, Option<i64>, String, String, OffsetDateTime);

fn row_to_message((id, user_id, nick_name, message, created_at): MessageRow) -> ChatMessage {
    ChatMessage { id: Some(id), user_id, nick_name, message, created_at }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn insert(&self, new: NewMessage) -> Result<ChatMessage, StoreError> {
        let id = Uuid::new_v4();
        let created_at: OffsetDateTime = sqlx::query_scalar(
            "INSERT INTO chat_messages (id, user_id, nick_name, message)
             VALUES ($1, $2, $3, $4)
             RETURNING created_at",
        )
        .bind(id)
        .bind(new.user_id)
        .bind(&new.nick_name)
        .bind(&new.message)
        .fetch_one(&self.pool)
        .await?;

        Ok(ChatMessage {
            id: Some(id),
            user_id: new.user_id,
            nick_name: new.nick_name,
            message: new.message,
            created_at,
        })
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, user_id, nick_name, message, created_at
             FROM (
                 SELECT id, user_id, nick_name, message, created_at, seq
                 FROM chat_messages
                 ORDER BY seq DESC
                 LIMIT $1
             ) latest
             ORDER BY seq ASC",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_message).collect())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local store. Used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryChatStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryChatStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn insert(&self, new: NewMessage) -> Result<ChatMessage, StoreError> {
        let stored = ChatMessage {
            id: Some(Uuid::new_v4()),
            user_id: new.user_id,
            nick_name: new.nick_name,
            message: new.message,
            created_at: OffsetDateTime::now_utc(),
        };
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(stored.clone());
        Ok(stored)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let messages = self
            .messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let limit = usize::try_from(limit).unwrap_or(0);
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
