//! Chat history route.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use frames::ChatMessage;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ErrorCode;
use crate::services::chat;
use crate::services::store::StoreError;
use crate::state::AppState;

/// JSON body returned when a route fails.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(code = self.0.error_code(), error = %self.0, "history: request failed");
        let body = ApiErrorBody { code: self.0.error_code(), message: self.0.to_string() };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// `GET /api/chat/messages`: recent messages, oldest first.
pub async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let messages = chat::history(&state).await?;
    info!(count = messages.len(), "history: served");
    Ok(Json(messages))
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
