//! Grepable error codes for errors that cross the websocket.
//!
//! Service errors implement [`ErrorCode`]; the websocket layer turns them
//! into `error` events so clients can branch on `code` without parsing
//! the human-readable message.

use frames::ServerEvent;

/// Grepable error code and retryable flag for structured error events.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Build the `error` event sent back to the requesting client.
#[must_use]
pub fn error_event(err: &(impl ErrorCode + ?Sized)) -> ServerEvent {
    ServerEvent::Error { code: err.error_code().to_owned(), message: err.to_string() }
}
