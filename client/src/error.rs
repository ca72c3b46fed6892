use frames::CodecError;

/// Errors from the client's network edges. None of them is fatal to a
/// session: history failures leave the log empty and transport failures
/// trigger a reconnect.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("history request returned HTTP {0}")]
    HttpStatus(u16),
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("frame decode failed: {0}")]
    Codec(#[from] CodecError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
