//! Server error types.

use vless_auth::IdentityError;
use vless_config::ConfigError;
use vless_core::{ERROR_CONFIG, ERROR_IO, ERROR_RESOLVE, ERROR_TIMEOUT, ERROR_WEBSOCKET};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("resolve failed: {0}")]
    Resolve(String),
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl From<IdentityError> for ServerError {
    fn from(err: IdentityError) -> Self {
        ServerError::Config(format!("auth.uuid: {err}"))
    }
}

impl ServerError {
    /// Get the error type string for log fields.
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Io(_) => ERROR_IO,
            ServerError::WebSocket(_) => ERROR_WEBSOCKET,
            ServerError::Config(_) => ERROR_CONFIG,
            ServerError::Resolve(_) => ERROR_RESOLVE,
            ServerError::ConnectTimeout(_) => ERROR_TIMEOUT,
        }
    }
}
