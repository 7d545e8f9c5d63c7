//! Error kind labels for logging.
//!
//! Every crate classifies failures with these constants so log lines can be
//! filtered by a single `error_type` field.

/// I/O error.
pub const ERROR_IO: &str = "io";
/// DNS/address resolution error.
pub const ERROR_RESOLVE: &str = "resolve";
/// Timeout error.
pub const ERROR_TIMEOUT: &str = "timeout";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
/// WebSocket handshake or framing error.
pub const ERROR_WEBSOCKET: &str = "websocket";
