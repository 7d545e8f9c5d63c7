//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Listener Defaults
// ============================================================================

/// Default listen address (plain HTTP, TLS terminates at the front proxy).
pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
/// Default TCP listener backlog.
pub const DEFAULT_CONNECTION_BACKLOG: u32 = 1024;
/// Default maximum bytes accepted for an HTTP request head.
pub const DEFAULT_MAX_HTTP_HEADER_BYTES: usize = 8192;

// ============================================================================
// Timeout Defaults
// ============================================================================

/// Default outbound connect timeout in seconds (0 = wait indefinitely).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 0;
/// Default relay idle timeout in seconds (0 = never time out).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 0;
/// Default time the surviving direction may drain after the other closed.
pub const DEFAULT_HALF_CLOSE_TIMEOUT_SECS: u64 = 2;
/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Buffer/Size Defaults
// ============================================================================

/// Default relay buffer size per direction (32 KiB).
pub const DEFAULT_RELAY_BUFFER_SIZE: usize = 32768;
/// Smallest accepted relay buffer.
pub const MIN_RELAY_BUFFER_SIZE: usize = 1024;
/// Largest accepted relay buffer.
pub const MAX_RELAY_BUFFER_SIZE: usize = 1024 * 1024;

// ============================================================================
// WebSocket Defaults
// ============================================================================

/// Default WebSocket upgrade path segment (without leading slash).
pub const DEFAULT_WS_PATH: &str = "vless";
/// Default max WebSocket frame/message size.
pub const DEFAULT_WS_MAX_FRAME_BYTES: usize = 1 << 20;

// ============================================================================
// Subscription Defaults
// ============================================================================

/// Default subscription endpoint path segment.
pub const DEFAULT_SUB_PATH: &str = "sub";
/// Default public port advertised in subscription links.
pub const DEFAULT_SUB_PORT: u16 = 443;
/// Default front-end addresses advertised next to the service domain.
pub const DEFAULT_SUB_CANDIDATES: &[&str] = &[
    "ip.sb",
    "time.is",
    "www.visa.com.hk",
    "singapore.com",
    "japan.com",
    "icook.tw",
];
