//! Configuration type definitions for server, auth, WebSocket, subscription and logging.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Plain HTTP listen address; TLS is terminated in front of the server.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Outbound connect timeout in seconds (0 = wait indefinitely).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Relay idle timeout in seconds (0 = never).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// How long one relay direction may drain after the other closed.
    #[serde(default = "default_half_close_timeout_secs")]
    pub half_close_timeout_secs: u64,
    /// Largest HTTP request head accepted before the upgrade.
    #[serde(default = "default_max_http_header_bytes")]
    pub max_http_header_bytes: usize,
    /// Maximum concurrent connections (None = unlimited)
    #[serde(default)]
    pub max_connections: Option<usize>,
    /// Copy buffer per relay direction (bytes).
    #[serde(default = "default_relay_buffer_size")]
    pub relay_buffer_size: usize,
    /// TCP listener backlog (pending connections queue size).
    #[serde(default = "default_connection_backlog")]
    pub connection_backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            half_close_timeout_secs: default_half_close_timeout_secs(),
            max_http_header_bytes: default_max_http_header_bytes(),
            max_connections: None,
            relay_buffer_size: default_relay_buffer_size(),
            connection_backlog: default_connection_backlog(),
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.idle_timeout_secs)
    }

    pub fn half_close_timeout(&self) -> Duration {
        Duration::from_secs(self.half_close_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Service identity as a UUID. A random one is generated when absent.
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Upgrade path segment; leading/trailing slashes are ignored.
    #[serde(default = "default_ws_path")]
    pub path: String,
    #[serde(default = "default_ws_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: default_ws_path(),
            max_frame_bytes: default_ws_max_frame_bytes(),
        }
    }
}

impl WebSocketConfig {
    /// Path segment without surrounding slashes.
    pub fn segment(&self) -> &str {
        self.path.trim_matches('/')
    }
}

/// Share-link endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sub_path")]
    pub path: String,
    /// Public domain of the service. Falls back to the request's
    /// `X-Forwarded-Host` or `Host` header.
    #[serde(default)]
    pub domain: Option<String>,
    /// Public port clients connect to on the front proxy.
    #[serde(default = "default_sub_port")]
    pub port: u16,
    /// Extra front-end addresses, one link each.
    #[serde(default = "default_sub_candidates")]
    pub candidates: Vec<String>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_sub_path(),
            domain: None,
            port: default_sub_port(),
            candidates: default_sub_candidates(),
        }
    }
}

impl SubscriptionConfig {
    pub fn segment(&self) -> &str {
        self.path.trim_matches('/')
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (off, trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"vless_server": "debug"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
