//! CLI override definitions and application logic.
//!
//! The environment fallbacks (`UUID`, `PORT`, `WS_PATH`, `DOMAIN`) match the
//! variables container platforms usually inject.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override server listen address, e.g. 0.0.0.0:3000
    #[arg(long)]
    pub listen: Option<String>,
    /// Override only the listen port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
    /// Service identity (UUID)
    #[arg(long, env = "UUID")]
    pub uuid: Option<String>,
    /// WebSocket upgrade path
    #[arg(long, env = "WS_PATH")]
    pub ws_path: Option<String>,
    /// WebSocket max frame bytes
    #[arg(long)]
    pub ws_max_frame_bytes: Option<usize>,
    /// Public domain advertised in subscription links
    #[arg(long, env = "DOMAIN")]
    pub domain: Option<String>,
    /// Enable or disable the subscription endpoint
    #[arg(long)]
    pub sub_enabled: Option<bool>,
    /// Subscription endpoint path
    #[arg(long)]
    pub sub_path: Option<String>,
    /// Override outbound connect timeout (seconds, 0 = disabled)
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,
    /// Override relay idle timeout (seconds, 0 = disabled)
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,
    /// Override half-close drain window (seconds)
    #[arg(long)]
    pub half_close_timeout_secs: Option<u64>,
    /// Override maximum HTTP request head bytes
    #[arg(long)]
    pub max_http_header_bytes: Option<usize>,
    /// Override maximum concurrent connections (0 = unlimited)
    #[arg(long)]
    pub max_connections: Option<usize>,
    /// Buffer size for the relay (bytes)
    #[arg(long)]
    pub relay_buffer_size: Option<usize>,
    /// TCP listener backlog size
    #[arg(long)]
    pub connection_backlog: Option<u32>,
    /// Override log level (off/trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Override log format (pretty/compact/json)
    #[arg(long)]
    pub log_format: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(port) = overrides.port {
        config.server.listen = with_port(&config.server.listen, port);
    }
    if let Some(v) = &overrides.uuid {
        config.auth.uuid = Some(v.clone());
    }
    if let Some(v) = &overrides.ws_path {
        config.websocket.path = v.clone();
    }
    if let Some(v) = overrides.ws_max_frame_bytes {
        config.websocket.max_frame_bytes = v;
    }
    if let Some(v) = &overrides.domain {
        config.subscription.domain = Some(v.clone());
    }
    if let Some(v) = overrides.sub_enabled {
        config.subscription.enabled = v;
    }
    if let Some(v) = &overrides.sub_path {
        config.subscription.path = v.clone();
    }
    if let Some(v) = overrides.connect_timeout_secs {
        config.server.connect_timeout_secs = v;
    }
    if let Some(v) = overrides.idle_timeout_secs {
        config.server.idle_timeout_secs = v;
    }
    if let Some(v) = overrides.half_close_timeout_secs {
        config.server.half_close_timeout_secs = v;
    }
    if let Some(v) = overrides.max_http_header_bytes {
        config.server.max_http_header_bytes = v;
    }
    if let Some(v) = overrides.max_connections {
        config.server.max_connections = if v == 0 { None } else { Some(v) };
    }
    if let Some(v) = overrides.relay_buffer_size {
        config.server.relay_buffer_size = v;
    }
    if let Some(v) = overrides.connection_backlog {
        config.server.connection_backlog = v;
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = &overrides.log_format {
        config.logging.format = Some(v.clone());
    }
}

/// Replace the port of a `host:port` listen address.
fn with_port(listen: &str, port: u16) -> String {
    match listen.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{listen}:{port}"),
    }
}
