//! Configuration validation logic.

use std::net::{SocketAddr, ToSocketAddrs};

use vless_auth::Identity;
use vless_proto::MIN_HEADER_LEN;

use crate::defaults::{max_relay_buffer_size, min_relay_buffer_size};
use crate::loader::ConfigError;
use crate::Config;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let listen = config.server.listen.trim();
    if listen.is_empty() {
        return Err(ConfigError::Validation("server.listen is empty".into()));
    }
    if listen.parse::<SocketAddr>().is_err() && listen.to_socket_addrs().is_err() {
        return Err(ConfigError::Validation(format!(
            "server.listen is not a valid address: {listen}"
        )));
    }
    if let Some(uuid) = &config.auth.uuid {
        Identity::parse(uuid)
            .map_err(|e| ConfigError::Validation(format!("auth.uuid: {e}")))?;
    }
    let ws_path = config.websocket.segment();
    if ws_path.is_empty() {
        return Err(ConfigError::Validation("websocket.path is empty".into()));
    }
    if config.subscription.enabled {
        let sub_path = config.subscription.segment();
        if sub_path.is_empty() {
            return Err(ConfigError::Validation("subscription.path is empty".into()));
        }
        if sub_path == ws_path {
            return Err(ConfigError::Validation(
                "subscription.path must differ from websocket.path".into(),
            ));
        }
        if config.subscription.port == 0 {
            return Err(ConfigError::Validation("subscription.port must be > 0".into()));
        }
    }
    if config.websocket.max_frame_bytes < MIN_HEADER_LEN {
        return Err(ConfigError::Validation(format!(
            "websocket.max_frame_bytes too small (min {MIN_HEADER_LEN})"
        )));
    }
    if config.server.relay_buffer_size < min_relay_buffer_size() {
        return Err(ConfigError::Validation(format!(
            "server.relay_buffer_size must be >= {}",
            min_relay_buffer_size()
        )));
    }
    if config.server.relay_buffer_size > max_relay_buffer_size() {
        return Err(ConfigError::Validation(
            "server.relay_buffer_size must be <= 1MB".into(),
        ));
    }
    if config.server.connection_backlog == 0 {
        return Err(ConfigError::Validation(
            "server.connection_backlog must be > 0".into(),
        ));
    }
    if config.server.half_close_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server.half_close_timeout_secs must be > 0".into(),
        ));
    }
    if config.server.max_connections == Some(0) {
        return Err(ConfigError::Validation(
            "server.max_connections must be > 0 (omit it for no limit)".into(),
        ));
    }
    if config.server.max_http_header_bytes == 0 {
        return Err(ConfigError::Validation(
            "server.max_http_header_bytes must be > 0".into(),
        ));
    }
    Ok(())
}
