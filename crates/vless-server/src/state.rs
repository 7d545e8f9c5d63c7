//! Server state shared across connections.

use std::time::Duration;

use vless_auth::Identity;
use vless_config::{SubscriptionConfig, WebSocketConfig};
use vless_core::io::RelayOptions;

/// Shared, read-only server state for all connections.
#[derive(Clone)]
pub struct ServerState {
    pub identity: Identity,
    pub relay: RelayOptions,
    pub connect_timeout: Option<Duration>,
    pub max_http_header_bytes: usize,
    pub websocket: WebSocketConfig,
    pub subscription: SubscriptionConfig,
}
