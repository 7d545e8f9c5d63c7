//! Session relay with structured logging.
//!
//! Wraps the generic relay from `vless-core` and turns its outcome into the
//! per-session log line. Relay I/O errors end the session quietly; they are
//! reported at debug level and never propagate.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::debug;
use vless_core::io::{relay_bidirectional, RelayOptions, RelayStats};

/// Bridge `inbound` and `outbound` until the session ends.
pub async fn relay_session<A, B>(
    inbound: A,
    outbound: B,
    options: &RelayOptions,
    peer: SocketAddr,
    target: &str,
) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let start = Instant::now();
    match relay_bidirectional(inbound, outbound, options).await {
        Ok(stats) => {
            debug!(
                peer = %peer,
                target,
                upstream = stats.upstream,
                downstream = stats.downstream,
                duration_ms = start.elapsed().as_millis() as u64,
                "relay finished"
            );
            stats
        }
        Err(err) => {
            debug!(peer = %peer, target, error = %err, "relay ended with error");
            RelayStats::default()
        }
    }
}
