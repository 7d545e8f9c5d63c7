//! WebSocket upgrade handling.
//!
//! The request head was already buffered by the front door, so the handshake
//! runs over a `PrefixedStream` that replays it to tungstenite.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{
    accept_hdr_async_with_config,
    tungstenite::{
        handshake::server::{Request, Response},
        protocol::WebSocketConfig as Limits,
    },
    WebSocketStream,
};
use tracing::debug;
use vless_config::WebSocketConfig;
use vless_core::io::PrefixedStream;

use crate::error::ServerError;

/// Frame and message caps for a tunnel. A header-sized first message must
/// always fit, which config validation guarantees.
fn session_limits(cfg: &WebSocketConfig) -> Limits {
    let cap = (cfg.max_frame_bytes > 0).then_some(cfg.max_frame_bytes);
    Limits {
        max_frame_size: cap,
        max_message_size: cap,
        ..Limits::default()
    }
}

/// Complete the upgrade for `peer`, replaying the buffered request head.
pub async fn accept_ws<S>(
    stream: S,
    head: Bytes,
    cfg: &WebSocketConfig,
    peer: SocketAddr,
) -> Result<WebSocketStream<PrefixedStream<S>>, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let head_len = head.len();
    let upgraded = accept_hdr_async_with_config(
        PrefixedStream::new(head, stream),
        |req: &Request, resp: Response| {
            debug!(
                peer = %peer,
                path = %req.uri(),
                head_bytes = head_len,
                "tunnel upgrade"
            );
            Ok(resp)
        },
        Some(session_limits(cfg)),
    )
    .await?;
    Ok(upgraded)
}
