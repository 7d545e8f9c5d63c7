//! Per-connection session controller.
//!
//! A session reads the first WebSocket message, decodes the header once,
//! checks the credential and command, connects outbound, acknowledges the
//! client and then relays opaque bytes until either side closes.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::{tungstenite::Message, WebSocketStream};
use tracing::{debug, instrument};
use vless_auth::CredentialValidator;
use vless_core::transport::{read_first_message, WsIo};
use vless_proto::{parse_request, response, ParseError, VlessRequest};

use super::connect::connect_outbound;
use crate::error::ServerError;
use crate::relay::relay_session;
use crate::state::ServerState;

/// Why a session was abandoned before connecting anywhere.
///
/// All variants share one observable outcome: nothing is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    Malformed(ParseError),
    BadCredential,
    UnsupportedCommand(u8),
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reject::Malformed(err) => write!(f, "malformed header: {err}"),
            Reject::BadCredential => f.write_str("credential mismatch"),
            Reject::UnsupportedCommand(cmd) => write!(f, "unsupported command {cmd}"),
        }
    }
}

/// Decode the first message and decide whether the session may proceed.
pub fn accept_request<'a, A>(buf: &'a [u8], auth: &A) -> Result<VlessRequest<'a>, Reject>
where
    A: CredentialValidator + ?Sized,
{
    let req = parse_request(buf).map_err(Reject::Malformed)?;
    auth.verify(req.credential)
        .map_err(|_| Reject::BadCredential)?;
    if !req.is_connect() {
        return Err(Reject::UnsupportedCommand(req.command));
    }
    Ok(req)
}

/// Run one tunnel session over an upgraded WebSocket.
#[instrument(level = "debug", skip_all, fields(peer = %peer))]
pub async fn handle_session<S, A>(
    mut ws: WebSocketStream<S>,
    state: Arc<ServerState>,
    auth: Arc<A>,
    peer: SocketAddr,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    A: CredentialValidator + ?Sized,
{
    let first = match read_first_message(&mut ws).await? {
        Some(first) => first,
        None => {
            debug!("closed before sending a header");
            return Ok(());
        }
    };

    let req = match accept_request(&first, auth.as_ref()) {
        Ok(req) => req,
        Err(reject) => {
            debug!(reason = %reject, "session rejected");
            hold_silently(ws, state.relay.idle_timeout).await;
            return Ok(());
        }
    };

    let target = req.address.to_string();
    debug!(target = %target, "connecting to target");
    let mut outbound = match connect_outbound(&req.address, state.connect_timeout).await {
        Ok(stream) => stream,
        Err(err) => {
            let _ = ws.close(None).await;
            return Err(err);
        }
    };
    debug!(target = %target, "target connected");

    let mut inbound = WsIo::new(ws);
    inbound.write_all(&response(req.version)).await?;
    inbound.flush().await?;

    if !req.payload.is_empty() {
        outbound.write_all(req.payload).await?;
        debug!(target = %target, bytes = req.payload.len(), "initial payload sent");
    }

    relay_session(inbound, outbound, &state.relay, peer, &target).await;
    Ok(())
}

/// Keep a rejected connection open and discard whatever arrives.
///
/// Ends when the peer closes, the transport fails, or no message arrived
/// within `idle_timeout` (when set).
async fn hold_silently<S>(mut ws: WebSocketStream<S>, idle_timeout: Option<Duration>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, ws.next()).await {
                Ok(next) => next,
                Err(_) => break,
            },
            None => ws.next().await,
        };
        match next {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => {}
        }
    }
}
