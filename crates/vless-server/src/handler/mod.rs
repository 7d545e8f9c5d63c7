//! Connection handlers: the HTTP front door and the tunnel session.

mod connect;
mod session;

pub use session::{accept_request, handle_session, Reject};

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, warn};
use vless_auth::CredentialValidator;

use crate::error::ServerError;
use crate::http::{
    inspect_request, send_not_found, send_reject, send_response, Route, INDEX_BODY,
    INITIAL_BUFFER_SIZE,
};
use crate::state::ServerState;
use crate::subscription::{encode_subscription, subscription_links, LinkParams};
use crate::ws::accept_ws;

/// Handle a freshly accepted connection.
pub async fn handle_conn<S, A>(
    mut stream: S,
    state: Arc<ServerState>,
    auth: Arc<A>,
    peer: SocketAddr,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    A: CredentialValidator + ?Sized,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUFFER_SIZE);
    loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        match inspect_request(&buf, &state.websocket, &state.subscription) {
            Route::NeedMore => {
                if buf.len() > state.max_http_header_bytes {
                    warn!(peer = %peer, bytes = buf.len(), max = state.max_http_header_bytes, "request head too large");
                    return send_reject(stream, "request too large").await;
                }
                continue;
            }
            Route::Upgrade => {
                let ws = accept_ws(stream, buf.freeze(), &state.websocket, peer).await?;
                return handle_session(ws, state, auth, peer).await;
            }
            Route::Index => {
                return send_response(stream, "200 OK", "application/json", INDEX_BODY.as_bytes())
                    .await;
            }
            Route::Subscription { host } => {
                let domain = match state.subscription.domain.clone().or(host) {
                    Some(domain) => domain,
                    None => return send_reject(stream, "missing host").await,
                };
                let links = subscription_links(&LinkParams {
                    identity: &state.identity,
                    domain: &domain,
                    port: state.subscription.port,
                    ws_path: state.websocket.segment(),
                    candidates: &state.subscription.candidates,
                });
                debug!(peer = %peer, domain = %domain, links = links.len(), "subscription served");
                let body = encode_subscription(&links);
                return send_response(stream, "200 OK", "text/plain; charset=utf-8", body.as_bytes())
                    .await;
            }
            Route::BadRequest(reason) => return send_reject(stream, reason).await,
            Route::NotFound => return send_not_found(stream).await,
            Route::NotHttp => {
                debug!(peer = %peer, "non-http bytes, dropping connection");
                return Ok(());
            }
        }
    }
}
