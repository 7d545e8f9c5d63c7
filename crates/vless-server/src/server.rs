//! Main server loop and connection handling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vless_auth::{Identity, StaticAuth};
use vless_config::{AuthConfig, Config};
use vless_core::defaults;
use vless_core::io::RelayOptions;

use crate::error::ServerError;
use crate::handler::handle_conn;
use crate::resolve::resolve_sockaddr;
use crate::state::ServerState;
use crate::util::{create_listener, ConnectionTracker};

/// Default graceful shutdown timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration =
    Duration::from_secs(defaults::DEFAULT_SHUTDOWN_TIMEOUT_SECS);

/// Pause after a failed `accept` so descriptor exhaustion does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The configured identity, or a fresh random one.
pub fn load_identity(auth: &AuthConfig) -> Result<Identity, ServerError> {
    match auth.uuid.as_deref() {
        Some(text) => Ok(Identity::parse(text)?),
        None => {
            let identity = Identity::generate();
            info!(uuid = %identity, "no identity configured, generated one");
            Ok(identity)
        }
    }
}

/// Run the server with a cancellation token for graceful shutdown.
pub async fn run_with_shutdown(
    config: Config,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let identity = load_identity(&config.auth)?;
    let listen = resolve_sockaddr(&config.server.listen).await?;

    let relay = RelayOptions {
        buffer_size: config.server.relay_buffer_size,
        idle_timeout: config.server.idle_timeout(),
        half_close_timeout: config.server.half_close_timeout(),
    };
    let state = Arc::new(ServerState {
        identity,
        relay,
        connect_timeout: config.server.connect_timeout(),
        max_http_header_bytes: config.server.max_http_header_bytes,
        websocket: config.websocket.clone(),
        subscription: config.subscription.clone(),
    });
    let auth = Arc::new(StaticAuth::new(identity));
    let tracker = ConnectionTracker::new();

    // Connection limiter (None = unlimited)
    let conn_limit: Option<Arc<Semaphore>> = config.server.max_connections.map(|n| {
        info!("max_connections set to {}", n);
        Arc::new(Semaphore::new(n))
    });

    let backlog = config.server.connection_backlog;
    let listener = create_listener(listen, backlog)?;
    let local = listener.local_addr()?;
    let ws_path = format!("/{}", state.websocket.segment());
    info!(address = %local, backlog, ws_path = %ws_path, "listening");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }

            result = listener.accept() => {
                let (tcp, peer) = match result {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                // Try to acquire connection permit
                let permit: Option<OwnedSemaphorePermit> = match &conn_limit {
                    Some(sem) => match sem.clone().try_acquire_owned() {
                        Ok(p) => Some(p),
                        Err(_) => {
                            debug!(peer = %peer, reason = "max_connections", "connection rejected");
                            drop(tcp); // close immediately
                            continue;
                        }
                    },
                    None => None,
                };

                if let Err(err) = tcp.set_nodelay(true) {
                    debug!(peer = %peer, error = %err, "failed to set TCP_NODELAY");
                }
                debug!(peer = %peer, "new connection");

                let state = state.clone();
                let auth = auth.clone();
                let guard = tracker.enter();

                tokio::spawn(async move {
                    let _guard = guard;
                    let _permit = permit; // hold permit until connection closes
                    let start = Instant::now();

                    let result = handle_conn(tcp, state, auth, peer).await;

                    let duration_secs = start.elapsed().as_secs_f64();
                    match result {
                        Err(err) => warn!(
                            peer = %peer,
                            duration_secs,
                            error_type = err.error_type(),
                            error = %err,
                            "connection closed with error"
                        ),
                        Ok(()) => debug!(peer = %peer, duration_secs, "connection closed"),
                    }
                });
            }
        }
    }

    drop(listener);

    // Graceful drain: wait for active connections
    let active = tracker.count();
    if active > 0 {
        info!("waiting for {} active connections to drain", active);
        if tracker.wait_for_zero(DEFAULT_SHUTDOWN_TIMEOUT).await {
            info!("all connections drained");
        } else {
            warn!(
                "shutdown timeout, {} connections still active",
                tracker.count()
            );
        }
    }

    info!("server stopped");
    Ok(())
}

/// Run the server until the process exits.
pub async fn run(config: Config) -> Result<(), ServerError> {
    run_with_shutdown(config, CancellationToken::new()).await
}
