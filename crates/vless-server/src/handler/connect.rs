//! Outbound TCP connector.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;
use vless_proto::AddressRef;

use crate::error::ServerError;
use crate::resolve::resolve_address;

/// Open the outbound connection for a decoded destination.
///
/// Resolved addresses are tried in order; the last error is returned when
/// all of them fail. With a timeout the whole resolve-and-connect step is
/// bounded.
pub async fn connect_outbound(
    address: &AddressRef<'_>,
    timeout: Option<Duration>,
) -> Result<TcpStream, ServerError> {
    let connect = async {
        let addrs = resolve_address(address).await?;
        connect_any(&addrs).await
    };
    match timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| ServerError::ConnectTimeout(address.to_string()))?,
        None => connect.await,
    }
}

async fn connect_any(addrs: &[SocketAddr]) -> Result<TcpStream, ServerError> {
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(target = %addr, error = %e, "failed to set TCP_NODELAY");
                }
                return Ok(stream);
            }
            Err(e) => {
                debug!(target = %addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(match last_err {
        Some(e) => ServerError::Io(e),
        None => ServerError::Resolve("no addresses".into()),
    })
}
