//! Address resolution utilities.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use vless_proto::{AddressRef, HostRef};

use crate::error::ServerError;

/// Resolve a string address (host:port) through the system resolver.
pub async fn resolve_sockaddr(target: &str) -> Result<SocketAddr, ServerError> {
    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Ok(addr);
    }
    tokio::net::lookup_host(target)
        .await
        .map_err(|e| ServerError::Resolve(format!("{target}: {e}")))?
        .next()
        .ok_or_else(|| ServerError::Resolve(format!("{target}: no addresses")))
}

/// Resolve a decoded destination to candidate socket addresses.
///
/// IP hosts go through their rendered text form, so the outbound connection
/// targets exactly the host a client sees in logs.
pub async fn resolve_address(address: &AddressRef<'_>) -> Result<Vec<SocketAddr>, ServerError> {
    match address.host {
        HostRef::Ipv4(ip) => Ok(vec![SocketAddr::from((ip, address.port))]),
        HostRef::Ipv6(_) => {
            let host = address.host.render();
            let ip: Ipv6Addr = host
                .parse()
                .map_err(|_| ServerError::Resolve(format!("invalid ipv6 host {host}")))?;
            Ok(vec![SocketAddr::new(IpAddr::V6(ip), address.port)])
        }
        HostRef::Domain(domain) => {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((domain, address.port))
                .await
                .map_err(|e| ServerError::Resolve(format!("{domain}: {e}")))?
                .collect();
            if addrs.is_empty() {
                return Err(ServerError::Resolve(format!("{domain}: no addresses")));
            }
            Ok(addrs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ipv4_resolves_without_lookup() {
        let addr = AddressRef {
            host: HostRef::Ipv4([127, 0, 0, 1]),
            port: 8080,
        };
        let resolved = resolve_address(&addr).await.unwrap();
        assert_eq!(resolved, vec!["127.0.0.1:8080".parse().unwrap()]);
    }

    #[tokio::test]
    async fn ipv6_uses_rendered_host() {
        let mut ip = [0u8; 16];
        ip[0] = 0x20;
        ip[1] = 0x01;
        let addr = AddressRef {
            host: HostRef::Ipv6(ip),
            port: 443,
        };
        let resolved = resolve_address(&addr).await.unwrap();
        let expected: Ipv6Addr = "320:100:0:0:0:0:0:0".parse().unwrap();
        assert_eq!(resolved, vec![SocketAddr::new(IpAddr::V6(expected), 443)]);
    }

    #[tokio::test]
    async fn localhost_domain_resolves() {
        let addr = AddressRef {
            host: HostRef::Domain("localhost"),
            port: 80,
        };
        let resolved = resolve_address(&addr).await.unwrap();
        assert!(resolved.iter().all(|a| a.port() == 80 && a.ip().is_loopback()));
    }

    #[tokio::test]
    async fn literal_sockaddr_skips_lookup() {
        let addr = resolve_sockaddr("0.0.0.0:3000").await.unwrap();
        assert_eq!(addr.port(), 3000);
    }
}
