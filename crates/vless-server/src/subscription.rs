//! Share-link generation.
//!
//! One `vless://` link per front-end address: the service domain itself,
//! then every configured candidate. Clients import the newline-joined list
//! as a base64 blob.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use vless_auth::Identity;

/// Inputs for [`subscription_links`].
pub struct LinkParams<'a> {
    pub identity: &'a Identity,
    /// Public domain; used for TLS SNI and the HTTP `Host` header.
    pub domain: &'a str,
    pub port: u16,
    /// Upgrade path segment without slashes.
    pub ws_path: &'a str,
    pub candidates: &'a [String],
}

pub fn subscription_links(params: &LinkParams<'_>) -> Vec<String> {
    let path = params.ws_path.replace('/', "%2F");
    std::iter::once(params.domain)
        .chain(params.candidates.iter().map(String::as_str))
        .map(|addr| {
            format!(
                "vless://{uuid}@{addr}:{port}?encryption=none&security=tls&sni={domain}&type=ws&host={domain}&path=%2F{path}#{addr}",
                uuid = params.identity,
                port = params.port,
                domain = params.domain,
            )
        })
        .collect()
}

/// Join links with `\n` and base64-encode the result.
pub fn encode_subscription(links: &[String]) -> String {
    STANDARD.encode(links.join("\n"))
}
