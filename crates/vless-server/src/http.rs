//! Minimal HTTP/1.1 front door.
//!
//! Every accepted TCP stream starts with an HTTP request head. The head is
//! inspected once to pick a [`Route`]; only the upgrade route hands the
//! stream on to the WebSocket layer, everything else is answered with a
//! single `Connection: close` response.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;
use vless_config::{SubscriptionConfig, WebSocketConfig};

use crate::error::ServerError;

/// Initial buffer size for reading the HTTP request head.
pub const INITIAL_BUFFER_SIZE: usize = 2048;

const HTTP_HEADER_END: &[u8] = b"\r\n\r\n";
const MAX_METHOD_LEN: usize = 8;

/// Response body of the index route.
pub const INDEX_BODY: &str = r#"{"hello":"world"}"#;

/// Result of inspecting a buffered request head.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    /// Need more data to see the full request head.
    NeedMore,
    /// Not HTTP traffic; the connection is dropped.
    NotHttp,
    /// WebSocket upgrade on the tunnel path.
    Upgrade,
    /// `GET /`.
    Index,
    /// `GET /{sub_path}`; carries the host the request was addressed to.
    Subscription { host: Option<String> },
    /// Answer with 400.
    BadRequest(&'static str),
    /// Answer with 404.
    NotFound,
}

/// Inspect buffered bytes and pick the route for this connection.
pub fn inspect_request(
    buf: &[u8],
    websocket: &WebSocketConfig,
    subscription: &SubscriptionConfig,
) -> Route {
    if !looks_like_http(buf) {
        return Route::NotHttp;
    }
    let header_end = match find_header_end(buf) {
        Some(end) => end,
        None => return Route::NeedMore,
    };
    let header_str = match std::str::from_utf8(&buf[..header_end]) {
        Ok(v) => v,
        Err(_) => return Route::NotHttp,
    };
    let mut lines = header_str.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Route::NotHttp;
    }

    let mut upgrade = false;
    let mut connection_upgrade = false;
    let mut ws_key = false;
    let mut host: Option<&str> = None;
    let mut forwarded_host: Option<&str> = None;

    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value_trim = value.trim();
            let value_lower = value_trim.to_ascii_lowercase();
            match name.as_str() {
                "upgrade" => {
                    if value_lower.contains("websocket") {
                        upgrade = true;
                    }
                }
                "connection" => {
                    if value_lower.contains("upgrade") {
                        connection_upgrade = true;
                    }
                }
                "sec-websocket-key" => {
                    if !value_trim.is_empty() {
                        ws_key = true;
                    }
                }
                "host" => host = Some(value_trim),
                "x-forwarded-host" => forwarded_host = value_trim.split(',').next().map(str::trim),
                _ => {}
            }
        }
    }

    let path = target.split('?').next().unwrap_or("");
    let is_upgrade = upgrade && connection_upgrade && ws_key;

    if method != "GET" {
        return Route::NotFound;
    }
    if is_upgrade {
        return if segment_matches(path, websocket.segment()) {
            Route::Upgrade
        } else {
            Route::BadRequest("websocket path mismatch")
        };
    }
    if path == "/" {
        return Route::Index;
    }
    if subscription.enabled && segment_matches(path, subscription.segment()) {
        let host = forwarded_host
            .filter(|h| !h.is_empty())
            .or(host)
            .map(strip_port)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        return Route::Subscription { host };
    }
    Route::NotFound
}

/// Write a complete response and close the write side.
pub async fn send_response<S>(
    mut stream: S,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), ServerError>
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Send an HTTP 400 Bad Request response.
pub async fn send_reject<S>(stream: S, reason: &'static str) -> Result<(), ServerError>
where
    S: AsyncWrite + Unpin,
{
    debug!(reason, "request rejected");
    send_response(stream, "400 Bad Request", "text/plain", reason.as_bytes()).await
}

pub async fn send_not_found<S>(stream: S) -> Result<(), ServerError>
where
    S: AsyncWrite + Unpin,
{
    send_response(stream, "404 Not Found", "text/plain", b"not found").await
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HTTP_HEADER_END.len())
        .position(|w| w == HTTP_HEADER_END)
        .map(|idx| idx + HTTP_HEADER_END.len())
}

/// Cheap early check on the method token so binary junk is dropped without
/// waiting for a header terminator that never comes.
fn looks_like_http(buf: &[u8]) -> bool {
    for (i, &b) in buf.iter().take(MAX_METHOD_LEN + 1).enumerate() {
        if b == b' ' {
            return i > 0;
        }
        if !b.is_ascii_uppercase() {
            return false;
        }
    }
    buf.len() <= MAX_METHOD_LEN
}

fn segment_matches(path: &str, segment: &str) -> bool {
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    !segment.is_empty() && trimmed == segment
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or("")
}
