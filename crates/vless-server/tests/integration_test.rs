//! Integration tests for vless-server.
//!
//! These tests verify the complete server flow including:
//! - HTTP routing and WebSocket upgrade
//! - Header parsing and credential checks
//! - CONNECT relay and close propagation
//! - Informational endpoints and shutdown
#![allow(clippy::tests_outside_test_module)]

use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener},
    thread,
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{client_async, tungstenite::Message, WebSocketStream};
use vless_auth::Identity;
use vless_config::{Config, LoggingConfig};
use vless_proto::{write_request_header, AddressRef, HostRef, CMD_CONNECT, CMD_UDP};
use vless_server::CancellationToken;

const UUID: &str = "d342d11e-d424-4583-b36e-524ab1f0afa4";
const QUIET: Duration = Duration::from_millis(300);
const PATIENCE: Duration = Duration::from_secs(5);

type Client = WebSocketStream<TcpStream>;

// ============================================================================
// Test Helper: Mock Echo Server
// ============================================================================

/// A simple TCP server that echoes back whatever it receives.
struct MockEchoServer {
    addr: SocketAddr,
    _handle: thread::JoinHandle<()>,
}

impl MockEchoServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            for mut stream in listener.incoming().flatten() {
                thread::spawn(move || {
                    let mut buf = [0u8; 4096];
                    loop {
                        match stream.read(&mut buf) {
                            Ok(0) => break,
                            Ok(n) => {
                                if stream.write_all(&buf[..n]).is_err() {
                                    break;
                                }
                            }
                            Err(_) => break,
                        }
                    }
                });
            }
        });

        Self {
            addr,
            _handle: handle,
        }
    }
}

// ============================================================================
// Test Helper: VLESS Server
// ============================================================================

struct TestServer {
    addr: SocketAddr,
    identity: Identity,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<Result<(), vless_server::ServerError>>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(customize: impl FnOnce(&mut Config)) -> Self {
        // Find available port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = Config::default();
        config.server.listen = addr.to_string();
        config.server.half_close_timeout_secs = 1;
        config.auth.uuid = Some(UUID.to_string());
        config.logging = LoggingConfig {
            level: Some("warn".to_string()),
            ..Default::default()
        };
        customize(&mut config);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(vless_server::run_with_shutdown(config, shutdown.clone()));

        // Wait until the listener accepts connections.
        let deadline = tokio::time::Instant::now() + PATIENCE;
        while TcpStream::connect(addr).await.is_err() {
            assert!(tokio::time::Instant::now() < deadline, "server did not start");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self {
            addr,
            identity: UUID.parse().unwrap(),
            shutdown,
            handle,
        }
    }

    async fn connect_ws(&self) -> Client {
        let tcp = TcpStream::connect(self.addr).await.unwrap();
        let (ws, _) = client_async(format!("ws://{}/vless", self.addr), tcp)
            .await
            .unwrap();
        ws
    }

    fn header(&self, command: u8, target: SocketAddr, payload: &[u8]) -> Vec<u8> {
        build_header(0, self.identity.as_bytes(), command, target, payload)
    }
}

fn build_header(
    version: u8,
    credential: &[u8; 16],
    command: u8,
    target: SocketAddr,
    payload: &[u8],
) -> Vec<u8> {
    let ip = match target {
        SocketAddr::V4(v4) => v4.ip().octets(),
        SocketAddr::V6(_) => panic!("Expected IPv4 address"),
    };
    let address = AddressRef {
        host: HostRef::Ipv4(ip),
        port: target.port(),
    };
    let mut buf = BytesMut::new();
    write_request_header(&mut buf, version, credential, &[], command, &address).unwrap();
    buf.extend_from_slice(payload);
    buf.to_vec()
}

/// Next data message, skipping control frames. `None` once the stream closed.
async fn next_binary(ws: &mut Client) -> Option<Vec<u8>> {
    loop {
        match ws.next().await? {
            Ok(Message::Binary(data)) => return Some(data),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Read `len` relayed bytes, which may arrive split over several messages.
async fn read_relayed(ws: &mut Client, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    while out.len() < len {
        let chunk = tokio::time::timeout(PATIENCE, next_binary(ws))
            .await
            .expect("read timeout")
            .expect("stream closed early");
        out.extend_from_slice(&chunk);
    }
    out
}

/// Plain HTTP GET, returning the raw response.
async fn http_get(addr: SocketAddr, path: &str, extra_headers: &str) -> String {
    let mut tcp = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n{extra_headers}\r\n");
    tcp.write_all(req.as_bytes()).await.unwrap();
    let mut out = String::new();
    tokio::time::timeout(PATIENCE, tcp.read_to_string(&mut out))
        .await
        .expect("read timeout")
        .unwrap();
    out
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
}

// ============================================================================
// Tests: Tunnel
// ============================================================================

/// Valid header: ack first, then the trailing payload is relayed and echoed.
#[tokio::test]
async fn test_connect_relay() {
    let echo = MockEchoServer::start();
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    ws.send(Message::Binary(server.header(CMD_CONNECT, echo.addr, b"Hello, VLESS!")))
        .await
        .unwrap();

    let ack = tokio::time::timeout(PATIENCE, next_binary(&mut ws))
        .await
        .expect("ack timeout");
    assert_eq!(ack, Some(vec![0, 0]));

    assert_eq!(read_relayed(&mut ws, 13).await, b"Hello, VLESS!");

    // Later messages are opaque bytes, never re-parsed as headers.
    ws.send(Message::Binary(b"\x00second".to_vec())).await.unwrap();
    assert_eq!(read_relayed(&mut ws, 7).await, b"\x00second");
}

/// The ack echoes the client's version byte.
#[tokio::test]
async fn test_ack_echoes_version() {
    let echo = MockEchoServer::start();
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    let header = build_header(7, server.identity.as_bytes(), CMD_CONNECT, echo.addr, b"");
    ws.send(Message::Binary(header)).await.unwrap();

    let ack = tokio::time::timeout(PATIENCE, next_binary(&mut ws))
        .await
        .expect("ack timeout");
    assert_eq!(ack, Some(vec![7, 0]));
}

/// Wrong credential: no ack, no outbound connect, connection stays open.
#[tokio::test]
async fn test_bad_credential_is_silent() {
    let target = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target.local_addr().unwrap();
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    let mut credential = *server.identity.as_bytes();
    credential[15] ^= 0xff;
    let header = build_header(0, &credential, CMD_CONNECT, target_addr, b"payload");
    ws.send(Message::Binary(header)).await.unwrap();

    assert!(
        tokio::time::timeout(QUIET, target.accept()).await.is_err(),
        "server must not connect outbound"
    );
    assert!(
        tokio::time::timeout(QUIET, ws.next()).await.is_err(),
        "server must neither answer nor close"
    );
}

/// UDP command is decoded but not served.
#[tokio::test]
async fn test_udp_command_is_silent() {
    let target = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target.local_addr().unwrap();
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    ws.send(Message::Binary(server.header(CMD_UDP, target_addr, b"")))
        .await
        .unwrap();

    assert!(tokio::time::timeout(QUIET, target.accept()).await.is_err());
    assert!(tokio::time::timeout(QUIET, ws.next()).await.is_err());
}

/// A header cut short is rejected without a response.
#[tokio::test]
async fn test_truncated_header_is_silent() {
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    ws.send(Message::Binary(vec![0u8; 10])).await.unwrap();
    assert!(tokio::time::timeout(QUIET, ws.next()).await.is_err());

    // The rejected session still ends when the client leaves.
    ws.close(None).await.unwrap();
}

/// With an idle timeout, a rejected session is dropped once the client goes
/// quiet, still without an ack.
#[tokio::test]
async fn test_rejected_session_ends_after_idle_timeout() {
    let target = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target.local_addr().unwrap();
    let server = TestServer::start_with(|c| c.server.idle_timeout_secs = 1).await;
    let mut ws = server.connect_ws().await;

    let mut credential = *server.identity.as_bytes();
    credential[0] ^= 0x01;
    let header = build_header(0, &credential, CMD_CONNECT, target_addr, b"payload");
    ws.send(Message::Binary(header)).await.unwrap();

    // Traffic before the deadline is discarded and keeps the session held.
    tokio::time::sleep(Duration::from_millis(500)).await;
    ws.send(Message::Binary(b"ignored".to_vec())).await.unwrap();

    let started = tokio::time::Instant::now();
    let next = tokio::time::timeout(PATIENCE, next_binary(&mut ws))
        .await
        .expect("rejected session was never closed");
    assert_eq!(next, None, "no ack or data may be sent");
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(tokio::time::timeout(QUIET, target.accept()).await.is_err());
}

/// Outbound connect failure closes the WebSocket without an ack.
#[tokio::test]
async fn test_connect_failure_closes_inbound() {
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);

    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;
    ws.send(Message::Binary(server.header(CMD_CONNECT, closed_addr, b"x")))
        .await
        .unwrap();

    let next = tokio::time::timeout(PATIENCE, next_binary(&mut ws))
        .await
        .expect("server should close the connection");
    assert_eq!(next, None, "no ack may be sent");
}

/// Closing the WebSocket closes the outbound connection.
#[tokio::test]
async fn test_inbound_close_closes_outbound() {
    let target = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target.local_addr().unwrap();
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    ws.send(Message::Binary(server.header(CMD_CONNECT, target_addr, b"ping")))
        .await
        .unwrap();
    let (mut outbound, _) = tokio::time::timeout(PATIENCE, target.accept())
        .await
        .expect("accept timeout")
        .unwrap();
    assert_eq!(next_binary(&mut ws).await, Some(vec![0, 0]));

    let mut buf = [0u8; 4];
    outbound.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    ws.close(None).await.unwrap();

    let mut rest = Vec::new();
    let n = tokio::time::timeout(PATIENCE, outbound.read_to_end(&mut rest))
        .await
        .expect("outbound should be closed")
        .unwrap_or(0);
    assert_eq!(n, 0);
}

/// Closing the outbound connection closes the WebSocket after relaying
/// what the target sent.
#[tokio::test]
async fn test_outbound_close_closes_inbound() {
    let target = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target.local_addr().unwrap();
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    ws.send(Message::Binary(server.header(CMD_CONNECT, target_addr, b"")))
        .await
        .unwrap();
    let (mut outbound, _) = tokio::time::timeout(PATIENCE, target.accept())
        .await
        .expect("accept timeout")
        .unwrap();
    assert_eq!(next_binary(&mut ws).await, Some(vec![0, 0]));

    outbound.write_all(b"bye").await.unwrap();
    drop(outbound);

    assert_eq!(read_relayed(&mut ws, 3).await, b"bye");
    let end = tokio::time::timeout(PATIENCE, next_binary(&mut ws))
        .await
        .expect("websocket should be closed");
    assert_eq!(end, None);
}

/// Domain targets go through the system resolver.
#[tokio::test]
async fn test_connect_by_domain() {
    let echo = MockEchoServer::start();
    let server = TestServer::start().await;
    let mut ws = server.connect_ws().await;

    let address = AddressRef {
        host: HostRef::Domain("localhost"),
        port: echo.addr.port(),
    };
    let mut header = BytesMut::new();
    write_request_header(
        &mut header,
        0,
        server.identity.as_bytes(),
        &[],
        CMD_CONNECT,
        &address,
    )
    .unwrap();
    header.extend_from_slice(b"via dns");
    ws.send(Message::Binary(header.to_vec())).await.unwrap();

    assert_eq!(next_binary(&mut ws).await, Some(vec![0, 0]));
    assert_eq!(read_relayed(&mut ws, 7).await, b"via dns");
}

// ============================================================================
// Tests: HTTP front door
// ============================================================================

#[tokio::test]
async fn test_index_returns_hello_world() {
    let server = TestServer::start().await;
    let resp = http_get(server.addr, "/", "").await;
    assert!(resp.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(body(&resp), r#"{"hello":"world"}"#);
}

#[tokio::test]
async fn test_subscription_uses_forwarded_host() {
    let server = TestServer::start().await;
    let resp = http_get(server.addr, "/sub", "X-Forwarded-Host: edge.example.com\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 200 OK"));

    let decoded = String::from_utf8(STANDARD.decode(body(&resp)).unwrap()).unwrap();
    let links: Vec<&str> = decoded.split('\n').collect();
    assert_eq!(links.len(), 7);
    assert_eq!(
        links[0],
        format!(
            "vless://{UUID}@edge.example.com:443?encryption=none&security=tls&sni=edge.example.com&type=ws&host=edge.example.com&path=%2Fvless#edge.example.com"
        )
    );
    assert!(links[1].contains("@ip.sb:443?"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let server = TestServer::start().await;
    let resp = http_get(server.addr, "/missing", "").await;
    assert!(resp.starts_with("HTTP/1.1 404"));
}

#[tokio::test]
async fn test_upgrade_on_wrong_path_is_rejected() {
    let server = TestServer::start().await;
    let tcp = TcpStream::connect(server.addr).await.unwrap();
    let result = client_async(format!("ws://{}/elsewhere", server.addr), tcp).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_custom_ws_path() {
    let echo = MockEchoServer::start();
    let server = TestServer::start_with(|c| c.websocket.path = "/tunnel".into()).await;

    let tcp = TcpStream::connect(server.addr).await.unwrap();
    let (mut ws, _) = client_async(format!("ws://{}/tunnel", server.addr), tcp)
        .await
        .unwrap();
    ws.send(Message::Binary(server.header(CMD_CONNECT, echo.addr, b"")))
        .await
        .unwrap();
    assert_eq!(next_binary(&mut ws).await, Some(vec![0, 0]));
}

#[tokio::test]
async fn test_non_http_bytes_are_dropped() {
    let server = TestServer::start().await;
    let mut tcp = TcpStream::connect(server.addr).await.unwrap();
    tcp.write_all(&[0x16, 0x03, 0x01, 0x00, 0xa5]).await.unwrap();

    let mut out = Vec::new();
    tokio::time::timeout(PATIENCE, tcp.read_to_end(&mut out))
        .await
        .expect("connection should be dropped")
        .unwrap_or(0);
    assert!(out.is_empty());
}

// ============================================================================
// Tests: Limits and lifecycle
// ============================================================================

#[tokio::test]
async fn test_max_connections_limit() {
    let server = TestServer::start_with(|c| c.server.max_connections = Some(1)).await;

    // The readiness check in `start` may still hold the only permit briefly.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let _held = server.connect_ws().await;

    let mut second = TcpStream::connect(server.addr).await.unwrap();
    let _ = second
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await;
    let mut out = Vec::new();
    let _ = tokio::time::timeout(PATIENCE, second.read_to_end(&mut out))
        .await
        .expect("excess connection should be closed");
    assert!(out.is_empty(), "excess connection must not be served");
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let server = TestServer::start().await;
    server.shutdown.cancel();

    let result = tokio::time::timeout(PATIENCE, server.handle)
        .await
        .expect("server should stop")
        .unwrap();
    assert!(result.is_ok());
    assert!(TcpStream::connect(server.addr).await.is_err());
}
