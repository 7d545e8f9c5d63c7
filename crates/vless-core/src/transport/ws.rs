//! WebSocket stream adapter.
//!
//! `WsIo` wraps a `WebSocketStream` and exposes it as `AsyncRead +
//! AsyncWrite`. Incoming binary (and text) messages are concatenated into
//! a byte stream; every write becomes one binary message. Ping replies are
//! queued by tungstenite itself while reading.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Sink, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_tungstenite::{
    tungstenite::{Error as WsError, Message},
    WebSocketStream,
};

/// Read the first data message of a connection.
///
/// Control frames before it are skipped. Returns `Ok(None)` when the peer
/// closes before sending any data.
pub async fn read_first_message<S>(ws: &mut WebSocketStream<S>) -> Result<Option<Bytes>, WsError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Binary(data) => return Ok(Some(Bytes::from(data))),
            Message::Text(text) => return Ok(Some(Bytes::from(text.into_bytes()))),
            Message::Close(_) => return Ok(None),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        }
    }
    Ok(None)
}

/// Byte-stream view of a WebSocket connection.
pub struct WsIo<S> {
    ws: WebSocketStream<S>,
    read_buf: Bytes,
}

impl<S> WsIo<S> {
    pub fn new(ws: WebSocketStream<S>) -> Self {
        Self {
            ws,
            read_buf: Bytes::new(),
        }
    }

    fn drain_into(&mut self, buf: &mut ReadBuf<'_>) {
        let n = self.read_buf.len().min(buf.remaining());
        buf.put_slice(&self.read_buf[..n]);
        self.read_buf = self.read_buf.slice(n..);
    }
}

impl<S> AsyncRead for WsIo<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.read_buf.is_empty() {
            self.drain_into(buf);
            return Poll::Ready(Ok(()));
        }

        loop {
            match Pin::new(&mut self.ws).poll_next(cx) {
                Poll::Ready(Some(Ok(msg))) => {
                    let data = match msg {
                        Message::Binary(data) => Bytes::from(data),
                        Message::Text(text) => Bytes::from(text.into_bytes()),
                        Message::Close(_) => return Poll::Ready(Ok(())),
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                    };
                    // An empty message is not EOF; wait for the next one.
                    if data.is_empty() {
                        continue;
                    }
                    self.read_buf = data;
                    self.drain_into(buf);
                    return Poll::Ready(Ok(()));
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Err(ws_err(err))),
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<S> AsyncWrite for WsIo<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }
        let mut ws = Pin::new(&mut self.ws);
        match ws.as_mut().poll_ready(cx) {
            Poll::Ready(Ok(())) => {
                if let Err(err) = ws.start_send(Message::Binary(data.to_vec())) {
                    return Poll::Ready(Err(ws_err(err)));
                }
                Poll::Ready(Ok(data.len()))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(ws_err(err))),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.ws).poll_flush(cx).map_err(ws_err)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match Pin::new(&mut self.ws).poll_close(cx) {
            // Closing an already closed socket is not an error for the relay.
            Poll::Ready(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                Poll::Ready(Ok(()))
            }
            other => other.map_err(ws_err),
        }
    }
}

fn ws_err(err: WsError) -> io::Error {
    match err {
        WsError::Io(e) => e,
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            io::Error::new(io::ErrorKind::BrokenPipe, err)
        }
        other => io::Error::other(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (a, b) = duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(a, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(b, Role::Client, None).await;
        (server, client)
    }

    #[tokio::test]
    async fn first_message_skips_control_frames() {
        let (mut server, mut client) = pair().await;
        client.send(Message::Ping(b"p".to_vec())).await.unwrap();
        client.send(Message::Binary(b"header".to_vec())).await.unwrap();

        let first = read_first_message(&mut server).await.unwrap();
        assert_eq!(first.as_deref(), Some(&b"header"[..]));
    }

    #[tokio::test]
    async fn first_message_none_on_close() {
        let (mut server, mut client) = pair().await;
        client.close(None).await.unwrap();
        assert!(read_first_message(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn messages_read_as_contiguous_bytes() {
        let (server, mut client) = pair().await;
        let mut io = WsIo::new(server);

        client.send(Message::Binary(b"abc".to_vec())).await.unwrap();
        client.send(Message::Binary(Vec::new())).await.unwrap();
        client.send(Message::Text("def".into())).await.unwrap();

        let mut buf = [0u8; 6];
        io.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"abcdef");
    }

    #[tokio::test]
    async fn each_write_is_one_binary_message() {
        let (server, mut client) = pair().await;
        let mut io = WsIo::new(server);

        io.write_all(&[0, 0]).await.unwrap();
        io.flush().await.unwrap();

        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg, Message::Binary(vec![0, 0]));
    }

    #[tokio::test]
    async fn shutdown_sends_close() {
        let (server, mut client) = pair().await;
        let mut io = WsIo::new(server);

        io.shutdown().await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert!(matches!(msg, Message::Close(_)));
    }
}
