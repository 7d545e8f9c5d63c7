//! Bidirectional byte relay between an inbound and an outbound stream.
//!
//! Each direction is a poll-driven read → write → flush state machine, and
//! both are driven from a single future. A direction only issues its next
//! read after the previous chunk was written and flushed, so a slow writer
//! stalls exactly the reader feeding it and nothing is buffered beyond one
//! chunk per direction.
//!
//! When one direction reaches EOF its writer is shut down (propagating the
//! close to the peer) and the surviving direction gets `half_close_timeout`
//! to drain before both streams are dropped.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

use crate::defaults;

/// Tunables for [`relay_bidirectional`].
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Size of each direction's copy buffer.
    pub buffer_size: usize,
    /// Close the relay when neither direction moved data for this long.
    /// `None` keeps idle relays open forever.
    pub idle_timeout: Option<Duration>,
    /// How long the surviving direction may keep flowing after the other
    /// side closed.
    pub half_close_timeout: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            buffer_size: defaults::DEFAULT_RELAY_BUFFER_SIZE,
            idle_timeout: None,
            half_close_timeout: Duration::from_secs(defaults::DEFAULT_HALF_CLOSE_TIMEOUT_SECS),
        }
    }
}

/// Byte totals of a finished relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied inbound → outbound.
    pub upstream: u64,
    /// Bytes copied outbound → inbound.
    pub downstream: u64,
}

enum CopyState {
    Reading,
    Writing(usize, usize), // (pos, len)
    Flushing(usize),
    ShuttingDown,
    Done,
}

enum CopyPoll {
    Flushed(usize),
    Finished,
}

fn poll_copy_direction<R, W>(
    cx: &mut Context<'_>,
    reader: &mut R,
    writer: &mut W,
    buf: &mut [u8],
    state: &mut CopyState,
) -> Poll<io::Result<CopyPoll>>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    loop {
        match state {
            CopyState::Reading => {
                let mut read_buf = ReadBuf::new(buf);
                match Pin::new(&mut *reader).poll_read(cx, &mut read_buf) {
                    Poll::Ready(Ok(())) => {
                        let n = read_buf.filled().len();
                        *state = if n == 0 {
                            CopyState::ShuttingDown
                        } else {
                            CopyState::Writing(0, n)
                        };
                    }
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => return Poll::Pending,
                }
            }
            CopyState::Writing(pos, len) => {
                match Pin::new(&mut *writer).poll_write(cx, &buf[*pos..*len]) {
                    Poll::Ready(Ok(0)) => {
                        return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
                    }
                    Poll::Ready(Ok(n)) => {
                        *pos += n;
                        if *pos >= *len {
                            *state = CopyState::Flushing(*len);
                        }
                    }
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => return Poll::Pending,
                }
            }
            CopyState::Flushing(bytes) => {
                let bytes = *bytes;
                match Pin::new(&mut *writer).poll_flush(cx) {
                    Poll::Ready(Ok(())) => {
                        *state = CopyState::Reading;
                        return Poll::Ready(Ok(CopyPoll::Flushed(bytes)));
                    }
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => return Poll::Pending,
                }
            }
            // The peer may already be gone; a failed shutdown still ends the direction.
            CopyState::ShuttingDown => match Pin::new(&mut *writer).poll_shutdown(cx) {
                Poll::Ready(_) => {
                    *state = CopyState::Done;
                    return Poll::Ready(Ok(CopyPoll::Finished));
                }
                Poll::Pending => return Poll::Pending,
            },
            CopyState::Done => return Poll::Ready(Ok(CopyPoll::Finished)),
        }
    }
}

/// Wait on an optional timer; `None` never fires.
async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}

/// Copy bytes in both directions until both sides finished, an I/O error
/// occurs, the idle timeout fires, or the half-close window expires.
///
/// Both streams are dropped on return, so returning from this function
/// always releases both transports.
pub async fn relay_bidirectional<A, B>(
    inbound: A,
    outbound: B,
    options: &RelayOptions,
) -> io::Result<RelayStats>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut in_r, mut in_w) = tokio::io::split(inbound);
    let (mut out_r, mut out_w) = tokio::io::split(outbound);

    let mut buf_up = vec![0u8; options.buffer_size];
    let mut buf_down = vec![0u8; options.buffer_size];
    let mut state_up = CopyState::Reading;
    let mut state_down = CopyState::Reading;

    let mut idle: Option<Pin<Box<Sleep>>> = options
        .idle_timeout
        .map(|d| Box::pin(tokio::time::sleep(d)));
    let mut linger: Option<Pin<Box<Sleep>>> = None;

    let mut stats = RelayStats::default();
    let mut up_done = false;
    let mut down_done = false;

    loop {
        if up_done && down_done {
            return Ok(stats);
        }
        if (up_done || down_done) && linger.is_none() {
            linger = Some(Box::pin(tokio::time::sleep(options.half_close_timeout)));
        }

        let both = std::future::poll_fn(|cx| {
            let mut any_ready = false;
            let mut activity = false;

            if !up_done {
                match poll_copy_direction(cx, &mut in_r, &mut out_w, &mut buf_up, &mut state_up) {
                    Poll::Ready(Ok(CopyPoll::Flushed(n))) => {
                        stats.upstream += n as u64;
                        activity = true;
                        any_ready = true;
                    }
                    Poll::Ready(Ok(CopyPoll::Finished)) => {
                        up_done = true;
                        any_ready = true;
                    }
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => {}
                }
            }

            if !down_done {
                match poll_copy_direction(cx, &mut out_r, &mut in_w, &mut buf_down, &mut state_down) {
                    Poll::Ready(Ok(CopyPoll::Flushed(n))) => {
                        stats.downstream += n as u64;
                        activity = true;
                        any_ready = true;
                    }
                    Poll::Ready(Ok(CopyPoll::Finished)) => {
                        down_done = true;
                        any_ready = true;
                    }
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => {}
                }
            }

            if any_ready {
                Poll::Ready(Ok(activity))
            } else {
                Poll::Pending
            }
        });

        tokio::select! {
            result = both => {
                if result? {
                    if let (Some(timeout), Some(sleep)) = (options.idle_timeout, idle.as_mut()) {
                        sleep.as_mut().reset(Instant::now() + timeout);
                    }
                }
            }
            _ = fire(&mut idle) => {
                return Ok(stats);
            }
            _ = fire(&mut linger) => {
                return Ok(stats);
            }
        }
    }
}
