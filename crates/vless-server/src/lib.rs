//! VLESS-over-WebSocket relay server library.
//!
//! This module exposes the server implementation for use by integration tests
//! and potential embedding scenarios.

pub mod cli;
mod error;
mod handler;
mod http;
mod relay;
mod resolve;
mod server;
mod state;
mod subscription;
mod util;
mod ws;

pub use cli::{LinksArgs, ServerArgs};
pub use error::ServerError;
pub use handler::{accept_request, Reject};
pub use server::{load_identity, run, run_with_shutdown, DEFAULT_SHUTDOWN_TIMEOUT};
pub use subscription::{encode_subscription, subscription_links, LinkParams};
pub use tokio_util::sync::CancellationToken;
