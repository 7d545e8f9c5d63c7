//! # vless-rs
//!
//! A relay for the VLESS tunnel protocol carried over WebSocket.
//!
//! Clients open a WebSocket on the configured path and send a binary header
//! naming a TCP destination; the server checks the credential, connects,
//! acknowledges, and bridges bytes until either side closes.
//!
//! ## Crates
//!
//! - [`vless_core`] - Default constants, relay and stream adapters
//! - [`vless_proto`] - Request header codec
//! - [`vless_auth`] - Identity and credential validation
//! - [`vless_config`] - Configuration loading and validation
//! - [`vless_server`] - Server implementation

pub use vless_auth as auth;
pub use vless_config as config;
pub use vless_core as core;
pub use vless_proto as proto;
pub use vless_server as server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use vless_auth::{CredentialValidator, Identity, StaticAuth};
    pub use vless_config::{load_config, validate_config, Config};
    pub use vless_server::{run, run_with_shutdown, CancellationToken, ServerError};
}
