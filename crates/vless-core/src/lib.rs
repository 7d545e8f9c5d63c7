//! Core types and constants shared across vless crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Error kind labels for structured logging
//! - Relay and stream adapters (`io`, `transport`)

pub mod defaults;
pub mod errors;
pub mod io;
pub mod transport;

// Re-export commonly used items at crate root
pub use defaults::*;
pub use errors::*;
