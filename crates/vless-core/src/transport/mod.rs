//! Transport adapters exposing message transports as byte streams.

mod ws;

pub use ws::{read_first_message, WsIo};
