//! I/O primitives: the bidirectional relay and a replaying stream wrapper.

mod prefixed;
mod relay;

pub use prefixed::PrefixedStream;
pub use relay::{relay_bidirectional, RelayOptions, RelayStats};
