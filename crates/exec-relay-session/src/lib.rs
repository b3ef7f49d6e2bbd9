//! Session orchestration for remote-exec stream relays.
//!
//! Provides:
//! - `StreamRelay` - Start, observe, cancel, and restart relay sessions
//! - The per-session reconnect worker behind it

pub mod relay;
mod worker;

pub use relay::{RelayError, StreamRelay};
