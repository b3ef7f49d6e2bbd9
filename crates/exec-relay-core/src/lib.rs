//! Core abstractions for resilient remote-exec stream relays.
//!
//! This crate provides the fundamental building blocks:
//! - `OutputStore` - Append-only accumulators + broadcast for live followers
//! - `StreamChunk` - Typed chunk read from a remote stream
//! - `ExecTarget` - Description of the remote instance and command
//! - `RelayConfig` / `BackoffPolicy` - Reconnect pacing and retry budget
//! - Stream opener and handle traits

pub mod chunk;
pub mod config;
pub mod output;
pub mod target;
pub mod traits;

pub use chunk::StreamChunk;
pub use config::{BackoffPolicy, RelayConfig};
pub use output::{OutputSnapshot, OutputStore};
pub use target::{ExecTarget, TargetError};
pub use traits::{
    OpenError, SessionId, SessionState, SessionStatus, StreamHandle, StreamIoError, StreamOpener,
};
