//! Collaborator traits and session state types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{ExecTarget, StreamChunk};

/// Relay session identifier.
pub type SessionId = Uuid;

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session exists but the first connect attempt has not started yet.
    Idle,
    /// A stream-open call is in flight.
    Connecting,
    /// A live stream is being copied into the accumulators.
    Streaming,
    /// The last attempt ended (stream error, open error, or clean end).
    Failed,
    /// Session was cancelled by the caller. Terminal.
    Cancelled,
}

impl SessionStatus {
    /// Whether no further transitions can leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Observable state of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Failed attempts so far. Resets only on an explicit restart.
    pub attempts: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            attempts: 0,
        }
    }
}

/// Error opening a stream against a target. Recoverable: counted as one
/// failed attempt, never fatal to the session.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Exec request rejected: {0}")]
    Rejected(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error reading from a live stream. Recoverable: same treatment as
/// `OpenError`, and tears down the current handle.
#[derive(Debug, Error)]
pub enum StreamIoError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One live connection to a remote process's stdio.
///
/// A handle is owned exclusively by the relay worker that opened it and is
/// never reused across attempts. Cancellation drops an in-flight
/// `next_chunk` future before `close` is called, so implementations must
/// tolerate their read futures being dropped mid-poll.
#[async_trait]
pub trait StreamHandle: Send {
    /// Read the next chunk from the remote process.
    ///
    /// `Ok(None)` means the remote closed the stream cleanly.
    ///
    /// # Errors
    /// Returns an error when the transport fails mid-stream. A handle whose
    /// first read errors is treated the same as a later mid-stream error.
    async fn next_chunk(&mut self) -> Result<Option<StreamChunk>, StreamIoError>;

    /// Tear down the transport. Called at most once, after reads stop.
    async fn close(&mut self);
}

/// Opens command-execution streams against remote targets.
///
/// Invoked once per connection attempt, repeatedly and independently.
/// Errors are ordinary on a flaky connection and must not abort anything.
/// Open futures may be dropped when the session is cancelled mid-connect;
/// implementations should release any partial connection on drop.
#[async_trait]
pub trait StreamOpener: Send + Sync {
    /// Open a fresh stream for one connection attempt.
    ///
    /// # Errors
    /// Returns an error when the stream could not be established.
    async fn open(&self, target: &ExecTarget) -> Result<Box<dyn StreamHandle>, OpenError>;
}
