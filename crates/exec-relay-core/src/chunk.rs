//! Typed chunks read from a remote stream.

use bytes::Bytes;

/// One chunk of output read from a remote process, tagged by channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Bytes from the remote stdout channel.
    Stdout(Bytes),
    /// Bytes from the remote stderr channel.
    Stderr(Bytes),
}

impl StreamChunk {
    /// Create a stdout chunk.
    #[must_use]
    pub fn stdout(data: impl Into<Bytes>) -> Self {
        Self::Stdout(data.into())
    }

    /// Create a stderr chunk.
    #[must_use]
    pub fn stderr(data: impl Into<Bytes>) -> Self {
        Self::Stderr(data.into())
    }

    /// The chunk payload, regardless of channel.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        match self {
            Self::Stdout(b) | Self::Stderr(b) => b,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload().len()
    }

    /// Whether the chunk carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }
}
