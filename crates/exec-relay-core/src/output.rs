//! Append-only output accumulators with broadcast support.
//!
//! The store is the only state shared between a relay worker (writer) and
//! its callers (readers). Buffers grow monotonically for the life of a
//! session; a reconnect appends, it never clears or rewinds.

use std::{borrow::Cow, sync::RwLock};

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::StreamChunk;

struct Inner {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Copy of the accumulated output at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSnapshot {
    /// All stdout bytes received so far.
    pub stdout: Vec<u8>,
    /// All stderr bytes received so far.
    pub stderr: Vec<u8>,
}

impl OutputSnapshot {
    /// Stdout as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stderr as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Whether both channels of this snapshot are a prefix of `other`.
    ///
    /// Successive snapshots of a live session always form a prefix chain.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.stdout.starts_with(&self.stdout) && other.stderr.starts_with(&self.stderr)
    }
}

/// Output store with append-only accumulators and live broadcast.
///
/// Callers read via [`snapshot`](Self::snapshot) at any time, or follow
/// live output via [`subscribe`](Self::subscribe) /
/// [`snapshot_then_stream`](Self::snapshot_then_stream).
pub struct OutputStore {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<StreamChunk>,
}

impl Default for OutputStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(10000);
        Self {
            inner: RwLock::new(Inner {
                stdout: Vec::new(),
                stderr: Vec::new(),
            }),
            sender,
        }
    }

    /// Append a chunk to its accumulator and broadcast it to live followers.
    pub fn push(&self, chunk: StreamChunk) {
        let inner = &mut *self.inner.write().unwrap();
        match &chunk {
            StreamChunk::Stdout(b) => inner.stdout.extend_from_slice(b),
            StreamChunk::Stderr(b) => inner.stderr.extend_from_slice(b),
        }
        // Broadcast under the lock: a follower subscribed under the read
        // lock sees each chunk exactly once, in the snapshot or live.
        let _ = self.sender.send(chunk);
    }

    /// Append stdout bytes.
    pub fn push_stdout(&self, data: impl Into<bytes::Bytes>) {
        self.push(StreamChunk::Stdout(data.into()));
    }

    /// Append stderr bytes.
    pub fn push_stderr(&self, data: impl Into<bytes::Bytes>) {
        self.push(StreamChunk::Stderr(data.into()));
    }

    /// Copy of everything accumulated so far. Never blocks on I/O and never
    /// observes a partially-appended chunk.
    #[must_use]
    pub fn snapshot(&self) -> OutputSnapshot {
        let inner = self.inner.read().unwrap();
        OutputSnapshot {
            stdout: inner.stdout.clone(),
            stderr: inner.stderr.clone(),
        }
    }

    /// Get a receiver for live chunks only.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StreamChunk> {
        self.sender.subscribe()
    }

    /// Stream that yields the accumulated output first, then live chunks.
    #[must_use]
    pub fn snapshot_then_stream(&self) -> futures::stream::BoxStream<'static, StreamChunk> {
        let (snapshot, rx) = {
            let inner = self.inner.read().unwrap();
            let snapshot = OutputSnapshot {
                stdout: inner.stdout.clone(),
                stderr: inner.stderr.clone(),
            };
            (snapshot, self.sender.subscribe())
        };

        let head = futures::stream::iter(
            [
                StreamChunk::Stdout(snapshot.stdout.into()),
                StreamChunk::Stderr(snapshot.stderr.into()),
            ]
            .into_iter()
            .filter(|chunk| !chunk.is_empty()),
        );
        let live = BroadcastStream::new(rx).filter_map(|res| async move { res.ok() });

        Box::pin(head.chain(live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_preserve_order_per_channel() {
        let store = OutputStore::new();
        store.push_stdout("hello ");
        store.push_stderr("warn: ");
        store.push_stdout("world");
        store.push_stderr("again");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.stdout_lossy(), "hello world");
        assert_eq!(snapshot.stderr_lossy(), "warn: again");
    }

    #[test]
    fn snapshots_form_a_prefix_chain() {
        let store = OutputStore::new();
        let mut previous = store.snapshot();
        for part in ["a", "bb", "ccc", "dddd"] {
            store.push_stdout(part);
            let next = store.snapshot();
            assert!(previous.is_prefix_of(&next));
            previous = next;
        }
        assert_eq!(previous.stdout_lossy(), "abbcccdddd");
    }

    #[tokio::test]
    async fn subscribers_receive_live_chunks() {
        let store = OutputStore::new();
        let mut rx = store.subscribe();
        store.push_stdout("live");

        assert_eq!(rx.recv().await.unwrap(), StreamChunk::stdout("live"));
    }

    #[tokio::test]
    async fn snapshot_then_stream_replays_then_follows() {
        let store = OutputStore::new();
        store.push_stdout("early ");
        store.push_stderr("oops");

        let mut stream = store.snapshot_then_stream();
        store.push_stdout("late");

        assert_eq!(stream.next().await.unwrap(), StreamChunk::stdout("early "));
        assert_eq!(stream.next().await.unwrap(), StreamChunk::stderr("oops"));
        assert_eq!(stream.next().await.unwrap(), StreamChunk::stdout("late"));
    }
}
