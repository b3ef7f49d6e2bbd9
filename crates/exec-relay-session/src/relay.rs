//! Session manager for remote-exec stream relays.

use std::{collections::HashMap, sync::Arc};

use exec_relay_core::{
    ExecTarget, OutputSnapshot, OutputStore, RelayConfig, SessionId, SessionState, SessionStatus,
    StreamChunk, StreamOpener, TargetError,
};
use tokio::{
    sync::{RwLock, broadcast, watch},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::worker::{RelayWorker, StateCell};

/// Relay error.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid target: {0}")]
    InvalidTarget(#[from] TargetError),
    #[error("Session not found: {0}")]
    NotFound(SessionId),
}

/// Active session state.
struct ActiveSession {
    target: ExecTarget,
    output: Arc<OutputStore>,
    state: Arc<StateCell>,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the lifecycle of remote-exec relay sessions.
///
/// Each started session runs one worker task that keeps its stream alive
/// across transient failures, appending everything it reads into the
/// session's accumulators. Sessions are independent; relays for different
/// targets never interfere.
///
/// The relay assumes the diagnostic container a target addresses is already
/// present on the instance; establishing that precondition is the caller's
/// job.
pub struct StreamRelay<O: StreamOpener + 'static> {
    opener: Arc<O>,
    config: RelayConfig,
    sessions: RwLock<HashMap<SessionId, ActiveSession>>,
}

impl<O: StreamOpener + 'static> StreamRelay<O> {
    /// Create a relay with the default reconnect configuration.
    #[must_use]
    pub fn new(opener: O) -> Self {
        Self::with_config(opener, RelayConfig::default())
    }

    /// Create a relay with an explicit reconnect configuration.
    #[must_use]
    pub fn with_config(opener: O, config: RelayConfig) -> Self {
        Self {
            opener: Arc::new(opener),
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a relay session for `target`.
    ///
    /// Returns as soon as the session is registered; the first connect
    /// attempt happens on a background task.
    ///
    /// # Errors
    /// Returns `InvalidTarget` if the target is missing or malformed, in
    /// which case no session is created and no worker is spawned.
    pub async fn start(&self, target: ExecTarget) -> Result<SessionId, RelayError> {
        target.validate()?;

        let id = Uuid::new_v4();
        let output = Arc::new(OutputStore::new());
        let state = Arc::new(StateCell::new());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = self.spawn_worker(
            target.clone(),
            Arc::clone(&output),
            Arc::clone(&state),
            cancel_rx,
        );

        let active = ActiveSession {
            target,
            output,
            state,
            cancel_tx,
            task,
        };
        self.sessions.write().await.insert(id, active);
        tracing::debug!(session = %id, "relay session started");

        Ok(id)
    }

    /// Snapshot of the output accumulated so far.
    ///
    /// Safe to call concurrently with active streaming; never blocks on
    /// network I/O and never observes a partially-appended chunk.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn output(&self, id: SessionId) -> Result<OutputSnapshot, RelayError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(RelayError::NotFound(id))?;
        Ok(session.output.snapshot())
    }

    /// Current lifecycle state and attempt count.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn status(&self, id: SessionId) -> Result<SessionState, RelayError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(RelayError::NotFound(id))?;
        Ok(session.state.get())
    }

    /// Receiver for live chunks as the worker appends them.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn subscribe(
        &self,
        id: SessionId,
    ) -> Result<broadcast::Receiver<StreamChunk>, RelayError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(RelayError::NotFound(id))?;
        Ok(session.output.subscribe())
    }

    /// Stream yielding the accumulated output first, then live chunks.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn follow(
        &self,
        id: SessionId,
    ) -> Result<futures::stream::BoxStream<'static, StreamChunk>, RelayError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(RelayError::NotFound(id))?;
        Ok(session.output.snapshot_then_stream())
    }

    /// Cancel a session. Idempotent.
    ///
    /// Marks the session `Cancelled` and signals its worker to tear down
    /// the current stream; returns without waiting for the network close.
    /// No further reconnect attempts happen after this returns.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn cancel(&self, id: SessionId) -> Result<(), RelayError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(RelayError::NotFound(id))?;
        session.state.set_status(SessionStatus::Cancelled);
        let _ = session.cancel_tx.send(true);
        tracing::debug!(session = %id, "relay session cancelled");
        Ok(())
    }

    /// Restart a session: stop the current worker, reset the attempt count,
    /// and spawn a fresh worker against the same target.
    ///
    /// The accumulators are kept; a restarted session appends. This is the
    /// only way the attempt count resets. The old worker is awaited before
    /// the new one spawns, so at most one stream handle is ever live.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn restart(&self, id: SessionId) -> Result<(), RelayError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(RelayError::NotFound(id))?;

        session.state.set_status(SessionStatus::Cancelled);
        let _ = session.cancel_tx.send(true);
        if let Err(e) = (&mut session.task).await {
            tracing::error!(session = %id, error = %e, "relay worker did not shut down cleanly");
        }

        let state = Arc::new(StateCell::new());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        session.task = self.spawn_worker(
            session.target.clone(),
            Arc::clone(&session.output),
            Arc::clone(&state),
            cancel_rx,
        );
        session.state = state;
        session.cancel_tx = cancel_tx;
        tracing::debug!(session = %id, "relay session restarted");

        Ok(())
    }

    /// Cancel a session and release its entry, returning the final output.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn remove(&self, id: SessionId) -> Result<OutputSnapshot, RelayError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(&id).ok_or(RelayError::NotFound(id))?;
        session.state.set_status(SessionStatus::Cancelled);
        let _ = session.cancel_tx.send(true);
        Ok(session.output.snapshot())
    }

    /// Ids and states of all tracked sessions.
    pub async fn sessions(&self) -> Vec<(SessionId, SessionState)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| (*id, session.state.get()))
            .collect()
    }

    fn spawn_worker(
        &self,
        target: ExecTarget,
        output: Arc<OutputStore>,
        state: Arc<StateCell>,
        cancel_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let worker = RelayWorker {
            opener: Arc::clone(&self.opener),
            target,
            config: self.config.clone(),
            output,
            state,
            cancel_rx,
        };
        tokio::spawn(worker.run())
    }
}
