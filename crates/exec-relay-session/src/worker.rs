//! Per-session reconnect worker.
//!
//! One worker task owns one logical relay session: it opens the stream,
//! copies chunks into the session's accumulators, and on any termination
//! (clean end-of-stream included) waits out the backoff and opens a fresh
//! stream, appending to the same accumulators. Bytes the remote emits while
//! the relay is disconnected are lost; the relay does not gap-fill.

use std::sync::{Arc, RwLock};

use exec_relay_core::{
    ExecTarget, OutputStore, RelayConfig, SessionState, SessionStatus, StreamHandle, StreamIoError,
    StreamOpener,
};
use tokio::sync::watch;

/// Shared session state. The worker is the only writer apart from
/// cancellation; callers read copies through the relay.
pub(crate) struct StateCell(RwLock<SessionState>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(RwLock::new(SessionState::default()))
    }

    pub(crate) fn get(&self) -> SessionState {
        *self.0.read().unwrap()
    }

    /// Set the status. Transitions out of a terminal status are ignored.
    pub(crate) fn set_status(&self, status: SessionStatus) {
        let mut state = self.0.write().unwrap();
        if !state.status.is_terminal() {
            state.status = status;
        }
    }

    /// Record one failed attempt and return the new total. Frozen once the
    /// session is cancelled.
    fn record_failure(&self) -> u32 {
        let mut state = self.0.write().unwrap();
        if !state.status.is_terminal() {
            state.status = SessionStatus::Failed;
            state.attempts = state.attempts.saturating_add(1);
        }
        state.attempts
    }
}

/// How one connection attempt ended.
enum PumpEnd {
    /// Remote closed the stream cleanly.
    Eof,
    /// Transport failed mid-stream.
    Failed(StreamIoError),
    /// Cancellation observed while copying.
    Cancelled,
}

/// The reconnect loop for one session.
pub(crate) struct RelayWorker<O: ?Sized> {
    pub(crate) opener: Arc<O>,
    pub(crate) target: ExecTarget,
    pub(crate) config: RelayConfig,
    pub(crate) output: Arc<OutputStore>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) cancel_rx: watch::Receiver<bool>,
}

impl<O: StreamOpener + ?Sized> RelayWorker<O> {
    pub(crate) async fn run(self) {
        let Self {
            opener,
            target,
            config,
            output,
            state,
            mut cancel_rx,
        } = self;

        loop {
            if *cancel_rx.borrow() {
                state.set_status(SessionStatus::Cancelled);
                return;
            }

            state.set_status(SessionStatus::Connecting);
            let opened = tokio::select! {
                res = opener.open(&target) => res,
                _ = cancel_rx.changed() => {
                    state.set_status(SessionStatus::Cancelled);
                    return;
                }
            };

            match opened {
                Ok(mut handle) => {
                    state.set_status(SessionStatus::Streaming);
                    let end = pump(handle.as_mut(), &output, &mut cancel_rx).await;
                    handle.close().await;
                    match end {
                        PumpEnd::Cancelled => {
                            state.set_status(SessionStatus::Cancelled);
                            return;
                        }
                        PumpEnd::Eof => tracing::debug!("stream ended, scheduling reconnect"),
                        PumpEnd::Failed(e) => tracing::warn!(error = %e, "stream read failed"),
                    }
                }
                Err(e) => tracing::warn!(error = %e, "stream open failed"),
            }

            let attempts = state.record_failure();
            if !config.should_retry(attempts) {
                tracing::warn!(attempts, "retry budget exhausted, giving up");
                return;
            }

            let delay = config.backoff.delay_for_attempt(attempts.saturating_sub(1));
            tracing::debug!(attempts, delay_ms = delay.as_millis(), "reconnecting after backoff");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = cancel_rx.changed() => {
                    state.set_status(SessionStatus::Cancelled);
                    return;
                }
            }
        }
    }
}

/// Copy chunks from the handle into the accumulators until the stream ends,
/// errors, or the session is cancelled. Cancellation drops the in-flight
/// read future; the caller closes the handle afterwards.
async fn pump(
    handle: &mut dyn StreamHandle,
    output: &OutputStore,
    cancel_rx: &mut watch::Receiver<bool>,
) -> PumpEnd {
    loop {
        tokio::select! {
            chunk = handle.next_chunk() => match chunk {
                Ok(Some(chunk)) => output.push(chunk),
                Ok(None) => return PumpEnd::Eof,
                Err(e) => return PumpEnd::Failed(e),
            },
            _ = cancel_rx.changed() => return PumpEnd::Cancelled,
        }
    }
}
