//! Reconnect pacing and retry budget configuration.

use std::time::Duration;

/// Delay policy applied between reconnect attempts.
///
/// The policy only changes how long the relay waits; the retry trigger is
/// always the same: any stream termination, including a clean end-of-stream,
/// schedules a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// The same delay before every reconnect attempt.
    Fixed(Duration),
    /// Delay doubles after each failed attempt, capped at `cap`.
    Exponential { base: Duration, cap: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// Calculate the delay for a given attempt number (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, cap } => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                base.checked_mul(factor).map_or(cap, |d| d.min(cap))
            }
        }
    }
}

/// Configuration for one relay session.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Backoff between reconnect attempts.
    pub backoff: BackoffPolicy,
    /// Maximum number of failed attempts before the session settles in
    /// `Failed` (None = retry forever).
    pub max_attempts: Option<u32>,
}

impl RelayConfig {
    /// Fixed-interval backoff with unlimited retries.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            backoff: BackoffPolicy::Fixed(delay),
            max_attempts: None,
        }
    }

    /// Exponential backoff with unlimited retries.
    #[must_use]
    pub const fn exponential(base: Duration, cap: Duration) -> Self {
        Self {
            backoff: BackoffPolicy::Exponential { base, cap },
            max_attempts: None,
        }
    }

    /// Bound the number of failed attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = Some(max);
        self
    }

    /// Whether another attempt should be made after `attempts` failures.
    #[must_use]
    pub fn should_retry(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }
}
