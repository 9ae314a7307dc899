//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciliations. Each identity keeps its own
//! sequence, which is dropped once a reconciliation succeeds.
//!
//! Sequence with the defaults: 5s, 5s, 10s, 15s, 25s, 40s, ... capped at 300s.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Default first delay in seconds
pub const MIN_BACKOFF_SECS: u64 = 5;
/// Default delay ceiling in seconds
pub const MAX_BACKOFF_SECS: u64 = 300;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min_secs`
/// twice and never exceeding `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev_secs: u64,
    current_secs: u64,
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Creates a sequence starting at `min_secs` and capped at `max_secs`.
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_secs;
        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = next.min(self.max_secs);
        Duration::from_secs(result)
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(MIN_BACKOFF_SECS, MAX_BACKOFF_SECS)
    }
}

/// Backoff state per resource key (`namespace/name`)
#[derive(Debug, Default)]
pub struct BackoffTracker {
    states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl BackoffTracker {
    /// Creates a tracker with no failing keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next retry delay for `key`, advancing its sequence.
    pub fn next_backoff(&self, key: &str) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.entry(key.to_string()).or_default().next_backoff()
    }

    /// Forget the failures of `key` after a successful reconciliation.
    pub fn reset(&self, key: &str) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
