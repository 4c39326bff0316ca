//! Reconnect backoff policy
//!
//! Classic exponential backoff: each failure waits the current delay and
//! doubles it, capped at a maximum; a successful connection resets the
//! delay to the base. No jitter, no retry cap — the relay has no
//! "give up" state, upstream data is expected to eventually resume.

use std::time::Duration;

/// Per-symbol reconnect delay state.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    /// The delay to wait before the next attempt. Doubles the stored
    /// delay (capped at max) for the attempt after that.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Reset to the base delay after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.base;
    }

    /// The delay the next failure would wait, without advancing.
    pub fn current(&self) -> Duration {
        self.current
    }
}
