//! Single-shot, re-armable quiescence timer.
//!
//! The timer holds a deadline instead of a spawned task so the owning loop
//! can sleep until [`Debounce::deadline`] and then call [`Debounce::fire`].
//! Re-arming just moves the deadline; there is nothing to cancel.

#[cfg(test)]
#[path = "debounce_test.rs"]
mod debounce_test;

use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, deadline: None }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm or re-arm the timer to fire one window after `now`.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once per quiet window: when `now` has reached the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
