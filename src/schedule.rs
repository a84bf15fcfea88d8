//! Preview coalescing.
//!
//! At most one render is pending. Every trigger restarts the window, so a
//! burst of mutations (a drag) produces one render after the burst goes
//! quiet. Triggers that arrive while a render is in flight are dropped.

use std::time::Duration;

use tokio::time::Instant;

/// Debounce state for the preview. Holds no timers; callers pass `now`.
#[derive(Clone, Debug)]
pub struct PreviewScheduler {
    window: Duration,
    last_trigger: Option<Instant>,
    in_flight: bool,
}

impl PreviewScheduler {
    /// A scheduler that waits `window` after the last trigger.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_trigger: None,
            in_flight: false,
        }
    }

    /// Record a mutation at `now`. Returns `false` when dropped because a
    /// render is in flight.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.in_flight {
            log::debug!("preview trigger dropped: render in flight");
            return false;
        }
        self.last_trigger = Some(now);
        true
    }

    /// Whether a render is waiting for its window.
    pub fn is_pending(&self) -> bool {
        self.last_trigger.is_some()
    }

    /// Whether a claimed render has not finished yet.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// When the pending render becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_trigger.map(|t| t + self.window)
    }

    /// Claim the pending render if its window has elapsed. The caller must
    /// call [`finish`](Self::finish) when the render is done.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if !self.in_flight && now >= deadline => {
                self.last_trigger = None;
                self.in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// Claim a render immediately, discarding any pending one.
    pub fn take_now(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.last_trigger = None;
        self.in_flight = true;
        true
    }

    /// Release the in-flight claim.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}
