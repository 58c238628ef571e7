//! Leading-edge throttle with a coalesced trailing run

use std::time::Duration;

/// Timestamps are host milliseconds, as in `performance.now()`
#[derive(Debug, Clone)]
pub struct Throttle {
    window_ms: f64,
    last_run: Option<f64>,
    pending: bool,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: window.as_secs_f64() * 1000.0,
            last_run: None,
            pending: false,
        }
    }

    fn window_elapsed(&self, now: f64) -> bool {
        self.last_run.is_none_or(|last| now - last >= self.window_ms)
    }

    /// Register a trigger. Returns true if the work should run now;
    /// otherwise the trigger is folded into one pending trailing run.
    pub fn trigger(&mut self, now: f64) -> bool {
        if self.window_elapsed(now) {
            self.last_run = Some(now);
            self.pending = false;
            true
        } else {
            self.pending = true;
            false
        }
    }

    /// True once if a coalesced run is due
    pub fn take_due(&mut self, now: f64) -> bool {
        if self.pending && self.window_elapsed(now) {
            self.last_run = Some(now);
            self.pending = false;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn reset(&mut self) {
        self.last_run = None;
        self.pending = false;
    }
}
