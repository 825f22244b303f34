//! Deadline-based timers for coalescing input.
//!
//! Neither type sleeps; the owner asks for [`Debouncer::deadline`] and calls
//! `fire_if_due` once the clock passes it.

use std::time::Duration;

use tokio::time::Instant;

/// Fires once after a burst of signals has gone quiet.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// (Re)arms the timer; any pending firing is replaced.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` exactly once when the quiet period has elapsed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Lets through at most one signal per gap; signals in between are absorbed.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_gap: Duration,
    deadline: Option<Instant>,
}

impl Throttle {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            deadline: None,
        }
    }

    /// Records a signal, returning `true` if it scheduled a new firing.
    pub fn signal(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.min_gap);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
