//! Trailing-edge debounce for state writes.

use chrono::{DateTime, Duration, Utc};

/// Fires once `delay` has passed since the most recent `touch`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    due: Option<DateTime<Utc>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, due: None }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::milliseconds(ms as i64))
    }

    /// Record a mutation; restarts the quiet window.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.due = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// True exactly once per burst, when the window has elapsed.
    pub fn fire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending write, returning whether one existed.
    pub fn take(&mut self) -> bool {
        self.due.take().is_some()
    }
}
