use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use std::time::Duration;

/// Boundary between already-notified and new events.
///
/// Never moves backwards. Owned by the monitor loop alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    current: NaiveDateTime,
}

impl Watermark {
    pub fn new(start: NaiveDateTime) -> Self {
        Self { current: start }
    }

    /// Start `grace` before `now` so events logged just before the first poll are seen.
    pub fn starting_before(now: NaiveDateTime, grace: Duration) -> Self {
        let grace = ChronoDuration::from_std(grace).unwrap_or(ChronoDuration::zero());
        Self::new(now.checked_sub_signed(grace).unwrap_or(now))
    }

    /// Startup watermark in store-local time
    pub fn at_startup(grace: Duration) -> Self {
        Self::starting_before(Local::now().naive_local(), grace)
    }

    pub fn current(&self) -> NaiveDateTime {
        self.current
    }

    /// Move forward to `observed` if it is newer. Returns whether it moved.
    pub fn advance(&mut self, observed: NaiveDateTime) -> bool {
        if observed > self.current {
            self.current = observed;
            true
        } else {
            false
        }
    }
}
