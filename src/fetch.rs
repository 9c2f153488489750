//! Fetch timing for the schedule source
//!
//! The deadline here is separate from the schedule's acceptance watermark: it
//! is clamped to the local clock after every attempt so a server running
//! ahead or behind cannot stall or flood the fetch loop.

use embassy_time::Instant;

/// Minimum seconds between two fetch attempts
pub const MIN_FETCH_LEAD: i64 = 6;

/// Decides when the next schedule fetch is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlanner {
    deadline: i64,
    jitter_ms: u16,
}

impl FetchPlanner {
    /// Create a planner that is immediately due
    ///
    /// `jitter_ms` (0-999) spreads fetches of many devices across the second.
    pub const fn new(jitter_ms: u16) -> Self {
        Self {
            deadline: 0,
            jitter_ms: if jitter_ms > 999 { 999 } else { jitter_ms },
        }
    }

    pub const fn deadline(&self) -> i64 {
        self.deadline
    }

    /// A fetch is due once the deadline has passed and the sub-second phase
    /// of the uptime is past the jitter offset
    pub fn is_due(&self, epoch: i64, uptime: Instant) -> bool {
        epoch > self.deadline && uptime.as_millis() % 1000 > u64::from(self.jitter_ms)
    }

    /// More than a whole interval past the deadline
    pub fn is_overdue(&self, epoch: i64, interval: u32) -> bool {
        epoch > self.deadline.saturating_add(i64::from(interval))
    }

    /// Schedule the next attempt after a fetch
    ///
    /// The watermark is constrained to `[epoch + 6, epoch + interval]`; when
    /// that range is inverted the lower bound wins.
    pub fn reschedule(&mut self, epoch: i64, watermark: i64, interval: u32) {
        let low = epoch.saturating_add(MIN_FETCH_LEAD);
        let high = epoch.saturating_add(i64::from(interval));
        self.deadline = if watermark < low {
            low
        } else if watermark > high {
            high
        } else {
            watermark
        };
    }

    /// Make the next check due immediately
    pub fn reset(&mut self) {
        self.deadline = 0;
    }
}
