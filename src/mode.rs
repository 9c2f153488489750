//! Display mode state machine
//!
//! Modes only change on an explicit control event. Renderers keep no state
//! between frames, so a switch needs nothing beyond a forced redraw.

use embassy_time::{Duration, Instant};

use crate::controller::DisplayPower;

/// What the map is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Mode {
    /// Server schedule at wall-clock time
    #[default]
    Realtime = 0,
    /// Compiled timetable at local time of day
    TimetableRealtime = 1,
    /// Compiled timetable at accelerated time
    TimetableFastForward = 2,
}

impl Mode {
    /// Next mode in the cycle, wrapping
    pub const fn next(self) -> Self {
        match self {
            Self::Realtime => Self::TimetableRealtime,
            Self::TimetableRealtime => Self::TimetableFastForward,
            Self::TimetableFastForward => Self::Realtime,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Realtime => "REALTIME",
            Self::TimetableRealtime => "1x TIMETABLE",
            Self::TimetableFastForward => "FAST FORWARD TIMETABLE",
        }
    }
}

/// Tracks the active mode and when the map was last drawn
#[derive(Debug, Clone)]
pub struct ModeController {
    mode: Mode,
    last_drawn: Option<i64>,
    mode_started: Instant,
}

impl ModeController {
    pub const fn new(now: Instant) -> Self {
        Self {
            mode: Mode::Realtime,
            last_drawn: None,
            mode_started: now,
        }
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Advance to the next mode
    ///
    /// Forces a redraw, restarts the fast-forward clock and turns the
    /// display on.
    pub fn cycle<P: DisplayPower>(&mut self, now: Instant, power: &mut P) -> Mode {
        self.mode = self.mode.next();
        self.mode_started = now;
        self.last_drawn = None;
        power.set_power(true);
        self.mode
    }

    /// Whether a frame is due at epoch second `epoch`
    ///
    /// Wall-clock modes draw once per second; fast-forward draws every tick.
    pub fn should_draw(&self, epoch: i64) -> bool {
        match self.mode {
            Mode::TimetableFastForward => true,
            Mode::Realtime | Mode::TimetableRealtime => {
                self.last_drawn.is_none_or(|drawn| drawn < epoch)
            }
        }
    }

    pub fn mark_drawn(&mut self, epoch: i64) {
        self.last_drawn = Some(epoch);
    }

    /// Drop the last draw time so the next tick redraws
    pub fn invalidate(&mut self) {
        self.last_drawn = None;
    }

    /// Wall time spent in the current mode
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.mode_started)
    }
}
