//! Simulated timetable rendering
//!
//! Unlike the live map there is no priority between trains: a route drawn
//! later overwrites an earlier route sharing the same block.

mod route;

use embassy_time::Duration;

pub use route::{Route, RouteCatalog, SECONDS_PER_DAY, TimetableEntry, TrainInstance};

use crate::frame::{FrameBuffer, RenderStats};

/// Simulated start of a fast-forward run, 05:45
pub const FAST_FORWARD_BASE: u32 = (5 * 60 + 45) * 60;

/// Default simulated seconds per wall second in fast-forward
pub const FAST_FORWARD_SPEED: u32 = 1000;

/// Simulated seconds since midnight for a fast-forward run
///
/// `elapsed` is the wall time since the mode was entered.
#[allow(clippy::cast_possible_truncation)]
pub fn fast_forward_seconds(elapsed: Duration, speed: u32, base: u32) -> u32 {
    let simulated = elapsed.as_millis() * u64::from(speed) / 1000 + u64::from(base);
    (simulated % u64::from(SECONDS_PER_DAY)) as u32
}

/// Renders trains from a route catalog at a simulated time of day
#[derive(Debug, Clone, Copy, Default)]
pub struct TimetableRenderer;

impl TimetableRenderer {
    /// Clear `frame` and draw every visible train at `current` seconds since midnight
    pub fn render<const N: usize>(
        self,
        catalog: &RouteCatalog<'_>,
        current: u32,
        frame: &mut FrameBuffer<N>,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        frame.clear();

        for route in catalog.routes() {
            for train in route.trains() {
                if train.is_visible(current) {
                    stats.record(frame.set_block(train.current_block(current), route.color()));
                }
            }
        }

        stats
    }
}
