//! Compiled-in routes and the trains projected from them

use crate::color::Rgb;

/// Length of a day in seconds
pub const SECONDS_PER_DAY: u32 = 86_400;

/// A train enters `block` at `offset` seconds after its start time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimetableEntry {
    pub offset: i16,
    pub block: u16,
}

impl TimetableEntry {
    pub const fn new(offset: i16, block: u16) -> Self {
        Self { offset, block }
    }
}

/// A simulated route
///
/// Entries must be sorted by ascending offset. This is not checked at runtime.
#[derive(Debug, Clone, Copy)]
pub struct Route<'a> {
    entries: &'a [TimetableEntry],
    color: Rgb,
    start_times: &'a [u32],
}

impl<'a> Route<'a> {
    pub const fn new(entries: &'a [TimetableEntry], color: Rgb, start_times: &'a [u32]) -> Self {
        Self {
            entries,
            color,
            start_times,
        }
    }

    pub const fn entries(&self) -> &'a [TimetableEntry] {
        self.entries
    }

    pub const fn color(&self) -> Rgb {
        self.color
    }

    /// Departure times in seconds since midnight
    pub const fn start_times(&self) -> &'a [u32] {
        self.start_times
    }

    /// Block occupied `elapsed` seconds after departure
    ///
    /// Before the first entry the first block is returned. An empty route
    /// occupies the "no block" sentinel.
    pub fn block_at(&self, elapsed: i32) -> u16 {
        let Some(first) = self.entries.first() else {
            return 0;
        };
        self.entries
            .iter()
            .rev()
            .find(|entry| i32::from(entry.offset) <= elapsed)
            .unwrap_or(first)
            .block
    }

    /// Whether a train is on the map `elapsed` seconds after departure
    ///
    /// Both the first and the last entry offsets are excluded.
    pub fn is_visible_at(&self, elapsed: i32) -> bool {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => {
                elapsed > i32::from(first.offset) && elapsed < i32::from(last.offset)
            }
            _ => false,
        }
    }

    /// One train per start time
    pub fn trains(&'a self) -> impl Iterator<Item = TrainInstance<'a>> + 'a {
        self.start_times
            .iter()
            .map(move |&start_time| TrainInstance::new(self, start_time))
    }

    /// Approximate storage used by this route's tables
    pub const fn footprint_bytes(&self) -> usize {
        self.entries.len() * size_of::<TimetableEntry>() + self.start_times.len() * size_of::<u32>()
    }
}

/// A single departure of a route
#[derive(Debug, Clone, Copy)]
pub struct TrainInstance<'a> {
    route: &'a Route<'a>,
    start_time: u32,
}

impl<'a> TrainInstance<'a> {
    pub const fn new(route: &'a Route<'a>, start_time: u32) -> Self {
        Self { route, start_time }
    }

    pub const fn route(&self) -> &'a Route<'a> {
        self.route
    }

    pub const fn start_time(&self) -> u32 {
        self.start_time
    }

    /// Seconds since departure, wrapping across midnight
    #[allow(clippy::cast_possible_truncation)]
    pub fn elapsed(&self, current: u32) -> i32 {
        let current = i64::from(current);
        let start = i64::from(self.start_time);
        let elapsed = if current >= start {
            current - start
        } else {
            (i64::from(SECONDS_PER_DAY) - start) + current
        };
        elapsed as i32
    }

    pub fn current_block(&self, current: u32) -> u16 {
        self.route.block_at(self.elapsed(current))
    }

    pub fn is_visible(&self, current: u32) -> bool {
        self.route.is_visible_at(self.elapsed(current))
    }
}

/// All compiled routes, immutable for the life of the process
#[derive(Debug, Clone, Copy)]
pub struct RouteCatalog<'a> {
    routes: &'a [Route<'a>],
}

impl<'a> RouteCatalog<'a> {
    pub const fn new(routes: &'a [Route<'a>]) -> Self {
        Self { routes }
    }

    pub const fn routes(&self) -> &'a [Route<'a>] {
        self.routes
    }

    pub const fn len(&self) -> usize {
        self.routes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn footprint_bytes(&self) -> usize {
        self.routes.iter().map(Route::footprint_bytes).sum()
    }
}
