//! Server-authored schedule of timestamped block color transitions
//!
//! The payload schema is:
//!
//! ```text
//! {
//!   "version": "...",
//!   "timestamp": <epoch seconds>,
//!   "update": <seconds until the next fetch>,
//!   "colors": { "<any key>": [r, g, b], ... },
//!   "updates": [ { "b": [pre, post], "c": <color id>, "t": <offset seconds> }, ... ]
//! }
//! ```
//!
//! Decoding is done by the transport with any serde format. The order of the
//! `colors` entries defines the color ids.

use core::fmt;

use heapless::{String, Vec};
use serde::Deserialize;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::color::{BLACK, Rgb};

/// Maximum number of palette entries
pub const MAX_COLORS: usize = 32;

/// Maximum number of transitions in one schedule
pub const MAX_EVENTS: usize = 512;

/// Bytes of the payload version kept for comparison
pub const VERSION_LEN: usize = 32;

/// Fetch interval used until a payload provides one
pub const DEFAULT_UPDATE_INTERVAL: u32 = 30;

/// Palette index, also the compositing priority of a transition
pub type ColorId = u16;

/// Ordered palette indexed by color id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Rgb, MAX_COLORS>,
}

impl ColorTable {
    pub const fn new() -> Self {
        Self { colors: Vec::new() }
    }

    /// Append a color, assigning it the next id
    ///
    /// Returns the color back if the table is full.
    pub fn push(&mut self, color: Rgb) -> Result<ColorId, Rgb> {
        self.colors.push(color)?;
        #[allow(clippy::cast_possible_truncation)]
        Ok((self.colors.len() - 1) as ColorId)
    }

    /// Look up a color id; unknown ids resolve to black
    pub fn resolve(&self, id: ColorId) -> Rgb {
        self.colors.get(usize::from(id)).copied().unwrap_or(BLACK)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl<'de> Deserialize<'de> for ColorTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColorTableVisitor;

        impl<'de> Visitor<'de> for ColorTableVisitor {
            type Value = ColorTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of at most {MAX_COLORS} [r, g, b] triples")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut table = ColorTable::new();
                while let Some((_, [r, g, b])) = map.next_entry::<IgnoredAny, [u8; 3]>()? {
                    table
                        .push(Rgb { r, g, b })
                        .map_err(|_| de::Error::invalid_length(MAX_COLORS + 1, &self))?;
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(ColorTableVisitor)
    }
}

/// Backend version carried by a payload
///
/// Any length decodes. Only the first [`VERSION_LEN`] bytes are kept, and a
/// longer version never matches an expected one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadVersion {
    text: String<VERSION_LEN>,
    truncated: bool,
}

impl PayloadVersion {
    pub fn new(version: &str) -> Self {
        let mut text = String::new();
        let mut truncated = false;
        for c in version.chars() {
            if text.push(c).is_err() {
                truncated = true;
                break;
            }
        }
        Self { text, truncated }
    }

    /// The kept prefix of the version
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn matches(&self, expected: &str) -> bool {
        !self.truncated && self.text.as_str() == expected
    }
}

impl<'de> Deserialize<'de> for PayloadVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = PayloadVersion;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a version string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(PayloadVersion::new(v))
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

/// Block number as sent by the server
///
/// Numbers beyond `u16` decode to [`u16::MAX`], which no strand covers.
fn deserialize_blocks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u16; 2], D::Error> {
    let [pre, post] = <[u32; 2]>::deserialize(deserializer)?;
    let clamp = |block: u32| u16::try_from(block).unwrap_or(u16::MAX);
    Ok([clamp(pre), clamp(post)])
}

/// One entry of the payload `updates` array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PayloadUpdate {
    /// `[pre_block, post_block]`
    #[serde(rename = "b", deserialize_with = "deserialize_blocks")]
    pub blocks: [u16; 2],
    #[serde(rename = "c")]
    pub color_id: ColorId,
    /// Seconds after the payload timestamp; zero or less means already passed
    #[serde(rename = "t")]
    pub offset: i64,
}

/// Decoded schedule payload, before acceptance
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulePayload {
    #[serde(default)]
    pub version: PayloadVersion,
    /// Schedule base time, epoch seconds
    #[serde(default)]
    pub timestamp: i64,
    /// Next-fetch interval in seconds; keeps the previous interval when absent
    #[serde(default)]
    pub update: Option<u32>,
    #[serde(default)]
    pub colors: ColorTable,
    #[serde(default)]
    pub updates: Vec<PayloadUpdate, MAX_EVENTS>,
}

/// A block color transition
///
/// Before `timestamp` the color belongs to `pre_block`, from `timestamp` on it
/// belongs to `post_block`. A timestamp of 0 has always passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEvent {
    pub pre_block: u16,
    pub post_block: u16,
    pub color_id: ColorId,
    pub timestamp: i64,
}

impl ScheduleEvent {
    fn from_update(update: &PayloadUpdate, base_timestamp: i64) -> Self {
        let timestamp = if update.offset > 0 {
            base_timestamp.saturating_add(update.offset)
        } else {
            0
        };
        Self {
            pre_block: update.blocks[0],
            post_block: update.blocks[1],
            color_id: update.color_id,
            timestamp,
        }
    }

    /// Block that holds this event's color at `now`
    pub const fn target_block(&self, now: i64) -> u16 {
        if now >= self.timestamp {
            self.post_block
        } else {
            self.pre_block
        }
    }
}

/// Schedule ingestion failure
///
/// None of these change the schedule; rendering continues from the last
/// accepted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Payload does not advance the next fetch time (duplicate)
    #[error("payload at {timestamp} does not advance the schedule")]
    Stale { timestamp: i64 },
    /// Payload could not be decoded
    #[error("malformed schedule payload")]
    Malformed,
    /// No payload could be retrieved
    #[error("schedule source unavailable")]
    Unavailable,
}

/// Bookkeeping returned for an accepted payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub base_timestamp: i64,
    pub next_fetch_time: i64,
}

/// The most recently accepted schedule
#[derive(Debug, Clone)]
pub struct EventSchedule {
    colors: ColorTable,
    events: Vec<ScheduleEvent, MAX_EVENTS>,
    base_timestamp: i64,
    next_fetch_time: i64,
    update_interval: u32,
}

impl Default for EventSchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSchedule {
    /// Create an empty schedule that accepts any first payload
    pub const fn new() -> Self {
        Self {
            colors: ColorTable::new(),
            events: Vec::new(),
            base_timestamp: 0,
            next_fetch_time: 0,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }

    /// Replace the schedule with `payload` if it is newer
    ///
    /// A payload whose `timestamp + update` does not exceed the current next
    /// fetch time is rejected as [`ScheduleError::Stale`] and nothing changes.
    /// A version other than `expected_version` is only reported.
    pub fn accept(
        &mut self,
        payload: SchedulePayload,
        expected_version: &str,
    ) -> Result<Accepted, ScheduleError> {
        let interval = payload.update.unwrap_or(self.update_interval);
        let candidate = payload.timestamp.saturating_add(i64::from(interval));

        if candidate <= self.next_fetch_time {
            #[cfg(feature = "esp32-log")]
            println!("Fetched the same data twice");
            return Err(ScheduleError::Stale {
                timestamp: payload.timestamp,
            });
        }

        if !payload.version.matches(expected_version) {
            #[cfg(feature = "esp32-log")]
            println!(
                "Backend version mismatch: expected {}, got {}",
                expected_version,
                payload.version.as_str()
            );
        }

        self.events = payload
            .updates
            .iter()
            .map(|update| ScheduleEvent::from_update(update, payload.timestamp))
            .collect();
        self.colors = payload.colors;
        self.base_timestamp = payload.timestamp;
        self.next_fetch_time = candidate;
        self.update_interval = interval;

        Ok(Accepted {
            base_timestamp: self.base_timestamp,
            next_fetch_time: self.next_fetch_time,
        })
    }

    pub const fn colors(&self) -> &ColorTable {
        &self.colors
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    pub const fn base_timestamp(&self) -> i64 {
        self.base_timestamp
    }

    /// Acceptance watermark; never decreases
    pub const fn next_fetch_time(&self) -> i64 {
        self.next_fetch_time
    }

    /// Seconds between fetches, from the last accepted payload
    pub const fn update_interval(&self) -> u32 {
        self.update_interval
    }
}
