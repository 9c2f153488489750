//! Debounced button input
//!
//! Lines idle high (pulled up) and read low while pressed. The edge handler
//! runs in interrupt context: it timestamps presses and releases and queues an
//! event for every release that followed a press held longer than the
//! debounce duration. A dispatch task drains the queue and calls the callback
//! registered for the line.
//!
//! The queue is a statically allocated [`InputQueue`] owned by exactly one
//! pipeline.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::{Duration, Instant};
use heapless::Vec;

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::channel::Channel;

/// Queue depth for a short burst of presses
pub const INPUT_QUEUE_SIZE: usize = 10;

/// Maximum number of monitored lines
pub const MAX_INPUT_LINES: usize = 8;

/// Default minimum press duration
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(30);

/// Default pause of the dispatch task after each handled event
pub const DEFAULT_DISPATCH_THROTTLE: Duration = Duration::from_millis(50);

/// Identifier of an input line (usually the GPIO number)
pub type LineId = u8;

/// Callback invoked by the dispatch task with the release time of the press
pub type InputCallback<C> = fn(&mut C, Instant);

/// Event queue between the edge handler and the dispatch task
pub type InputQueue<const SIZE: usize = INPUT_QUEUE_SIZE> = Channel<InputEvent, SIZE>;

/// Input timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputConfig {
    /// Presses must be held strictly longer than this
    pub debounce: Duration,
    /// Sleep after each dispatched event
    pub dispatch_throttle: Duration,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            dispatch_throttle: DEFAULT_DISPATCH_THROTTLE,
        }
    }
}

/// A debounced press, queued on release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub line: LineId,
    pub released_at: Instant,
}

/// What the edge handler did with an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Level equal to the last seen level
    Unchanged,
    /// Line went active
    Pressed,
    /// Released before the debounce duration elapsed
    Bounced,
    /// Event queued for dispatch
    Queued,
    /// Queue full, event discarded
    Dropped,
    /// No line registered with this id
    UnknownLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("input event queue is already in use")]
    ChannelUnavailable,
    #[error("too many input lines")]
    TooManyLines,
    #[error("input line {0} registered twice")]
    DuplicateLine(LineId),
    #[error("input line {0} not found")]
    UnknownLine(LineId),
}

struct Line<C> {
    id: LineId,
    callback: InputCallback<C>,
    high: bool,
    activated_at: Instant,
    released_at: Instant,
}

/// Collects lines before the pipeline starts
pub struct InputPipelineBuilder<C> {
    config: InputConfig,
    lines: Vec<Line<C>, MAX_INPUT_LINES>,
}

impl<C> InputPipelineBuilder<C> {
    pub const fn new(config: InputConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
        }
    }

    /// Register a line and its callback
    pub fn add(&mut self, id: LineId, callback: InputCallback<C>) -> Result<(), InputError> {
        if self.lines.iter().any(|line| line.id == id) {
            return Err(InputError::DuplicateLine(id));
        }
        self.lines
            .push(Line {
                id,
                callback,
                high: true,
                activated_at: Instant::from_ticks(0),
                released_at: Instant::from_ticks(0),
            })
            .map_err(|_| InputError::TooManyLines)
    }

    /// Take ownership of `queue` and start accepting edges
    ///
    /// Fails with [`InputError::ChannelUnavailable`] if another pipeline
    /// already owns the queue.
    pub fn begin<const QUEUE: usize>(
        self,
        queue: &InputQueue<QUEUE>,
    ) -> Result<InputPipeline<'_, C, QUEUE>, InputError> {
        if !queue.claim() {
            #[cfg(feature = "esp32-log")]
            println!("Failed to create button queue!");
            return Err(InputError::ChannelUnavailable);
        }
        Ok(InputPipeline {
            config: self.config,
            lines: Mutex::new(RefCell::new(self.lines)),
            events: queue,
        })
    }
}

/// Running input pipeline
///
/// Shared between the edge interrupt and the dispatch task; every method
/// takes `&self`.
pub struct InputPipeline<'a, C, const QUEUE: usize = INPUT_QUEUE_SIZE> {
    config: InputConfig,
    lines: Mutex<RefCell<Vec<Line<C>, MAX_INPUT_LINES>>>,
    events: &'a InputQueue<QUEUE>,
}

impl<C, const QUEUE: usize> InputPipeline<'_, C, QUEUE> {
    /// Handle a level change on `line`; safe to call from an interrupt
    ///
    /// Never blocks: when the queue is full the new event is dropped.
    pub fn on_edge(&self, line: LineId, high: bool, now: Instant) -> EdgeOutcome {
        let debounced = critical_section::with(|cs| {
            let mut lines = self.lines.borrow(cs).borrow_mut();
            let Some(state) = lines.iter_mut().find(|l| l.id == line) else {
                return Err(EdgeOutcome::UnknownLine);
            };
            if state.high == high {
                return Err(EdgeOutcome::Unchanged);
            }
            state.high = high;
            if !high {
                state.activated_at = now;
                return Err(EdgeOutcome::Pressed);
            }
            state.released_at = now;
            if state.released_at.saturating_duration_since(state.activated_at) > self.config.debounce
            {
                Ok(())
            } else {
                Err(EdgeOutcome::Bounced)
            }
        });

        if let Err(outcome) = debounced {
            return outcome;
        }

        let event = InputEvent {
            line,
            released_at: now,
        };
        match self.events.try_send(event) {
            Ok(()) => EdgeOutcome::Queued,
            Err(_) => EdgeOutcome::Dropped,
        }
    }

    /// Handle the next queued event
    ///
    /// Invokes the callback of the event's line and returns how long the
    /// dispatch task should sleep before taking the next one. Returns `None`
    /// when the queue is empty; the task then parks until the next edge.
    pub fn dispatch(&self, context: &mut C) -> Option<Duration> {
        let event = self.events.try_receive()?;
        Some(self.handle(event, context))
    }

    /// Wait for the next debounced event without handling it
    pub async fn next_event(&self) -> InputEvent {
        self.events.receive().await
    }

    /// Wait for the next event and handle it
    ///
    /// Parks the dispatch task until `on_edge` queues something, then behaves
    /// like [`InputPipeline::dispatch`].
    pub async fn dispatch_next(&self, context: &mut C) -> Duration {
        let event = self.events.receive().await;
        self.handle(event, context)
    }

    fn handle(&self, event: InputEvent, context: &mut C) -> Duration {
        let callback = critical_section::with(|cs| {
            self.lines
                .borrow(cs)
                .borrow()
                .iter()
                .find(|l| l.id == event.line)
                .map(|l| l.callback)
        });
        if let Some(callback) = callback {
            callback(context, event.released_at);
        }
        self.config.dispatch_throttle
    }

    /// Replace the callback of a registered line
    pub fn set_callback(&self, line: LineId, callback: InputCallback<C>) -> Result<(), InputError> {
        critical_section::with(|cs| {
            let mut lines = self.lines.borrow(cs).borrow_mut();
            match lines.iter_mut().find(|l| l.id == line) {
                Some(state) => {
                    state.callback = callback;
                    Ok(())
                }
                None => {
                    #[cfg(feature = "esp32-log")]
                    println!("Button on pin {} not found!", line);
                    Err(InputError::UnknownLine(line))
                }
            }
        })
    }

    /// Events waiting for dispatch
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Events lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.events.dropped()
    }

    pub const fn config(&self) -> &InputConfig {
        &self.config
    }
}
