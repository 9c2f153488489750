//! Interrupt-safe bounded queue
//!
//! Producers never block. When the queue is full the value is handed back
//! and counted as dropped, so an interrupt handler can return immediately.
//! A queue has a single consumer, which claims it once and then either polls
//! or waits for the next value.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel;

/// Error returned when trying to send to a full channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrySendError<T>(pub T);

/// Bounded queue holding up to `SIZE` values
pub struct Channel<T, const SIZE: usize> {
    inner: channel::Channel<CriticalSectionRawMutex, T, SIZE>,
    dropped: Mutex<Cell<u32>>,
    claimed: Mutex<Cell<bool>>,
}

impl<T, const SIZE: usize> Channel<T, SIZE> {
    pub const fn new() -> Self {
        Self {
            inner: channel::Channel::new(),
            dropped: Mutex::new(Cell::new(0)),
            claimed: Mutex::new(Cell::new(false)),
        }
    }

    /// Register the consumer
    ///
    /// Returns `false` if the queue already has one.
    pub fn claim(&self) -> bool {
        !critical_section::with(|cs| self.claimed.borrow(cs).replace(true))
    }

    /// Append a value without blocking
    ///
    /// Returns `Err(TrySendError(value))` if the channel is full.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        match self.inner.try_send(value) {
            Ok(()) => Ok(()),
            Err(channel::TrySendError::Full(value)) => {
                critical_section::with(|cs| {
                    let dropped = self.dropped.borrow(cs);
                    dropped.set(dropped.get().saturating_add(1));
                });
                Err(TrySendError(value))
            }
        }
    }

    /// Take the oldest value, if any
    pub fn try_receive(&self) -> Option<T> {
        self.inner.try_receive().ok()
    }

    /// Wait until a value is available and take it
    pub async fn receive(&self) -> T {
        self.inner.receive().await
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        SIZE
    }

    /// Values rejected because the queue was full
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }
}

impl<T, const SIZE: usize> Default for Channel<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
