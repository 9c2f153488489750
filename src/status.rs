//! Two-slot status indicators
//!
//! Each slot is a bicolor LED on one conductor pair. Driving the line high
//! lights color A, driving it low lights color B, and floating it turns the
//! LED off. Commands reach the indicator task through a single-slot mailbox
//! where the latest word replaces any unread one.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant};

#[cfg(feature = "esp32-log")]
use esp_println::println;

/// Cadence of the indicator task
pub const STATUS_TICK: Duration = Duration::from_millis(25);

/// Half-period of a slow (~1 Hz) blink
pub const SLOW_BLINK: Duration = Duration::from_millis(500);

/// Half-period of a fast (~5 Hz) blink
pub const FAST_BLINK: Duration = Duration::from_millis(100);

/// Physical drive state of an indicator line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorDrive {
    /// Drive high, color A
    High,
    /// Drive low, color B
    Low,
    /// High impedance, LED off
    Float,
}

/// A tri-state output pin behind one indicator slot
pub trait IndicatorPin {
    fn drive(&mut self, drive: IndicatorDrive);
}

/// What an indicator slot should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StatusCommand {
    #[default]
    Off = 0,
    OnA = 1,
    OnB = 2,
    BlinkASlow = 3,
    BlinkAFast = 4,
    BlinkBSlow = 5,
    BlinkBFast = 6,
}

impl StatusCommand {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Off,
            1 => Self::OnA,
            2 => Self::OnB,
            3 => Self::BlinkASlow,
            4 => Self::BlinkAFast,
            5 => Self::BlinkBSlow,
            6 => Self::BlinkBFast,
            _ => return None,
        })
    }

    /// Lit drive and half-period of a blinking command
    pub const fn blink(self) -> Option<(IndicatorDrive, Duration)> {
        match self {
            Self::BlinkASlow => Some((IndicatorDrive::High, SLOW_BLINK)),
            Self::BlinkAFast => Some((IndicatorDrive::High, FAST_BLINK)),
            Self::BlinkBSlow => Some((IndicatorDrive::Low, SLOW_BLINK)),
            Self::BlinkBFast => Some((IndicatorDrive::Low, FAST_BLINK)),
            Self::Off | Self::OnA | Self::OnB => None,
        }
    }

    /// Drive state of a steady command
    pub const fn steady(self) -> Option<IndicatorDrive> {
        match self {
            Self::Off => Some(IndicatorDrive::Float),
            Self::OnA => Some(IndicatorDrive::High),
            Self::OnB => Some(IndicatorDrive::Low),
            _ => None,
        }
    }
}

/// A command addressed to one indicator slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCommand {
    /// Slot id, never 0
    pub slot: u8,
    pub command: StatusCommand,
}

/// Up to two slot commands delivered together
///
/// On the wire this is `[slot1:8][cmd1:8][slot2:8][cmd2:8]`, with slot id 0
/// meaning "no command".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusWord {
    pub first: Option<SlotCommand>,
    pub second: Option<SlotCommand>,
}

impl StatusWord {
    /// Commands for two slots
    pub const fn pair(
        slot1: u8,
        command1: StatusCommand,
        slot2: u8,
        command2: StatusCommand,
    ) -> Self {
        Self {
            first: Self::slot(slot1, command1),
            second: Self::slot(slot2, command2),
        }
    }

    /// Command for a single slot
    pub const fn single(slot: u8, command: StatusCommand) -> Self {
        Self {
            first: Self::slot(slot, command),
            second: None,
        }
    }

    const fn slot(slot: u8, command: StatusCommand) -> Option<SlotCommand> {
        if slot == 0 {
            None
        } else {
            Some(SlotCommand { slot, command })
        }
    }

    /// Encode as a 32-bit word
    pub const fn pack(self) -> u32 {
        const fn half(cmd: Option<SlotCommand>) -> u32 {
            match cmd {
                Some(c) => ((c.slot as u32) << 8) | c.command as u32,
                None => 0,
            }
        }
        (half(self.first) << 16) | half(self.second)
    }

    /// Decode a 32-bit word
    ///
    /// Halves with slot id 0 or an unknown command are dropped.
    #[allow(clippy::cast_possible_truncation)]
    pub fn unpack(word: u32) -> Self {
        let half = |bits: u32| {
            let slot = (bits >> 8) as u8;
            if slot == 0 {
                return None;
            }
            let Some(command) = StatusCommand::from_raw(bits as u8) else {
                #[cfg(feature = "esp32-log")]
                println!("Unknown status command {} for slot {}", bits as u8, slot);
                return None;
            };
            Some(SlotCommand { slot, command })
        };
        Self {
            first: half(word >> 16),
            second: half(word & 0xFFFF),
        }
    }

    fn commands(self) -> impl Iterator<Item = SlotCommand> {
        [self.first, self.second].into_iter().flatten()
    }
}

/// Single-slot overwrite mailbox for status words
pub type StatusMailbox = Signal<CriticalSectionRawMutex, StatusWord>;

#[derive(Debug)]
struct IndicatorSlot<P> {
    id: u8,
    pin: P,
    command: StatusCommand,
    lit: bool,
    last_toggle: Instant,
}

impl<P: IndicatorPin> IndicatorSlot<P> {
    fn apply(&mut self, command: StatusCommand) {
        self.command = command;
        if let Some(drive) = command.steady() {
            self.pin.drive(drive);
        }
    }

    fn blink(&mut self, now: Instant) {
        let Some((drive, half_period)) = self.command.blink() else {
            return;
        };
        if now.saturating_duration_since(self.last_toggle) >= half_period {
            self.lit = !self.lit;
            self.pin.drive(if self.lit { drive } else { IndicatorDrive::Float });
            self.last_toggle = now;
        }
    }
}

/// Indicator task state for two slots
#[derive(Debug)]
pub struct StatusSignal<P> {
    slots: [IndicatorSlot<P>; 2],
}

impl<P: IndicatorPin> StatusSignal<P> {
    /// Create the task with both slots off
    pub fn new(first: (u8, P), second: (u8, P)) -> Self {
        let slot = |(id, pin): (u8, P)| IndicatorSlot {
            id,
            pin,
            command: StatusCommand::Off,
            lit: false,
            last_toggle: Instant::from_ticks(0),
        };
        let mut signal = Self {
            slots: [slot(first), slot(second)],
        };
        for slot in &mut signal.slots {
            slot.pin.drive(IndicatorDrive::Float);
        }
        signal
    }

    /// Run one indicator tick
    ///
    /// Takes at most one pending word from the mailbox without blocking,
    /// applies steady commands immediately, then advances the blink phase of
    /// every slot. Call every [`STATUS_TICK`].
    pub fn tick(&mut self, mailbox: &StatusMailbox, now: Instant) {
        if let Some(word) = mailbox.try_take() {
            self.apply(word);
        }
        for slot in &mut self.slots {
            slot.blink(now);
        }
    }

    /// Apply a decoded word directly
    pub fn apply(&mut self, word: StatusWord) {
        for cmd in word.commands() {
            if let Some(slot) = self.slots.iter_mut().find(|s| s.id == cmd.slot) {
                slot.apply(cmd.command);
            }
        }
    }

    /// Current command of a slot
    pub fn command(&self, slot: u8) -> Option<StatusCommand> {
        self.slots.iter().find(|s| s.id == slot).map(|s| s.command)
    }

    pub fn pin(&self, slot: u8) -> Option<&P> {
        self.slots.iter().find(|s| s.id == slot).map(|s| &s.pin)
    }
}
