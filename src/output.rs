//! Frame hand-off between the renderer and the output task
//!
//! The renderer draws into a private back buffer and publishes complete frames
//! under a critical section. The output task copies the latest published
//! frame, scales it by the output brightness with temporal dithering, and
//! writes it to the LED driver at a fixed cadence. Neither side ever sees a
//! half-written frame, and the output side never writes to the shared frame.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use embassy_time::{Duration, Instant};

use crate::OutputDriver;
use crate::frame::FrameBuffer;
use crate::math8::{scale8_dithered, unit_to_u8};

/// Default output frame rate (50 FPS).
pub const DEFAULT_FPS: u32 = 50;

/// Default frame duration based on target FPS.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(1000 / DEFAULT_FPS as u64);

struct Front<const N: usize> {
    frame: FrameBuffer<N>,
    generation: u32,
    brightness: u8,
}

/// The most recently published frame
pub struct SharedFrame<const N: usize> {
    front: Mutex<RefCell<Front<N>>>,
    writer_claimed: Mutex<Cell<bool>>,
}

impl<const N: usize> SharedFrame<N> {
    /// Share `initial` as the first frame, at full brightness
    pub fn new(initial: FrameBuffer<N>) -> Self {
        Self {
            front: Mutex::new(RefCell::new(Front {
                frame: initial,
                generation: 0,
                brightness: u8::MAX,
            })),
            writer_claimed: Mutex::new(Cell::new(false)),
        }
    }

    /// Take the single writer handle
    ///
    /// Returns `None` once a writer exists.
    pub fn claim_writer(&self) -> Option<FrameWriter<'_, N>> {
        let claimed = critical_section::with(|cs| self.writer_claimed.borrow(cs).replace(true));
        if claimed {
            return None;
        }
        Some(FrameWriter {
            shared: self,
            back: self.template(),
        })
    }

    /// Set the output brightness, 0.0 (dark) to 1.0 (full)
    pub fn set_output_brightness(&self, level: f32) {
        let brightness = unit_to_u8(level);
        critical_section::with(|cs| self.front.borrow(cs).borrow_mut().brightness = brightness);
    }

    pub fn output_brightness(&self) -> u8 {
        critical_section::with(|cs| self.front.borrow(cs).borrow().brightness)
    }

    /// Number of frames published so far
    pub fn generation(&self) -> u32 {
        critical_section::with(|cs| self.front.borrow(cs).borrow().generation)
    }

    /// Copy the published frame into `out`, returning the output brightness
    pub fn snapshot(&self, out: &mut FrameBuffer<N>) -> u8 {
        critical_section::with(|cs| {
            let front = self.front.borrow(cs).borrow();
            out.copy_pixels_from(&front.frame);
            front.brightness
        })
    }

    fn template(&self) -> FrameBuffer<N> {
        critical_section::with(|cs| self.front.borrow(cs).borrow().frame.clone())
    }

    fn publish(&self, frame: &FrameBuffer<N>) {
        critical_section::with(|cs| {
            let mut front = self.front.borrow(cs).borrow_mut();
            front.frame.copy_pixels_from(frame);
            front.generation = front.generation.wrapping_add(1);
        });
    }
}

/// Exclusive render access to a [`SharedFrame`]
pub struct FrameWriter<'a, const N: usize> {
    shared: &'a SharedFrame<N>,
    back: FrameBuffer<N>,
}

impl<const N: usize> FrameWriter<'_, N> {
    /// Draw into the back buffer, then publish it as one frame
    pub fn render<R>(&mut self, draw: impl FnOnce(&mut FrameBuffer<N>) -> R) -> R {
        let result = draw(&mut self.back);
        self.shared.publish(&self.back);
        result
    }

    /// The last frame drawn by this writer
    pub const fn back(&self) -> &FrameBuffer<N> {
        &self.back
    }
}

/// Result of an output tick.
#[derive(Debug, Clone, Copy)]
pub struct FrameResult {
    /// The deadline for the next frame.
    pub next_deadline: Instant,
    /// How long to wait until the next frame (may be zero if behind schedule).
    pub sleep_duration: Duration,
}

/// Continuously transmits the shared frame to the LED driver
///
/// The caller sleeps for the returned duration between ticks.
pub struct OutputTask<'a, O: OutputDriver, const N: usize> {
    shared: &'a SharedFrame<N>,
    driver: O,
    scratch: FrameBuffer<N>,
    next_frame: Instant,
    frame_duration: Duration,
    phase: u8,
}

impl<'a, O: OutputDriver, const N: usize> OutputTask<'a, O, N> {
    /// Uses `DEFAULT_FRAME_DURATION` (50 FPS) for frame timing.
    pub fn new(shared: &'a SharedFrame<N>, driver: O) -> Self {
        Self::with_frame_duration(shared, driver, DEFAULT_FRAME_DURATION)
    }

    pub fn with_frame_duration(
        shared: &'a SharedFrame<N>,
        driver: O,
        frame_duration: Duration,
    ) -> Self {
        Self {
            shared,
            driver,
            scratch: shared.template(),
            next_frame: Instant::from_millis(0),
            frame_duration,
            phase: 0,
        }
    }

    /// Transmit one frame and return timing information.
    pub fn tick(&mut self, now: Instant) -> FrameResult {
        // Skip the backlog instead of bursting after a long stall
        let max_drift = self.frame_duration * 2;
        if now > self.next_frame + max_drift {
            self.next_frame = now;
        }

        let brightness = self.shared.snapshot(&mut self.scratch);
        self.apply_brightness(brightness);
        for strand in 0..self.scratch.layout().strand_count() {
            if let Some(pixels) = self.scratch.strand(strand) {
                self.driver.write(strand, pixels);
            }
        }
        self.phase = self.phase.wrapping_add(1);

        self.next_frame += self.frame_duration;
        let sleep_duration = if self.next_frame > now {
            self.next_frame - now
        } else {
            Duration::from_millis(0)
        };

        FrameResult {
            next_deadline: self.next_frame,
            sleep_duration,
        }
    }

    fn apply_brightness(&mut self, brightness: u8) {
        if brightness == u8::MAX {
            return;
        }
        if brightness == 0 {
            self.scratch.clear();
            return;
        }
        let phase = self.phase;
        for strand in 0..self.scratch.layout().strand_count() {
            let Some(pixels) = self.scratch.strand_mut(strand) else {
                continue;
            };
            for pixel in pixels {
                pixel.r = scale8_dithered(pixel.r, brightness, phase);
                pixel.g = scale8_dithered(pixel.g, brightness, phase);
                pixel.b = scale8_dithered(pixel.b, brightness, phase);
            }
        }
    }

    pub const fn driver(&self) -> &O {
        &self.driver
    }
}
