//! Main control loop
//!
//! One [`MapController::tick`] per main-loop iteration (every [`MAIN_TICK`]):
//! fetch the schedule when due, publish the status indicators, and redraw the
//! map for the active mode. Input callbacks reach the controller through the
//! `on_*_button` methods, e.g. [`MapController::on_mode_button`].

use embassy_time::{Duration, Instant};

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::fetch::FetchPlanner;
use crate::frame::{FrameBuffer, RenderStats};
use crate::mode::{Mode, ModeController};
use crate::output::FrameWriter;
use crate::realtime::RealtimeRenderer;
use crate::schedule::{Accepted, EventSchedule, ScheduleError, SchedulePayload};
use crate::status::{StatusCommand, StatusMailbox, StatusWord};
use crate::timetable::{
    FAST_FORWARD_BASE, FAST_FORWARD_SPEED, RouteCatalog, TimetableRenderer, fast_forward_seconds,
};

/// Cadence of the main loop
pub const MAIN_TICK: Duration = Duration::from_millis(30);

/// How long after boot a missing link is shown as "connecting"
pub const STARTUP_GRACE: Duration = Duration::from_secs(60);

/// Display power switch of the external brightness subsystem
pub trait DisplayPower {
    fn set_power(&mut self, on: bool);

    fn toggle_power(&mut self);

    /// One brightness step up
    fn increase(&mut self);

    /// One brightness step down
    fn decrease(&mut self);
}

/// Network link state reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

/// Transport that delivers decoded schedule payloads
pub trait ScheduleSource {
    fn link(&self) -> LinkState;

    /// Retrieve and decode the next payload
    ///
    /// Must return within the transport's own timeout. Report transport
    /// failures as [`ScheduleError::Unavailable`] and decode failures as
    /// [`ScheduleError::Malformed`].
    fn fetch(&mut self) -> Result<SchedulePayload, ScheduleError>;
}

/// Time as seen by one main-loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Wall clock, epoch seconds
    pub epoch: i64,
    /// Local time of day
    pub seconds_since_midnight: u32,
    /// Monotonic time since boot
    pub uptime: Instant,
}

/// Configuration for the map controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Payload version this build expects
    pub backend_version: &'static str,
    /// Status slot showing network connectivity
    pub connectivity_slot: u8,
    /// Status slot showing schedule server health
    pub server_slot: u8,
    pub fast_forward_speed: u32,
    /// Simulated seconds since midnight when fast-forward starts
    pub fast_forward_base: u32,
    pub startup_grace: Duration,
    /// Per-device fetch offset within the second, 0-999 ms
    pub fetch_jitter_ms: u16,
}

impl MapConfig {
    pub const fn new(backend_version: &'static str, connectivity_slot: u8, server_slot: u8) -> Self {
        Self {
            backend_version,
            connectivity_slot,
            server_slot,
            fast_forward_speed: FAST_FORWARD_SPEED,
            fast_forward_base: FAST_FORWARD_BASE,
            startup_grace: STARTUP_GRACE,
            fetch_jitter_ms: 0,
        }
    }

    #[must_use]
    pub const fn with_fetch_jitter(mut self, jitter_ms: u16) -> Self {
        self.fetch_jitter_ms = jitter_ms;
        self
    }

    #[must_use]
    pub const fn with_fast_forward(mut self, speed: u32, base: u32) -> Self {
        self.fast_forward_speed = speed;
        self.fast_forward_base = base;
        self
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub rendered: Option<RenderStats>,
    pub ingest: Option<Result<Accepted, ScheduleError>>,
}

/// Owns the map state and drives rendering
pub struct MapController<'a, P: DisplayPower, const N: usize> {
    config: MapConfig,
    writer: FrameWriter<'a, N>,
    schedule: EventSchedule,
    catalog: RouteCatalog<'a>,
    modes: ModeController,
    planner: FetchPlanner,
    status: &'a StatusMailbox,
    power: P,
}

impl<'a, P: DisplayPower, const N: usize> MapController<'a, P, N> {
    /// Create a controller in realtime mode with an empty schedule
    pub fn new(
        config: MapConfig,
        writer: FrameWriter<'a, N>,
        catalog: RouteCatalog<'a>,
        status: &'a StatusMailbox,
        power: P,
        now: Instant,
    ) -> Self {
        #[cfg(feature = "esp32-log")]
        println!(
            "Loaded {} routes, ~{} bytes",
            catalog.len(),
            catalog.footprint_bytes()
        );
        Self {
            config,
            writer,
            schedule: EventSchedule::new(),
            catalog,
            modes: ModeController::new(now),
            planner: FetchPlanner::new(config.fetch_jitter_ms),
            status,
            power,
        }
    }

    /// Run one main-loop iteration
    pub fn tick<S: ScheduleSource>(&mut self, clock: &ClockReading, source: &mut S) -> TickReport {
        let mut report = TickReport::default();
        let link = source.link();

        match self.modes.mode() {
            Mode::Realtime => {
                match link {
                    LinkState::Up if self.planner.is_due(clock.epoch, clock.uptime) => {
                        report.ingest = Some(self.fetch(clock, source));
                    }
                    LinkState::Up => {}
                    LinkState::Down => self.publish_link_down(clock.uptime),
                }
                if self.modes.should_draw(clock.epoch) {
                    report.rendered = Some(self.render_now(clock));
                }
            }
            Mode::TimetableRealtime => {
                if self.modes.should_draw(clock.epoch) {
                    report.rendered = Some(self.render_now(clock));
                }
                match link {
                    LinkState::Up => self.publish(StatusCommand::OnA, StatusCommand::Off),
                    LinkState::Down => self.publish_link_down(clock.uptime),
                }
            }
            Mode::TimetableFastForward => {
                report.rendered = Some(self.render_now(clock));
                self.publish(StatusCommand::Off, StatusCommand::Off);
                self.planner.reset();
            }
        }

        report
    }

    /// Redraw the map for the active mode immediately
    pub fn render_now(&mut self, clock: &ClockReading) -> RenderStats {
        let stats = match self.modes.mode() {
            Mode::Realtime => {
                let schedule = &self.schedule;
                self.writer
                    .render(|frame| RealtimeRenderer.render(schedule, clock.epoch, frame))
            }
            Mode::TimetableRealtime => {
                let catalog = self.catalog;
                let seconds = clock.seconds_since_midnight;
                self.writer
                    .render(|frame| TimetableRenderer.render(&catalog, seconds, frame))
            }
            Mode::TimetableFastForward => {
                let catalog = self.catalog;
                let seconds = fast_forward_seconds(
                    self.modes.elapsed(clock.uptime),
                    self.config.fast_forward_speed,
                    self.config.fast_forward_base,
                );
                self.writer
                    .render(|frame| TimetableRenderer.render(&catalog, seconds, frame))
            }
        };
        self.modes.mark_drawn(clock.epoch);
        stats
    }

    /// Accept a payload delivered outside the fetch cycle
    pub fn accept(&mut self, payload: SchedulePayload) -> Result<Accepted, ScheduleError> {
        self.schedule.accept(payload, self.config.backend_version)
    }

    /// Switch to the next mode
    pub fn cycle_mode(&mut self, now: Instant) -> Mode {
        let mode = self.modes.cycle(now, &mut self.power);
        #[cfg(feature = "esp32-log")]
        println!("Mode button pressed, mode changed to {}", mode.as_str());
        mode
    }

    /// Input callback for the mode button
    pub fn on_mode_button(&mut self, at: Instant) {
        self.cycle_mode(at);
    }

    /// Input callback for the power button
    pub fn on_power_button(&mut self, _at: Instant) {
        self.power.toggle_power();
    }

    pub fn on_brightness_up_button(&mut self, _at: Instant) {
        self.power.increase();
    }

    pub fn on_brightness_down_button(&mut self, _at: Instant) {
        self.power.decrease();
    }

    pub const fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub const fn schedule(&self) -> &EventSchedule {
        &self.schedule
    }

    pub const fn planner(&self) -> &FetchPlanner {
        &self.planner
    }

    /// The last frame drawn
    pub const fn frame(&self) -> &FrameBuffer<N> {
        self.writer.back()
    }

    pub const fn power(&self) -> &P {
        &self.power
    }

    pub fn power_mut(&mut self) -> &mut P {
        &mut self.power
    }

    fn fetch<S: ScheduleSource>(
        &mut self,
        clock: &ClockReading,
        source: &mut S,
    ) -> Result<Accepted, ScheduleError> {
        if self
            .planner
            .is_overdue(clock.epoch, self.schedule.update_interval())
        {
            self.publish(StatusCommand::OnA, StatusCommand::BlinkAFast);
        }

        let version = self.config.backend_version;
        let result = source
            .fetch()
            .and_then(|payload| self.schedule.accept(payload, version));

        let server = match result {
            Ok(_) | Err(ScheduleError::Stale { .. }) => StatusCommand::OnA,
            Err(ScheduleError::Malformed | ScheduleError::Unavailable) => StatusCommand::OnB,
        };
        self.publish(StatusCommand::OnA, server);

        self.planner.reschedule(
            clock.epoch,
            self.schedule.next_fetch_time(),
            self.schedule.update_interval(),
        );

        #[cfg(feature = "esp32-log")]
        self.log_fetch(clock.epoch, result);

        result
    }

    #[cfg(feature = "esp32-log")]
    fn log_fetch(&self, epoch: i64, result: Result<Accepted, ScheduleError>) {
        match result {
            Ok(Accepted { base_timestamp, .. })
            | Err(ScheduleError::Stale {
                timestamp: base_timestamp,
            }) => println!(
                "fetchDelay:{}s next:{}",
                epoch - base_timestamp,
                self.planner.deadline()
            ),
            Err(error) => println!("Schedule fetch failed: {}", error),
        }
    }

    fn publish(&self, connectivity: StatusCommand, server: StatusCommand) {
        self.status.signal(StatusWord::pair(
            self.config.connectivity_slot,
            connectivity,
            self.config.server_slot,
            server,
        ));
    }

    fn publish_link_down(&self, uptime: Instant) {
        let connectivity = if uptime.as_ticks() < self.config.startup_grace.as_ticks() {
            StatusCommand::BlinkAFast
        } else {
            StatusCommand::OnB
        };
        self.publish(connectivity, StatusCommand::Off);
    }
}
