#![no_std]

pub mod channel;
pub mod color;
pub mod controller;
pub mod fetch;
pub mod frame;
pub mod input;
pub mod layout;
pub mod math8;
pub mod mode;
pub mod output;
pub mod realtime;
pub mod schedule;
pub mod status;
pub mod timetable;

pub use controller::{
    ClockReading, DisplayPower, LinkState, MapConfig, MapController, ScheduleSource, TickReport,
};
pub use fetch::FetchPlanner;
pub use frame::{BlockWrite, FrameBuffer, RenderStats};
pub use input::{
    InputConfig, InputError, InputEvent, InputPipeline, InputPipelineBuilder, InputQueue,
};
pub use layout::{LayoutError, StrandLayout, StrandRange};
pub use mode::{Mode, ModeController};
pub use output::{FrameWriter, OutputTask, SharedFrame};
pub use realtime::RealtimeRenderer;
pub use schedule::{
    Accepted, ColorTable, EventSchedule, PayloadVersion, ScheduleError, ScheduleEvent,
    SchedulePayload,
};
pub use status::{IndicatorDrive, IndicatorPin, StatusCommand, StatusMailbox, StatusSignal, StatusWord};
pub use timetable::{Route, RouteCatalog, TimetableEntry, TimetableRenderer, TrainInstance};

pub use color::Rgb;
pub use embassy_time::{Duration, Instant};

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms.
/// The output task is generic over this trait and calls it once per strand
/// for every transmitted frame.
pub trait OutputDriver {
    /// Write colors to one LED strand
    fn write(&mut self, strand: usize, colors: &[Rgb]);
}
