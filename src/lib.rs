//! Lane sensor
//!
//! Watches a lane through a camera or a video file, counts vehicles and spots
//! ambulances inside a fixed lane zone, and tells a traffic-signal controller
//! about it over a serial line.
//!
//! # Pipeline
//!
//! Each frame passes through the same steps, strictly in order:
//!
//! 1. `ingest`: a `FrameSource` yields the next frame.
//! 2. `region`: the lane zone is derived from the frame size.
//! 3. `detect`: a `DetectorBackend` runs on the zone; boxes are moved back
//!    into frame coordinates and labelled through the `ClassMap`.
//! 4. `aggregate`: detections become a `SignalState` (count + ambulance flag).
//! 5. `notify`: at most once per interval the state goes out as a `Command`
//!    over the `SerialLink`.
//! 6. `overlay`: the zone, boxes and count are drawn onto the frame, which is
//!    handed to a `display::FrameSink`.
//!
//! The `accident` module is a second pipeline over the same building blocks:
//! a sliding frame window, a `ClassifierBackend`, and single-byte commands.

pub mod accident;
pub mod aggregate;
pub mod command;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod notify;
pub mod overlay;
pub mod region;
pub mod runtime;
pub mod sensor;
pub mod serial;

pub use accident::{AccidentMonitor, AccidentVerdict, MonitorSettings};
pub use aggregate::SignalState;
pub use command::Command;
pub use config::SensorConfig;
pub use detect::{
    detect_full_frame, detect_in_region, BoundingBox, ClassKind, ClassMap, Detection,
    DetectorBackend, RawDetection, StubBackend,
};
pub use display::{FrameSink, NullSink, SnapshotSink};
pub use frame::Frame;
pub use ingest::{open_source, FrameSource, SourceKind, SourceSettings, SourceStats};
pub use notify::{RateLimitedNotifier, TimerState};
pub use overlay::OverlayRenderer;
pub use region::{Region, RegionBounds};
pub use runtime::{run_loop, LoopOptions, RunControl, RunSummary, StopReason};
pub use sensor::{LaneReport, LaneSensor};
pub use serial::{SerialLink, SerialSettings};
