//! Servo Tracker
//!
//! Follows the largest detected face with a pan/tilt servo pair and flags
//! hands that come close to a face.
//!
//! # Architecture
//!
//! Two detectors (face, hand) publish results independently of the render
//! loop. Each model has one `DetectionStore`; its producer replaces the list
//! atomically and the render side only ever reads whole snapshots.
//!
//! 1. **Producer** (one per model): `RawDetectionFrame` → `BoxDecoder` →
//!    `NonMaxSuppressor` → `DetectionStore::publish`
//! 2. **Consumer** (once per output frame): snapshot → `TargetSelector` →
//!    `TrackingController` → `ProximityEvaluator` → `OverlaySink`
//!
//! # Module Structure
//!
//! - `detect`: anchor decoding, suppression, priors and labels
//! - `store`: latest-wins detection list per model
//! - `track`: target selection, pan/tilt control, hand proximity
//! - `actuator` / `overlay`: outbound seams (servo driver, compositor)
//! - `ingest`: sources of raw detector output
//! - `pipeline`: producer/consumer wiring
//! - `config`: runtime configuration

pub mod actuator;
pub mod config;
pub mod detect;
pub mod ingest;
pub mod overlay;
pub mod pipeline;
pub mod store;
pub mod track;

pub use actuator::{Actuator, Axis, LogActuator, MemoryActuator, ServoChannels};
pub use config::TrackerConfig;
pub use detect::{
    BoxDecoder, BoxPriorSet, Detection, DetectionList, LabelTable, Model, NonMaxSuppressor,
    RawDetectionFrame,
};
pub use overlay::{LogOverlay, OverlaySink, OverlayTarget};
pub use pipeline::{build, CycleReport, DetectionProducer, PipelineParts, RenderTracker};
pub use store::{DetectionSnapshot, DetectionStore};
pub use track::{
    ControlParams, FrameScale, ImageBox, ProximityEvaluator, TargetSelector, TrackerState,
    TrackingController,
};
