//! Per-frame target selection, pan/tilt control and hand proximity.
//!
//! Runs on the render side once per output frame:
//! 1. `TargetSelector` scales the capped face list to video space and picks the largest face
//! 2. `TrackingController` steers the actuator toward that face
//! 3. `ProximityEvaluator` checks hands against every face box from step 1

mod controller;
mod proximity;
mod selector;

pub use controller::{ControlParams, TrackerState, TrackingController, TrackingError};
pub use proximity::{HandProximity, ProximityEvaluator};
pub use selector::{FaceSelection, FrameScale, ImageBox, TargetSelector};

pub const VIDEO_WIDTH: u32 = 640;
pub const VIDEO_HEIGHT: u32 = 480;

/// Faces considered per cycle; hands get one more.
pub const MAX_OBJECT_DETECTION: usize = 5;

/// Growth of each face box, in video pixels, for the proximity test.
pub const PROXIMITY_MARGIN_PX: f32 = 50.0;
