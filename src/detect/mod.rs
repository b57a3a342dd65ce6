//! Detector output post-processing.
//!
//! Turns one raw inference output (`RawDetectionFrame`) into a deduplicated
//! `DetectionList`: anchor decode first, then greedy suppression.

mod decoder;
mod frame;
mod labels;
mod nms;
mod priors;
mod result;

pub use decoder::{sigmoid, BoxDecoder, DecodeParams};
pub use frame::{boxes_len, record_len, scores_len, RawDetectionFrame, BOX_SIZE};
pub use labels::LabelTable;
pub use nms::NonMaxSuppressor;
pub use priors::BoxPriorSet;
pub use result::{Detection, DetectionList, Model};

/// Anchors produced by the SSD MobileNet detectors.
pub const DETECTION_MAX: usize = 1917;
pub const FACE_LABEL_SIZE: usize = 2;
pub const HAND_LABEL_SIZE: usize = 2;

pub const MODEL_WIDTH: u32 = 300;
pub const MODEL_HEIGHT: u32 = 300;

pub const Y_SCALE: f32 = 10.0;
pub const X_SCALE: f32 = 10.0;
pub const H_SCALE: f32 = 5.0;
pub const W_SCALE: f32 = 5.0;

pub const SCORE_THRESHOLD: f32 = 0.5;
pub const IOU_THRESHOLD: f32 = 0.5;
/// Survivors with this label never reach the tracker.
pub const SUPPRESSED_LABEL: &str = "person";
