use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::actuator::ServoChannels;
use crate::detect::{
    BoxDecoder, DecodeParams, NonMaxSuppressor, DETECTION_MAX, FACE_LABEL_SIZE, HAND_LABEL_SIZE, H_SCALE, IOU_THRESHOLD,
    MODEL_HEIGHT, MODEL_WIDTH, SCORE_THRESHOLD, SUPPRESSED_LABEL, W_SCALE, X_SCALE, Y_SCALE,
};
use crate::track::{
    ControlParams, FrameScale, MAX_OBJECT_DETECTION, PROXIMITY_MARGIN_PX, VIDEO_HEIGHT,
    VIDEO_WIDTH,
};

const DEFAULT_VIDEO_FPS: u32 = 15;
const DEFAULT_PRIORS_PATH: &str = "tflite_model/box_priors.txt";
const DEFAULT_FACE_LABELS_PATH: &str = "tflite_model/labels_face.txt";
const DEFAULT_HAND_LABELS_PATH: &str = "tflite_model/labels_hand.txt";
const DEFAULT_FACE_SOURCE: &str = "stub://face";
const DEFAULT_HAND_SOURCE: &str = "stub://hand";

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    model: Option<ModelConfigFile>,
    video: Option<VideoConfigFile>,
    thresholds: Option<ThresholdConfigFile>,
    tracking: Option<TrackingConfigFile>,
    resources: Option<ResourceConfigFile>,
    sources: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    detection_max: Option<usize>,
    width: Option<u32>,
    height: Option<u32>,
    y_scale: Option<f32>,
    x_scale: Option<f32>,
    h_scale: Option<f32>,
    w_scale: Option<f32>,
    face_label_count: Option<usize>,
    hand_label_count: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdConfigFile {
    score: Option<f32>,
    iou: Option<f32>,
    suppressed_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingConfigFile {
    max_object_detection: Option<usize>,
    gain_divisor: Option<f32>,
    deadband_px: Option<f32>,
    pan_min: Option<f32>,
    pan_max: Option<f32>,
    tilt_min: Option<f32>,
    tilt_max: Option<f32>,
    initial_pan: Option<f32>,
    initial_tilt: Option<f32>,
    pan_channel: Option<u8>,
    tilt_channel: Option<u8>,
    proximity_margin_px: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ResourceConfigFile {
    priors_path: Option<PathBuf>,
    face_labels_path: Option<PathBuf>,
    hand_labels_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    face: Option<String>,
    hand: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub model: ModelSettings,
    pub video: VideoSettings,
    pub thresholds: ThresholdSettings,
    pub tracking: TrackingSettings,
    pub resources: ResourceSettings,
    pub sources: SourceSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub detection_max: usize,
    pub width: u32,
    pub height: u32,
    pub y_scale: f32,
    pub x_scale: f32,
    pub h_scale: f32,
    pub w_scale: f32,
    pub face_label_count: usize,
    pub hand_label_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSettings {
    pub score: f32,
    pub iou: f32,
    pub suppressed_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    pub max_object_detection: usize,
    pub control: ControlParams,
    pub channels: ServoChannels,
    pub proximity_margin_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSettings {
    pub priors_path: PathBuf,
    pub face_labels_path: PathBuf,
    pub hand_labels_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub face: String,
    pub hand: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        // An empty file section resolves every field to its default.
        Self::from_file(TrackerConfigFile::default())
    }
}

impl TrackerConfig {
    /// Load from `TRACKER_CONFIG` (if set), then apply `TRACKER_*` overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TRACKER_CONFIG").ok().map(PathBuf::from);
        Self::load_with(config_path.as_deref())
    }

    /// Same as [`Self::load`] with an explicit file in place of `TRACKER_CONFIG`.
    pub fn load_with(config_path: Option<&Path>) -> Result<Self> {
        let file_cfg = match config_path {
            Some(path) if !path.as_os_str().is_empty() => Some(read_config_file(path)?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TrackerConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let video = file.video.unwrap_or_default();
        let thresholds = file.thresholds.unwrap_or_default();
        let tracking = file.tracking.unwrap_or_default();
        let resources = file.resources.unwrap_or_default();
        let sources = file.sources.unwrap_or_default();
        let control_defaults = ControlParams::default();
        let channel_defaults = ServoChannels::default();

        Self {
            model: ModelSettings {
                detection_max: model.detection_max.unwrap_or(DETECTION_MAX),
                width: model.width.unwrap_or(MODEL_WIDTH),
                height: model.height.unwrap_or(MODEL_HEIGHT),
                y_scale: model.y_scale.unwrap_or(Y_SCALE),
                x_scale: model.x_scale.unwrap_or(X_SCALE),
                h_scale: model.h_scale.unwrap_or(H_SCALE),
                w_scale: model.w_scale.unwrap_or(W_SCALE),
                face_label_count: model.face_label_count.unwrap_or(FACE_LABEL_SIZE),
                hand_label_count: model.hand_label_count.unwrap_or(HAND_LABEL_SIZE),
            },
            video: VideoSettings {
                width: video.width.unwrap_or(VIDEO_WIDTH),
                height: video.height.unwrap_or(VIDEO_HEIGHT),
                fps: video.fps.unwrap_or(DEFAULT_VIDEO_FPS),
            },
            thresholds: ThresholdSettings {
                score: thresholds.score.unwrap_or(SCORE_THRESHOLD),
                iou: thresholds.iou.unwrap_or(IOU_THRESHOLD),
                suppressed_label: thresholds
                    .suppressed_label
                    .unwrap_or_else(|| SUPPRESSED_LABEL.to_string()),
            },
            tracking: TrackingSettings {
                max_object_detection: tracking
                    .max_object_detection
                    .unwrap_or(MAX_OBJECT_DETECTION),
                control: ControlParams {
                    gain_divisor: tracking
                        .gain_divisor
                        .unwrap_or(control_defaults.gain_divisor),
                    deadband_px: tracking.deadband_px.unwrap_or(control_defaults.deadband_px),
                    pan_min: tracking.pan_min.unwrap_or(control_defaults.pan_min),
                    pan_max: tracking.pan_max.unwrap_or(control_defaults.pan_max),
                    tilt_min: tracking.tilt_min.unwrap_or(control_defaults.tilt_min),
                    tilt_max: tracking.tilt_max.unwrap_or(control_defaults.tilt_max),
                    initial_pan: tracking.initial_pan.unwrap_or(control_defaults.initial_pan),
                    initial_tilt: tracking
                        .initial_tilt
                        .unwrap_or(control_defaults.initial_tilt),
                },
                channels: ServoChannels {
                    pan: tracking.pan_channel.unwrap_or(channel_defaults.pan),
                    tilt: tracking.tilt_channel.unwrap_or(channel_defaults.tilt),
                },
                proximity_margin_px: tracking
                    .proximity_margin_px
                    .unwrap_or(PROXIMITY_MARGIN_PX),
            },
            resources: ResourceSettings {
                priors_path: resources
                    .priors_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PRIORS_PATH)),
                face_labels_path: resources
                    .face_labels_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_FACE_LABELS_PATH)),
                hand_labels_path: resources
                    .hand_labels_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_HAND_LABELS_PATH)),
            },
            sources: SourceSettings {
                face: sources
                    .face
                    .unwrap_or_else(|| DEFAULT_FACE_SOURCE.to_string()),
                hand: sources
                    .hand
                    .unwrap_or_else(|| DEFAULT_HAND_SOURCE.to_string()),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("TRACKER_PRIORS_PATH") {
            if !path.trim().is_empty() {
                self.resources.priors_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("TRACKER_FACE_LABELS") {
            if !path.trim().is_empty() {
                self.resources.face_labels_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("TRACKER_HAND_LABELS") {
            if !path.trim().is_empty() {
                self.resources.hand_labels_path = PathBuf::from(path);
            }
        }
        if let Ok(source) = std::env::var("TRACKER_FACE_SOURCE") {
            if !source.trim().is_empty() {
                self.sources.face = source;
            }
        }
        if let Ok(source) = std::env::var("TRACKER_HAND_SOURCE") {
            if !source.trim().is_empty() {
                self.sources.hand = source;
            }
        }
        if let Ok(fps) = std::env::var("TRACKER_VIDEO_FPS") {
            self.video.fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("TRACKER_VIDEO_FPS must be an integer frame rate"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let m = &self.model;
        if m.detection_max == 0 {
            bail!("model.detection_max must be greater than zero");
        }
        if m.width == 0 || m.height == 0 {
            bail!("model dimensions must be greater than zero");
        }
        if self.video.width == 0 || self.video.height == 0 {
            bail!("video dimensions must be greater than zero");
        }
        if self.video.fps == 0 {
            bail!("video.fps must be >= 1");
        }
        for (name, scale) in [
            ("y_scale", m.y_scale),
            ("x_scale", m.x_scale),
            ("h_scale", m.h_scale),
            ("w_scale", m.w_scale),
        ] {
            if !(scale > 0.0) {
                bail!("model.{} must be positive", name);
            }
        }
        if m.face_label_count < 2 || m.hand_label_count < 2 {
            bail!("label counts must include background and at least one class");
        }
        for (name, value) in [("score", self.thresholds.score), ("iou", self.thresholds.iou)] {
            if !(0.0..=1.0).contains(&value) {
                bail!("thresholds.{} must be within [0, 1]", name);
            }
        }

        let c = &self.tracking.control;
        if !(c.gain_divisor > 0.0) {
            bail!("tracking.gain_divisor must be positive");
        }
        if !(c.deadband_px >= 0.0) {
            bail!("tracking.deadband_px must not be negative");
        }
        if !(c.pan_min <= c.pan_max) {
            bail!("tracking pan range is empty");
        }
        if !(c.tilt_min <= c.tilt_max) {
            bail!("tracking tilt range is empty");
        }
        if !(c.pan_min..=c.pan_max).contains(&c.initial_pan) {
            bail!("tracking.initial_pan is outside the pan range");
        }
        if !(c.tilt_min..=c.tilt_max).contains(&c.initial_tilt) {
            bail!("tracking.initial_tilt is outside the tilt range");
        }
        if self.tracking.channels.pan == self.tracking.channels.tilt {
            bail!("pan and tilt must use different servo channels");
        }
        if !(self.tracking.proximity_margin_px >= 0.0) {
            bail!("tracking.proximity_margin_px must not be negative");
        }
        Ok(())
    }

    pub fn decode_params(&self) -> DecodeParams {
        DecodeParams {
            y_scale: self.model.y_scale,
            x_scale: self.model.x_scale,
            h_scale: self.model.h_scale,
            w_scale: self.model.w_scale,
            model_width: self.model.width,
            model_height: self.model.height,
            score_threshold: self.thresholds.score,
        }
    }

    pub fn decoder(&self) -> BoxDecoder {
        BoxDecoder::new(self.decode_params())
    }

    pub fn suppressor(&self) -> NonMaxSuppressor {
        NonMaxSuppressor::new(self.thresholds.iou, self.thresholds.suppressed_label.clone())
    }

    pub fn frame_scale(&self) -> FrameScale {
        FrameScale {
            model_width: self.model.width,
            model_height: self.model.height,
            video_width: self.video.width,
            video_height: self.video.height,
        }
    }
}

fn read_config_file(path: &Path) -> Result<TrackerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
