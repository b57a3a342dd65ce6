//! Synthetic detector output (`stub://` sources).
//!
//! Produces well-formed `RawDetectionFrame`s with one confident anchor
//! regressed onto a drifting target. The face and hand trajectories share a
//! time base, so the hand periodically sweeps across the face.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::detect::{BoxPriorSet, Model, RawDetectionFrame, BOX_SIZE, X_SCALE, Y_SCALE};
use crate::ingest::FrameSource;

const BACKGROUND_LOGIT: f32 = 8.0;
const MISS_LOGIT: f32 = -8.0;
const HIT_LOGIT: f32 = 4.0;
const JITTER: f32 = 0.004;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub model: Model,
    pub label_count: usize,
    /// Frames to emit before reporting end of stream; `None` runs forever.
    pub max_frames: Option<u64>,
    pub seed: u64,
}

impl SyntheticConfig {
    pub fn new(name: impl Into<String>, model: Model, label_count: usize) -> Self {
        Self {
            name: name.into(),
            model,
            label_count,
            max_frames: None,
            seed: 0x5eed,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    priors: Arc<BoxPriorSet>,
    rng: StdRng,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig, priors: Arc<BoxPriorSet>) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            priors,
            rng,
            frame_count: 0,
        }
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frame_count
    }

    /// Normalized target center for frame `t`.
    fn target_center(&self, t: u64) -> (f32, f32) {
        let t = t as f32;
        let face_x = 0.5 + 0.2 * (t * 0.05).sin();
        let face_y = 0.5 + 0.1 * (t * 0.03).cos();
        match self.config.model {
            Model::Face => (face_x, face_y),
            Model::Hand => {
                // Offset swings between 0 and 0.4 of the frame.
                let offset = 0.2 + 0.2 * (t * 0.02).sin();
                (face_x + offset, face_y + offset * 0.5)
            }
        }
    }

    /// Build a frame whose only confident anchor decodes to center `(cx, cy)`.
    pub fn frame_for_center(&self, cx: f32, cy: f32) -> Result<RawDetectionFrame> {
        let detection_max = self.priors.len();
        let label_count = self.config.label_count;
        let mut boxes = vec![0.0f32; detection_max * BOX_SIZE];
        let mut scores = vec![MISS_LOGIT; detection_max * label_count];
        for d in 0..detection_max {
            scores[d * label_count] = BACKGROUND_LOGIT;
        }

        let d = self.priors.nearest_anchor(cx, cy);
        let (prior_y, prior_x, prior_h, prior_w) = self.priors.anchor(d);
        if prior_h > 0.0 {
            boxes[d * BOX_SIZE] = (cy - prior_y) / prior_h * Y_SCALE;
        }
        if prior_w > 0.0 {
            boxes[d * BOX_SIZE + 1] = (cx - prior_x) / prior_w * X_SCALE;
        }
        if label_count > 1 {
            scores[d * label_count] = MISS_LOGIT;
            scores[d * label_count + 1] = HIT_LOGIT;
        }

        RawDetectionFrame::new(boxes, scores, detection_max, label_count)
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn next_frame(&mut self) -> Result<Option<RawDetectionFrame>> {
        if let Some(max) = self.config.max_frames {
            if self.frame_count >= max {
                return Ok(None);
            }
        }
        let (cx, cy) = self.target_center(self.frame_count);
        let cx = (cx + self.rng.gen_range(-JITTER..JITTER)).clamp(0.0, 1.0);
        let cy = (cy + self.rng.gen_range(-JITTER..JITTER)).clamp(0.0, 1.0);
        self.frame_count += 1;
        self.frame_for_center(cx, cy).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoxDecoder, LabelTable, NonMaxSuppressor};

    fn grid_priors() -> Arc<BoxPriorSet> {
        let mut y = Vec::new();
        let mut x = Vec::new();
        for row in 0..10 {
            for col in 0..10 {
                y.push(0.05 + row as f32 * 0.1);
                x.push(0.05 + col as f32 * 0.1);
            }
        }
        Arc::new(BoxPriorSet::new(y, x, vec![0.2; 100], vec![0.2; 100], 100).unwrap())
    }

    #[test]
    fn frame_decodes_to_requested_center() {
        let source = SyntheticSource::new(
            SyntheticConfig::new("stub://face", Model::Face, 2),
            grid_priors(),
        );
        let frame = source.frame_for_center(0.42, 0.61).unwrap();
        let candidates = BoxDecoder::default().decode(&frame, &grid_priors()).unwrap();
        assert_eq!(candidates.len(), 1);
        let det = &candidates[0];
        assert!((det.x + det.width / 2.0 - 0.42 * 300.0).abs() < 1e-2);
        assert!((det.y + det.height / 2.0 - 0.61 * 300.0).abs() < 1e-2);
    }

    #[test]
    fn emits_bounded_stream() {
        let mut config = SyntheticConfig::new("stub://hand", Model::Hand, 2);
        config.max_frames = Some(3);
        let mut source = SyntheticSource::new(config, grid_priors());
        let labels = LabelTable::new(["???", "hand"]);
        for _ in 0..3 {
            let frame = source.next_frame().unwrap().expect("frame");
            let candidates = BoxDecoder::default().decode(&frame, &grid_priors()).unwrap();
            assert_eq!(NonMaxSuppressor::default().suppress(candidates, &labels).len(), 1);
        }
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.frames_emitted(), 3);
    }
}
