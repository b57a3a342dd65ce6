use anyhow::{bail, Result};

use crate::detect::frame::RawDetectionFrame;
use crate::detect::priors::BoxPriorSet;
use crate::detect::result::Detection;
use crate::detect::{
    H_SCALE, MODEL_HEIGHT, MODEL_WIDTH, SCORE_THRESHOLD, W_SCALE, X_SCALE, Y_SCALE,
};

/// Fixed decode constants of a deployment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeParams {
    pub y_scale: f32,
    pub x_scale: f32,
    pub h_scale: f32,
    pub w_scale: f32,
    pub model_width: u32,
    pub model_height: u32,
    pub score_threshold: f32,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            y_scale: Y_SCALE,
            x_scale: X_SCALE,
            h_scale: H_SCALE,
            w_scale: W_SCALE,
            model_width: MODEL_WIDTH,
            model_height: MODEL_HEIGHT,
            score_threshold: SCORE_THRESHOLD,
        }
    }
}

/// Converts anchor-relative regression output into model-space boxes.
#[derive(Clone, Debug, Default)]
pub struct BoxDecoder {
    params: DecodeParams,
}

impl BoxDecoder {
    pub fn new(params: DecodeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DecodeParams {
        &self.params
    }

    /// Decode every `(anchor, class)` pair scoring at or above the threshold.
    ///
    /// Class 0 is background and never produces a candidate. Candidates come
    /// out in anchor order, then class order.
    pub fn decode(&self, frame: &RawDetectionFrame, priors: &BoxPriorSet) -> Result<Vec<Detection>> {
        if frame.anchor_count() != priors.len() {
            bail!(
                "contract: frame has {} anchors but prior table has {}",
                frame.anchor_count(),
                priors.len()
            );
        }

        let p = &self.params;
        let model_w = p.model_width as f32;
        let model_h = p.model_height as f32;
        let mut candidates = Vec::new();

        for d in 0..frame.anchor_count() {
            let (dy, dx, dh, dw) = frame.box_delta(d);
            let (prior_y, prior_x, prior_h, prior_w) = priors.anchor(d);

            let ycenter = dy / p.y_scale * prior_h + prior_y;
            let xcenter = dx / p.x_scale * prior_w + prior_x;
            let h = (dh / p.h_scale).exp() * prior_h;
            let w = (dw / p.w_scale).exp() * prior_w;

            let ymin = ycenter - h / 2.0;
            let xmin = xcenter - w / 2.0;
            let ymax = ycenter + h / 2.0;
            let xmax = xcenter + w / 2.0;

            let x = xmin * model_w;
            let y = ymin * model_h;
            let width = (xmax - xmin) * model_w;
            let height = (ymax - ymin) * model_h;

            for (class_id, &logit) in frame.class_scores(d).iter().enumerate().skip(1) {
                let score = sigmoid(logit);
                // Not `score < threshold`, so NaN scores never pass.
                if !(score >= p.score_threshold) {
                    continue;
                }
                candidates.push(Detection {
                    class_id,
                    x,
                    y,
                    width,
                    height,
                    prob: score,
                });
            }
        }

        Ok(candidates)
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
