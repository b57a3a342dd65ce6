//! Overlay rendering boundary.
//!
//! Drawing happens in an external compositor. Each cycle the tracker hands it
//! the boxes to draw per model with the presentation flags already decided.

use anyhow::Result;
use serde::Serialize;

use crate::detect::Model;
use crate::track::ImageBox;

/// Text drawn instead of the label on a hand that is close to a face.
pub const CAUTION_TEXT: &str = "Caution!";

/// One box to draw.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayTarget {
    pub label: String,
    pub image_box: ImageBox,
    /// Face currently followed by the pan/tilt controller.
    pub tracked: bool,
    /// Hand close to a face.
    pub caution: bool,
}

impl OverlayTarget {
    /// Caption the renderer should draw.
    pub fn caption(&self) -> &str {
        if self.caution {
            CAUTION_TEXT
        } else {
            &self.label
        }
    }
}

pub trait OverlaySink {
    fn render_targets(&mut self, model: Model, targets: &[OverlayTarget]) -> Result<()>;
}

/// Overlay sink that writes each box to the log.
#[derive(Debug, Default)]
pub struct LogOverlay;

impl LogOverlay {
    pub fn new() -> Self {
        Self
    }
}

impl OverlaySink for LogOverlay {
    fn render_targets(&mut self, model: Model, targets: &[OverlayTarget]) -> Result<()> {
        for target in targets {
            let b = &target.image_box;
            if target.caution {
                log::warn!(
                    "{} [{}] at ({}, {}) {}x{} is near a face",
                    model,
                    target.caption(),
                    b.x,
                    b.y,
                    b.width,
                    b.height
                );
            } else {
                log::debug!(
                    "{} [{}] at ({}, {}) {}x{}{}",
                    model,
                    target.caption(),
                    b.x,
                    b.y,
                    b.width,
                    b.height,
                    if target.tracked { " (tracked)" } else { "" }
                );
            }
        }
        Ok(())
    }
}
