use serde::Serialize;

use crate::detect::{Detection, MODEL_HEIGHT, MODEL_WIDTH};
use crate::track::{MAX_OBJECT_DETECTION, VIDEO_HEIGHT, VIDEO_WIDTH};

/// A detection box converted to video-frame pixels.
///
/// Coordinates are whole pixels (floored), as drawn on the output frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ImageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageBox {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Center point using floored half extents.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x + (self.width / 2.0).floor(),
            self.y + (self.height / 2.0).floor(),
        )
    }
}

/// Model-space to video-space conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameScale {
    pub model_width: u32,
    pub model_height: u32,
    pub video_width: u32,
    pub video_height: u32,
}

impl Default for FrameScale {
    fn default() -> Self {
        Self {
            model_width: MODEL_WIDTH,
            model_height: MODEL_HEIGHT,
            video_width: VIDEO_WIDTH,
            video_height: VIDEO_HEIGHT,
        }
    }
}

impl FrameScale {
    /// `value * video // model` on each axis.
    pub fn to_image(&self, det: &Detection) -> ImageBox {
        let sx = |v: f32| (v * self.video_width as f32 / self.model_width as f32).floor();
        let sy = |v: f32| (v * self.video_height as f32 / self.model_height as f32).floor();
        ImageBox {
            x: sx(det.x),
            y: sy(det.y),
            width: sx(det.width),
            height: sy(det.height),
        }
    }

    /// Integer frame center.
    pub fn frame_center(&self) -> (f32, f32) {
        ((self.video_width / 2) as f32, (self.video_height / 2) as f32)
    }
}

/// Face boxes shown this cycle and the one chosen for tracking.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FaceSelection {
    /// Video-space boxes of the capped face list, in list order.
    pub boxes: Vec<ImageBox>,
    /// Index into `boxes` of the tracking target.
    pub target: Option<usize>,
}

impl FaceSelection {
    pub fn target_box(&self) -> Option<&ImageBox> {
        self.target.and_then(|idx| self.boxes.get(idx))
    }
}

/// Picks the largest face among the first few detections.
///
/// The cap is positional: detections are not re-ranked by score first.
#[derive(Clone, Copy, Debug)]
pub struct TargetSelector {
    max_objects: usize,
    scale: FrameScale,
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new(MAX_OBJECT_DETECTION, FrameScale::default())
    }
}

impl TargetSelector {
    pub fn new(max_objects: usize, scale: FrameScale) -> Self {
        Self { max_objects, scale }
    }

    pub fn select(&self, faces: &[Detection]) -> FaceSelection {
        let boxes: Vec<ImageBox> = faces
            .iter()
            .take(self.max_objects)
            .map(|det| self.scale.to_image(det))
            .collect();

        let mut target: Option<(usize, f32)> = None;
        for (idx, b) in boxes.iter().enumerate() {
            let area = b.area();
            match target {
                // Strictly greater keeps the first occurrence of a tie.
                Some((_, best)) if !(area > best) => {}
                _ => target = Some((idx, area)),
            }
        }

        FaceSelection {
            boxes,
            target: target.map(|(idx, _)| idx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f32, y: f32, width: f32, height: f32) -> Detection {
        Detection {
            class_id: 1,
            x,
            y,
            width,
            height,
            prob: 0.8,
        }
    }

    #[test]
    fn scales_model_space_with_floor_division() {
        let b = FrameScale::default().to_image(&face(10.0, 10.0, 100.0, 151.0));
        // 10*640/300 = 21.33, 10*480/300 = 16, 100*640/300 = 213.33, 151*480/300 = 241.6
        assert_eq!(b, ImageBox { x: 21.0, y: 16.0, width: 213.0, height: 241.0 });
        assert_eq!(b.center(), (21.0 + 106.0, 16.0 + 120.0));
    }

    #[test]
    fn empty_list_selects_nothing() {
        let sel = TargetSelector::default().select(&[]);
        assert!(sel.boxes.is_empty());
        assert_eq!(sel.target, None);
        assert!(sel.target_box().is_none());
    }

    #[test]
    fn picks_largest_area() {
        let faces = [
            face(0.0, 0.0, 30.0, 30.0),
            face(100.0, 0.0, 60.0, 60.0),
            face(200.0, 0.0, 45.0, 45.0),
        ];
        let sel = TargetSelector::default().select(&faces);
        assert_eq!(sel.target, Some(1));
        assert_eq!(sel.boxes.len(), 3);
    }

    #[test]
    fn ties_resolve_to_first_occurrence() {
        let faces = [
            face(0.0, 0.0, 30.0, 30.0),
            face(50.0, 0.0, 60.0, 60.0),
            face(150.0, 0.0, 60.0, 60.0),
        ];
        assert_eq!(TargetSelector::default().select(&faces).target, Some(1));
    }

    #[test]
    fn cap_is_by_position_not_score() {
        let mut faces: Vec<Detection> = (0..5).map(|i| face(i as f32 * 50.0, 0.0, 20.0, 20.0)).collect();
        // Sixth entry is the biggest and most confident, but falls outside the cap.
        faces.push(Detection {
            prob: 0.99,
            ..face(0.0, 100.0, 200.0, 200.0)
        });
        let sel = TargetSelector::default().select(&faces);
        assert_eq!(sel.boxes.len(), 5);
        assert_eq!(sel.target, Some(0));
    }
}
