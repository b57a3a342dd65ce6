use crate::detect::Detection;
use crate::track::selector::{FrameScale, ImageBox};
use crate::track::{MAX_OBJECT_DETECTION, PROXIMITY_MARGIN_PX};

/// A hand box with its face-proximity flag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandProximity {
    pub image_box: ImageBox,
    /// True when the hand center lies inside an inflated face box.
    pub caution: bool,
}

/// Flags hands whose center comes close to any rendered face.
#[derive(Clone, Copy, Debug)]
pub struct ProximityEvaluator {
    max_hands: usize,
    margin: f32,
    scale: FrameScale,
}

impl Default for ProximityEvaluator {
    fn default() -> Self {
        Self::new(MAX_OBJECT_DETECTION + 1, PROXIMITY_MARGIN_PX, FrameScale::default())
    }
}

impl ProximityEvaluator {
    pub fn new(max_hands: usize, margin: f32, scale: FrameScale) -> Self {
        Self {
            max_hands,
            margin,
            scale,
        }
    }

    /// Evaluate the first `max_hands` hands, in list order, against `faces`.
    ///
    /// `faces` are the video-space face boxes rendered this cycle. With no
    /// faces every hand comes back unflagged.
    pub fn evaluate(&self, hands: &[Detection], faces: &[ImageBox]) -> Vec<HandProximity> {
        hands
            .iter()
            .take(self.max_hands)
            .map(|hand| {
                let image_box = self.scale.to_image(hand);
                let caution = faces.iter().any(|face| self.is_near(&image_box, face));
                HandProximity { image_box, caution }
            })
            .collect()
    }

    /// Inclusive containment of the hand center in the face box grown by the margin.
    pub fn is_near(&self, hand: &ImageBox, face: &ImageBox) -> bool {
        let (cx, cy) = hand.center();
        let m = self.margin;
        (face.x - m..=face.x + face.width + m).contains(&cx)
            && (face.y - m..=face.y + face.height + m).contains(&cy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_box() -> ImageBox {
        ImageBox { x: 200.0, y: 100.0, width: 120.0, height: 140.0 }
    }

    fn hand_at(cx: f32, cy: f32) -> ImageBox {
        ImageBox { x: cx - 20.0, y: cy - 20.0, width: 40.0, height: 40.0 }
    }

    #[test]
    fn hand_on_face_center_is_flagged() {
        let eval = ProximityEvaluator::default();
        let face = face_box();
        let hand = hand_at(face.x + face.width / 2.0, face.y + face.height / 2.0);
        assert!(eval.is_near(&hand, &face));
    }

    #[test]
    fn hand_far_outside_is_not_flagged() {
        let eval = ProximityEvaluator::default();
        let face = face_box();
        // 200px beyond the inflated right edge.
        let hand = hand_at(face.x + face.width + 50.0 + 200.0, face.y);
        assert!(!eval.is_near(&hand, &face));
        let hand = hand_at(face.x, face.y - 50.0 - 200.0);
        assert!(!eval.is_near(&hand, &face));
    }

    #[test]
    fn margin_edges_are_inclusive() {
        let eval = ProximityEvaluator::default();
        let face = face_box();
        assert!(eval.is_near(&hand_at(face.x - 50.0, face.y - 50.0), &face));
        assert!(eval.is_near(&hand_at(face.x + face.width + 50.0, face.y + face.height + 50.0), &face));
        assert!(!eval.is_near(&hand_at(face.x - 51.0, face.y), &face));
    }

    #[test]
    fn flags_against_any_face_and_caps_hands() {
        let eval = ProximityEvaluator::default();
        // Model-space hands; at 640x480 from 300x300, x scales by 32/15 and y by 8/5.
        let hands: Vec<Detection> = (0..8)
            .map(|i| Detection {
                class_id: 1,
                x: i as f32 * 30.0,
                y: 10.0,
                width: 15.0,
                height: 15.0,
                prob: 0.6,
            })
            .collect();
        let faces = [
            ImageBox { x: 0.0, y: 0.0, width: 10.0, height: 10.0 },
            ImageBox { x: 330.0, y: 0.0, width: 10.0, height: 10.0 },
        ];
        let out = eval.evaluate(&hands, &faces);
        assert_eq!(out.len(), 6);
        let flags: Vec<bool> = out.iter().map(|h| h.caution).collect();
        // Hand centers: x = floor(i*30*640/300) + 16 -> 16, 80, 144, 208, 272, 336; y = 16 + 12 = 28.
        assert_eq!(flags, vec![true, false, false, false, false, true]);
    }

    #[test]
    fn no_faces_means_no_flags() {
        let eval = ProximityEvaluator::default();
        let hands = [Detection {
            class_id: 1,
            x: 10.0,
            y: 10.0,
            width: 10.0,
            height: 10.0,
            prob: 0.9,
        }];
        let out = eval.evaluate(&hands, &[]);
        assert_eq!(out.len(), 1);
        assert!(!out[0].caution);
    }
}
