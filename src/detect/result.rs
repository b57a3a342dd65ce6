use serde::Serialize;
use std::fmt;

/// Detector model feeding the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Face,
    Hand,
}

impl Model {
    pub fn name(self) -> &'static str {
        match self {
            Model::Face => "face",
            Model::Hand => "hand",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded detection in model-space pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub class_id: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Sigmoid score in `(0, 1]`.
    pub prob: f32,
}

impl Detection {
    pub fn xmax(&self) -> f32 {
        self.x + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    fn inclusive_intersection(&self, other: &Detection) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.xmax().min(other.xmax());
        let y2 = self.ymax().min(other.ymax());
        (x2 - x1 + 1.0).max(0.0) * (y2 - y1 + 1.0).max(0.0)
    }

    /// Intersection-over-union.
    ///
    /// The intersection counts edges as inclusive pixels (`+1` per side); the
    /// areas are plain `width * height`. Because of that mix the raw ratio can
    /// exceed 1 for near-identical boxes, so it is capped at 1. A non-positive
    /// union, or a ratio that is negative or not finite, gives 0.
    pub fn iou(&self, other: &Detection) -> f32 {
        let inter = self.inclusive_intersection(other);
        let union = self.area() + other.area() - inter;
        if !(union > 0.0) {
            return 0.0;
        }
        let overlap = inter / union;
        if overlap.is_finite() && overlap >= 0.0 {
            overlap.min(1.0)
        } else {
            0.0
        }
    }
}

/// The detections of one model for one cycle, in publication order.
pub type DetectionList = Vec<Detection>;

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, width: f32, height: f32) -> Detection {
        Detection {
            class_id: 1,
            x,
            y,
            width,
            height,
            prob: 0.9,
        }
    }

    #[test]
    fn iou_of_box_with_itself_is_one() {
        for b in [
            det(0.0, 0.0, 10.0, 10.0),
            det(12.3, 45.6, 78.9, 10.1),
            det(-5.0, 3.0, 50.0, 50.0),
        ] {
            assert_eq!(b.iou(&b), 1.0);
        }
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = det(0.0, 0.0, 10.0, 10.0);
        let b = det(100.0, 100.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(b.iou(&a), 0.0);
    }

    #[test]
    fn iou_counts_touching_pixels_as_overlap() {
        // Edges at x=10 share one pixel column under the inclusive convention.
        let a = det(0.0, 0.0, 10.0, 10.0);
        let b = det(10.0, 0.0, 10.0, 10.0);
        let overlap = a.iou(&b);
        assert!(overlap > 0.0);
        // 1 x 11 inclusive pixels over 100 + 100 - 11.
        assert!((overlap - 11.0 / 189.0).abs() < 1e-6);
    }

    #[test]
    fn iou_stays_within_unit_interval() {
        let boxes = [
            det(0.0, 0.0, 10.0, 10.0),
            det(5.0, 5.0, 10.0, 10.0),
            det(0.0, 0.0, 0.0, 0.0),
            det(-20.0, -20.0, 300.0, 300.0),
            det(3.0, 3.0, 1.0, 1.0),
            det(50.0, 0.0, 2.0, 200.0),
        ];
        for a in &boxes {
            for b in &boxes {
                let v = a.iou(b);
                assert!((0.0..=1.0).contains(&v), "iou {} out of range", v);
            }
        }
    }

    #[test]
    fn areas_do_not_take_the_inclusive_term() {
        // Intersection 33 x 51 = 1683, union 2500 + 2500 - 1683 = 3317.
        let a = det(0.0, 0.0, 50.0, 50.0);
        let b = det(18.0, 0.0, 50.0, 50.0);
        let overlap = a.iou(&b);
        assert!((overlap - 1683.0 / 3317.0).abs() < 1e-6);
        assert!(overlap > 0.5);
    }

    #[test]
    fn tiny_box_with_non_positive_union_gives_zero() {
        let a = det(0.0, 0.0, 0.5, 0.5);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn degenerate_negative_boxes_coerce_to_zero() {
        let a = det(0.0, 0.0, -10.0, -10.0);
        let b = det(0.0, 0.0, -10.0, -10.0);
        assert_eq!(a.iou(&b), 0.0);
    }
}
