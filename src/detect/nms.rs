use crate::detect::labels::LabelTable;
use crate::detect::result::{Detection, DetectionList};
use crate::detect::{IOU_THRESHOLD, SUPPRESSED_LABEL};

/// Greedy IoU suppression followed by a label filter.
///
/// Candidates are visited in ascending probability order and each survivor
/// suppresses every later overlapping candidate. Among a cluster of
/// overlapping boxes the lowest-probability one is therefore kept. Callers
/// wanting conventional highest-score NMS must not rely on this type.
#[derive(Clone, Debug)]
pub struct NonMaxSuppressor {
    iou_threshold: f32,
    suppressed_label: String,
}

impl Default for NonMaxSuppressor {
    fn default() -> Self {
        Self::new(IOU_THRESHOLD, SUPPRESSED_LABEL)
    }
}

impl NonMaxSuppressor {
    pub fn new(iou_threshold: f32, suppressed_label: impl Into<String>) -> Self {
        Self {
            iou_threshold,
            suppressed_label: suppressed_label.into(),
        }
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn suppressed_label(&self) -> &str {
        &self.suppressed_label
    }

    /// Run suppression and drop survivors carrying the suppressed label.
    ///
    /// The output keeps the ascending-probability visiting order.
    pub fn suppress(&self, mut candidates: Vec<Detection>, labels: &LabelTable) -> DetectionList {
        // Stable: equal probabilities keep decode order.
        candidates.sort_by(|a, b| a.prob.total_cmp(&b.prob));

        let count = candidates.len();
        let mut deleted = vec![false; count];
        for i in 0..count {
            if deleted[i] {
                continue;
            }
            for j in (i + 1)..count {
                if candidates[i].iou(&candidates[j]) > self.iou_threshold {
                    deleted[j] = true;
                }
            }
        }

        let survivors: DetectionList = candidates
            .into_iter()
            .zip(deleted)
            .filter(|(_, del)| !del)
            .map(|(det, _)| det)
            .filter(|det| labels.get(det.class_id) != Some(self.suppressed_label.as_str()))
            .collect();

        log::trace!("nms kept {} of {} candidates", survivors.len(), count);
        survivors
    }
}
