use anyhow::{bail, Result};

/// Values per anchor in the box regression tensor: dy, dx, dh, dw.
pub const BOX_SIZE: usize = 4;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// One inference output of a detector: box deltas and per-class logits.
///
/// Lengths are checked at construction, so a frame that exists always
/// matches the anchor count and label count it was built for.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetectionFrame {
    boxes: Vec<f32>,
    scores: Vec<f32>,
    label_count: usize,
}

impl RawDetectionFrame {
    pub fn new(
        boxes: Vec<f32>,
        scores: Vec<f32>,
        detection_max: usize,
        label_count: usize,
    ) -> Result<Self> {
        if label_count == 0 {
            bail!("contract: label count must be at least 1");
        }
        if boxes.len() != detection_max * BOX_SIZE {
            bail!(
                "contract: boxes length {} != {}",
                boxes.len(),
                detection_max * BOX_SIZE
            );
        }
        if scores.len() != detection_max * label_count {
            bail!(
                "contract: scores length {} != {}",
                scores.len(),
                detection_max * label_count
            );
        }
        Ok(Self {
            boxes,
            scores,
            label_count,
        })
    }

    /// Decode the two tensor memories delivered by a tensor sink.
    ///
    /// Both buffers hold native little-endian f32 values; their byte sizes are
    /// checked before any value is read.
    pub fn from_le_bytes(
        boxes: &[u8],
        scores: &[u8],
        detection_max: usize,
        label_count: usize,
    ) -> Result<Self> {
        let boxes_bytes = boxes_len(detection_max);
        if boxes.len() != boxes_bytes {
            bail!(
                "contract: invalid boxes buffer size {} (expected {})",
                boxes.len(),
                boxes_bytes
            );
        }
        let scores_bytes = scores_len(detection_max, label_count);
        if scores.len() != scores_bytes {
            bail!(
                "contract: invalid scores buffer size {} (expected {})",
                scores.len(),
                scores_bytes
            );
        }
        Self::new(
            decode_f32_le(boxes),
            decode_f32_le(scores),
            detection_max,
            label_count,
        )
    }

    /// Serialize back to the tensor byte layout, boxes first.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.boxes.len() + self.scores.len()) * F32_BYTES);
        for v in self.boxes.iter().chain(self.scores.iter()) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Number of anchors covered by this frame.
    pub fn anchor_count(&self) -> usize {
        self.boxes.len() / BOX_SIZE
    }

    pub fn label_count(&self) -> usize {
        self.label_count
    }

    /// `(dy, dx, dh, dw)` for anchor `d`.
    pub fn box_delta(&self, d: usize) -> (f32, f32, f32, f32) {
        let b = &self.boxes[d * BOX_SIZE..(d + 1) * BOX_SIZE];
        (b[0], b[1], b[2], b[3])
    }

    /// Raw class logits for anchor `d`.
    pub fn class_scores(&self, d: usize) -> &[f32] {
        &self.scores[d * self.label_count..(d + 1) * self.label_count]
    }
}

/// Byte size of the box tensor.
pub fn boxes_len(detection_max: usize) -> usize {
    detection_max * BOX_SIZE * F32_BYTES
}

/// Byte size of the score tensor.
pub fn scores_len(detection_max: usize, label_count: usize) -> usize {
    detection_max * label_count * F32_BYTES
}

/// Byte size of one serialized frame record.
pub fn record_len(detection_max: usize, label_count: usize) -> usize {
    boxes_len(detection_max) + scores_len(detection_max, label_count)
}

fn decode_f32_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
