//! Latest-value handoff between a detector producer and the render consumer.
//!
//! Each model gets its own `DetectionStore`. The producer publishes a whole
//! list; the consumer takes a snapshot. Lists are immutable once published,
//! so a snapshot is a shared handle to a complete list and can never observe
//! a partially written one.

use std::sync::{Arc, PoisonError, RwLock};

use crate::detect::{Detection, DetectionList, Model};

/// A consistent view of one published cycle.
#[derive(Clone, Debug)]
pub struct DetectionSnapshot {
    /// Publish count at the time of the snapshot; 0 means nothing was published yet.
    pub generation: u64,
    detections: Arc<[Detection]>,
}

impl Default for DetectionSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            detections: Arc::from(Vec::new()),
        }
    }
}

impl DetectionSnapshot {
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn to_list(&self) -> DetectionList {
        self.detections.to_vec()
    }
}

/// Thread-safe holder of the most recent detection list for one model.
#[derive(Debug)]
pub struct DetectionStore {
    model: Model,
    current: RwLock<DetectionSnapshot>,
}

impl DetectionStore {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            current: RwLock::new(DetectionSnapshot::default()),
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Replace the stored list. The previous list is dropped once no snapshot holds it.
    pub fn publish(&self, list: DetectionList) {
        let detections: Arc<[Detection]> = list.into();
        // The write section is a single assignment of a complete value, so a
        // poisoned lock still guards a consistent snapshot.
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        guard.generation += 1;
        guard.detections = detections;
    }

    /// Handle to the latest published list.
    pub fn snapshot(&self) -> DetectionSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }
}
