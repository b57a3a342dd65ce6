//! Producer and consumer halves of the tracking pipeline.
//!
//! `DetectionProducer` runs in a detector's callback context: it decodes one
//! inference output, suppresses duplicates and publishes the result to its
//! model's `DetectionStore`. `RenderTracker` runs in the render context: once
//! per output frame it snapshots both stores, picks a face to follow, drives
//! the actuator, flags hands near faces and hands everything to the overlay.

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::actuator::Actuator;
use crate::config::TrackerConfig;
use crate::detect::{
    BoxDecoder, BoxPriorSet, DetectionList, LabelTable, Model, NonMaxSuppressor,
    RawDetectionFrame,
};
use crate::overlay::{OverlaySink, OverlayTarget};
use crate::store::DetectionStore;
use crate::track::{
    FaceSelection, HandProximity, ProximityEvaluator, TargetSelector, TrackerState,
    TrackingController,
};

/// Producer side for one model.
pub struct DetectionProducer {
    model: Model,
    label_count: usize,
    decoder: BoxDecoder,
    suppressor: NonMaxSuppressor,
    priors: Arc<BoxPriorSet>,
    labels: Arc<LabelTable>,
    store: Arc<DetectionStore>,
    stats: ProducerStats,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProducerStats {
    pub published: u64,
    pub skipped: u64,
}

impl DetectionProducer {
    pub fn new(
        model: Model,
        label_count: usize,
        decoder: BoxDecoder,
        suppressor: NonMaxSuppressor,
        priors: Arc<BoxPriorSet>,
        labels: Arc<LabelTable>,
        store: Arc<DetectionStore>,
    ) -> Result<Self> {
        if store.model() != model {
            bail!("{} producer wired to the {} store", model, store.model());
        }
        if labels.len() < label_count {
            bail!(
                "contract: {} label table has {} entries, model has {} classes",
                model,
                labels.len(),
                label_count
            );
        }
        Ok(Self {
            model,
            label_count,
            decoder,
            suppressor,
            priors,
            labels,
            store,
            stats: ProducerStats::default(),
        })
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn label_count(&self) -> usize {
        self.label_count
    }

    /// Anchor count expected in every frame.
    pub fn detection_max(&self) -> usize {
        self.priors.len()
    }

    pub fn priors(&self) -> &Arc<BoxPriorSet> {
        &self.priors
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    pub fn store(&self) -> &Arc<DetectionStore> {
        &self.store
    }

    /// Decode, suppress and publish one inference output.
    ///
    /// A frame that violates the size contract is skipped: the error is
    /// logged and returned, and the previously published list stays visible.
    pub fn on_detection_frame(&mut self, frame: &RawDetectionFrame) -> Result<usize> {
        match self.process(frame) {
            Ok(list) => {
                let count = list.len();
                self.store.publish(list);
                self.stats.published += 1;
                Ok(count)
            }
            Err(e) => {
                self.stats.skipped += 1;
                log::warn!("{} detection cycle skipped: {}", self.model, e);
                Err(e)
            }
        }
    }

    /// Same as [`Self::on_detection_frame`] for the two raw tensor memories.
    pub fn on_tensor_buffers(&mut self, boxes: &[u8], scores: &[u8]) -> Result<usize> {
        match RawDetectionFrame::from_le_bytes(boxes, scores, self.priors.len(), self.label_count) {
            Ok(frame) => self.on_detection_frame(&frame),
            Err(e) => {
                self.stats.skipped += 1;
                log::warn!("{} detection cycle skipped: {}", self.model, e);
                Err(e)
            }
        }
    }

    fn process(&self, frame: &RawDetectionFrame) -> Result<DetectionList> {
        if frame.label_count() != self.label_count {
            bail!(
                "contract: {} frame carries {} classes, expected {}",
                self.model,
                frame.label_count(),
                self.label_count
            );
        }
        let candidates = self.decoder.decode(frame, &self.priors)?;
        Ok(self.suppressor.suppress(candidates, &self.labels))
    }
}

/// What one render cycle saw and did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub faces: FaceSelection,
    pub hands: Vec<HandReport>,
    /// Angles after the cycle; unchanged when no face was selected.
    pub state: TrackerState,
    /// True when the actuator was written this cycle.
    pub actuated: bool,
    pub face_generation: u64,
    pub hand_generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HandReport {
    pub image_box: crate::track::ImageBox,
    pub caution: bool,
}

impl From<HandProximity> for HandReport {
    fn from(h: HandProximity) -> Self {
        Self {
            image_box: h.image_box,
            caution: h.caution,
        }
    }
}

impl CycleReport {
    pub fn caution_count(&self) -> usize {
        self.hands.iter().filter(|h| h.caution).count()
    }
}

/// Consumer side: selection, control and proximity for each output frame.
pub struct RenderTracker<A: Actuator> {
    faces: Arc<DetectionStore>,
    hands: Arc<DetectionStore>,
    face_labels: Arc<LabelTable>,
    hand_labels: Arc<LabelTable>,
    selector: TargetSelector,
    controller: TrackingController<A>,
    proximity: ProximityEvaluator,
    cycles: u64,
}

impl<A: Actuator> RenderTracker<A> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        faces: Arc<DetectionStore>,
        hands: Arc<DetectionStore>,
        face_labels: Arc<LabelTable>,
        hand_labels: Arc<LabelTable>,
        selector: TargetSelector,
        controller: TrackingController<A>,
        proximity: ProximityEvaluator,
    ) -> Result<Self> {
        if faces.model() != Model::Face || hands.model() != Model::Hand {
            return Err(anyhow!("render tracker needs the face store and the hand store"));
        }
        Ok(Self {
            faces,
            hands,
            face_labels,
            hand_labels,
            selector,
            controller,
            proximity,
            cycles: 0,
        })
    }

    pub fn state(&self) -> TrackerState {
        self.controller.state()
    }

    pub fn controller(&self) -> &TrackingController<A> {
        &self.controller
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one render cycle.
    ///
    /// Actuator errors are returned as-is; the tracker does not retry.
    pub fn render_cycle(&mut self, overlay: &mut dyn OverlaySink) -> Result<CycleReport> {
        let faces = self.faces.snapshot();
        let hands = self.hands.snapshot();
        self.cycles += 1;

        let selection = self.selector.select(faces.detections());
        let actuated = match selection.target_box() {
            Some(target) => {
                self.controller.track(target)?;
                true
            }
            None => false,
        };

        let face_targets: Vec<OverlayTarget> = faces
            .detections()
            .iter()
            .zip(&selection.boxes)
            .enumerate()
            .map(|(idx, (det, image_box))| OverlayTarget {
                label: self.face_labels.display(det.class_id),
                image_box: *image_box,
                tracked: selection.target == Some(idx),
                caution: false,
            })
            .collect();
        overlay.render_targets(Model::Face, &face_targets)?;

        let hand_flags = self.proximity.evaluate(hands.detections(), &selection.boxes);
        let hand_targets: Vec<OverlayTarget> = hands
            .detections()
            .iter()
            .zip(&hand_flags)
            .map(|(det, flag)| OverlayTarget {
                label: self.hand_labels.display(det.class_id),
                image_box: flag.image_box,
                tracked: false,
                caution: flag.caution,
            })
            .collect();
        overlay.render_targets(Model::Hand, &hand_targets)?;

        Ok(CycleReport {
            faces: selection,
            hands: hand_flags.into_iter().map(HandReport::from).collect(),
            state: self.controller.state(),
            actuated,
            face_generation: faces.generation,
            hand_generation: hands.generation,
        })
    }
}

/// Everything `build` wires together.
pub struct PipelineParts<A: Actuator> {
    pub face: DetectionProducer,
    pub hand: DetectionProducer,
    pub tracker: RenderTracker<A>,
}

/// Wire producers, stores and the render tracker from a validated config.
///
/// Fails fast when the prior table does not match `model.detection_max` or a
/// label table is shorter than its model's class count.
pub fn build<A: Actuator>(
    config: &TrackerConfig,
    priors: BoxPriorSet,
    face_labels: LabelTable,
    hand_labels: LabelTable,
    actuator: A,
) -> Result<PipelineParts<A>> {
    if priors.len() != config.model.detection_max {
        bail!(
            "contract: prior table has {} anchors, config expects {}",
            priors.len(),
            config.model.detection_max
        );
    }
    let priors = Arc::new(priors);
    let face_labels = Arc::new(face_labels);
    let hand_labels = Arc::new(hand_labels);
    let face_store = Arc::new(DetectionStore::new(Model::Face));
    let hand_store = Arc::new(DetectionStore::new(Model::Hand));

    let decoder = config.decoder();
    let suppressor = config.suppressor();

    let face = DetectionProducer::new(
        Model::Face,
        config.model.face_label_count,
        decoder.clone(),
        suppressor.clone(),
        Arc::clone(&priors),
        Arc::clone(&face_labels),
        Arc::clone(&face_store),
    )?;
    let hand = DetectionProducer::new(
        Model::Hand,
        config.model.hand_label_count,
        decoder,
        suppressor,
        Arc::clone(&priors),
        Arc::clone(&hand_labels),
        Arc::clone(&hand_store),
    )?;

    let scale = config.frame_scale();
    let max_objects = config.tracking.max_object_detection;
    let controller = TrackingController::new(config.tracking.control, scale, actuator)?;
    let tracker = RenderTracker::new(
        face_store,
        hand_store,
        face_labels,
        hand_labels,
        TargetSelector::new(max_objects, scale),
        controller,
        ProximityEvaluator::new(max_objects + 1, config.tracking.proximity_margin_px, scale),
    )?;

    Ok(PipelineParts {
        face,
        hand,
        tracker,
    })
}
