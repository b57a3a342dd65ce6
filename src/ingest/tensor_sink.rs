//! GStreamer appsink carrying raw detector tensors.
//!
//! The launch line must end in an `appsink name=tensor_sink`. Each buffer holds
//! two memories: the box tensor first, then the score tensor.

use anyhow::{anyhow, Context, Result};
use gstreamer::prelude::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::detect::RawDetectionFrame;
use crate::ingest::{poll_while_running, FrameSource, Poll};

const SINK_NAME: &str = "tensor_sink";
const PULL_TIMEOUT_MS: u64 = 500;

pub struct TensorSinkSource {
    name: String,
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    detection_max: usize,
    label_count: usize,
    playing: bool,
    eos: bool,
    frame_count: u64,
    running: Arc<AtomicBool>,
}

impl TensorSinkSource {
    /// `next_frame` stops waiting and reports end of stream once `running` is cleared.
    pub fn new(
        launch: &str,
        detection_max: usize,
        label_count: usize,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        gstreamer::init().context("initialize gstreamer")?;

        let pipeline = gstreamer::parse_launch(launch)
            .context("build tensor pipeline")?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow!("tensor pipeline is not a Pipeline"))?;

        let appsink = pipeline
            .by_name(SINK_NAME)
            .with_context(|| format!("{} element missing from pipeline", SINK_NAME))?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| anyhow!("{} element has unexpected type", SINK_NAME))?;
        appsink.set_max_buffers(1);
        appsink.set_drop(true);
        appsink.set_sync(false);

        Ok(Self {
            name: format!("gst:{}", launch),
            pipeline,
            appsink,
            detection_max,
            label_count,
            playing: false,
            eos: false,
            frame_count: 0,
            running,
        })
    }

    pub fn frames_pulled(&self) -> u64 {
        self.frame_count
    }

    fn start(&mut self) -> Result<()> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .context("set tensor pipeline to Playing")?;
        self.playing = true;
        log::info!("TensorSinkSource: playing {}", self.name);
        Ok(())
    }

    fn poll_bus(&mut self) -> Result<()> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };
        while let Some(message) = bus.timed_pop(gstreamer::ClockTime::ZERO) {
            use gstreamer::MessageView;
            match message.view() {
                MessageView::Error(err) => {
                    return Err(anyhow!(
                        "gstreamer error from {:?}: {}",
                        err.src().map(|s| s.path_string()),
                        err.error()
                    ));
                }
                MessageView::Eos(..) => self.eos = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// One bounded wait on the appsink.
    fn poll_once(&mut self) -> Result<Poll> {
        self.poll_bus()?;
        if self.eos || self.appsink.is_eos() {
            return Ok(Poll::Ended);
        }
        let Some(sample) = self
            .appsink
            .try_pull_sample(gstreamer::ClockTime::from_mseconds(PULL_TIMEOUT_MS))
        else {
            return Ok(Poll::Pending);
        };
        match self.sample_to_frame(&sample)? {
            Some(frame) => {
                self.frame_count += 1;
                Ok(Poll::Frame(frame))
            }
            None => Ok(Poll::Pending),
        }
    }

    /// Copy both tensors out of a sample. `None` when the buffer layout is not boxes + scores.
    fn sample_to_frame(&self, sample: &gstreamer::Sample) -> Result<Option<RawDetectionFrame>> {
        let buffer = sample.buffer().context("tensor sample has no buffer")?;
        if buffer.n_memory() != 2 {
            log::warn!(
                "{}: buffer carries {} memories, expected 2; skipped",
                self.name,
                buffer.n_memory()
            );
            return Ok(None);
        }
        let boxes = buffer.peek_memory(0).map_readable().context("map box tensor")?;
        let scores = buffer.peek_memory(1).map_readable().context("map score tensor")?;
        RawDetectionFrame::from_le_bytes(
            boxes.as_slice(),
            scores.as_slice(),
            self.detection_max,
            self.label_count,
        )
        .map(Some)
    }
}

impl FrameSource for TensorSinkSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<Option<RawDetectionFrame>> {
        if !self.playing {
            self.start()?;
        }
        let running = Arc::clone(&self.running);
        poll_while_running(&running, || self.poll_once())
    }
}

impl Drop for TensorSinkSource {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            log::warn!("TensorSinkSource: failed to stop pipeline: {}", e);
        }
    }
}
