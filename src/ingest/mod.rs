//! Detector output sources.
//!
//! Inference itself runs outside this crate. A source hands over the two
//! output tensors of one invocation as a `RawDetectionFrame`:
//! - `stub://<name>`: synthetic frames (testing, demos)
//! - a filesystem path: a recorded stream of frame records
//! - `gst:<launch line>`: a GStreamer appsink named `tensor_sink`
//!   (feature: ingest-gstreamer)
//!
//! Sources never decode or suppress; that belongs to `DetectionProducer`.

pub mod file;
pub mod synthetic;
#[cfg(feature = "ingest-gstreamer")]
pub mod tensor_sink;

pub use file::FileSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-gstreamer")]
pub use tensor_sink::TensorSinkSource;

use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detect::{BoxPriorSet, Model, RawDetectionFrame};

pub trait FrameSource: Send {
    fn name(&self) -> &str;

    /// Next inference output, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<RawDetectionFrame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_frame(&mut self) -> Result<Option<RawDetectionFrame>> {
        (**self).next_frame()
    }
}

/// Result of one bounded wait on a live source.
#[cfg_attr(not(feature = "ingest-gstreamer"), allow(dead_code))]
pub(crate) enum Poll {
    Frame(RawDetectionFrame),
    /// Nothing arrived within the wait; try again.
    Pending,
    Ended,
}

/// Repeat `poll` until it yields a frame or the stream ends.
///
/// Returns `None` as soon as `running` is cleared, so a stalled source
/// cannot hold its producer thread past shutdown.
#[cfg_attr(not(feature = "ingest-gstreamer"), allow(dead_code))]
pub(crate) fn poll_while_running<F>(
    running: &AtomicBool,
    mut poll: F,
) -> Result<Option<RawDetectionFrame>>
where
    F: FnMut() -> Result<Poll>,
{
    while running.load(Ordering::SeqCst) {
        match poll()? {
            Poll::Frame(frame) => return Ok(Some(frame)),
            Poll::Ended => return Ok(None),
            Poll::Pending => {}
        }
    }
    Ok(None)
}

const STUB_SCHEME: &str = "stub://";
const GST_SCHEME: &str = "gst:";

/// Open the source named by a config string.
///
/// Live sources give up waiting for data once `running` is cleared.
pub fn open_source(
    source: &str,
    model: Model,
    label_count: usize,
    priors: Arc<BoxPriorSet>,
    running: Arc<AtomicBool>,
) -> Result<Box<dyn FrameSource>> {
    if source.starts_with(STUB_SCHEME) {
        let config = SyntheticConfig::new(source, model, label_count);
        return Ok(Box::new(SyntheticSource::new(config, priors)));
    }
    if let Some(launch) = source.strip_prefix(GST_SCHEME) {
        #[cfg(feature = "ingest-gstreamer")]
        {
            let source = TensorSinkSource::new(launch, priors.len(), label_count, running)?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "ingest-gstreamer"))]
        {
            let _ = (launch, running);
            anyhow::bail!("{} sources require the ingest-gstreamer feature", GST_SCHEME)
        }
    }
    let source = FileSource::open(Path::new(source), priors.len(), label_count)?;
    Ok(Box::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn stalled_source_returns_once_stopped() {
        let running = AtomicBool::new(true);
        let waits = Cell::new(0);
        let out = poll_while_running(&running, || {
            waits.set(waits.get() + 1);
            if waits.get() == 3 {
                running.store(false, Ordering::SeqCst);
            }
            Ok(Poll::Pending)
        })
        .unwrap();
        assert!(out.is_none());
        assert_eq!(waits.get(), 3);
    }

    #[test]
    fn polling_yields_first_frame_or_end() {
        let running = AtomicBool::new(true);
        let frame = RawDetectionFrame::new(vec![0.0; 4], vec![0.0, 1.0], 1, 2).unwrap();
        let mut polls = vec![Poll::Ended, Poll::Frame(frame.clone()), Poll::Pending];
        let out = poll_while_running(&running, || Ok(polls.pop().unwrap())).unwrap();
        assert_eq!(out, Some(frame));
        assert!(poll_while_running(&running, || Ok(polls.pop().unwrap())).unwrap().is_none());
    }

    #[test]
    fn stub_scheme_opens_synthetic_source() {
        let priors = Arc::new(BoxPriorSet::new(vec![0.5], vec![0.5], vec![0.2], vec![0.2], 1).unwrap());
        let mut source = open_source("stub://face", Model::Face, 2, priors, running()).unwrap();
        assert_eq!(source.name(), "stub://face");
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn missing_file_is_an_error() {
        let priors = Arc::new(BoxPriorSet::new(vec![0.5], vec![0.5], vec![0.2], vec![0.2], 1).unwrap());
        assert!(open_source("/nonexistent/recording.bin", Model::Hand, 2, priors, running()).is_err());
    }
}
