//! trackerd - face tracking daemon
//!
//! This daemon:
//! 1. Loads config, box priors and label tables
//! 2. Runs one producer thread per detector over its configured source
//! 3. Runs the render cycle at the video frame rate: select a face, steer
//!    the servos, flag hands near faces
//! 4. Stops on Ctrl-C, when both sources are exhausted, or on actuator failure

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use servo_tracker::detect::{BoxPriorSet, LabelTable};
use servo_tracker::ingest::{open_source, FrameSource};
use servo_tracker::pipeline::{build, DetectionProducer, ProducerStats};
use servo_tracker::{LogActuator, LogOverlay, TrackerConfig};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,
    /// Stop after this many render cycles.
    #[arg(long)]
    max_cycles: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = TrackerConfig::load_with(args.config.as_deref())?;

    let priors = BoxPriorSet::load(&config.resources.priors_path, config.model.detection_max)?;
    let face_labels = LabelTable::load(&config.resources.face_labels_path)?;
    let hand_labels = LabelTable::load(&config.resources.hand_labels_path)?;

    let actuator = LogActuator::new(config.tracking.channels);
    let parts = build(&config, priors, face_labels, hand_labels, actuator)?;
    let mut tracker = parts.tracker;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    }

    let face_source = open_source(
        &config.sources.face,
        parts.face.model(),
        parts.face.label_count(),
        Arc::clone(parts.face.priors()),
        Arc::clone(&running),
    )?;
    let hand_source = open_source(
        &config.sources.hand,
        parts.hand.model(),
        parts.hand.label_count(),
        Arc::clone(parts.hand.priors()),
        Arc::clone(&running),
    )?;

    let frame_interval = Duration::from_secs(1) / config.video.fps;
    let producers = vec![
        spawn_producer(parts.face, face_source, frame_interval, Arc::clone(&running))?,
        spawn_producer(parts.hand, hand_source, frame_interval, Arc::clone(&running))?,
    ];

    log::info!(
        "trackerd running. video {}x{} @ {} fps, face={} hand={}",
        config.video.width,
        config.video.height,
        config.video.fps,
        config.sources.face,
        config.sources.hand
    );

    let mut overlay = LogOverlay::new();
    let mut last_health_log = Instant::now();
    let mut cautions = 0u64;
    let mut outcome = Ok(());

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();

        match tracker.render_cycle(&mut overlay) {
            Ok(report) => cautions += report.caution_count() as u64,
            Err(e) => {
                log::error!("render cycle failed: {}", e);
                outcome = Err(e);
                break;
            }
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let state = tracker.state();
            log::info!(
                "cycles={} pan={:.1} tilt={:.1} servo_writes={} cautions={}",
                tracker.cycles(),
                state.pan(),
                state.tilt(),
                tracker.controller().actuator().commands(),
                cautions
            );
            last_health_log = Instant::now();
        }

        if args.max_cycles.is_some_and(|max| tracker.cycles() >= max) {
            log::info!("reached {} render cycles", tracker.cycles());
            break;
        }
        if producers.iter().all(|p| p.is_finished()) {
            log::info!("both detection sources exhausted");
            break;
        }

        if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }

    running.store(false, Ordering::SeqCst);
    for handle in producers {
        match handle.join() {
            Ok(stats) => log::info!(
                "producer stopped: published={} skipped={}",
                stats.published,
                stats.skipped
            ),
            Err(_) => log::error!("producer thread panicked"),
        }
    }
    log::info!("trackerd stopped after {} cycles", tracker.cycles());
    outcome
}

fn spawn_producer(
    mut producer: DetectionProducer,
    mut source: Box<dyn FrameSource>,
    frame_interval: Duration,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<ProducerStats>> {
    let name = format!("{}-producer", producer.model());
    let handle = thread::Builder::new().name(name).spawn(move || {
        while running.load(Ordering::SeqCst) {
            let started = Instant::now();
            match source.next_frame() {
                // Rejected frames are logged and counted by the producer.
                Ok(Some(frame)) => {
                    let _ = producer.on_detection_frame(&frame);
                }
                Ok(None) => {
                    log::info!("{}: end of stream", source.name());
                    break;
                }
                Err(e) => {
                    log::error!("{}: source failed: {}", source.name(), e);
                    break;
                }
            }
            if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
        producer.stats()
    })?;
    Ok(handle)
}
