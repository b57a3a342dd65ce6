//! decode_frame - decode one recorded detector output and print the detections

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use servo_tracker::config::TrackerConfig;
use servo_tracker::detect::{BoxPriorSet, Detection, LabelTable};
use servo_tracker::ingest::{FileSource, FrameSource};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config of the deployment that made the recording; decode constants,
    /// thresholds and resource paths come from here.
    #[arg(long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,
    /// Recorded frame stream.
    #[arg(long)]
    input: PathBuf,
    /// Zero-based record to decode.
    #[arg(long, default_value_t = 0)]
    record: u64,
    /// The recording comes from the hand model instead of the face model.
    #[arg(long)]
    hand: bool,
    /// Box prior table; overrides the configured path.
    #[arg(long)]
    priors: Option<PathBuf>,
    /// Label table; overrides the configured path for the model.
    #[arg(long)]
    labels: Option<PathBuf>,
    /// Print the candidates before suppression as well.
    #[arg(long)]
    candidates: bool,
}

#[derive(Serialize)]
struct DecodedRecord<'a> {
    record: u64,
    candidates: Option<&'a [Detection]>,
    detections: Vec<LabeledDetection<'a>>,
}

#[derive(Serialize)]
struct LabeledDetection<'a> {
    label: String,
    #[serde(flatten)]
    detection: &'a Detection,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = TrackerConfig::load_with(args.config.as_deref())?;
    let detection_max = config.model.detection_max;
    let (label_count, labels_path) = if args.hand {
        (config.model.hand_label_count, &config.resources.hand_labels_path)
    } else {
        (config.model.face_label_count, &config.resources.face_labels_path)
    };

    let priors_path = args.priors.as_ref().unwrap_or(&config.resources.priors_path);
    let priors = BoxPriorSet::load(priors_path, detection_max)?;
    let labels = LabelTable::load(args.labels.as_ref().unwrap_or(labels_path))?;
    if labels.len() < label_count {
        return Err(anyhow!(
            "label table has {} entries, model has {} classes",
            labels.len(),
            label_count
        ));
    }

    let mut source = FileSource::open(&args.input, detection_max, label_count)?;
    let mut index = 0u64;
    let frame = loop {
        let frame = source
            .next_frame()?
            .ok_or_else(|| anyhow!("recording has only {} records", index))?;
        if index == args.record {
            break frame;
        }
        index += 1;
    };

    let candidates = config.decoder().decode(&frame, &priors)?;
    let detections = config.suppressor().suppress(candidates.clone(), &labels);

    let output = DecodedRecord {
        record: args.record,
        candidates: args.candidates.then_some(candidates.as_slice()),
        detections: detections
            .iter()
            .map(|detection| LabeledDetection {
                label: labels.display(detection.class_id),
                detection,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
