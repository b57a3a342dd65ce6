use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use servo_tracker::config::TrackerConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "TRACKER_CONFIG",
        "TRACKER_PRIORS_PATH",
        "TRACKER_FACE_LABELS",
        "TRACKER_HAND_LABELS",
        "TRACKER_FACE_SOURCE",
        "TRACKER_HAND_SOURCE",
        "TRACKER_VIDEO_FPS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "model": { "detection_max": 100, "face_label_count": 3 },
        "video": { "width": 1280, "height": 720, "fps": 30 },
        "thresholds": { "score": 0.6, "suppressed_label": "background" },
        "tracking": {
            "gain_divisor": 90.0,
            "tilt_max": 120.0,
            "pan_channel": 4,
            "tilt_channel": 5
        },
        "resources": { "priors_path": "/opt/models/priors.txt" },
        "sources": { "face": "/var/lib/tracker/face.bin" }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("TRACKER_CONFIG", file.path());
    std::env::set_var("TRACKER_HAND_SOURCE", "stub://left_hand");
    std::env::set_var("TRACKER_VIDEO_FPS", "12");

    let cfg = TrackerConfig::load().expect("load config");

    assert_eq!(cfg.model.detection_max, 100);
    assert_eq!(cfg.model.face_label_count, 3);
    assert_eq!(cfg.model.hand_label_count, 2);
    assert_eq!((cfg.video.width, cfg.video.height), (1280, 720));
    assert_eq!(cfg.video.fps, 12);
    assert_eq!(cfg.thresholds.score, 0.6);
    assert_eq!(cfg.thresholds.iou, 0.5);
    assert_eq!(cfg.thresholds.suppressed_label, "background");
    assert_eq!(cfg.tracking.control.gain_divisor, 90.0);
    assert_eq!(cfg.tracking.control.tilt_max, 120.0);
    assert_eq!(cfg.tracking.control.pan_max, 180.0);
    assert_eq!((cfg.tracking.channels.pan, cfg.tracking.channels.tilt), (4, 5));
    assert_eq!(cfg.resources.priors_path, PathBuf::from("/opt/models/priors.txt"));
    assert_eq!(
        cfg.resources.face_labels_path,
        PathBuf::from("tflite_model/labels_face.txt")
    );
    assert_eq!(cfg.sources.face, "/var/lib/tracker/face.bin");
    assert_eq!(cfg.sources.hand, "stub://left_hand");
    assert_eq!(cfg.frame_scale().video_width, 1280);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
[video]
fps = 25

[tracking]
deadband_px = 8.0
proximity_margin_px = 30.0

[sources]
hand = "stub://right_hand"
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = TrackerConfig::load_with(Some(file.path())).expect("load config");

    assert_eq!(cfg.video.fps, 25);
    assert_eq!(cfg.tracking.control.deadband_px, 8.0);
    assert_eq!(cfg.tracking.proximity_margin_px, 30.0);
    assert_eq!(cfg.sources.face, "stub://face");
    assert_eq!(cfg.sources.hand, "stub://right_hand");

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = TrackerConfig::load().expect("load defaults");
    assert_eq!(cfg, TrackerConfig::default());
    assert_eq!(cfg.video.fps, 15);
    assert_eq!(cfg.model.detection_max, 1917);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "tracking": { "pan_channel": 1, "tilt_channel": 1 } }"#)
        .expect("write config");
    let err = TrackerConfig::from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("different servo channels"));

    std::env::set_var("TRACKER_VIDEO_FPS", "fast");
    assert!(TrackerConfig::load().is_err());
    std::env::set_var("TRACKER_VIDEO_FPS", "0");
    assert!(TrackerConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_malformed_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    let err = TrackerConfig::load_with(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}
