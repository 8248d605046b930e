use std::{env, fs, path::PathBuf, str::FromStr};

use image::ImageReader;
use log::{info, warn, LevelFilter};
use serde::{Deserialize, Serialize};

use laser_arcade_core::{init_with_level, RgbFrameView};
use laser_arcade_detect::{DetectionResult, LaserDetector, LaserDetectorParams};

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    image_path: String,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    detector: LaserDetectorParams,
}

#[derive(Debug, Serialize)]
struct ExampleReport {
    image_path: String,
    config_path: String,
    detection: DetectionResult,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = LevelFilter::from_str("info").unwrap_or(LevelFilter::Info);
    init_with_level(log_level)?;

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("testdata/detect_frame_config.json"));
    let raw = fs::read_to_string(&config_path)?;
    let cfg: ExampleConfig = serde_json::from_str(&raw)?;

    let img = ImageReader::open(&cfg.image_path)?.decode()?.to_rgb8();
    let view = RgbFrameView::new(img.width() as usize, img.height() as usize, img.as_raw())
        .ok_or("image buffer size mismatch")?;

    let mut detector = LaserDetector::new(cfg.detector.clone());
    let detection = detector.detect(&view);
    match detection.point {
        Some(p) => info!(
            "laser spot at ({:.1}, {:.1}), confidence {:.2}",
            p.x, p.y, detection.confidence
        ),
        None => warn!("no laser spot detected"),
    }

    let report = ExampleReport {
        image_path: cfg.image_path.clone(),
        config_path: config_path.to_string_lossy().into_owned(),
        detection,
    };
    let out_path = cfg
        .output_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tmpdata/detect_frame_report.json"));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_path, serde_json::to_string_pretty(&report)?)?;
    println!("wrote report JSON to {}", out_path.display());
    Ok(())
}
