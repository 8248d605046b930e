//! User-tunable settings document.
//!
//! The settings file is owned by the outer application; the core loads it
//! once at startup and passes explicit values into each component. A
//! corrupt file is backed up (`.bak`, `.bak1`, ...) and replaced with
//! defaults rather than aborting.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use laser_arcade_calib::CalibrationSessionParams;
use laser_arcade_core::DwellParams;
use laser_arcade_detect::{LaserDetectorParams, SmootherParams};

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Capture device configuration, applied by the capture collaborator.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CameraSettings {
    pub device_index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// All tunables, constructed once and passed into each component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub screen_width: u32,
    pub screen_height: u32,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub detector: LaserDetectorParams,
    #[serde(default)]
    pub smoother: SmootherParams,
    #[serde(default)]
    pub dwell: DwellParams,
    #[serde(default)]
    pub calibration: CalibrationSessionParams,
    #[serde(default)]
    pub debug_overlay: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screen_width: 1024,
            screen_height: 768,
            camera: CameraSettings::default(),
            detector: LaserDetectorParams::default(),
            smoother: SmootherParams::default(),
            dwell: DwellParams::default(),
            calibration: CalibrationSessionParams::default(),
            debug_overlay: false,
        }
    }
}

impl Settings {
    /// `~/.laser_arcade/settings.json`, falling back to the working
    /// directory when no home is available.
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".laser_arcade")
            .join("settings.json")
    }

    /// Load a JSON settings document from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this document to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load settings, recovering from a missing or corrupt file.
    ///
    /// A file that fails to parse is moved aside to a `.bak` sibling and
    /// defaults are written in its place, so a bad edit never takes the
    /// session down.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load_json(path) {
                Ok(settings) => return settings,
                Err(err) => {
                    warn!("settings file unreadable, restoring defaults: {err}");
                    backup_corrupt_file(path);
                }
            }
        }
        let settings = Self::default();
        if let Err(err) = settings.write_json(path) {
            warn!("could not write default settings to {}: {err}", path.display());
        } else {
            info!("wrote default settings to {}", path.display());
        }
        settings
    }
}

/// Move a corrupt file to the first free `.bak` / `.bakN` sibling.
fn backup_corrupt_file(path: &Path) {
    let mut backup = path.with_extension("json.bak");
    let mut counter = 1;
    while backup.exists() {
        backup = path.with_extension(format!("json.bak{counter}"));
        counter += 1;
    }
    match fs::rename(path, &backup) {
        Ok(()) => info!("backed up corrupt file to {}", backup.display()),
        Err(err) => warn!("could not back up {}: {err}", path.display()),
    }
}
