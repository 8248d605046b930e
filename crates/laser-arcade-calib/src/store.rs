//! Calibration profile persistence.
//!
//! The profile lives at a fixed per-user path as a versioned JSON
//! document. Saves go through a temp file in the same directory followed
//! by a rename, so a crash mid-write never corrupts the active profile.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use laser_arcade_core::{any_three_collinear, mean_reprojection_error, Homography};

use crate::error::ProfileError;
use crate::profile::{CalibrationPoint, CalibrationProfile, TargetLabel};

pub const PROFILE_VERSION: u32 = 1;

/// Residual bound applied when re-validating a loaded profile. Looser
/// than the acquisition tolerance so rounding in the stored coefficients
/// cannot invalidate a good profile.
const LOAD_RESIDUAL_TOLERANCE_PX: f64 = 5.0;

#[derive(Debug, Serialize, Deserialize)]
struct CorrespondenceDoc {
    camera_x: f32,
    camera_y: f32,
    screen_x: f32,
    screen_y: f32,
    label: TargetLabel,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileDocument {
    version: u32,
    points: Vec<CorrespondenceDoc>,
    homography: [[f64; 3]; 3],
    residual: f64,
    created_unix_s: u64,
}

/// Fixed-path profile storage.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.laser_arcade/calibration.json`, falling back to the working
    /// directory when no home is available.
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".laser_arcade")
            .join("calibration.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the stored profile.
    ///
    /// Any failure here means "uncalibrated at startup", never an abort.
    pub fn load(&self) -> Result<CalibrationProfile, ProfileError> {
        let raw = fs::read_to_string(&self.path)?;
        let doc: ProfileDocument = serde_json::from_str(&raw)?;
        if doc.version != PROFILE_VERSION {
            return Err(ProfileError::Version(doc.version));
        }

        let points: [CalibrationPoint; 5] = doc
            .points
            .iter()
            .map(|p| CalibrationPoint {
                camera: Point2::new(p.camera_x, p.camera_y),
                screen: Point2::new(p.screen_x, p.screen_y),
                label: p.label,
            })
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| {
                ProfileError::Invalid(format!("expected 5 correspondences, got {}", doc.points.len()))
            })?;

        let homography = Homography::from_rows(doc.homography);
        if !homography.h.iter().all(|c| c.is_finite()) {
            return Err(ProfileError::Invalid("non-finite coefficients".into()));
        }

        let camera: Vec<Point2<f32>> = points.iter().map(|p| p.camera).collect();
        let screen: Vec<Point2<f32>> = points.iter().map(|p| p.screen).collect();
        if any_three_collinear(&camera) {
            return Err(ProfileError::Invalid("collinear camera points".into()));
        }
        let residual = mean_reprojection_error(&homography, &camera, &screen);
        if residual > LOAD_RESIDUAL_TOLERANCE_PX {
            return Err(ProfileError::Invalid(format!(
                "stored transform does not reproduce its correspondences ({residual:.2}px)"
            )));
        }

        debug!(
            "loaded calibration profile from {} (residual {:.2}px)",
            self.path.display(),
            residual
        );
        Ok(CalibrationProfile {
            points,
            homography,
            residual: doc.residual,
            created_unix_s: doc.created_unix_s,
        })
    }

    /// Persist the profile with an atomic replace.
    pub fn save(&self, profile: &CalibrationProfile) -> Result<(), ProfileError> {
        let doc = ProfileDocument {
            version: PROFILE_VERSION,
            points: profile
                .points
                .iter()
                .map(|p| CorrespondenceDoc {
                    camera_x: p.camera.x,
                    camera_y: p.camera.y,
                    screen_x: p.screen.x,
                    screen_y: p.screen.y,
                    label: p.label,
                })
                .collect(),
            homography: profile.homography.to_rows(),
            residual: profile.residual,
            created_unix_s: profile.created_unix_s,
        };
        let json = serde_json::to_string_pretty(&doc)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            // Leave no stale temp file behind on a failed replace.
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!("could not remove temp profile {}: {}", tmp.display(), cleanup);
            }
            return Err(err.into());
        }
        debug!("saved calibration profile to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "calibration.json".to_string());
        self.path.with_file_name(format!("{name}.tmp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::well_spread_points;

    fn fitted_profile() -> CalibrationProfile {
        CalibrationProfile::fit(well_spread_points(), 3.0).expect("fit")
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path().join("calibration.json"));
        let profile = fitted_profile();

        store.save(&profile).expect("save");
        let loaded = store.load().expect("load");

        assert_eq!(loaded.created_unix_s, profile.created_unix_s);
        assert_eq!(loaded.points, profile.points);
        for (a, b) in loaded
            .homography
            .to_rows()
            .iter()
            .flatten()
            .zip(profile.homography.to_rows().iter().flatten())
        {
            assert!((a - b).abs() < 1e-9);
        }
        // No temp file left behind
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path().join("nested/deeper/calibration.json"));
        store.save(&fitted_profile()).expect("save");
        assert!(store.path().exists());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path().join("calibration.json"));
        assert!(matches!(store.load(), Err(ProfileError::Io(_))));
    }

    #[test]
    fn corrupt_json_is_a_json_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("calibration.json");
        fs::write(&path, "{ not json").expect("write");
        let store = ProfileStore::new(path);
        assert!(matches!(store.load(), Err(ProfileError::Json(_))));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path().join("calibration.json"));
        store.save(&fitted_profile()).expect("save");

        let raw = fs::read_to_string(store.path()).expect("read");
        let bumped = raw.replacen("\"version\": 1", "\"version\": 99", 1);
        fs::write(store.path(), bumped).expect("write");

        assert!(matches!(store.load(), Err(ProfileError::Version(99))));
    }

    #[test]
    fn tampered_correspondences_fail_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path().join("calibration.json"));
        let mut profile = fitted_profile();
        // Break the transform so it no longer reproduces the points
        profile.homography.h[(0, 2)] += 500.0;
        store.save(&profile).expect("save");

        assert!(matches!(store.load(), Err(ProfileError::Invalid(_))));
    }
}
