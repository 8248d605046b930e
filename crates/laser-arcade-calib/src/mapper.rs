use nalgebra::Point2;

use crate::profile::CalibrationProfile;

/// Applies the active calibration to live camera-space points.
///
/// Without a profile the laser channel cannot produce a screen
/// coordinate at all; `map` returns `None` and the caller treats the
/// laser source as inactive until a profile exists.
#[derive(Clone, Debug, Default)]
pub struct CoordinateMapper {
    profile: Option<CalibrationProfile>,
}

impl CoordinateMapper {
    pub fn uncalibrated() -> Self {
        Self { profile: None }
    }

    pub fn with_profile(profile: CalibrationProfile) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    /// Replace the active profile (successful recalibration).
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.profile = Some(profile);
    }

    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.profile.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.profile.is_some()
    }

    /// Map a camera-space point to screen space.
    ///
    /// `None` means either "no profile" or a degenerate homogeneous
    /// divide for points far outside the calibrated domain; both report
    /// as no detection rather than an extreme coordinate.
    pub fn map(&self, camera: Point2<f32>) -> Option<Point2<f32>> {
        self.profile.as_ref()?.homography.apply_checked(camera)
    }
}
