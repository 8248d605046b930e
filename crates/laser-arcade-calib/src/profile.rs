use std::time::{SystemTime, UNIX_EPOCH};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use laser_arcade_core::{fit_homography, mean_reprojection_error, Homography};

use crate::error::CalibrationError;

/// Fixed calibration targets, in acquisition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetLabel {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    Center,
}

impl TargetLabel {
    pub const ORDER: [TargetLabel; 5] = [
        TargetLabel::TopLeft,
        TargetLabel::TopRight,
        TargetLabel::BottomRight,
        TargetLabel::BottomLeft,
        TargetLabel::Center,
    ];
}

/// One camera/screen correspondence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub camera: Point2<f32>,
    pub screen: Point2<f32>,
    pub label: TargetLabel,
}

/// Screen-space placement of the 5 calibration targets, inset from the
/// canvas edges so the markers stay fully visible on the projection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CalibrationLayout {
    pub width: f32,
    pub height: f32,
    pub inset: f32,
}

impl CalibrationLayout {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            inset: 24.0,
        }
    }

    pub fn with_inset(width: f32, height: f32, inset: f32) -> Self {
        Self {
            width,
            height,
            inset,
        }
    }

    pub fn target(&self, label: TargetLabel) -> Point2<f32> {
        let left = self.inset;
        let right = self.width - 1.0 - self.inset;
        let top = self.inset;
        let bottom = self.height - 1.0 - self.inset;
        match label {
            TargetLabel::TopLeft => Point2::new(left, top),
            TargetLabel::TopRight => Point2::new(right, top),
            TargetLabel::BottomRight => Point2::new(right, bottom),
            TargetLabel::BottomLeft => Point2::new(left, bottom),
            TargetLabel::Center => Point2::new(self.width / 2.0, self.height / 2.0),
        }
    }
}

/// A fitted camera-to-screen calibration.
#[derive(Clone, Debug)]
pub struct CalibrationProfile {
    pub points: [CalibrationPoint; 5],
    pub homography: Homography,
    /// Mean reprojection error over the 5 correspondences, screen pixels.
    pub residual: f64,
    /// Unix seconds at fit time.
    pub created_unix_s: u64,
}

impl CalibrationProfile {
    /// Fit a projective transform from 5 correspondences.
    ///
    /// Fails `Degenerate` if any 3 camera points are collinear and
    /// `ResidualTooLarge` if the least-squares fit does not reproduce its
    /// own correspondences within `residual_tolerance_px`.
    pub fn fit(
        points: [CalibrationPoint; 5],
        residual_tolerance_px: f64,
    ) -> Result<Self, CalibrationError> {
        let camera: Vec<Point2<f32>> = points.iter().map(|p| p.camera).collect();
        let screen: Vec<Point2<f32>> = points.iter().map(|p| p.screen).collect();

        let homography = fit_homography(&camera, &screen)?;
        let residual = mean_reprojection_error(&homography, &camera, &screen);
        if residual > residual_tolerance_px {
            return Err(CalibrationError::ResidualTooLarge {
                residual,
                tolerance: residual_tolerance_px,
            });
        }

        Ok(Self {
            points,
            homography,
            residual,
            created_unix_s: unix_now(),
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Shared fixture for this crate's tests.
#[cfg(test)]
pub(crate) fn well_spread_points() -> [CalibrationPoint; 5] {
    let camera = [
        Point2::new(100.0, 100.0),
        Point2::new(540.0, 100.0),
        Point2::new(540.0, 380.0),
        Point2::new(100.0, 380.0),
        Point2::new(320.0, 240.0),
    ];
    let screen = [
        Point2::new(0.0, 0.0),
        Point2::new(1024.0, 0.0),
        Point2::new(1024.0, 768.0),
        Point2::new(0.0, 768.0),
        Point2::new(512.0, 384.0),
    ];
    let mut out = [CalibrationPoint {
        camera: camera[0],
        screen: screen[0],
        label: TargetLabel::TopLeft,
    }; 5];
    for i in 0..5 {
        out[i] = CalibrationPoint {
            camera: camera[i],
            screen: screen[i],
            label: TargetLabel::ORDER[i],
        };
    }
    out
}
