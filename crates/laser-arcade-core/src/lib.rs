//! Core types and utilities for laser pointer tracking.
//!
//! This crate is intentionally small and purely geometric/temporal. It does
//! *not* depend on any capture device, detector, or pipeline: frames are
//! borrowed pixel views, the homography knows nothing about calibration
//! acquisition, and the dwell machine is a plain state machine over
//! wall-clock instants.

mod dwell;
mod homography;
mod image;
mod logger;

pub use dwell::{DwellDetector, DwellParams, DwellPhase, DwellUpdate};
pub use homography::{
    any_three_collinear, fit_homography, mean_reprojection_error, Homography, HomographyFitError,
};
pub use image::RgbFrameView;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
