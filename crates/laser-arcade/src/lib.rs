//! High-level facade crate for the `laser-arcade-*` workspace.
//!
//! This crate wires the perception components into one tick-driven
//! pipeline and provides:
//! - stable re-exports of the underlying crates
//! - the settings document shared with the presentation layer
//! - the frame-source seam with its retry/fallback policy
//! - pointer fusion (laser over mouse) and click routing
//! - the app capability trait consumers implement
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::time::Instant;
//! use laser_arcade::{Pipeline, Settings};
//! use laser_arcade::frame::NoCamera;
//!
//! let settings = Settings::default();
//! // No capture device attached: the pointer is mouse-driven from the
//! // first tick and calibration is unavailable.
//! let mut pipeline = Pipeline::new(settings, NoCamera);
//! let out = pipeline.tick(Some(nalgebra::Point2::new(10.0, 10.0)), Instant::now());
//! assert!(out.click.is_none());
//! ```
//!
//! ## API map
//! - `laser_arcade::core`: homography, dwell machine, frame views.
//! - `laser_arcade::detect`: HSV segmentation, blobs, smoothing.
//! - `laser_arcade::calib`: acquisition, fitting, persistence, mapping.
//! - `laser_arcade::{Pipeline, Settings, PointerApp}`: the glue.

pub use laser_arcade_calib as calib;
pub use laser_arcade_core as core;
pub use laser_arcade_detect as detect;

pub mod apps;
pub mod frame;
pub mod fusion;
pub mod pipeline;
pub mod settings;

pub use apps::{AppRegistry, PointerApp};
pub use frame::{CameraError, Frame, FrameFeed, FrameOrigin, FrameSource};
pub use fusion::{ClickEvent, PointerEvent, PointerEventKind, PointerFusion, PointerSource, PointerState};
pub use pipeline::{CalibrationStatus, Pipeline, TickOutput};
pub use settings::{Settings, SettingsError};

pub use laser_arcade_calib::{
    CalibrationError, CalibrationLayout, CalibrationProfile, CoordinateMapper, ProfileError,
    ProfileStore,
};
pub use laser_arcade_core::{DwellParams, DwellPhase};
pub use laser_arcade_detect::{LaserDetectorParams, SmootherParams};
