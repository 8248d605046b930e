//! The tick-driven perception pipeline.
//!
//! One logical pipeline per session: frame feed -> detector -> smoother
//! -> mapper -> fusion, advanced by a periodic tick (a new camera frame
//! or, absent a camera, a fixed-interval timer). There is no internal
//! threading; the only concurrency boundary is the frame source, which
//! hands over the newest frame and discards backlog.
//!
//! Every failure mode degrades: camera loss falls back to the mouse,
//! calibration failure keeps the previous profile, a failed profile save
//! leaves the in-memory profile active for the session.

use std::time::Instant;

use log::{info, warn};
use nalgebra::Point2;

use laser_arcade_calib::{
    CalibrationError, CalibrationLayout, CalibrationProfile, CalibrationProgress,
    CalibrationSession, CoordinateMapper, ProfileError, ProfileStore, TargetLabel,
};
use laser_arcade_detect::{LaserDetector, MaskPreview, TemporalSmoother};

use crate::frame::{CameraError, FeedStatus, FrameFeed, FrameSource};
use crate::fusion::{ClickEvent, PointerFusion, PointerState};
use crate::settings::Settings;

/// Per-tick calibration report for the presentation layer.
#[derive(Debug)]
pub enum CalibrationStatus {
    /// Waiting for a stable hold on the current target marker.
    Acquiring {
        index: usize,
        label: TargetLabel,
        target: Point2<f32>,
        dwelling: bool,
    },
    /// A target was just confirmed.
    Captured { index: usize, label: TargetLabel },
    /// Calibration finished and the new profile is active.
    Completed {
        residual: f64,
        /// Set when the profile could not be written to disk; the
        /// in-memory profile is active regardless.
        persist_error: Option<ProfileError>,
    },
    /// Calibration aborted; the previous profile remains in force.
    Failed(CalibrationError),
}

/// Output of one pipeline tick.
#[derive(Debug)]
pub struct TickOutput {
    pub pointer: PointerState,
    pub click: Option<ClickEvent>,
    pub calibration: Option<CalibrationStatus>,
}

enum Mode {
    Pointing,
    Calibrating(CalibrationSession),
}

/// The assembled pipeline.
pub struct Pipeline<S> {
    settings: Settings,
    feed: FrameFeed<S>,
    detector: LaserDetector,
    smoother: TemporalSmoother,
    mapper: CoordinateMapper,
    fusion: PointerFusion,
    mode: Mode,
    store: Option<ProfileStore>,
}

impl<S: FrameSource> Pipeline<S> {
    pub fn new(settings: Settings, source: S) -> Self {
        let mut detector_params = settings.detector.clone();
        detector_params.keep_mask_preview |= settings.debug_overlay;

        Self {
            feed: FrameFeed::new(source),
            detector: LaserDetector::new(detector_params),
            smoother: TemporalSmoother::new(settings.smoother),
            mapper: CoordinateMapper::uncalibrated(),
            fusion: PointerFusion::new(settings.dwell),
            mode: Mode::Pointing,
            store: None,
            settings,
        }
    }

    /// Attach profile persistence and load any stored profile.
    ///
    /// An invalid or missing profile means "uncalibrated at startup",
    /// never an abort.
    pub fn with_store(mut self, store: ProfileStore) -> Self {
        match store.load() {
            Ok(profile) => {
                info!(
                    "calibration profile loaded (residual {:.2}px)",
                    profile.residual
                );
                self.mapper.set_profile(profile);
            }
            Err(err) => {
                info!("starting uncalibrated: {err}");
            }
        }
        self.store = Some(store);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Activate a profile directly (tests, or a profile handed over by
    /// the outer application).
    pub fn install_profile(&mut self, profile: CalibrationProfile) {
        self.mapper.set_profile(profile);
    }

    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.mapper.profile()
    }

    pub fn is_calibrated(&self) -> bool {
        self.mapper.is_calibrated()
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.mode, Mode::Calibrating(_))
    }

    /// True once the session has permanently fallen back to mouse-only.
    pub fn camera_gone(&self) -> bool {
        self.feed.camera_gone()
    }

    /// Mask thumbnail from the most recent processed frame, when the
    /// debug overlay is enabled.
    pub fn mask_preview(&self) -> Option<&MaskPreview> {
        self.detector.mask_preview()
    }

    /// Enter calibration mode. Normal laser pointer routing is suspended
    /// until the session completes, fails, or is cancelled.
    pub fn begin_calibration(&mut self, now: Instant) -> Result<(), CameraError> {
        if self.feed.camera_gone() {
            return Err(CameraError::Unavailable(
                "cannot calibrate without a camera".into(),
            ));
        }
        let layout = CalibrationLayout::new(
            self.settings.screen_width as f32,
            self.settings.screen_height as f32,
        );
        self.mode = Mode::Calibrating(CalibrationSession::new(
            layout,
            self.settings.calibration,
            now,
        ));
        info!("calibration started");
        Ok(())
    }

    /// Request a calibration abort; the next tick reports `Failed`.
    pub fn cancel_calibration(&mut self) {
        if let Mode::Calibrating(session) = &mut self.mode {
            session.cancel();
        }
    }

    /// A direct mouse press: immediate click, dwell machine debounced.
    pub fn mouse_press(&mut self, position: Point2<f32>, now: Instant) -> ClickEvent {
        self.fusion.mouse_press(position, now)
    }

    /// Advance the pipeline by one tick.
    pub fn tick(&mut self, mouse: Option<Point2<f32>>, now: Instant) -> TickOutput {
        // 1. Acquire and segment the newest frame.
        let mut camera_lost = false;
        let raw_point = match self.feed.poll() {
            FeedStatus::Frame(frame) => match frame.view() {
                Some(view) => self.detector.detect(&view).point,
                None => {
                    warn!("frame buffer size mismatch, dropping frame");
                    None
                }
            },
            // Camera healthy, nothing new: the smoother holds.
            FeedStatus::Idle => None,
            // A failed read is camera loss, not a missed detection: the
            // laser must read as gone on this very tick.
            FeedStatus::BackingOff | FeedStatus::CameraGone => {
                camera_lost = true;
                None
            }
        };
        if camera_lost {
            self.smoother.reset();
            self.detector.reset();
        }

        // 2. Temporal smoothing in camera space.
        let smoothed = self.smoother.update(raw_point, now);

        // 3. Calibration taps the raw camera-space point and suspends
        //    laser routing; otherwise map into screen space.
        let mut calibration = None;
        let laser_screen = if let Mode::Calibrating(session) = &mut self.mode {
            let result = session.update(smoothed.map(|s| s.point), now);
            calibration = Some(self.apply_calibration_result(result));
            None
        } else {
            smoothed.and_then(|s| self.mapper.map(s.point))
        };

        // 4. Fuse into the unified pointer.
        let (pointer, click) = self.fusion.tick(laser_screen, mouse, now);

        TickOutput {
            pointer,
            click,
            calibration,
        }
    }

    fn apply_calibration_result(
        &mut self,
        result: Result<CalibrationProgress, CalibrationError>,
    ) -> CalibrationStatus {
        match result {
            Ok(CalibrationProgress::Acquiring {
                index,
                label,
                target,
                dwelling,
            }) => CalibrationStatus::Acquiring {
                index,
                label,
                target,
                dwelling,
            },
            Ok(CalibrationProgress::Captured { index, label }) => {
                CalibrationStatus::Captured { index, label }
            }
            Ok(CalibrationProgress::Complete(profile)) => {
                let residual = profile.residual;
                let persist_error = match &self.store {
                    Some(store) => store.save(&profile).err(),
                    None => None,
                };
                if let Some(err) = &persist_error {
                    warn!("could not persist calibration profile: {err}");
                }
                self.mapper.set_profile(profile);
                self.mode = Mode::Pointing;
                info!("calibration profile activated (residual {residual:.2}px)");
                CalibrationStatus::Completed {
                    residual,
                    persist_error,
                }
            }
            Err(err) => {
                warn!("calibration aborted: {err}");
                self.mode = Mode::Pointing;
                CalibrationStatus::Failed(err)
            }
        }
    }
}
