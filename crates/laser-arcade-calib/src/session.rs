use std::time::{Duration, Instant};

use log::{debug, info};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use laser_arcade_core::{DwellDetector, DwellParams, DwellPhase};

use crate::error::CalibrationError;
use crate::profile::{CalibrationLayout, CalibrationPoint, CalibrationProfile, TargetLabel};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CalibrationSessionParams {
    /// Stability contract: the same radius/duration used for dwell
    /// clicking confirms a target without a separate input device.
    pub dwell: DwellParams,
    /// Per-target deadline with no stable confirmation.
    pub target_timeout_ms: u64,
    /// Mean reprojection tolerance for accepting the fit.
    pub residual_tolerance_px: f64,
}

impl Default for CalibrationSessionParams {
    fn default() -> Self {
        Self {
            dwell: DwellParams::default(),
            target_timeout_ms: 10_000,
            residual_tolerance_px: 3.0,
        }
    }
}

impl CalibrationSessionParams {
    #[inline]
    fn target_timeout(&self) -> Duration {
        Duration::from_millis(self.target_timeout_ms)
    }
}

/// Progress of one tick of the acquisition state machine.
#[derive(Clone, Debug)]
pub enum CalibrationProgress {
    /// Waiting for a stable camera-space point on the current target.
    Acquiring {
        index: usize,
        label: TargetLabel,
        /// Where the presentation layer should draw the marker.
        target: Point2<f32>,
        /// The point is currently inside the stability radius.
        dwelling: bool,
    },
    /// The current target was just confirmed; more targets remain.
    Captured { index: usize, label: TargetLabel },
    /// All 5 targets confirmed and the fit accepted.
    Complete(CalibrationProfile),
}

/// 5-step acquisition state machine over the fixed target order.
///
/// Feed it the smoother's raw camera-space output once per tick. After
/// `Complete` or any error the session is spent; the owner drops it and,
/// on failure, keeps the previously active profile in force.
pub struct CalibrationSession {
    layout: CalibrationLayout,
    params: CalibrationSessionParams,
    dwell: DwellDetector,
    captured: Vec<CalibrationPoint>,
    deadline: Instant,
    cancelled: bool,
}

impl CalibrationSession {
    pub fn new(layout: CalibrationLayout, params: CalibrationSessionParams, now: Instant) -> Self {
        let deadline = now + params.target_timeout();
        Self {
            layout,
            params,
            dwell: DwellDetector::new(params.dwell),
            captured: Vec::with_capacity(5),
            deadline,
            cancelled: false,
        }
    }

    pub fn layout(&self) -> &CalibrationLayout {
        &self.layout
    }

    pub fn current_index(&self) -> usize {
        self.captured.len()
    }

    pub fn current_label(&self) -> Option<TargetLabel> {
        TargetLabel::ORDER.get(self.captured.len()).copied()
    }

    /// Request an abort; the next `update` reports `Cancelled`.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Advance with this tick's camera-space point (None = laser absent).
    pub fn update(
        &mut self,
        camera_point: Option<Point2<f32>>,
        now: Instant,
    ) -> Result<CalibrationProgress, CalibrationError> {
        if self.cancelled {
            return Err(CalibrationError::Cancelled);
        }
        let label = match self.current_label() {
            Some(label) => label,
            // Spent session; treat further ticks as an abort.
            None => return Err(CalibrationError::Cancelled),
        };
        if now >= self.deadline {
            return Err(CalibrationError::Timeout { label });
        }

        let update = self.dwell.update(camera_point, now);
        let anchor = match update.fired {
            Some(anchor) => anchor,
            None => {
                return Ok(CalibrationProgress::Acquiring {
                    index: self.captured.len(),
                    label,
                    target: self.layout.target(label),
                    dwelling: update.phase == DwellPhase::Dwelling,
                })
            }
        };

        let screen = self.layout.target(label);
        debug!(
            "calibration target {:?} confirmed at camera ({:.1}, {:.1})",
            label, anchor.x, anchor.y
        );
        self.captured.push(CalibrationPoint {
            camera: anchor,
            screen,
            label,
        });
        self.dwell.reset();
        self.deadline = now + self.params.target_timeout();

        if self.captured.len() < TargetLabel::ORDER.len() {
            return Ok(CalibrationProgress::Captured {
                index: self.captured.len() - 1,
                label,
            });
        }

        let points: [CalibrationPoint; 5] = match self.captured.clone().try_into() {
            Ok(points) => points,
            Err(_) => unreachable!("exactly 5 targets captured"),
        };
        let profile = CalibrationProfile::fit(points, self.params.residual_tolerance_px)?;
        info!(
            "calibration complete, residual {:.2}px over {} points",
            profile.residual,
            profile.points.len()
        );
        Ok(CalibrationProgress::Complete(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::well_spread_points;

    fn hold_until_confirmed(
        session: &mut CalibrationSession,
        point: Point2<f32>,
        start: Instant,
    ) -> Result<CalibrationProgress, CalibrationError> {
        // Anchor, then hold past the dwell duration.
        session.update(Some(point), start)?;
        session.update(Some(point), start + Duration::from_millis(150))?;
        session.update(Some(point), start + Duration::from_millis(320))
    }

    fn corner_layout() -> CalibrationLayout {
        CalibrationLayout::with_inset(1024.0, 768.0, 0.0)
    }

    #[test]
    fn five_stable_holds_complete_the_session() {
        let start = Instant::now();
        let mut session =
            CalibrationSession::new(corner_layout(), CalibrationSessionParams::default(), start);

        let camera_points = well_spread_points().map(|p| p.camera);
        let mut t = start;
        let mut completed = None;
        for (i, cam) in camera_points.iter().enumerate() {
            let progress = hold_until_confirmed(&mut session, *cam, t).expect("no error");
            match progress {
                CalibrationProgress::Captured { index, .. } => {
                    assert_eq!(index, i);
                    assert!(i < 4);
                }
                CalibrationProgress::Complete(profile) => {
                    assert_eq!(i, 4);
                    completed = Some(profile);
                }
                CalibrationProgress::Acquiring { .. } => panic!("hold should confirm"),
            }
            t += Duration::from_millis(1000);
        }

        let profile = completed.expect("session completed");
        assert!(profile.residual < CalibrationSessionParams::default().residual_tolerance_px);
        // The fitted transform sends the center camera point near the
        // center target.
        let mapped = profile
            .homography
            .apply_checked(Point2::new(320.0, 240.0))
            .unwrap();
        assert!((mapped.x - 512.0).abs() < 2.0);
        assert!((mapped.y - 384.0).abs() < 2.0);
    }

    #[test]
    fn unstable_point_keeps_acquiring() {
        let start = Instant::now();
        let mut session =
            CalibrationSession::new(corner_layout(), CalibrationSessionParams::default(), start);

        // Wander more than the radius between ticks: never confirms.
        let mut t = start;
        for i in 0..10 {
            let p = Point2::new(100.0 + 30.0 * i as f32, 100.0);
            match session.update(Some(p), t).expect("no error") {
                CalibrationProgress::Acquiring { index, .. } => assert_eq!(index, 0),
                other => panic!("unexpected progress: {other:?}"),
            }
            t += Duration::from_millis(100);
        }
    }

    #[test]
    fn target_timeout_aborts() {
        let start = Instant::now();
        let params = CalibrationSessionParams::default();
        let mut session = CalibrationSession::new(corner_layout(), params, start);

        let late = start + Duration::from_millis(params.target_timeout_ms + 1);
        match session.update(None, late) {
            Err(CalibrationError::Timeout { label }) => assert_eq!(label, TargetLabel::TopLeft),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn cancel_aborts_on_the_next_tick() {
        let start = Instant::now();
        let mut session =
            CalibrationSession::new(corner_layout(), CalibrationSessionParams::default(), start);
        session.cancel();
        assert!(matches!(
            session.update(Some(Point2::new(1.0, 1.0)), start),
            Err(CalibrationError::Cancelled)
        ));
    }

    #[test]
    fn collinear_captures_fail_the_fit() {
        let start = Instant::now();
        let mut session =
            CalibrationSession::new(corner_layout(), CalibrationSessionParams::default(), start);

        // First four on one line, fifth elsewhere: 3 collinear among them.
        let cams = [
            Point2::new(100.0, 100.0),
            Point2::new(200.0, 100.0),
            Point2::new(300.0, 100.0),
            Point2::new(100.0, 380.0),
            Point2::new(320.0, 240.0),
        ];
        let mut t = start;
        let mut last = None;
        for cam in cams {
            last = Some(hold_until_confirmed(&mut session, cam, t));
            if last.as_ref().is_some_and(|r| r.is_err()) {
                break;
            }
            t += Duration::from_millis(1000);
        }
        match last.expect("ran") {
            Err(CalibrationError::Degenerate(_)) => {}
            other => panic!("expected degenerate fit, got {other:?}"),
        }
    }
}
