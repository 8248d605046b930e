use std::time::{Duration, Instant};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Temporal smoothing parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SmootherParams {
    /// EMA weight of the newest sample.
    pub alpha: f32,
    /// Hold duration for a missing detection before presence flips false.
    pub staleness_ms: u64,
}

impl Default for SmootherParams {
    fn default() -> Self {
        Self {
            alpha: 0.35,
            staleness_ms: 200,
        }
    }
}

impl SmootherParams {
    #[inline]
    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }
}

/// Filtered camera-space point. Presence is the `Option` wrapping it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothedPoint {
    pub point: Point2<f32>,
    /// When a detection last fed the filter (not when it was last held).
    pub last_update: Instant,
}

/// Per-axis exponential moving average with short-gap holding.
///
/// On a missing detection the filter holds its last value unchanged (no
/// extrapolation) until the staleness timeout, then reports absence. This
/// bounds flicker from single-frame dropouts while degrading promptly on
/// real camera loss.
pub struct TemporalSmoother {
    params: SmootherParams,
    state: Option<SmoothedPoint>,
}

impl TemporalSmoother {
    pub fn new(params: SmootherParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &SmootherParams {
        &self.params
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Feed one frame's detection (or absence) into the filter.
    pub fn update(&mut self, detection: Option<Point2<f32>>, now: Instant) -> Option<SmoothedPoint> {
        match detection {
            Some(measured) => {
                let a = self.params.alpha;
                let point = match self.state {
                    None => measured,
                    Some(prev) => Point2::new(
                        a * measured.x + (1.0 - a) * prev.point.x,
                        a * measured.y + (1.0 - a) * prev.point.y,
                    ),
                };
                let smoothed = SmoothedPoint {
                    point,
                    last_update: now,
                };
                self.state = Some(smoothed);
                Some(smoothed)
            }
            None => {
                let held = self.state?;
                if now.duration_since(held.last_update) > self.params.staleness() {
                    self.state = None;
                    return None;
                }
                Some(held)
            }
        }
    }

    /// Current filtered point, applying the staleness check without
    /// feeding a sample.
    pub fn current(&self, now: Instant) -> Option<SmoothedPoint> {
        let held = self.state?;
        if now.duration_since(held.last_update) > self.params.staleness() {
            return None;
        }
        Some(held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoother() -> TemporalSmoother {
        TemporalSmoother::new(SmootherParams::default())
    }

    #[test]
    fn first_sample_passes_through() {
        let mut s = smoother();
        let now = Instant::now();
        let out = s.update(Some(Point2::new(100.0, 50.0)), now).unwrap();
        assert_eq!(out.point, Point2::new(100.0, 50.0));
    }

    #[test]
    fn converges_monotonically_without_overshoot() {
        let mut s = smoother();
        let start = Instant::now();
        s.update(Some(Point2::new(0.0, 0.0)), start);

        let target = Point2::new(200.0, 100.0);
        let mut prev_x = 0.0f32;
        for i in 1..60 {
            let now = start + Duration::from_millis(33 * i);
            let out = s.update(Some(target), now).unwrap();
            assert!(out.point.x >= prev_x, "x must not move backwards");
            assert!(out.point.x <= target.x, "x must not overshoot");
            assert!(out.point.y <= target.y, "y must not overshoot");
            prev_x = out.point.x;
        }
        // 59 steps of alpha 0.35 land essentially on the target
        let final_out = s.current(start + Duration::from_millis(33 * 59)).unwrap();
        assert!((final_out.point.x - target.x).abs() < 0.1);
    }

    #[test]
    fn short_gap_holds_last_value() {
        let mut s = smoother();
        let start = Instant::now();
        s.update(Some(Point2::new(40.0, 40.0)), start);

        // 100 ms gap, inside the 200 ms staleness window
        let held = s
            .update(None, start + Duration::from_millis(100))
            .expect("held");
        assert_eq!(held.point, Point2::new(40.0, 40.0));
        assert_eq!(held.last_update, start);
    }

    #[test]
    fn stale_hold_decays_to_absent() {
        let mut s = smoother();
        let start = Instant::now();
        s.update(Some(Point2::new(40.0, 40.0)), start);

        assert!(s.update(None, start + Duration::from_millis(250)).is_none());
        // Once decayed, even an in-window query stays absent
        assert!(s.current(start + Duration::from_millis(260)).is_none());
    }

    #[test]
    fn reappearing_detection_restarts_from_measurement_blend() {
        let mut s = smoother();
        let start = Instant::now();
        s.update(Some(Point2::new(0.0, 0.0)), start);
        s.update(None, start + Duration::from_millis(300)); // decays

        let out = s
            .update(Some(Point2::new(80.0, 80.0)), start + Duration::from_millis(400))
            .unwrap();
        // No stale state left, so the new measurement passes through
        assert_eq!(out.point, Point2::new(80.0, 80.0));
    }
}
