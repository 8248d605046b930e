//! Pointer fusion and click routing.
//!
//! Merges the mapped laser coordinate and the raw mouse position into a
//! single pointer stream per tick. A valid laser coordinate wins the
//! tick; otherwise the mouse drives. The dwell machine runs on the merged
//! stream, so a steadily held laser clicks exactly like a resting mouse.

use std::time::Instant;

use log::debug;
use nalgebra::Point2;

use laser_arcade_core::{DwellDetector, DwellParams, DwellPhase};

/// Which device drives the pointer this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Laser,
    Mouse,
}

/// Unified pointer, rebuilt every tick.
#[derive(Clone, Copy, Debug)]
pub struct PointerState {
    /// Screen-space position; `None` when neither source is active.
    pub position: Option<Point2<f32>>,
    pub source: PointerSource,
    pub dwell_phase: DwellPhase,
    /// Anchor of an in-progress dwell.
    pub dwell_anchor: Option<Point2<f32>>,
    pub last_click_at: Option<Instant>,
}

impl PointerState {
    fn initial() -> Self {
        Self {
            position: None,
            source: PointerSource::Mouse,
            dwell_phase: DwellPhase::Idle,
            dwell_anchor: None,
            last_click_at: None,
        }
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.position.is_some()
    }
}

/// A discrete click.
#[derive(Clone, Copy, Debug)]
pub struct ClickEvent {
    pub position: Point2<f32>,
    pub at: Instant,
    pub source: PointerSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEventKind {
    Move,
    Down,
    Up,
    Click,
}

/// Event delivered to app consumers.
#[derive(Clone, Copy, Debug)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point2<f32>,
    pub source: PointerSource,
    pub at: Instant,
}

/// Laser/mouse fusion with dwell clicking.
pub struct PointerFusion {
    dwell: DwellDetector,
    state: PointerState,
}

impl PointerFusion {
    pub fn new(params: DwellParams) -> Self {
        Self {
            dwell: DwellDetector::new(params),
            state: PointerState::initial(),
        }
    }

    pub fn state(&self) -> &PointerState {
        &self.state
    }

    /// One pipeline tick. `laser` is the mapped screen-space coordinate
    /// (already `None` without a calibration profile), `mouse` the raw
    /// mouse position.
    pub fn tick(
        &mut self,
        laser: Option<Point2<f32>>,
        mouse: Option<Point2<f32>>,
        now: Instant,
    ) -> (PointerState, Option<ClickEvent>) {
        let (position, source) = match (laser, mouse) {
            (Some(p), _) => (Some(p), PointerSource::Laser),
            (None, Some(p)) => (Some(p), PointerSource::Mouse),
            (None, None) => (None, self.state.source),
        };

        let update = self.dwell.update(position, now);
        let click = update.fired.map(|anchor| {
            debug!("dwell click at ({:.1}, {:.1})", anchor.x, anchor.y);
            ClickEvent {
                position: anchor,
                at: now,
                source,
            }
        });

        if click.is_some() {
            self.state.last_click_at = Some(now);
        }
        self.state = PointerState {
            position,
            source,
            dwell_phase: update.phase,
            dwell_anchor: self.dwell.anchor().or(update.fired),
            last_click_at: self.state.last_click_at,
        };

        (self.state, click)
    }

    /// A direct mouse press: bypasses the dwell path, clicks immediately,
    /// and puts the machine into cooldown so residual hover cannot fire a
    /// follow-on dwell click.
    pub fn mouse_press(&mut self, position: Point2<f32>, now: Instant) -> ClickEvent {
        self.dwell.begin_cooldown(now);
        self.state.last_click_at = Some(now);
        self.state.dwell_phase = DwellPhase::Cooldown;
        self.state.dwell_anchor = None;
        ClickEvent {
            position,
            at: now,
            source: PointerSource::Mouse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fusion() -> PointerFusion {
        PointerFusion::new(DwellParams::default())
    }

    #[test]
    fn laser_takes_precedence_over_mouse() {
        let mut f = fusion();
        let now = Instant::now();
        let (state, _) = f.tick(
            Some(Point2::new(100.0, 100.0)),
            Some(Point2::new(5.0, 5.0)),
            now,
        );
        assert_eq!(state.source, PointerSource::Laser);
        assert_eq!(state.position.unwrap(), Point2::new(100.0, 100.0));
    }

    #[test]
    fn mouse_drives_when_laser_is_absent() {
        let mut f = fusion();
        let (state, _) = f.tick(None, Some(Point2::new(5.0, 5.0)), Instant::now());
        assert_eq!(state.source, PointerSource::Mouse);
        assert!(state.active());
    }

    #[test]
    fn laser_loss_switches_source_on_the_same_tick() {
        let mut f = fusion();
        let start = Instant::now();
        f.tick(Some(Point2::new(100.0, 100.0)), Some(Point2::new(5.0, 5.0)), start);
        let (state, _) = f.tick(
            None,
            Some(Point2::new(5.0, 5.0)),
            start + Duration::from_millis(33),
        );
        assert_eq!(state.source, PointerSource::Mouse);
    }

    #[test]
    fn steady_laser_dwell_clicks_once() {
        let mut f = fusion();
        let start = Instant::now();
        let p = Point2::new(300.0, 300.0);
        let mut clicks = Vec::new();
        for i in 0..11 {
            let (_, click) = f.tick(Some(p), None, start + Duration::from_millis(33 * i));
            clicks.extend(click);
        }
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].source, PointerSource::Laser);
        // Fires on the first tick at or past 300 ms (tick 10 at 330 ms)
        assert_eq!(clicks[0].at, start + Duration::from_millis(330));
    }

    #[test]
    fn mouse_press_clicks_immediately_and_blocks_dwell() {
        let mut f = fusion();
        let start = Instant::now();
        let p = Point2::new(40.0, 40.0);

        let click = f.mouse_press(p, start);
        assert_eq!(click.source, PointerSource::Mouse);
        assert_eq!(f.state().dwell_phase, DwellPhase::Cooldown);

        // Hovering through an entire dwell inside the cooldown: no click
        let mut clicks = Vec::new();
        for i in 1..11 {
            let (_, c) = f.tick(None, Some(p), start + Duration::from_millis(33 * i));
            clicks.extend(c);
        }
        assert!(clicks.is_empty());
    }

    #[test]
    fn dwell_resumes_after_mouse_press_cooldown() {
        let mut f = fusion();
        let start = Instant::now();
        let p = Point2::new(40.0, 40.0);
        f.mouse_press(p, start);

        // Past the 350 ms debounce, a fresh hold dwells and fires
        let mut clicks = Vec::new();
        for i in 0..12 {
            let t = start + Duration::from_millis(360 + 33 * i);
            let (_, c) = f.tick(None, Some(p), t);
            clicks.extend(c);
        }
        assert_eq!(clicks.len(), 1);
    }

    #[test]
    fn state_tracks_last_click_time() {
        let mut f = fusion();
        let start = Instant::now();
        assert!(f.state().last_click_at.is_none());
        f.mouse_press(Point2::new(1.0, 1.0), start);
        assert_eq!(f.state().last_click_at, Some(start));
    }
}
