//! Dwell/debounce state machine.
//!
//! One machine serves both click generation and calibration-target
//! confirmation: "hold the pointer still for long enough" is the same
//! contract in both places, parameterized by radius, dwell duration, and
//! debounce window. All timing is wall-clock, passed in as explicit
//! instants, so behavior does not depend on the camera frame rate.

use std::time::{Duration, Instant};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DwellParams {
    /// Hold duration before a dwell fires, in milliseconds.
    pub dwell_ms: u64,
    /// Movement beyond this radius re-anchors the dwell.
    pub radius_px: f32,
    /// Refractory window after a fire during which dwell completion is
    /// suppressed, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for DwellParams {
    fn default() -> Self {
        Self {
            dwell_ms: 300,
            radius_px: 10.0,
            debounce_ms: 350,
        }
    }
}

impl DwellParams {
    #[inline]
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    #[inline]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Externally visible machine phase for the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DwellPhase {
    Idle,
    Dwelling,
    /// The dwell duration was reached on this tick; `DwellUpdate::fired`
    /// carries the position. The machine is already in its refractory
    /// window on the next tick.
    Fired,
    Cooldown,
}

/// Result of one tick of the machine.
#[derive(Clone, Copy, Debug)]
pub struct DwellUpdate {
    pub phase: DwellPhase,
    /// Anchor position of a dwell that completed on this tick.
    pub fired: Option<Point2<f32>>,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Idle,
    Dwelling { anchor: Point2<f32>, since: Instant },
    Cooldown { until: Instant },
}

/// Dwell-click detector.
pub struct DwellDetector {
    params: DwellParams,
    state: State,
}

impl DwellDetector {
    pub fn new(params: DwellParams) -> Self {
        Self {
            params,
            state: State::Idle,
        }
    }

    pub fn params(&self) -> &DwellParams {
        &self.params
    }

    /// Drop any anchor and leave cooldown. Used when the pointer source
    /// disappears or a calibration target advances.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Enter the refractory window without a dwell having fired. A direct
    /// mouse press goes through here so residual hover cannot produce an
    /// immediate follow-on dwell click.
    pub fn begin_cooldown(&mut self, now: Instant) {
        self.state = State::Cooldown {
            until: now + self.params.debounce(),
        };
    }

    /// Advance the machine with the pointer position for this tick.
    pub fn update(&mut self, point: Option<Point2<f32>>, now: Instant) -> DwellUpdate {
        if let State::Cooldown { until } = self.state {
            if now < until {
                return DwellUpdate {
                    phase: DwellPhase::Cooldown,
                    fired: None,
                };
            }
            self.state = State::Idle;
        }

        let p = match point {
            Some(p) => p,
            None => {
                self.state = State::Idle;
                return DwellUpdate {
                    phase: DwellPhase::Idle,
                    fired: None,
                };
            }
        };

        match self.state {
            State::Idle => {
                self.state = State::Dwelling {
                    anchor: p,
                    since: now,
                };
                DwellUpdate {
                    phase: DwellPhase::Dwelling,
                    fired: None,
                }
            }
            State::Dwelling { anchor, since } => {
                let dx = p.x - anchor.x;
                let dy = p.y - anchor.y;
                if (dx * dx + dy * dy).sqrt() > self.params.radius_px {
                    // Moved out of the hold radius: re-anchor here.
                    self.state = State::Dwelling {
                        anchor: p,
                        since: now,
                    };
                    return DwellUpdate {
                        phase: DwellPhase::Dwelling,
                        fired: None,
                    };
                }
                if now.duration_since(since) >= self.params.dwell() {
                    self.state = State::Cooldown {
                        until: now + self.params.debounce(),
                    };
                    return DwellUpdate {
                        phase: DwellPhase::Fired,
                        fired: Some(anchor),
                    };
                }
                DwellUpdate {
                    phase: DwellPhase::Dwelling,
                    fired: None,
                }
            }
            State::Cooldown { .. } => unreachable!("cooldown handled above"),
        }
    }

    /// Current anchor, if the machine is dwelling.
    pub fn anchor(&self) -> Option<Point2<f32>> {
        match self.state {
            State::Dwelling { anchor, .. } => Some(anchor),
            _ => None,
        }
    }
}
