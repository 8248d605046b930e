use serde::{Deserialize, Serialize};

/// Convert one RGB8 pixel to HSV in the OpenCV byte convention:
/// H in [0, 180), S and V in [0, 255].
#[inline]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (u8, u8, u8) {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h = if delta <= f32::EPSILON {
        0.0
    } else if (max - r).abs() <= f32::EPSILON {
        let mut h = 30.0 * (g - b) / delta;
        if h < 0.0 {
            h += 180.0;
        }
        h
    } else if (max - g).abs() <= f32::EPSILON {
        60.0 + 30.0 * (b - r) / delta
    } else {
        120.0 + 30.0 * (r - g) / delta
    };

    (
        h.round().clamp(0.0, 180.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    )
}

/// One inclusive HSV threshold band, `lower[i] <= channel <= upper[i]`.
///
/// Red needs two of these: a band near hue 0 and a band near hue 180.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HueBand {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Low-hue half of the red wraparound.
    pub fn red_low() -> Self {
        Self::new([0, 120, 120], [8, 255, 255])
    }

    /// High-hue half of the red wraparound.
    pub fn red_high() -> Self {
        Self::new([170, 120, 120], [180, 255, 255])
    }

    #[inline]
    pub fn contains(&self, hsv: (u8, u8, u8)) -> bool {
        let (h, s, v) = hsv;
        h >= self.lower[0]
            && h <= self.upper[0]
            && s >= self.lower[1]
            && s <= self.upper[1]
            && v >= self.lower[2]
            && v <= self.upper[2]
    }
}
