use laser_arcade_core::RgbFrameView;

use crate::hsv::{rgb_to_hsv, HueBand};

/// Binary mask, row-major, 0 = background, 255 = foreground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Mask {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[inline]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize) {
        self.data[y * self.width + x] = 255;
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Nearest-neighbor downsample, used for the debug overlay thumbnail.
    pub fn downsample(&self, out_w: usize, out_h: usize) -> Mask {
        let mut out = Mask::zeros(out_w, out_h);
        if self.width == 0 || self.height == 0 || out_w == 0 || out_h == 0 {
            return out;
        }
        for y in 0..out_h {
            let sy = y * self.height / out_h;
            for x in 0..out_w {
                let sx = x * self.width / out_w;
                if self.is_set(sx, sy) {
                    out.set(x, y);
                }
            }
        }
        out
    }
}

/// Threshold a frame against the union of the given HSV bands.
pub fn threshold_bands(frame: &RgbFrameView<'_>, bands: &[HueBand]) -> Mask {
    let mut mask = Mask::zeros(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let hsv = rgb_to_hsv(frame.pixel(x, y));
            if bands.iter().any(|b| b.contains(hsv)) {
                mask.set(x, y);
            }
        }
    }
    mask
}
