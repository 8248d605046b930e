//! Binary morphology with an elliptical structuring element.
//!
//! Opening removes speckle smaller than the kernel; closing merges blob
//! fragments separated by sub-kernel gaps. Out-of-bounds neighbors count
//! as background, so foreground touching the frame border erodes.

use crate::mask::Mask;

/// Elliptical (disk) structuring element of odd side length `size`.
#[derive(Clone, Debug)]
pub struct EllipseKernel {
    offsets: Vec<(i32, i32)>,
}

impl EllipseKernel {
    pub fn new(size: usize) -> Self {
        let size = size.max(1) | 1; // force odd
        let r = (size / 2) as i32;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if r == 0 || dx * dx + dy * dy <= r * r {
                    offsets.push((dx, dy));
                }
            }
        }
        Self { offsets }
    }

    #[inline]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

pub fn erode(mask: &Mask, kernel: &EllipseKernel) -> Mask {
    let mut out = Mask::zeros(mask.width, mask.height);
    for y in 0..mask.height {
        for x in 0..mask.width {
            if covered(mask, kernel, x, y, true) {
                out.set(x, y);
            }
        }
    }
    out
}

pub fn dilate(mask: &Mask, kernel: &EllipseKernel) -> Mask {
    let mut out = Mask::zeros(mask.width, mask.height);
    for y in 0..mask.height {
        for x in 0..mask.width {
            if covered(mask, kernel, x, y, false) {
                out.set(x, y);
            }
        }
    }
    out
}

#[inline]
fn covered(mask: &Mask, kernel: &EllipseKernel, x: usize, y: usize, all: bool) -> bool {
    for &(dx, dy) in kernel.offsets() {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        let set = nx >= 0
            && ny >= 0
            && (nx as usize) < mask.width
            && (ny as usize) < mask.height
            && mask.is_set(nx as usize, ny as usize);
        if all && !set {
            return false;
        }
        if !all && set {
            return true;
        }
    }
    all
}

/// Erosion followed by dilation.
pub fn open(mask: &Mask, kernel: &EllipseKernel) -> Mask {
    dilate(&erode(mask, kernel), kernel)
}

/// Dilation followed by erosion.
pub fn close(mask: &Mask, kernel: &EllipseKernel) -> Mask {
    erode(&dilate(mask, kernel), kernel)
}
