use log::trace;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use laser_arcade_core::RgbFrameView;

use crate::blobs::{find_blobs, Blob};
use crate::hsv::HueBand;
use crate::mask::{threshold_bands, Mask};
use crate::morphology::{close, open, EllipseKernel};

/// Parameters for red spot detection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaserDetectorParams {
    /// Low-hue red band.
    pub band1: HueBand,
    /// High-hue red band (wraparound side).
    pub band2: HueBand,
    /// Side length of the elliptical morphology kernel.
    pub morph_kernel: usize,
    /// Regions smaller than this are sensor noise.
    pub min_area: f32,
    /// Regions larger than this are saturated over-exposure, not a dot.
    pub max_area: f32,
    /// Keep a downsampled copy of the binary mask for the debug overlay.
    #[serde(default)]
    pub keep_mask_preview: bool,
}

impl Default for LaserDetectorParams {
    fn default() -> Self {
        Self {
            band1: HueBand::red_low(),
            band2: HueBand::red_high(),
            morph_kernel: 3,
            min_area: 12.0,
            max_area: 4000.0,
            keep_mask_preview: false,
        }
    }
}

/// Per-frame detection output. `point` is `None` on no detection, and a
/// missing point never carries area or confidence.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DetectionResult {
    pub point: Option<Point2<f32>>,
    pub area: f32,
    pub confidence: f32,
}

impl DetectionResult {
    pub fn none() -> Self {
        Self {
            point: None,
            area: 0.0,
            confidence: 0.0,
        }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.point.is_some()
    }
}

/// Downsampled binary-mask thumbnail for the presentation layer's debug
/// overlay.
#[derive(Clone, Debug)]
pub struct MaskPreview {
    pub mask: Mask,
}

const PREVIEW_WIDTH: usize = 160;
const PREVIEW_HEIGHT: usize = 120;

/// Red laser spot detector.
///
/// Holds the previous accepted centroid so equal-area candidates resolve
/// to the one closest to where the spot last was.
pub struct LaserDetector {
    params: LaserDetectorParams,
    kernel: EllipseKernel,
    last_centroid: Option<Point2<f32>>,
    mask_preview: Option<MaskPreview>,
}

impl LaserDetector {
    pub fn new(params: LaserDetectorParams) -> Self {
        let kernel = EllipseKernel::new(params.morph_kernel);
        Self {
            params,
            kernel,
            last_centroid: None,
            mask_preview: None,
        }
    }

    pub fn params(&self) -> &LaserDetectorParams {
        &self.params
    }

    /// Mask thumbnail from the most recent frame, when
    /// `keep_mask_preview` is enabled.
    pub fn mask_preview(&self) -> Option<&MaskPreview> {
        self.mask_preview.as_ref()
    }

    /// Forget the previous centroid (e.g. after a camera restart).
    pub fn reset(&mut self) {
        self.last_centroid = None;
        self.mask_preview = None;
    }

    /// Segment one frame and extract the laser spot, if any.
    pub fn detect(&mut self, frame: &RgbFrameView<'_>) -> DetectionResult {
        let raw = threshold_bands(frame, &[self.params.band1, self.params.band2]);
        let cleaned = close(&open(&raw, &self.kernel), &self.kernel);

        if self.params.keep_mask_preview {
            self.mask_preview = Some(MaskPreview {
                mask: cleaned.downsample(PREVIEW_WIDTH, PREVIEW_HEIGHT),
            });
        }

        let blobs = find_blobs(&cleaned);
        let best = self.select_blob(&blobs);

        match best {
            Some(blob) => {
                let confidence = self.confidence(&blob);
                self.last_centroid = Some(blob.centroid);
                trace!(
                    "laser spot at ({:.1}, {:.1}), area {:.0}, confidence {:.2}",
                    blob.centroid.x,
                    blob.centroid.y,
                    blob.area,
                    confidence
                );
                DetectionResult {
                    point: Some(blob.centroid),
                    area: blob.area,
                    confidence,
                }
            }
            None => DetectionResult::none(),
        }
    }

    /// Max-area region within the area window; exact area ties go to the
    /// candidate nearest the previous accepted centroid (first-labeled
    /// wins without history).
    fn select_blob(&self, blobs: &[Blob]) -> Option<Blob> {
        let mut best: Option<Blob> = None;
        for blob in blobs {
            if blob.area < self.params.min_area || blob.area > self.params.max_area {
                continue;
            }
            best = match best {
                None => Some(*blob),
                Some(current) if blob.area > current.area => Some(*blob),
                Some(current) if blob.area == current.area => {
                    match self.last_centroid {
                        Some(last)
                            if dist2(blob.centroid, last) < dist2(current.centroid, last) =>
                        {
                            Some(*blob)
                        }
                        _ => Some(current),
                    }
                }
                Some(current) => Some(current),
            };
        }
        best
    }

    /// Bounded confidence from area and compactness. Area saturates at
    /// four times the floor; compactness discounts elongated glare so it
    /// never scores like a round dot of the same area.
    fn confidence(&self, blob: &Blob) -> f32 {
        let area_term = (blob.area / (4.0 * self.params.min_area.max(1.0))).min(1.0);
        let shape_term = 0.4 + 0.6 * blob.compactness();
        (area_term * shape_term).clamp(0.0, 1.0)
    }
}

#[inline]
fn dist2(a: Point2<f32>, b: Point2<f32>) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}
