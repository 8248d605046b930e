//! Red laser spot detection and temporal smoothing.
//!
//! The pipeline per frame:
//! - convert the RGB frame to HSV and threshold into two red hue bands
//!   (red wraps around the hue-circle seam, so one band is never enough)
//! - morphological opening then closing to drop speckle and merge
//!   fragmented blob pieces
//! - connected-component labeling, area-window filtering, max-area
//!   selection with a previous-centroid tie-break
//! - area-weighted centroid plus a confidence score bounded to [0, 1]
//!
//! The smoother turns the per-frame detections into a stable camera-space
//! point: exponential moving average while the spot is visible, short-gap
//! holding when it drops out, explicit absence once the hold goes stale.

mod blobs;
mod detector;
mod hsv;
mod mask;
mod morphology;
mod smoother;

pub use blobs::{find_blobs, Blob};
pub use detector::{DetectionResult, LaserDetector, LaserDetectorParams, MaskPreview};
pub use hsv::{rgb_to_hsv, HueBand};
pub use mask::{threshold_bands, Mask};
pub use morphology::{close, dilate, erode, open, EllipseKernel};
pub use smoother::{SmoothedPoint, SmootherParams, TemporalSmoother};
