//! Five-point camera-to-screen calibration.
//!
//! Acquisition walks the fixed target order TopLeft, TopRight,
//! BottomRight, BottomLeft, Center, confirming each target with the same
//! dwell-stability contract ordinary clicking uses. The fit is a
//! least-squares projective transform over the one-point-over-determined
//! system; the Center point both improves accuracy and acts as a sanity
//! check on the residual. Profiles persist as versioned JSON with an
//! atomic write-then-rename, so a crash mid-write never corrupts the
//! active profile.

mod error;
mod mapper;
mod profile;
mod session;
mod store;

pub use error::{CalibrationError, ProfileError};
pub use mapper::CoordinateMapper;
pub use profile::{CalibrationLayout, CalibrationPoint, CalibrationProfile, TargetLabel};
pub use session::{CalibrationProgress, CalibrationSession, CalibrationSessionParams};
pub use store::{ProfileStore, PROFILE_VERSION};
