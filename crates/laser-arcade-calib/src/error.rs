use laser_arcade_core::HomographyFitError;

use crate::profile::TargetLabel;

/// Errors that abort a calibration attempt. In every case the previously
/// active profile (if any) remains in force.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Degenerate(#[from] HomographyFitError),
    #[error("fit residual {residual:.2}px exceeds tolerance {tolerance:.2}px")]
    ResidualTooLarge { residual: f64, tolerance: f64 },
    #[error("no stable confirmation for {label:?} before the target timeout")]
    Timeout { label: TargetLabel },
    #[error("calibration cancelled")]
    Cancelled,
}

/// Errors loading or persisting a calibration profile. A failed save is
/// surfaced to the user-facing layer while the in-memory profile stays
/// usable for the session; a failed load means "uncalibrated", not abort.
#[derive(thiserror::Error, Debug)]
pub enum ProfileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unsupported profile version {0}")]
    Version(u32),
    #[error("profile failed validation: {0}")]
    Invalid(String),
}
