//! Error taxonomy for plotting jobs.

use std::time::Duration;

use hardware::DriverError;
use thiserror::Error;

use crate::axis::AxisRole;

/// Errors that can occur while driving the plotter.
///
/// Motion timeouts and calibration mismatches are fatal to the current print
/// job. The job leaves the mechanism with the pen raised and the axes halted
/// before returning them.
#[derive(Error, Debug)]
pub enum PlotError {
    /// A computed target lies outside the axis' physical travel, or the
    /// mechanism is not in the pose the calibration assumes (pen not raised
    /// at session start).
    #[error("Calibration mismatch on {axis} axis: {detail}")]
    CalibrationMismatch { axis: AxisRole, detail: String },

    /// An axis did not settle within the bounded wait.
    #[error("Motion timeout on {axis} axis after {waited:?}")]
    MotionTimeout { axis: AxisRole, waited: Duration },

    /// The glyph library has no rendering for a character.
    #[error("Unsupported glyph {0:?}")]
    UnsupportedGlyph(char),

    /// The job was cancelled at a glyph boundary.
    #[error("Print job cancelled after {glyphs_printed} glyphs")]
    Cancelled { glyphs_printed: usize },

    /// Calibration profile failed validation.
    #[error("Invalid calibration profile: {0}")]
    InvalidProfile(String),

    /// Any other driver failure.
    #[error("Driver error on {axis} axis: {source}")]
    Driver {
        axis: AxisRole,
        #[source]
        source: DriverError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlotError {
    /// Wrap a driver error raised while operating `axis`.
    ///
    /// Timeouts and stalls become [`PlotError::MotionTimeout`].
    pub fn from_driver(axis: AxisRole, error: DriverError) -> Self {
        match error {
            DriverError::Timeout { waited, .. } => PlotError::MotionTimeout { axis, waited },
            DriverError::Stalled(_) => PlotError::MotionTimeout {
                axis,
                waited: Duration::ZERO,
            },
            source => PlotError::Driver { axis, source },
        }
    }

    /// Whether the error aborts the whole job rather than one character.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PlotError::UnsupportedGlyph(_))
    }
}

/// Result type for plotting operations.
pub type PlotResult<T> = Result<T, PlotError>;
