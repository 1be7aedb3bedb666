//! Motion control and glyph rendering for a three-axis banner plotter.
//!
//! The plotter draws text on a moving paper strip with three regulated
//! motors: a lift axis raising and lowering the pen, a traverse axis moving
//! the pen across the strip, and a feed axis advancing the paper.
//!
//! Modules:
//!
//! - [`session`] - the session that owns the driver and all three axes
//! - [`axis`] - one calibrated motor and its feedback counter
//! - [`pen`] - pen raise/lower on the lift axis
//! - [`sync_move`] - coordinated traverse+feed moves inside a sync bracket
//! - [`executor`] - one [`PlotStep`]: pen state, then coordinated move
//! - [`glyphs`] - character to stroke sequence
//! - [`sequencer`] - a text string rendered glyph by glyph
//!
//! # Example
//!
//! ```
//! use hardware::sim::SimulatedDriver;
//! use plotter::{BannerPrinter, CalibrationProfile, Plotter};
//!
//! let plotter = Plotter::new(SimulatedDriver::new(), CalibrationProfile::banner_print3r())?;
//! let mut printer = BannerPrinter::new(plotter);
//! let report = printer.print("LEGO EV3")?;
//! assert_eq!(report.glyphs_printed, 8);
//! # Ok::<(), plotter::PlotError>(())
//! ```

pub mod axis;
pub mod calibration;
pub mod error;
pub mod executor;
pub mod glyphs;
pub mod pen;
pub mod session;
pub mod sequencer;
pub mod sync_move;

pub use axis::{Axis, AxisRole};
pub use calibration::{AxisCalibration, CalibrationProfile};
pub use error::{PlotError, PlotResult};
pub use executor::PlotStep;
pub use glyphs::{Glyph, GlyphLibrary, UnsupportedGlyphPolicy};
pub use pen::PenState;
pub use session::Plotter;
pub use sequencer::{BannerPrinter, CancelToken, PrintReport};
pub use sync_move::MovePlan;
