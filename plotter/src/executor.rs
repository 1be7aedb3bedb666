//! Plot step executor.

use hardware::ActuatorDriver;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlotResult;
use crate::pen::PenState;
use crate::session::Plotter;

/// One absolute target in the current glyph frame.
///
/// `x` is the paper position (feed axis), `y` the pen position across the
/// strip (traverse axis). Both are absolute within the glyph's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotStep {
    pub x: f64,
    pub y: f64,
    pub pen: PenState,
}

impl PlotStep {
    pub const fn new(x: f64, y: f64, pen: PenState) -> Self {
        Self { x, y, pen }
    }

    /// Pen-up move to `(x, y)`.
    pub const fn travel(x: f64, y: f64) -> Self {
        Self::new(x, y, PenState::Raised)
    }

    /// Pen-down stroke to `(x, y)`.
    pub const fn stroke(x: f64, y: f64) -> Self {
        Self::new(x, y, PenState::Lowered)
    }

    pub fn is_pen_lifted(&self) -> bool {
        self.pen.is_lifted()
    }
}

impl<D: ActuatorDriver> Plotter<D> {
    /// Execute one step: settle the pen first, then make the coordinated move.
    ///
    /// The move is never started if the pen fails to settle.
    pub fn execute(&mut self, step: PlotStep) -> PlotResult<()> {
        debug!("Step ({}, {}) pen {}", step.x, step.y, step.pen);
        self.set_pen_state(step.pen)?;
        self.move_to(step.x, step.y)?;
        Ok(())
    }
}
