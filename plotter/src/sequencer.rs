//! Print sequencer.
//!
//! Renders a string glyph by glyph on one [`Plotter`]. Glyphs run strictly
//! in order; after each glyph's blank step the feed origin is zeroed so the
//! next glyph starts in a fresh local frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hardware::ActuatorDriver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PlotError, PlotResult};
use crate::glyphs::{Glyph, GlyphLibrary, UnsupportedGlyphPolicy};
use crate::session::Plotter;

/// Cooperative cancellation flag checked at every glyph boundary.
///
/// Clones share the flag, so one can be handed to another thread (or a
/// signal handler) while the printer runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the printer can run another job.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Outcome of one print job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintReport {
    pub glyphs_printed: usize,
    pub steps_executed: usize,
    /// Characters left out under [`UnsupportedGlyphPolicy::Skip`]
    pub skipped: Vec<char>,
    /// Total paper advance in plotting units
    pub feed_travel_units: f64,
}

/// Drives a [`Plotter`] through a text string.
pub struct BannerPrinter<D: ActuatorDriver> {
    plotter: Plotter<D>,
    library: GlyphLibrary,
    policy: UnsupportedGlyphPolicy,
    cancel: CancelToken,
}

impl<D: ActuatorDriver> BannerPrinter<D> {
    pub fn new(plotter: Plotter<D>) -> Self {
        Self {
            plotter,
            library: GlyphLibrary::default(),
            policy: UnsupportedGlyphPolicy::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: UnsupportedGlyphPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_library(mut self, library: GlyphLibrary) -> Self {
        self.library = library;
        self
    }

    /// Token that cancels this printer's jobs at the next glyph boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn policy(&self) -> UnsupportedGlyphPolicy {
        self.policy
    }

    pub fn plotter(&self) -> &Plotter<D> {
        &self.plotter
    }

    pub fn plotter_mut(&mut self) -> &mut Plotter<D> {
        &mut self.plotter
    }

    pub fn into_plotter(self) -> Plotter<D> {
        self.plotter
    }

    /// Print `text`.
    ///
    /// All characters are resolved before the first motion, so under
    /// [`UnsupportedGlyphPolicy::Reject`] an unsupported character fails the
    /// job with the mechanism untouched. Any fatal error during motion stops
    /// the mechanism (axes halted, pen raised) before it is returned.
    ///
    /// # Errors
    ///
    /// - [`PlotError::UnsupportedGlyph`] under the reject policy
    /// - [`PlotError::Cancelled`] if the cancel token fires between glyphs
    /// - [`PlotError::MotionTimeout`], [`PlotError::CalibrationMismatch`] or
    ///   [`PlotError::Driver`] from the motion itself
    pub fn print(&mut self, text: &str) -> PlotResult<PrintReport> {
        let mut report = PrintReport::default();
        let glyphs = self.resolve(text, &mut report)?;

        info!(
            "Printing {:?}: {} glyphs, margin {}",
            text,
            glyphs.len(),
            self.library.margin()
        );

        for glyph in &glyphs {
            if self.cancel.is_cancelled() {
                info!(
                    "Print cancelled after {} of {} glyphs",
                    report.glyphs_printed,
                    glyphs.len()
                );
                self.plotter.make_safe();
                return Err(PlotError::Cancelled {
                    glyphs_printed: report.glyphs_printed,
                });
            }

            if let Err(e) = self.print_glyph(glyph, &mut report) {
                warn!("Glyph '{}' failed: {}", glyph.character, e);
                self.plotter.make_safe();
                return Err(e);
            }
        }

        info!(
            "Printed {} glyphs in {} steps ({} units of paper)",
            report.glyphs_printed, report.steps_executed, report.feed_travel_units
        );
        Ok(report)
    }

    fn resolve(&self, text: &str, report: &mut PrintReport) -> PlotResult<Vec<Glyph>> {
        let mut glyphs = Vec::with_capacity(text.chars().count());
        for character in text.chars() {
            match self.library.render(character) {
                Ok(glyph) => glyphs.push(glyph),
                Err(e) if !e.is_fatal() && self.policy == UnsupportedGlyphPolicy::Skip => {
                    warn!("{}, skipping", e);
                    report.skipped.push(character);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(glyphs)
    }

    fn print_glyph(&mut self, glyph: &Glyph, report: &mut PrintReport) -> PlotResult<()> {
        let margin = self.library.margin();
        debug!("Glyph '{}'", glyph.character);
        for step in glyph.steps(margin) {
            self.plotter.execute(step)?;
            report.steps_executed += 1;
        }
        self.plotter.reset_feed_origin()?;
        report.glyphs_printed += 1;
        report.feed_travel_units += glyph.advance(margin);
        Ok(())
    }
}
