//! Print a banner on the three-axis plotter.
//!
//! Runs against the simulated driver, so a job can be checked end to end
//! (calibration, glyph coverage, travel limits) without the mechanism.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hardware::sim::SimulatedDriver;
use plotter::{BannerPrinter, CalibrationProfile, GlyphLibrary, Plotter, UnsupportedGlyphPolicy};
use tracing::info;

/// Banner plotter print job
#[derive(Parser, Debug)]
#[command(name = "banner_print")]
#[command(about = "Print a text banner on the three-axis plotter")]
#[command(version)]
struct Args {
    /// Text to print
    #[arg(short, long, default_value = "LEGO EV3")]
    text: String,

    /// Built-in calibration profile (banner-print3r, print3r-rev-a)
    #[arg(long, default_value = "banner-print3r")]
    preset: String,

    /// Load the calibration profile from a JSON file instead of a preset
    #[arg(long, conflicts_with = "preset")]
    profile: Option<PathBuf>,

    /// Write the selected calibration profile to this JSON file and exit
    #[arg(long)]
    dump_profile: Option<PathBuf>,

    /// Leave out characters without a glyph instead of failing the job
    #[arg(long)]
    skip_unsupported: bool,

    /// Blank margin between glyphs, in plotting units
    #[arg(long, default_value = "10")]
    margin: f64,
}

fn load_profile(args: &Args) -> Result<CalibrationProfile> {
    match &args.profile {
        Some(path) => CalibrationProfile::load_from_file(path)
            .with_context(|| format!("loading profile {}", path.display())),
        None => CalibrationProfile::preset(&args.preset)
            .ok_or_else(|| anyhow!("unknown preset '{}'", args.preset)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let profile = load_profile(&args)?;

    if let Some(path) = &args.dump_profile {
        profile.save_to_file(path)?;
        info!("Wrote profile '{}' to {}", profile.name, path.display());
        return Ok(());
    }

    let policy = if args.skip_unsupported {
        UnsupportedGlyphPolicy::Skip
    } else {
        UnsupportedGlyphPolicy::Reject
    };

    info!("Starting session with profile '{}'", profile.name);
    let plotter = Plotter::new(SimulatedDriver::new(), profile)?;
    let mut printer = BannerPrinter::new(plotter)
        .with_library(GlyphLibrary::with_margin(args.margin)?)
        .with_policy(policy);

    let report = printer.print(&args.text)?;
    info!(
        "Glyphs: {}, steps: {}, paper: {} units",
        report.glyphs_printed, report.steps_executed, report.feed_travel_units
    );
    if !report.skipped.is_empty() {
        info!("Skipped: {:?}", report.skipped);
    }
    info!(
        "Simulated print time: {:.1} s",
        printer.plotter().driver().elapsed().as_secs_f64()
    );

    info!("Printing done.");
    Ok(())
}
