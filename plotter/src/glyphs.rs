//! Glyph library.
//!
//! Every glyph is authored in its own local frame: `x` runs along the paper
//! from 0 to the glyph width, `y` runs across the strip from 0 to 100. The
//! sequencer zeroes the feed origin after each glyph, so the absolute banner
//! position never appears in the table.

use serde::{Deserialize, Serialize};

use crate::error::{PlotError, PlotResult};
use crate::executor::PlotStep;
use crate::pen::PenState;

/// Default blank margin between glyphs, in plotting units.
pub const DEFAULT_MARGIN: f64 = 10.0;

/// Cell height shared by all glyphs.
pub const CELL_HEIGHT: f64 = 100.0;

const fn up(x: f64, y: f64) -> PlotStep {
    PlotStep::travel(x, y)
}

const fn down(x: f64, y: f64) -> PlotStep {
    PlotStep::stroke(x, y)
}

struct GlyphDef {
    character: char,
    width: f64,
    strokes: &'static [PlotStep],
}

static GLYPH_TABLE: &[GlyphDef] = &[
    GlyphDef {
        character: ' ',
        width: 30.0,
        strokes: &[],
    },
    GlyphDef {
        character: 'A',
        width: 50.0,
        strokes: &[
            up(0.0, 0.0),
            down(25.0, 100.0),
            down(50.0, 0.0),
            up(12.5, 50.0),
            down(37.5, 50.0),
        ],
    },
    GlyphDef {
        character: 'E',
        width: 50.0,
        strokes: &[
            up(50.0, 100.0),
            down(0.0, 100.0),
            down(0.0, 0.0),
            down(50.0, 0.0),
            up(0.0, 50.0),
            down(40.0, 50.0),
        ],
    },
    GlyphDef {
        character: 'G',
        width: 50.0,
        strokes: &[
            up(50.0, 100.0),
            down(0.0, 100.0),
            down(0.0, 0.0),
            down(50.0, 0.0),
            down(50.0, 50.0),
            down(25.0, 50.0),
        ],
    },
    GlyphDef {
        character: 'H',
        width: 50.0,
        strokes: &[
            up(0.0, 100.0),
            down(0.0, 0.0),
            up(50.0, 100.0),
            down(50.0, 0.0),
            up(0.0, 50.0),
            down(50.0, 50.0),
        ],
    },
    GlyphDef {
        character: 'I',
        width: 50.0,
        strokes: &[up(25.0, 100.0), down(25.0, 0.0)],
    },
    GlyphDef {
        character: 'L',
        width: 50.0,
        strokes: &[up(0.0, 100.0), down(0.0, 0.0), down(50.0, 0.0)],
    },
    GlyphDef {
        character: 'O',
        width: 50.0,
        strokes: &[
            up(0.0, 0.0),
            down(0.0, 100.0),
            down(50.0, 100.0),
            down(50.0, 0.0),
            down(0.0, 0.0),
        ],
    },
    GlyphDef {
        character: 'T',
        width: 50.0,
        strokes: &[
            up(0.0, 100.0),
            down(50.0, 100.0),
            up(25.0, 100.0),
            down(25.0, 0.0),
        ],
    },
    GlyphDef {
        character: 'V',
        width: 60.0,
        strokes: &[up(0.0, 100.0), down(30.0, 0.0), down(60.0, 100.0)],
    },
    GlyphDef {
        character: '3',
        width: 50.0,
        strokes: &[
            up(0.0, 100.0),
            down(50.0, 100.0),
            down(50.0, 0.0),
            down(0.0, 0.0),
            up(10.0, 50.0),
            down(50.0, 50.0),
        ],
    },
];

/// What to do with a character that has no glyph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum UnsupportedGlyphPolicy {
    /// Fail the whole job before any motion
    #[default]
    Reject,
    /// Leave the character out and record it in the report
    Skip,
}

/// The stroke rendering of one character.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub character: char,
    pub strokes: Vec<PlotStep>,
    /// Extent along the paper, excluding the margin
    pub width: f64,
}

impl Glyph {
    /// Strokes followed by the blank step that carries the paper past the
    /// glyph and its margin with the pen raised.
    ///
    /// The blank step keeps the traverse position of the last stroke, so
    /// after a drawn glyph it is a pure feed move. A glyph without strokes
    /// (space) has no last stroke and parks the pen at `y = 0`.
    pub fn steps(&self, margin: f64) -> Vec<PlotStep> {
        let mut steps = self.strokes.clone();
        steps.push(self.blank_step(margin));
        steps
    }

    pub fn blank_step(&self, margin: f64) -> PlotStep {
        let y = self.strokes.last().map(|s| s.y).unwrap_or(0.0);
        PlotStep::new(self.width + margin, y, PenState::Raised)
    }

    /// Feed advance of this glyph including the margin.
    pub fn advance(&self, margin: f64) -> f64 {
        self.width + margin
    }
}

/// Character to glyph lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphLibrary {
    margin: f64,
}

impl Default for GlyphLibrary {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
        }
    }
}

impl GlyphLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with a non-default blank margin.
    pub fn with_margin(margin: f64) -> PlotResult<Self> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(PlotError::InvalidProfile(format!(
                "glyph margin must be a non-negative number, got {margin}"
            )));
        }
        Ok(Self { margin })
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Render `character`. Lowercase letters use their uppercase glyph.
    ///
    /// Pure: the same character always yields the same glyph.
    pub fn render(&self, character: char) -> PlotResult<Glyph> {
        let key = character.to_ascii_uppercase();
        GLYPH_TABLE
            .iter()
            .find(|def| def.character == key)
            .map(|def| Glyph {
                character: def.character,
                strokes: def.strokes.to_vec(),
                width: def.width,
            })
            .ok_or(PlotError::UnsupportedGlyph(character))
    }

    /// Step sequence for `character`, blank step included.
    pub fn render_steps(&self, character: char) -> PlotResult<Vec<PlotStep>> {
        Ok(self.render(character)?.steps(self.margin))
    }

    pub fn supports(&self, character: char) -> bool {
        let key = character.to_ascii_uppercase();
        GLYPH_TABLE.iter().any(|def| def.character == key)
    }

    /// All characters with a glyph, in table order.
    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        GLYPH_TABLE.iter().map(|def| def.character)
    }
}
