//! Parameter types for sheet composition and export.
//!
//! These structs describe *what* to draw, not *how*. The session mutates a
//! [`GridSpec`] in response to user controls and hands it to the layout
//! engine; the backend receives a [`Quality`] when encoding.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`GridCount`]: A validated row or column count (`1..=MAX_GRID_COUNT`).
//! - [`PaperSize`]: Output sheet presets (A4, 4x6, 5x7) in pixels.
//! - [`GridSpec`]: Everything the layout engine needs to render a sheet.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest row/column count the grid selectors offer.
pub const MAX_GRID_COUNT: u32 = 32;

/// Outline drawn around every cell.
pub const DEFAULT_OUTLINE_WIDTH: u32 = 5;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Rejected row/column selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidGridInput {
    #[error("grid size is empty")]
    Empty,
    #[error("grid size '{0}' is not a number")]
    NotANumber(String),
    #[error("grid size {0} is out of range (1-{max})", max = MAX_GRID_COUNT)]
    OutOfRange(i64),
}

/// A row or column count, guaranteed to be in `1..=MAX_GRID_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GridCount(u32);

impl GridCount {
    pub fn new(value: u32) -> Result<Self, InvalidGridInput> {
        if (1..=MAX_GRID_COUNT).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidGridInput::OutOfRange(value as i64))
        }
    }

    /// Clamp any value into range. For defaults and presets, not user input.
    pub const fn saturating(value: u32) -> Self {
        if value < 1 {
            Self(1)
        } else if value > MAX_GRID_COUNT {
            Self(MAX_GRID_COUNT)
        } else {
            Self(value)
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for GridCount {
    type Err = InvalidGridInput;

    /// Parse a selector value. Trailing garbage is an error, not truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidGridInput::Empty);
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_| InvalidGridInput::NotANumber(trimmed.to_string()))?;
        u32::try_from(value)
            .map_err(|_| InvalidGridInput::OutOfRange(value))
            .and_then(Self::new)
    }
}

impl TryFrom<u32> for GridCount {
    type Error = InvalidGridInput;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GridCount> for u32 {
    fn from(count: GridCount) -> Self {
        count.0
    }
}

impl fmt::Display for GridCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output sheet presets, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    #[serde(rename = "a4")]
    A4,
    #[serde(rename = "4x6")]
    FourBySix,
    #[serde(rename = "5x7")]
    FiveBySeven,
}

impl PaperSize {
    pub const ALL: [PaperSize; 3] = [PaperSize::A4, PaperSize::FourBySix, PaperSize::FiveBySeven];

    /// `(width, height)` in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            PaperSize::A4 => (2480, 3505),
            PaperSize::FourBySix => (1200, 1800),
            PaperSize::FiveBySeven => (1500, 2100),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PaperSize::A4 => "a4",
            PaperSize::FourBySix => "4x6",
            PaperSize::FiveBySeven => "5x7",
        }
    }
}

impl FromStr for PaperSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        PaperSize::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| format!("unknown paper size '{s}' (expected a4, 4x6 or 5x7)"))
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full description of a sheet: grid shape, cell size, spacing, colors, canvas size.
///
/// No fit check is applied here: cells that extend past the sheet are
/// clipped by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSpec {
    pub rows: GridCount,
    pub cols: GridCount,
    pub cell_width: u32,
    pub cell_height: u32,
    pub gap: u32,
    pub margin: u32,
    pub background: Color,
    pub outline_width: u32,
    pub sheet_width: u32,
    pub sheet_height: u32,
}

impl GridSpec {
    pub fn sheet_dimensions(&self) -> (u32, u32) {
        (self.sheet_width, self.sheet_height)
    }

    pub fn cell_dimensions(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    /// Switch the canvas to a paper preset, keeping everything else.
    pub fn with_paper(mut self, paper: PaperSize) -> Self {
        (self.sheet_width, self.sheet_height) = paper.dimensions();
        self
    }
}
