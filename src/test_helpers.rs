//! Shared test utilities for the idsheet test suite.
//!
//! Builders for grid specs, crop rasters and export blobs, so individual
//! tests only spell out what they assert on.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let spec = small_spec(2, 3);
//! let crop = bordered_crop(&spec, 8, [10, 20, 30]);
//! let sheet = compose(&crop, &spec);
//! assert_eq!(sheet.get_pixel(0, 0), &WHITE_PX);
//! ```

use crate::color::Color;
use crate::config::SheetConfig;
use crate::export::{Download, ExportBlob};
use crate::imaging::{GridCount, GridSpec};
use crate::types::{CropResult, MimeType};
use image::{Rgba, RgbaImage};

pub const WHITE_PX: Rgba<u8> = Rgba([255, 255, 255, 255]);

// =========================================================================
// Grid specs
// =========================================================================

/// The stock A4 sheet (360x450 cells, gap 50, margin 25) with the given grid.
pub fn spec_with_grid(rows: u32, cols: u32) -> GridSpec {
    GridSpec {
        rows: GridCount::new(rows).unwrap(),
        cols: GridCount::new(cols).unwrap(),
        ..SheetConfig::default().grid_spec()
    }
}

/// A 200x160 sheet with 30x40 cells, gap 10, margin 5 and a teal background.
/// Small enough to compare whole sheets pixel by pixel.
pub fn small_spec(rows: u32, cols: u32) -> GridSpec {
    GridSpec {
        rows: GridCount::new(rows).unwrap(),
        cols: GridCount::new(cols).unwrap(),
        cell_width: 30,
        cell_height: 40,
        gap: 10,
        margin: 5,
        background: Color::rgb(0, 128, 128),
        outline_width: 5,
        sheet_width: 200,
        sheet_height: 160,
    }
}

// =========================================================================
// Crop rasters
// =========================================================================

/// An opaque crop at cell size.
pub fn solid_crop(spec: &GridSpec, rgb: [u8; 3]) -> CropResult {
    let [r, g, b] = rgb;
    CropResult::new(RgbaImage::from_pixel(
        spec.cell_width,
        spec.cell_height,
        Rgba([r, g, b, 255]),
    ))
}

/// A crop at cell size with a fully transparent border `border` pixels wide
/// around an opaque interior.
pub fn bordered_crop(spec: &GridSpec, border: u32, rgb: [u8; 3]) -> CropResult {
    let [r, g, b] = rgb;
    let (w, h) = (spec.cell_width, spec.cell_height);
    CropResult::new(RgbaImage::from_fn(w, h, |x, y| {
        let inside = x >= border && y >= border && x + border < w && y + border < h;
        if inside {
            Rgba([r, g, b, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}

/// A crop whose alpha varies across the cell.
pub fn translucent_crop(spec: &GridSpec) -> CropResult {
    CropResult::new(RgbaImage::from_fn(
        spec.cell_width,
        spec.cell_height,
        |x, y| Rgba([200, (x * 7 % 256) as u8, (y * 5 % 256) as u8, (x * 9 % 256) as u8]),
    ))
}

// =========================================================================
// Export
// =========================================================================

/// A download of `len` zero bytes tagged with `mime`.
pub fn test_download(mime: &str, len: usize) -> Download {
    let blob = ExportBlob::new(vec![0u8; len], MimeType::new(mime), 1);
    Download::new("test", 1, blob)
}
