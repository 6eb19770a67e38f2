//! Pure calculation functions for grid and crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::crop::CropRegion;
use super::params::GridSpec;
use serde::Serialize;

/// Top-left corner of cell `(row, col)` on the sheet.
///
/// `x = col * (cell_width + gap) + margin`, `y = row * (cell_height + gap) + margin`.
/// Computed in `i64` so large grids never overflow; callers clip.
///
/// # Examples
/// ```
/// # use idsheet::imaging::cell_origin;
/// # use idsheet::config::SheetConfig;
/// let spec = SheetConfig::default().grid_spec();
/// // 360x450 cells, gap 50, margin 25
/// assert_eq!(cell_origin(&spec, 0, 0), (25, 25));
/// assert_eq!(cell_origin(&spec, 1, 2), (2 * 410 + 25, 500 + 25));
/// ```
pub fn cell_origin(spec: &GridSpec, row: u32, col: u32) -> (i64, i64) {
    let x = col as i64 * (spec.cell_width as i64 + spec.gap as i64) + spec.margin as i64;
    let y = row as i64 * (spec.cell_height as i64 + spec.gap as i64) + spec.margin as i64;
    (x, y)
}

/// How many `(rows, cols)` fit entirely inside the sheet with the spec's
/// cell size, gap and margin. Either value may be zero.
pub fn max_fitting_grid(spec: &GridSpec) -> (u32, u32) {
    let fit = |sheet: u32, cell: u32| -> u32 {
        let usable = sheet as i64 - 2 * spec.margin as i64 + spec.gap as i64;
        let pitch = cell as i64 + spec.gap as i64;
        if usable <= 0 || pitch <= 0 {
            0
        } else {
            (usable / pitch) as u32
        }
    };
    (
        fit(spec.sheet_height, spec.cell_height),
        fit(spec.sheet_width, spec.cell_width),
    )
}

/// One cell of a planned grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellPlacement {
    pub row: u32,
    pub col: u32,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    /// `false` when any part of the cell falls outside the sheet.
    pub inside: bool,
}

/// Every cell placement for a spec, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridPlan {
    pub sheet_width: u32,
    pub sheet_height: u32,
    pub rows: u32,
    pub cols: u32,
    pub cells: Vec<CellPlacement>,
    /// Number of cells truncated by the sheet bounds.
    pub clipped: usize,
    /// Largest grid that fits without clipping, from [`max_fitting_grid`].
    pub max_rows: u32,
    pub max_cols: u32,
}

/// Plan the grid without rendering anything.
pub fn plan_grid(spec: &GridSpec) -> GridPlan {
    let (rows, cols) = (spec.rows.get(), spec.cols.get());
    let cells: Vec<CellPlacement> = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| {
            let (x, y) = cell_origin(spec, row, col);
            let inside = x >= 0
                && y >= 0
                && x + spec.cell_width as i64 <= spec.sheet_width as i64
                && y + spec.cell_height as i64 <= spec.sheet_height as i64;
            CellPlacement {
                row,
                col,
                x,
                y,
                width: spec.cell_width,
                height: spec.cell_height,
                inside,
            }
        })
        .collect();
    let clipped = cells.iter().filter(|c| !c.inside).count();
    let (max_rows, max_cols) = max_fitting_grid(spec);

    GridPlan {
        sheet_width: spec.sheet_width,
        sheet_height: spec.sheet_height,
        rows,
        cols,
        cells,
        clipped,
        max_rows,
        max_cols,
    }
}

/// Reduce `width:height` to lowest terms. Zero sides are returned as-is.
///
/// ```
/// # use idsheet::imaging::aspect_ratio;
/// assert_eq!(aspect_ratio(360, 450), (4, 5));
/// ```
pub fn aspect_ratio(width: u32, height: u32) -> (u32, u32) {
    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 { a } else { gcd(b, a % b) }
    }
    match gcd(width, height) {
        0 => (width, height),
        d => (width / d, height / d),
    }
}

/// Largest region of the given aspect ratio that fits the image, scaled by
/// `area` (`0 < area <= 1`) and centered.
///
/// # Arguments
/// * `image` - Source image dimensions (width, height)
/// * `aspect` - Target aspect ratio as (width, height)
/// * `area` - Fraction of the largest fitting region to cover
pub fn calculate_crop_region(image: (u32, u32), aspect: (u32, u32), area: f64) -> CropRegion {
    let (img_w, img_h) = image;
    let (aspect_w, aspect_h) = aspect;

    let (full_w, full_h) = if img_w as u64 * aspect_h as u64 >= img_h as u64 * aspect_w as u64 {
        // Image is wider than the target: height is the limit
        let w = (img_h as f64 * aspect_w as f64 / aspect_h as f64).round() as u32;
        (w.min(img_w), img_h)
    } else {
        // Image is taller: width is the limit
        let h = (img_w as f64 * aspect_h as f64 / aspect_w as f64).round() as u32;
        (img_w, h.min(img_h))
    };

    let area = area.clamp(f64::MIN_POSITIVE, 1.0);
    let w = ((full_w as f64 * area).round() as u32).min(img_w);
    let h = ((full_h as f64 * area).round() as u32).min(img_h);

    CropRegion {
        x: (img_w - w) / 2,
        y: (img_h - h) / 2,
        width: w,
        height: h,
    }
}

/// Move a region by `(dx, dy)`, keeping it entirely inside the image.
pub fn offset_crop_region(image: (u32, u32), region: CropRegion, dx: i64, dy: i64) -> CropRegion {
    let max_x = image.0.saturating_sub(region.width) as i64;
    let max_y = image.1.saturating_sub(region.height) as i64;
    CropRegion {
        x: (region.x as i64 + dx).clamp(0, max_x) as u32,
        y: (region.y as i64 + dy).clamp(0, max_y) as u32,
        ..region
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::spec_with_grid;

    // =========================================================================
    // cell_origin tests
    // =========================================================================

    #[test]
    fn origin_of_first_cell_is_margin() {
        let spec = spec_with_grid(3, 4);
        assert_eq!(cell_origin(&spec, 0, 0), (25, 25));
    }

    #[test]
    fn origin_moves_down_by_cell_height_plus_gap() {
        let spec = spec_with_grid(3, 4);
        // (row 1, col 0): y = 1 * (450 + 50) + 25
        assert_eq!(cell_origin(&spec, 1, 0), (25, 525));
    }

    #[test]
    fn origin_moves_right_by_cell_width_plus_gap() {
        let spec = spec_with_grid(3, 4);
        // (row 0, col 1): x = 1 * (360 + 50) + 25
        assert_eq!(cell_origin(&spec, 0, 1), (435, 25));
    }

    #[test]
    fn origin_of_row_two_col_three() {
        let spec = spec_with_grid(3, 4);
        assert_eq!(cell_origin(&spec, 2, 3), (3 * 410 + 25, 2 * 500 + 25));
    }

    #[test]
    fn origin_respects_custom_gap_and_margin() {
        let mut spec = spec_with_grid(2, 2);
        spec.cell_width = 10;
        spec.cell_height = 20;
        spec.gap = 4;
        spec.margin = 7;
        assert_eq!(cell_origin(&spec, 1, 1), (14 + 7, 24 + 7));
    }

    // =========================================================================
    // max_fitting_grid tests
    // =========================================================================

    #[test]
    fn max_fit_on_a4() {
        let spec = spec_with_grid(1, 1);
        // width: (2480 - 50 + 50) / 410 = 6; height: (3505 - 50 + 50) / 500 = 7
        assert_eq!(max_fitting_grid(&spec), (7, 6));
    }

    #[test]
    fn max_fit_zero_when_cell_larger_than_sheet() {
        let mut spec = spec_with_grid(1, 1);
        spec.cell_width = 5000;
        assert_eq!(max_fitting_grid(&spec).1, 0);
    }

    // =========================================================================
    // plan_grid tests
    // =========================================================================

    #[test]
    fn plan_is_row_major() {
        let plan = plan_grid(&spec_with_grid(2, 3));
        let order: Vec<(u32, u32)> = plan.cells.iter().map(|c| (c.row, c.col)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
        assert_eq!(plan.clipped, 0);
    }

    #[test]
    fn plan_counts_clipped_cells() {
        // 8 columns need 8 * 410 = 3280px > 2480px
        let plan = plan_grid(&spec_with_grid(1, 8));
        assert_eq!(plan.cells.len(), 8);
        assert_eq!(plan.clipped, 2);
        assert!(!plan.cells[7].inside);
        assert!(plan.cells[5].inside);
        assert_eq!((plan.max_rows, plan.max_cols), (7, 6));
    }

    #[test]
    fn aspect_ratio_reduces() {
        assert_eq!(aspect_ratio(360, 450), (4, 5));
        assert_eq!(aspect_ratio(600, 600), (1, 1));
        assert_eq!(aspect_ratio(7, 3), (7, 3));
        assert_eq!(aspect_ratio(0, 5), (0, 1));
        assert_eq!(aspect_ratio(0, 0), (0, 0));
    }

    // =========================================================================
    // crop region tests
    // =========================================================================

    #[test]
    fn crop_region_wide_image_is_height_limited() {
        // 1000x500 at 4:5 → 400x500 centered
        let r = calculate_crop_region((1000, 500), (4, 5), 1.0);
        assert_eq!((r.x, r.y, r.width, r.height), (300, 0, 400, 500));
    }

    #[test]
    fn crop_region_tall_image_is_width_limited() {
        // 400x1000 at 4:5 → 400x500 centered
        let r = calculate_crop_region((400, 1000), (4, 5), 1.0);
        assert_eq!((r.x, r.y, r.width, r.height), (0, 250, 400, 500));
    }

    #[test]
    fn crop_region_exact_aspect_uses_whole_image() {
        let r = calculate_crop_region((360, 450), (360, 450), 1.0);
        assert_eq!((r.x, r.y, r.width, r.height), (0, 0, 360, 450));
    }

    #[test]
    fn crop_region_partial_area_shrinks_around_center() {
        let r = calculate_crop_region((400, 500), (4, 5), 0.5);
        assert_eq!((r.x, r.y, r.width, r.height), (100, 125, 200, 250));
    }

    #[test]
    fn offset_clamps_inside_image() {
        let region = CropRegion {
            x: 300,
            y: 0,
            width: 400,
            height: 500,
        };
        let moved = offset_crop_region((1000, 500), region, 1000, 50);
        assert_eq!((moved.x, moved.y), (600, 0));
        let moved = offset_crop_region((1000, 500), region, -1000, -50);
        assert_eq!((moved.x, moved.y), (0, 0));
        let moved = offset_crop_region((1000, 500), region, 20, 0);
        assert_eq!(moved.x, 320);
    }
}
