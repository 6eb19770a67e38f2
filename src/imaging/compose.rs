//! Grid layout engine: renders a committed crop as a tiled sheet.
//!
//! [`compose`] is a pure function of `(CropResult, GridSpec)`. Each call
//! builds a fresh buffer, so there is never prior content to erase and two
//! calls with the same inputs produce identical pixels.
//!
//! Drawing order per sheet:
//!
//! ```text
//! 1. fill the whole sheet white
//! 2. for each cell, row-major:
//!      a. fill the cell rect with the background color
//!      b. draw the crop stretched to the cell rect (alpha-blended)
//!      c. stroke a black outline centered on the cell edge
//! ```
//!
//! Cells past the sheet edge are clipped; nothing is rejected. The crop is
//! placed with [`imageops::overlay`], which clips and blends on its own.

use super::calculations::cell_origin;
use super::params::GridSpec;
use crate::color::Color;
use crate::types::CropResult;
use image::imageops::{self, FilterType};
use image::{Pixel, Rgba, RgbaImage};
use std::borrow::Cow;

/// Render every cell of `spec` using the crop raster.
pub fn compose(crop: &CropResult, spec: &GridSpec) -> RgbaImage {
    let mut sheet = RgbaImage::from_pixel(
        spec.sheet_width,
        spec.sheet_height,
        Color::WHITE.to_rgba(),
    );

    let cell = cell_raster(crop.raster(), spec.cell_width, spec.cell_height);
    let background = spec.background.to_rgba();
    let outline = Color::BLACK.to_rgba();

    for row in 0..spec.rows.get() {
        for col in 0..spec.cols.get() {
            let (x, y) = cell_origin(spec, row, col);
            fill_rect(
                &mut sheet,
                x,
                y,
                spec.cell_width,
                spec.cell_height,
                background,
            );
            imageops::overlay(&mut sheet, &*cell, x, y);
            stroke_rect(
                &mut sheet,
                x,
                y,
                spec.cell_width,
                spec.cell_height,
                spec.outline_width,
                outline,
            );
        }
    }

    sheet
}

/// The crop stretched to exactly the cell size. Borrowed when it already fits.
fn cell_raster(raster: &RgbaImage, width: u32, height: u32) -> Cow<'_, RgbaImage> {
    if raster.dimensions() == (width, height) {
        Cow::Borrowed(raster)
    } else {
        Cow::Owned(imageops::resize(raster, width, height, FilterType::Triangle))
    }
}

/// Intersection of a rectangle with the image, as pixel ranges.
fn clip(
    img: &RgbaImage,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
) -> Option<(std::ops::Range<u32>, std::ops::Range<u32>)> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width as i64).min(img.width() as i64);
    let y1 = (y + height as i64).min(img.height() as i64);
    (x0 < x1 && y0 < y1).then(|| (x0 as u32..x1 as u32, y0 as u32..y1 as u32))
}

/// Paint `color` over a rectangle, clipped to the image.
fn fill_rect(img: &mut RgbaImage, x: i64, y: i64, width: u32, height: u32, color: Rgba<u8>) {
    let Some((xs, ys)) = clip(img, x, y, width, height) else {
        return;
    };
    for py in ys {
        for px in xs.clone() {
            img.get_pixel_mut(px, py).blend(&color);
        }
    }
}

/// Stroke a rectangle outline of `line_width` centered on its edges.
///
/// Each band starts `line_width / 2` pixels before its edge line, so a
/// width of 5 covers 2 pixels before and 3 after the line.
fn stroke_rect(
    img: &mut RgbaImage,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    line_width: u32,
    color: Rgba<u8>,
) {
    if line_width == 0 {
        return;
    }
    let half = (line_width / 2) as i64;
    let (left, top) = (x - half, y - half);
    let outer_w = width + line_width;
    let outer_h = height + line_width;

    fill_rect(img, left, top, outer_w, line_width, color);
    fill_rect(img, left, y + height as i64 - half, outer_w, line_width, color);
    fill_rect(img, left, top, line_width, outer_h, color);
    fill_rect(img, x + width as i64 - half, top, line_width, outer_h, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        WHITE_PX, bordered_crop, small_spec, solid_crop, translucent_crop,
    };

    const BLACK_PX: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn sheet_has_spec_dimensions() {
        let spec = small_spec(2, 3);
        let sheet = compose(&solid_crop(&spec, [10, 20, 30]), &spec);
        assert_eq!(sheet.dimensions(), (spec.sheet_width, spec.sheet_height));
    }

    #[test]
    fn compose_is_deterministic() {
        let spec = small_spec(2, 3);
        let crop = translucent_crop(&spec);
        assert_eq!(compose(&crop, &spec), compose(&crop, &spec));
    }

    #[test]
    fn gaps_and_margins_stay_white() {
        let spec = small_spec(2, 2);
        let sheet = compose(&solid_crop(&spec, [10, 20, 30]), &spec);
        // Far corner of the sheet is outside every cell and every outline.
        assert_eq!(
            sheet.get_pixel(spec.sheet_width - 1, spec.sheet_height - 1),
            &WHITE_PX
        );
        // Middle of the horizontal gap between column 0 and 1 on row 0.
        let (x0, y0) = cell_origin(&spec, 0, 0);
        let gap_x = x0 + spec.cell_width as i64 + spec.gap as i64 / 2;
        assert_eq!(sheet.get_pixel(gap_x as u32, y0 as u32 + 10), &WHITE_PX);
    }

    #[test]
    fn crop_is_drawn_in_each_cell_interior() {
        let spec = small_spec(2, 3);
        let sheet = compose(&solid_crop(&spec, [10, 20, 30]), &spec);
        for row in 0..2 {
            for col in 0..3 {
                let (x, y) = cell_origin(&spec, row, col);
                let center = sheet.get_pixel(
                    (x + spec.cell_width as i64 / 2) as u32,
                    (y + spec.cell_height as i64 / 2) as u32,
                );
                assert_eq!(center, &Rgba([10, 20, 30, 255]), "cell ({row}, {col})");
            }
        }
    }

    #[test]
    fn outline_straddles_cell_edge() {
        let spec = small_spec(1, 1);
        let sheet = compose(&solid_crop(&spec, [10, 20, 30]), &spec);
        let (x, y) = cell_origin(&spec, 0, 0);
        let (x, y) = (x as u32, y as u32 + 10);
        // 2 px before, 3 px after the left edge line
        assert_eq!(sheet.get_pixel(x - 3, y), &WHITE_PX);
        assert_eq!(sheet.get_pixel(x - 2, y), &BLACK_PX);
        assert_eq!(sheet.get_pixel(x + 2, y), &BLACK_PX);
        assert_eq!(sheet.get_pixel(x + 3, y), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn zero_outline_draws_nothing() {
        let mut spec = small_spec(1, 1);
        spec.outline_width = 0;
        let sheet = compose(&solid_crop(&spec, [10, 20, 30]), &spec);
        let (x, y) = cell_origin(&spec, 0, 0);
        assert_eq!(sheet.get_pixel(x as u32 - 1, y as u32), &WHITE_PX);
        assert_eq!(sheet.get_pixel(x as u32, y as u32), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn background_shows_through_transparent_crop_pixels() {
        let spec = small_spec(1, 2);
        let sheet = compose(&bordered_crop(&spec, 8, [10, 20, 30]), &spec);
        let (x, y) = cell_origin(&spec, 0, 1);
        // Inside the 8 px transparent border, past the 3 px inner outline.
        let bg = sheet.get_pixel(x as u32 + 5, y as u32 + 5);
        assert_eq!(bg, &spec.background.to_rgba());
    }

    #[test]
    fn recolor_leaves_opaque_crop_pixels_untouched() {
        let spec = small_spec(2, 2);
        let crop = solid_crop(&spec, [10, 20, 30]);
        let before = compose(&crop, &spec);
        let mut recolored = spec.clone();
        recolored.background = Color::rgb(255, 0, 0);
        let after = compose(&crop, &recolored);
        assert_eq!(before, after);
    }

    #[test]
    fn recolor_only_changes_letterbox_pixels() {
        let spec = small_spec(1, 1);
        let crop = bordered_crop(&spec, 8, [10, 20, 30]);
        let before = compose(&crop, &spec);
        let mut recolored = spec.clone();
        recolored.background = Color::rgb(255, 0, 0);
        let after = compose(&crop, &recolored);

        let (x, y) = cell_origin(&spec, 0, 0);
        for (px, py, old) in before.enumerate_pixels() {
            let new = after.get_pixel(px, py);
            let cx = px as i64 - x;
            let cy = py as i64 - y;
            let in_cell = cx >= 0
                && cy >= 0
                && cx < spec.cell_width as i64
                && cy < spec.cell_height as i64;
            let crop_alpha = if in_cell {
                crop.raster().get_pixel(cx as u32, cy as u32)[3]
            } else {
                255
            };
            if old != new {
                assert!(in_cell && crop_alpha < 255, "pixel ({px}, {py}) changed");
            }
        }
    }

    #[test]
    fn overflowing_cells_are_clipped_not_rejected() {
        let mut spec = small_spec(1, 10);
        // Column 5 starts at x = 205 and is cut off at 220.
        spec.sheet_width = 220;
        let sheet = compose(&solid_crop(&spec, [10, 20, 30]), &spec);
        assert_eq!(sheet.dimensions(), (220, spec.sheet_height));
        let (_, y) = cell_origin(&spec, 0, 0);
        assert_eq!(
            sheet.get_pixel(219, y as u32 + spec.cell_height / 2),
            &Rgba([10, 20, 30, 255])
        );
    }

    #[test]
    fn crop_is_stretched_to_cell_size() {
        let spec = small_spec(1, 1);
        let raster = RgbaImage::from_pixel(7, 3, Rgba([200, 100, 50, 255]));
        let sheet = compose(&CropResult::new(raster), &spec);
        let (x, y) = cell_origin(&spec, 0, 0);
        let center = sheet.get_pixel(
            (x + spec.cell_width as i64 / 2) as u32,
            (y + spec.cell_height as i64 / 2) as u32,
        );
        for (got, want) in center.0.iter().zip([200u8, 100, 50, 255]) {
            assert!(got.abs_diff(want) <= 1, "{center:?}");
        }
    }

    #[test]
    fn translucent_crop_blends_over_background() {
        let spec = small_spec(1, 1);
        let crop = CropResult::new(RgbaImage::from_pixel(
            spec.cell_width,
            spec.cell_height,
            Rgba([255, 0, 0, 128]),
        ));
        let sheet = compose(&crop, &spec);
        let (x, y) = cell_origin(&spec, 0, 0);
        let mut want = spec.background.to_rgba();
        want.blend(&Rgba([255, 0, 0, 128]));
        assert_eq!(sheet.get_pixel(x as u32 + 10, y as u32 + 10), &want);
    }

    #[test]
    fn outline_at_sheet_corner_is_clipped() {
        let mut spec = small_spec(1, 1);
        spec.margin = 0;
        spec.gap = 0;
        // Origin sits at the sheet corner; the outline half before it is cut.
        let sheet = compose(&solid_crop(&spec, [10, 20, 30]), &spec);
        assert_eq!(sheet.get_pixel(0, 0), &BLACK_PX);
        assert_eq!(sheet.get_pixel(5, 5), &Rgba([10, 20, 30, 255]));
    }
}
