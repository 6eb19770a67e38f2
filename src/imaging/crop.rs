//! The crop seam: selecting a fixed-aspect region and materializing it.
//!
//! The session never touches crop geometry itself. It talks to a
//! [`CropProvider`], which owns the crop surface for one image at a time:
//!
//! 1. `configure` sets up a surface over a decoded image at an aspect ratio
//! 2. `cropped_raster` materializes the current selection at an exact size
//! 3. `destroy` tears the surface down before another one is configured
//!
//! [`RustCropProvider`] is the non-interactive implementation used by the
//! CLI: the selection starts as the largest centered region of the requested
//! aspect ratio (scaled by `auto_crop_area`) and can be nudged by an offset.

use super::backend::BackendError;
use super::calculations::{calculate_crop_region, offset_crop_region};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::sync::Arc;

/// Crop region in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// How the crop surface is initialized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropOptions {
    /// Fraction (0, 1] of the largest fitting region the selection covers.
    pub auto_crop_area: f64,
    /// Pixel offset applied to the centered selection, clamped inside the image.
    pub offset: (i64, i64),
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            auto_crop_area: 1.0,
            offset: (0, 0),
        }
    }
}

/// An interactive (or scripted) crop surface.
///
/// Implementations own the surface between `configure` and `destroy`; the
/// session guarantees at most one live handle.
pub trait CropProvider {
    type Handle;

    /// Set up a crop surface over `image` locked to `aspect` (width, height).
    fn configure(
        &mut self,
        image: Arc<DynamicImage>,
        aspect: (u32, u32),
        options: &CropOptions,
    ) -> Result<Self::Handle, BackendError>;

    /// Materialize the current selection at exactly `width` x `height`.
    ///
    /// Returns `None` when there is nothing to crop.
    fn cropped_raster(
        &mut self,
        handle: &Self::Handle,
        width: u32,
        height: u32,
    ) -> Option<RgbaImage>;

    /// Tear the surface down.
    fn destroy(&mut self, handle: Self::Handle);
}

/// A configured crop surface for [`RustCropProvider`].
#[derive(Debug, Clone)]
pub struct CropSurface {
    image: Arc<DynamicImage>,
    region: CropRegion,
}

impl CropSurface {
    pub fn region(&self) -> CropRegion {
        self.region
    }
}

/// Deterministic crop provider backed by the `image` crate.
#[derive(Debug, Default)]
pub struct RustCropProvider {
    live_surfaces: usize,
}

impl RustCropProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of surfaces configured and not yet destroyed.
    pub fn live_surfaces(&self) -> usize {
        self.live_surfaces
    }
}

impl CropProvider for RustCropProvider {
    type Handle = CropSurface;

    fn configure(
        &mut self,
        image: Arc<DynamicImage>,
        aspect: (u32, u32),
        options: &CropOptions,
    ) -> Result<CropSurface, BackendError> {
        if aspect.0 == 0 || aspect.1 == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "invalid crop aspect ratio {}:{}",
                aspect.0, aspect.1
            )));
        }
        let dims = image.dimensions();
        let centered = calculate_crop_region(dims, aspect, options.auto_crop_area);
        let (dx, dy) = options.offset;
        let region = offset_crop_region(dims, centered, dx, dy);
        log::debug!(
            "crop surface over {}x{} image: {}x{} at ({}, {})",
            dims.0,
            dims.1,
            region.width,
            region.height,
            region.x,
            region.y
        );
        self.live_surfaces += 1;
        Ok(CropSurface { image, region })
    }

    fn cropped_raster(
        &mut self,
        handle: &CropSurface,
        width: u32,
        height: u32,
    ) -> Option<RgbaImage> {
        let r = handle.region;
        if !r.is_valid() || width == 0 || height == 0 {
            return None;
        }
        let selected = handle.image.crop_imm(r.x, r.y, r.width, r.height);
        let raster = if selected.dimensions() == (width, height) {
            selected.to_rgba8()
        } else {
            selected
                .resize_exact(width, height, FilterType::Lanczos3)
                .to_rgba8()
        };
        Some(raster)
    }

    fn destroy(&mut self, handle: CropSurface) {
        drop(handle);
        self.live_surfaces = self.live_surfaces.saturating_sub(1);
    }
}
