//! Image processing on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode upload** | `image::load_from_memory` |
//! | **Crop** | `crop_imm` + `resize_exact` (Lanczos3) |
//! | **Compose sheet** | custom fill / paint / stroke over an `RgbaImage` |
//! | **Encode export** | `image` codecs, format chosen by MIME type |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for grid and crop geometry (unit testable)
//! - **Parameters**: Data structures describing a sheet
//! - **Compose**: The grid layout engine
//! - **Crop**: [`CropProvider`] trait + [`RustCropProvider`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod compose;
pub mod crop;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, EncodedImage, ImageBackend};
pub use calculations::{
    CellPlacement, GridPlan, aspect_ratio, calculate_crop_region, cell_origin,
    max_fitting_grid, offset_crop_region, plan_grid,
};
pub use compose::compose;
pub use crop::{CropOptions, CropProvider, CropRegion, CropSurface, RustCropProvider};
pub use params::{
    DEFAULT_OUTLINE_WIDTH, GridCount, GridSpec, InvalidGridInput, MAX_GRID_COUNT, PaperSize,
    Quality,
};
pub use rust_backend::RustBackend;
