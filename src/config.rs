//! Sheet configuration module.
//!
//! Handles loading, validating, and merging `idsheet.toml`. Stock defaults
//! are overridden by whatever the user file specifies; CLI flags override
//! both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [sheet]
//! paper = "a4"              # a4 (2480x3505), 4x6 (1200x1800), 5x7 (1500x2100)
//!
//! [cell]
//! width = 360               # Crop target size; also fixes the crop aspect ratio
//! height = 450
//!
//! [grid]
//! rows = 1
//! cols = 6
//! gap = 50                  # Space between adjacent cells
//! # margin = 25             # Inset of the first row/column (default: gap / 2)
//! background = "#008080"    # Letterbox color behind each crop
//! outline_width = 5         # Black outline around each cell
//!
//! [crop]
//! auto_crop_area = 1.0      # Fraction of the largest fitting region to select
//!
//! [export]
//! quality = 90              # JPEG/AVIF quality (1-100)
//!
//! [processing]
//! max_processes = 4         # Background workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [grid]
//! rows = 2
//! cols = 3
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::color::Color;
use crate::imaging::{CropOptions, GridCount, GridSpec, PaperSize, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Sheet configuration loaded from `idsheet.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    /// Output canvas preset.
    pub sheet: SheetSection,
    /// Crop target / cell size.
    pub cell: CellConfig,
    /// Grid shape, spacing and colors.
    pub grid: GridConfig,
    /// Initial crop selection.
    pub crop: CropConfig,
    /// Encoder settings.
    pub export: ExportConfig,
    /// Background worker settings.
    pub processing: ProcessingConfig,
}

impl SheetConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell.width == 0 || self.cell.height == 0 {
            return Err(ConfigError::Validation(
                "cell.width and cell.height must be non-zero".into(),
            ));
        }
        if self.export.quality > 100 {
            return Err(ConfigError::Validation(
                "export.quality must be 0-100".into(),
            ));
        }
        let area = self.crop.auto_crop_area;
        if !(area > 0.0 && area <= 1.0) {
            return Err(ConfigError::Validation(
                "crop.auto_crop_area must be in (0, 1]".into(),
            ));
        }
        if self.grid.outline_width > self.cell.width.min(self.cell.height) {
            return Err(ConfigError::Validation(
                "grid.outline_width must not exceed the cell size".into(),
            ));
        }
        Ok(())
    }

    /// Margin applied to the first row/column: explicit, or half the gap.
    pub fn margin(&self) -> u32 {
        self.grid.margin.unwrap_or(self.grid.gap / 2)
    }

    /// The layout engine's view of this config.
    pub fn grid_spec(&self) -> GridSpec {
        let (sheet_width, sheet_height) = self.sheet.paper.dimensions();
        GridSpec {
            rows: self.grid.rows,
            cols: self.grid.cols,
            cell_width: self.cell.width,
            cell_height: self.cell.height,
            gap: self.grid.gap,
            margin: self.margin(),
            background: self.grid.background,
            outline_width: self.grid.outline_width,
            sheet_width,
            sheet_height,
        }
    }

    pub fn crop_options(&self) -> CropOptions {
        CropOptions {
            auto_crop_area: self.crop.auto_crop_area,
            ..CropOptions::default()
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.export.quality)
    }
}

/// Output canvas settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetSection {
    pub paper: PaperSize,
}

/// Cell (crop target) size in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CellConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            width: 360,
            height: 450,
        }
    }
}

/// Grid shape, spacing and colors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub rows: GridCount,
    pub cols: GridCount,
    /// Space between adjacent cells.
    pub gap: u32,
    /// Inset of the first row/column. When absent, half the gap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,
    /// Letterbox color painted behind each crop.
    pub background: Color,
    /// Width of the black outline stroked around each cell.
    pub outline_width: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: GridCount::saturating(1),
            cols: GridCount::saturating(6),
            gap: 50,
            margin: None,
            background: Color::rgb(0x00, 0x80, 0x80),
            outline_width: crate::imaging::DEFAULT_OUTLINE_WIDTH,
        }
    }
}

/// Initial crop selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// Fraction (0, 1] of the largest region of the cell's aspect ratio.
    pub auto_crop_area: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            auto_crop_area: 1.0,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// JPEG/AVIF quality (0 = worst, 100 = best). Lossless formats ignore it.
    pub quality: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Background worker settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of background decode/encode workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SheetConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SheetConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SheetConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
pub fn load_config(path: &Path) -> Result<SheetConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `idsheet.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# idsheet configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output sheet
# ---------------------------------------------------------------------------
[sheet]
# Paper preset: "a4" (2480x3505), "4x6" (1200x1800) or "5x7" (1500x2100).
paper = "a4"

# ---------------------------------------------------------------------------
# Cell size
# ---------------------------------------------------------------------------
[cell]
# The crop is produced at exactly this size, and its aspect ratio is locked
# to width:height (360:450 = 4:5, a common passport ratio).
width = 360
height = 450

# ---------------------------------------------------------------------------
# Grid
# ---------------------------------------------------------------------------
[grid]
rows = 1
cols = 6

# Space between adjacent cells, in pixels.
gap = 50

# Inset of the first row and column. Defaults to half the gap so the outer
# border matches the spacing between cells.
# margin = 25

# Color painted behind each crop (visible wherever the crop is transparent).
# Accepts #rgb, #rrggbb, #rrggbbaa or a basic color name.
background = "#008080"

# Width of the black outline stroked around each cell.
outline_width = 5

# ---------------------------------------------------------------------------
# Crop
# ---------------------------------------------------------------------------
[crop]
# Fraction of the largest region of the cell's aspect ratio to select.
auto_crop_area = 1.0

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Quality for lossy formats (JPEG, AVIF), 1-100.
quality = 90

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum background decode/encode workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
