//! Composition state manager.
//!
//! A [`Session`] owns everything that changes while a user builds a sheet:
//! the uploaded image, the live crop handle, the [`GridSpec`], the committed
//! crop, the composed sheet, the export blob and the tool state. It is the
//! only place that mutates any of them, so every event handler below runs
//! the same sequence:
//!
//! ```text
//! update spec/crop → compose a fresh sheet → drop the old blob → schedule encode
//! ```
//!
//! Handlers never fail. A request that cannot compose (no image yet, no
//! committed crop) is a silent no-op reported as [`ComposeOutcome::Skipped`];
//! the previous sheet stays as it was.
//!
//! Every user control is checked against the current [`Affordances`]. Crop
//! commits only go through while cropping; grid and background changes only
//! while a sheet is composed. A disabled control is skipped with
//! [`SkipReason::ControlDisabled`] and leaves the spec alone. Paper size is
//! a configuration setting rather than a control, so [`Session::set_paper`]
//! applies in either state.
//!
//! ## Background work
//!
//! Decoding an upload and encoding a sheet both run on the rayon pool.
//! [`Session::load_image`] waits for its [`DecodeTask`]; encodes are
//! collected by [`Session::poll`] (non-blocking) or [`Session::settle`]
//! (blocking). See [`crate::export`] for how stale encodes are discarded.
//!
//! ## Example
//!
//! ```no_run
//! use idsheet::config::SheetConfig;
//! use idsheet::imaging::{RustBackend, RustCropProvider};
//! use idsheet::session::Session;
//! use idsheet::types::SourceImage;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let config = SheetConfig::default();
//! let mut session = Session::from_config(
//!     RustCropProvider::new(),
//!     Arc::new(RustBackend::new()),
//!     &config,
//! );
//! session.load_image(SourceImage::from_file(Path::new("me.jpg"))?)?;
//! session.commit_crop();
//! session.on_grid_params_changed("2", "3");
//! session.settle();
//! let download = session.download("me", 1_700_000_000_000);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::color::{Color, ColorParseError};
use crate::config::SheetConfig;
use crate::export::{Download, ExportBlob, Exporter};
use crate::imaging::{
    BackendError, CropOptions, CropProvider, GridCount, GridSpec, ImageBackend, InvalidGridInput,
    PaperSize, Quality, aspect_ratio, compose,
};
use crate::tools::{Affordances, ToolController, ToolState};
use crate::types::{CropResult, MimeType, SourceImage};
use image::{DynamicImage, RgbaImage};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to decode upload: {0}")]
    Decode(#[source] BackendError),
    #[error("Decode task ended without a result")]
    DecodeAborted,
    #[error("Failed to set up crop surface: {0}")]
    CropSetup(#[source] BackendError),
}

/// Why a compose request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoImageLoaded,
    NoCropCommitted,
    /// The control is disabled in the current tool state.
    ControlDisabled,
}

/// Result of an event that may recompose the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// A new sheet was composed and its encode scheduled.
    Composed { generation: u64 },
    Skipped(SkipReason),
}

impl ComposeOutcome {
    pub fn is_composed(self) -> bool {
        matches!(self, ComposeOutcome::Composed { .. })
    }
}

/// Result of a grid change: the compose outcome plus any field that was
/// rejected and left at its previous value.
#[derive(Debug, Clone, PartialEq)]
pub struct GridChange {
    pub outcome: ComposeOutcome,
    pub rejected: Vec<InvalidGridInput>,
}

/// An upload being decoded on the rayon pool.
pub struct DecodeTask {
    rx: Receiver<Result<DynamicImage, BackendError>>,
}

impl DecodeTask {
    pub fn spawn<B: ImageBackend + 'static>(backend: Arc<B>, source: SourceImage) -> Self {
        let (tx, rx) = mpsc::channel();
        rayon::spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| backend.decode(&source)))
                .unwrap_or_else(|_| {
                    Err(BackendError::Decode {
                        mime: source.mime.clone(),
                        reason: "decoder panicked".to_string(),
                    })
                });
            let _ = tx.send(result);
        });
        Self { rx }
    }

    /// Block until the decode finishes.
    pub fn wait(self) -> Result<DynamicImage, SessionError> {
        self.rx
            .recv()
            .map_err(|_| SessionError::DecodeAborted)?
            .map_err(SessionError::Decode)
    }
}

pub struct Session<P: CropProvider, B: ImageBackend + 'static> {
    backend: Arc<B>,
    provider: P,
    crop_options: CropOptions,
    spec: GridSpec,
    source: Option<SourceImage>,
    crop_handle: Option<P::Handle>,
    crop: Option<CropResult>,
    sheet: Option<Arc<RgbaImage>>,
    generation: u64,
    tools: ToolController,
    exporter: Exporter<B>,
}

impl<P: CropProvider, B: ImageBackend + 'static> Session<P, B> {
    pub fn new(
        provider: P,
        backend: Arc<B>,
        spec: GridSpec,
        crop_options: CropOptions,
        quality: Quality,
    ) -> Self {
        let exporter = Exporter::new(Arc::clone(&backend), quality);
        Self {
            backend,
            provider,
            crop_options,
            spec,
            source: None,
            crop_handle: None,
            crop: None,
            sheet: None,
            generation: 0,
            tools: ToolController::new(),
            exporter,
        }
    }

    pub fn from_config(provider: P, backend: Arc<B>, config: &SheetConfig) -> Self {
        Self::new(
            provider,
            backend,
            config.grid_spec(),
            config.crop_options(),
            config.quality(),
        )
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Replace the upload and open a fresh crop surface over it.
    ///
    /// On a decode failure the session is left exactly as it was. The
    /// previous crop surface is destroyed before the new one is configured.
    pub fn load_image(&mut self, source: SourceImage) -> Result<(), SessionError> {
        log::info!("loading {} bytes of {}", source.bytes.len(), source.mime);
        let decoded = DecodeTask::spawn(Arc::clone(&self.backend), source.clone()).wait()?;
        log::debug!("decoded {}x{}", decoded.width(), decoded.height());

        if let Some(handle) = self.crop_handle.take() {
            self.provider.destroy(handle);
        }
        self.crop = None;
        self.tools.reset();

        let aspect = aspect_ratio(self.spec.cell_width, self.spec.cell_height);
        match self
            .provider
            .configure(Arc::new(decoded), aspect, &self.crop_options)
        {
            Ok(handle) => {
                self.crop_handle = Some(handle);
                self.source = Some(source);
                Ok(())
            }
            Err(e) => {
                self.source = None;
                Err(SessionError::CropSetup(e))
            }
        }
    }

    /// Ask the crop provider for a raster at cell size and commit it.
    pub fn commit_crop(&mut self) -> ComposeOutcome {
        if let Some(reason) = self.disabled(self.affordances().crop_controls) {
            log::debug!("crop commit ignored: {reason:?}");
            return ComposeOutcome::Skipped(reason);
        }
        let Some(handle) = self.crop_handle.as_ref() else {
            return ComposeOutcome::Skipped(SkipReason::NoImageLoaded);
        };
        let (width, height) = self.spec.cell_dimensions();
        let raster = self.provider.cropped_raster(handle, width, height);
        self.on_crop_committed(raster.map(CropResult::new))
    }

    /// Store a committed crop and compose. A `None` result keeps the
    /// session in `Cropping` and changes nothing else.
    pub fn on_crop_committed(&mut self, result: Option<CropResult>) -> ComposeOutcome {
        if let Some(reason) = self.disabled(self.affordances().crop_controls) {
            return ComposeOutcome::Skipped(reason);
        }
        let Some(result) = result else {
            log::debug!("crop provider yielded nothing; staying in {}", self.tools.state());
            return ComposeOutcome::Skipped(SkipReason::NoCropCommitted);
        };
        self.crop = Some(result);
        self.tools.on_crop_committed(true);
        self.recompose()
    }

    pub fn on_background_color_changed(&mut self, color: Color) -> ComposeOutcome {
        if let Some(reason) = self.disabled(self.affordances().background_control) {
            log::debug!("background change ignored: {reason:?}");
            return ComposeOutcome::Skipped(reason);
        }
        self.spec.background = color;
        self.recompose()
    }

    /// Parse a free-form color value. An invalid value is rejected and the
    /// current background kept.
    pub fn on_background_input(&mut self, value: &str) -> Result<ComposeOutcome, ColorParseError> {
        let color: Color = value.parse()?;
        Ok(self.on_background_color_changed(color))
    }

    /// Apply raw row/column selections. Each field is validated on its own;
    /// a rejected field keeps its previous value.
    pub fn on_grid_params_changed(&mut self, rows: &str, cols: &str) -> GridChange {
        if let Some(reason) = self.disabled(self.affordances().grid_controls) {
            log::debug!("grid change ignored: {reason:?}");
            return GridChange {
                outcome: ComposeOutcome::Skipped(reason),
                rejected: Vec::new(),
            };
        }
        let mut rejected = Vec::new();
        match rows.parse::<GridCount>() {
            Ok(rows) => self.spec.rows = rows,
            Err(e) => {
                log::warn!("keeping {} rows: {e}", self.spec.rows);
                rejected.push(e);
            }
        }
        match cols.parse::<GridCount>() {
            Ok(cols) => self.spec.cols = cols,
            Err(e) => {
                log::warn!("keeping {} columns: {e}", self.spec.cols);
                rejected.push(e);
            }
        }
        GridChange {
            outcome: self.recompose(),
            rejected,
        }
    }

    pub fn set_grid(&mut self, rows: GridCount, cols: GridCount) -> ComposeOutcome {
        if let Some(reason) = self.disabled(self.affordances().grid_controls) {
            return ComposeOutcome::Skipped(reason);
        }
        self.spec.rows = rows;
        self.spec.cols = cols;
        self.recompose()
    }

    pub fn set_paper(&mut self, paper: PaperSize) -> ComposeOutcome {
        self.spec = self.spec.clone().with_paper(paper);
        self.recompose()
    }

    /// Go back to cropping. The committed crop is dropped; the old sheet is
    /// kept but hidden, and download stays disabled until the next commit.
    pub fn request_recrop(&mut self) -> bool {
        let changed = self.tools.on_recrop_requested();
        if changed {
            self.crop = None;
        }
        changed
    }

    /// Apply finished encodes without blocking.
    pub fn poll(&mut self) {
        self.exporter.poll();
    }

    /// Wait for every scheduled encode to report.
    pub fn settle(&mut self) {
        self.exporter.settle();
    }

    /// The download action: the current blob named for `context`, or
    /// `None` when download is disabled or no encode has landed.
    pub fn download(&mut self, context: &str, unix_millis: u128) -> Option<Download> {
        self.poll();
        if !self.tools.affordances().download {
            return None;
        }
        let blob = self.exporter.blob()?.clone();
        Some(Download::new(context, unix_millis, blob))
    }

    /// Why a control cannot be used right now, if it cannot.
    fn disabled(&self, enabled: bool) -> Option<SkipReason> {
        if self.source.is_none() {
            Some(SkipReason::NoImageLoaded)
        } else if !enabled {
            Some(SkipReason::ControlDisabled)
        } else {
            None
        }
    }

    fn recompose(&mut self) -> ComposeOutcome {
        let Some(source) = self.source.as_ref() else {
            return ComposeOutcome::Skipped(SkipReason::NoImageLoaded);
        };
        let Some(crop) = self.crop.as_ref() else {
            return ComposeOutcome::Skipped(SkipReason::NoCropCommitted);
        };

        self.generation += 1;
        let sheet = Arc::new(compose(crop, &self.spec));
        log::debug!(
            "composed sheet #{}: {}x{} cells on {}x{}",
            self.generation,
            self.spec.cols,
            self.spec.rows,
            self.spec.sheet_width,
            self.spec.sheet_height
        );
        self.exporter.invalidate(self.generation);
        self.exporter
            .schedule(Arc::clone(&sheet), &source.mime, self.generation);
        self.sheet = Some(sheet);

        ComposeOutcome::Composed {
            generation: self.generation,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn source_mime(&self) -> Option<&MimeType> {
        self.source.as_ref().map(|s| &s.mime)
    }

    pub fn crop(&self) -> Option<&CropResult> {
        self.crop.as_ref()
    }

    /// The most recent sheet, whether or not it is currently shown.
    pub fn sheet(&self) -> Option<&RgbaImage> {
        self.sheet.as_deref()
    }

    /// The sheet as the user sees it: `None` while cropping.
    pub fn visible_sheet(&self) -> Option<&RgbaImage> {
        if self.tools.affordances().sheet_visible {
            self.sheet()
        } else {
            None
        }
    }

    pub fn export_blob(&self) -> Option<&ExportBlob> {
        self.exporter.blob()
    }

    /// Generation of the newest composed sheet; 0 before the first compose.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_encodes(&self) -> usize {
        self.exporter.in_flight()
    }

    pub fn tool_state(&self) -> ToolState {
        self.tools.state()
    }

    pub fn affordances(&self) -> Affordances {
        self.tools.affordances()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: CropProvider, B: ImageBackend + 'static> Drop for Session<P, B> {
    fn drop(&mut self) {
        if let Some(handle) = self.crop_handle.take() {
            self.provider.destroy(handle);
        }
    }
}
