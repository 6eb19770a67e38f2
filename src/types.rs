//! Shared types that flow between the session, the imaging layer and export.

use image::{ImageFormat, RgbaImage};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A MIME type as reported by the upload surface (e.g. `image/jpeg`).
///
/// Stored verbatim (lowercased) so the export can be tagged with exactly what
/// the user uploaded, even when it is not a type we can write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeType(String);

impl MimeType {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_lowercase())
    }

    pub fn png() -> Self {
        Self::new("image/png")
    }

    /// Guess the MIME type from a file extension, like a browser file picker does.
    ///
    /// Unknown extensions map to `application/octet-stream`.
    pub fn from_path(path: &Path) -> Self {
        ImageFormat::from_path(path)
            .map(|f| Self::new(f.to_mime_type()))
            .unwrap_or_else(|_| Self::new("application/octet-stream"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `image` crate format for this MIME type, if it names one.
    pub fn image_format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.0)
    }

    /// Preferred file extension, without the dot. Falls back to `png`.
    pub fn extension(&self) -> &'static str {
        self.image_format()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("png")
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw uploaded bytes plus the MIME type captured at upload time.
///
/// Immutable once loaded; a new upload replaces it wholesale.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub bytes: Arc<[u8]>,
    pub mime: MimeType,
}

impl SourceImage {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: MimeType) -> Self {
        Self {
            bytes: bytes.into(),
            mime,
        }
    }

    /// Read a file from disk, taking its MIME type from the extension.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes, MimeType::from_path(path)))
    }
}

/// The committed crop: a raster at exactly the cell's target size.
#[derive(Debug, Clone)]
pub struct CropResult {
    raster: Arc<RgbaImage>,
}

impl CropResult {
    pub fn new(raster: RgbaImage) -> Self {
        Self {
            raster: Arc::new(raster),
        }
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }
}
