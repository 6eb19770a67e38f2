//! Codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two byte-level operations the
//! session needs: decode an upload into pixels, and encode a composed sheet
//! into an exportable file.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::Quality;
use crate::types::{MimeType, SourceImage};
use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {mime} image: {reason}")]
    Decode { mime: MimeType, reason: String },
    #[error("Failed to encode {mime}: {reason}")]
    Encode { mime: MimeType, reason: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Bytes produced by an encode, tagged with the MIME type actually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: MimeType,
}

/// Trait for codec backends.
///
/// `Send + Sync` because decodes and encodes run on the rayon pool.
pub trait ImageBackend: Send + Sync {
    /// Decode uploaded bytes into pixels.
    fn decode(&self, source: &SourceImage) -> Result<DynamicImage, BackendError>;

    /// Encode a sheet, preferring `mime`. A backend that cannot write `mime`
    /// falls back to PNG and says so in [`EncodedImage::mime`].
    fn encode(
        &self,
        sheet: &RgbaImage,
        mime: &MimeType,
        quality: Quality,
    ) -> Result<EncodedImage, BackendError>;
}
