//! Codec backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` (content sniffing, MIME as fallback hint) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (RGB, configurable quality) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → TIFF | `image::codecs::tiff::TiffEncoder` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! Any other MIME type is written as PNG, the same fallback a browser canvas
//! applies when asked for a type it cannot produce.

use super::backend::{BackendError, EncodedImage, ImageBackend};
use super::params::Quality;
use crate::types::{MimeType, SourceImage};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Formats the encoder can write, in MIME-lookup order.
const WRITABLE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Tiff,
    ImageFormat::Avif,
];

/// Whether [`RustBackend`] can write `mime` without falling back to PNG.
pub fn can_encode(mime: &MimeType) -> bool {
    mime.image_format()
        .is_some_and(|f| WRITABLE_FORMATS.contains(&f))
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_error(mime: &MimeType, e: impl std::fmt::Display) -> BackendError {
    BackendError::Encode {
        mime: mime.clone(),
        reason: e.to_string(),
    }
}

/// Encode a sheet in `format`, which must be one of [`WRITABLE_FORMATS`].
fn encode_as(
    sheet: &RgbaImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let img = DynamicImage::ImageRgba8(sheet.clone());
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel; sheets are composed on an opaque base.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            rgb.write_with_encoder(encoder)?;
        }
        ImageFormat::WebP => {
            let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut buf);
            img.write_with_encoder(encoder)?;
        }
        ImageFormat::Tiff => {
            let encoder = image::codecs::tiff::TiffEncoder::new(Cursor::new(&mut buf));
            img.write_with_encoder(encoder)?;
        }
        ImageFormat::Avif => {
            let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
                &mut buf,
                6,
                quality.value() as u8,
            );
            img.write_with_encoder(encoder)?;
        }
        _ => {
            let encoder = image::codecs::png::PngEncoder::new(&mut buf);
            img.write_with_encoder(encoder)?;
        }
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn decode(&self, source: &SourceImage) -> Result<DynamicImage, BackendError> {
        let sniffed = image::load_from_memory(&source.bytes);
        match (sniffed, source.mime.image_format()) {
            (Ok(img), _) => Ok(img),
            (Err(_), Some(format)) => image::load_from_memory_with_format(&source.bytes, format)
                .map_err(|e| BackendError::Decode {
                    mime: source.mime.clone(),
                    reason: e.to_string(),
                }),
            (Err(e), None) => Err(BackendError::Decode {
                mime: source.mime.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn encode(
        &self,
        sheet: &RgbaImage,
        mime: &MimeType,
        quality: Quality,
    ) -> Result<EncodedImage, BackendError> {
        let (format, written) = match mime.image_format() {
            Some(f) if WRITABLE_FORMATS.contains(&f) => (f, mime.clone()),
            _ => {
                log::warn!("cannot encode {mime}; exporting as image/png");
                (ImageFormat::Png, MimeType::png())
            }
        };
        let bytes = encode_as(sheet, format, quality).map_err(|e| encode_error(&written, e))?;
        Ok(EncodedImage {
            bytes,
            mime: written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn sheet(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    fn encoded_format(bytes: &[u8]) -> ImageFormat {
        image::guess_format(bytes).unwrap()
    }

    #[test]
    fn writable_formats() {
        for mime in ["image/png", "image/jpeg", "image/webp", "image/tiff", "image/avif"] {
            assert!(can_encode(&MimeType::new(mime)), "{mime} should be writable");
        }
        assert!(!can_encode(&MimeType::new("image/gif")));
        assert!(!can_encode(&MimeType::new("application/octet-stream")));
    }

    #[test]
    fn encode_png_keeps_pixels() {
        let backend = RustBackend::new();
        let src = sheet(20, 10);
        let out = backend
            .encode(&src, &MimeType::png(), Quality::default())
            .unwrap();
        assert_eq!(out.mime, MimeType::png());
        assert_eq!(encoded_format(&out.bytes), ImageFormat::Png);

        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgba8();
        assert_eq!(decoded, src);
    }

    #[test]
    fn encode_jpeg_drops_alpha() {
        let backend = RustBackend::new();
        let out = backend
            .encode(&sheet(32, 16), &MimeType::new("image/jpeg"), Quality::new(85))
            .unwrap();
        assert_eq!(out.mime.as_str(), "image/jpeg");
        assert_eq!(encoded_format(&out.bytes), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
    }

    #[test]
    fn encode_webp() {
        let backend = RustBackend::new();
        let out = backend
            .encode(&sheet(8, 8), &MimeType::new("image/webp"), Quality::default())
            .unwrap();
        assert_eq!(encoded_format(&out.bytes), ImageFormat::WebP);
    }

    #[test]
    fn encode_unknown_mime_falls_back_to_png() {
        let backend = RustBackend::new();
        let out = backend
            .encode(&sheet(4, 4), &MimeType::new("image/gif"), Quality::default())
            .unwrap();
        assert_eq!(out.mime, MimeType::png());
        assert_eq!(encoded_format(&out.bytes), ImageFormat::Png);
    }

    #[test]
    fn decode_round_trips_through_png() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&sheet(6, 9), &MimeType::png(), Quality::default())
            .unwrap();
        let source = SourceImage::new(encoded.bytes, MimeType::png());
        let img = backend.decode(&source).unwrap();
        assert_eq!(img.dimensions(), (6, 9));
    }

    #[test]
    fn decode_sniffs_content_over_mime() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&sheet(5, 5), &MimeType::png(), Quality::default())
            .unwrap();
        // Labeled JPEG, actually PNG
        let source = SourceImage::new(encoded.bytes, MimeType::new("image/jpeg"));
        assert!(backend.decode(&source).is_ok());
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        let source = SourceImage::new(vec![0u8, 1, 2, 3, 4], MimeType::new("image/jpeg"));
        assert!(matches!(
            backend.decode(&source),
            Err(BackendError::Decode { .. })
        ));
    }
}
