//! Export encoding and the download action.
//!
//! Encoding is asynchronous: each composed sheet is handed to the rayon pool
//! and the result comes back over a channel, the same way long-running work
//! reports progress elsewhere in the pipeline. Nothing blocks the caller
//! until it asks to [`settle`](Exporter::settle).
//!
//! ## Generations
//!
//! Every compose is numbered. [`Exporter::invalidate`] drops the current blob
//! and records the newest generation; an encode result is stored only if
//! it carries that generation. Overlapping encodes may finish in any order,
//! but a result for an older sheet is discarded instead of overwriting a
//! newer one, so the stored blob never lags the sheet on screen.
//!
//! The stored blob is replaced by a single assignment from the owning
//! context, so a download can never observe a partially written blob.

use crate::imaging::{BackendError, EncodedImage, ImageBackend, Quality};
use crate::naming::export_file_name;
use crate::types::MimeType;
use image::RgbaImage;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

/// Encoded sheet ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    bytes: Arc<[u8]>,
    mime: MimeType,
    generation: u64,
}

impl ExportBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: MimeType, generation: u64) -> Self {
        Self {
            bytes: bytes.into(),
            mime,
            generation,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &MimeType {
        &self.mime
    }

    /// The compose this blob was encoded from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the download action hands to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub blob: ExportBlob,
}

impl Download {
    pub fn new(context: &str, unix_millis: u128, blob: ExportBlob) -> Self {
        Self {
            file_name: export_file_name(context, unix_millis, blob.mime()),
            blob,
        }
    }
}

/// Result of one background encode.
struct EncodeOutcome {
    generation: u64,
    result: Result<EncodedImage, BackendError>,
}

/// Schedules sheet encodes and keeps the blob for the newest sheet.
pub struct Exporter<B: ImageBackend + 'static> {
    backend: Arc<B>,
    quality: Quality,
    tx: Sender<EncodeOutcome>,
    rx: Receiver<EncodeOutcome>,
    in_flight: usize,
    latest: u64,
    blob: Option<ExportBlob>,
}

impl<B: ImageBackend + 'static> Exporter<B> {
    pub fn new(backend: Arc<B>, quality: Quality) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            quality,
            tx,
            rx,
            in_flight: 0,
            latest: 0,
            blob: None,
        }
    }

    /// Forget the current blob; only results for `generation` are accepted from now on.
    pub fn invalidate(&mut self, generation: u64) {
        self.latest = generation;
        self.blob = None;
    }

    /// Encode `sheet` in the background, tagged with `generation`.
    pub fn schedule(&mut self, sheet: Arc<RgbaImage>, mime: &MimeType, generation: u64) {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let mime = mime.clone();
        let quality = self.quality;
        self.in_flight += 1;
        log::debug!("scheduling encode #{generation} as {mime}");

        rayon::spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                backend.encode(&sheet, &mime, quality)
            }))
            .unwrap_or_else(|_| {
                Err(BackendError::Encode {
                    mime: mime.clone(),
                    reason: "encoder panicked".to_string(),
                })
            });
            // The receiver lives as long as the exporter; a send error only
            // means the session is gone.
            let _ = tx.send(EncodeOutcome { generation, result });
        });
    }

    /// Apply every encode that has finished, without blocking.
    pub fn poll(&mut self) {
        while let Ok(outcome) = self.rx.try_recv() {
            self.apply(outcome);
        }
    }

    /// Block until every scheduled encode has reported.
    pub fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(outcome) => self.apply(outcome),
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, outcome: EncodeOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome.result {
            Ok(encoded) if outcome.generation == self.latest => {
                log::debug!(
                    "encode #{} ready: {} bytes of {}",
                    outcome.generation,
                    encoded.bytes.len(),
                    encoded.mime
                );
                self.blob = Some(ExportBlob::new(
                    encoded.bytes,
                    encoded.mime,
                    outcome.generation,
                ));
            }
            Ok(_) => {
                log::debug!(
                    "discarding encode #{} (newest sheet is #{})",
                    outcome.generation,
                    self.latest
                );
            }
            Err(e) => {
                log::warn!("encode #{} failed: {e}", outcome.generation);
            }
        }
    }

    /// The blob for the newest sheet, if its encode has landed.
    pub fn blob(&self) -> Option<&ExportBlob> {
        self.blob.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::RustBackend;

    fn sheet(width: u32, height: u32) -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(width, height))
    }

    #[test]
    fn settled_encode_produces_blob_with_mime() {
        let mut exporter = Exporter::new(Arc::new(MockBackend::new()), Quality::default());
        exporter.invalidate(1);
        exporter.schedule(sheet(4, 3), &MimeType::new("image/jpeg"), 1);
        exporter.settle();

        let blob = exporter.blob().unwrap();
        assert_eq!(blob.mime().as_str(), "image/jpeg");
        assert_eq!(blob.generation(), 1);
        assert_eq!(exporter.in_flight(), 0);
    }

    #[test]
    fn invalidate_clears_blob() {
        let mut exporter = Exporter::new(Arc::new(MockBackend::new()), Quality::default());
        exporter.invalidate(1);
        exporter.schedule(sheet(4, 3), &MimeType::png(), 1);
        exporter.settle();
        assert!(exporter.blob().is_some());

        exporter.invalidate(2);
        assert!(exporter.blob().is_none());
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut exporter = Exporter::new(Arc::new(MockBackend::new()), Quality::default());
        exporter.invalidate(1);
        exporter.schedule(sheet(1, 1), &MimeType::png(), 1);
        exporter.invalidate(2);
        exporter.schedule(sheet(2, 2), &MimeType::png(), 2);
        exporter.settle();

        let blob = exporter.blob().unwrap();
        assert_eq!(blob.generation(), 2);
        // MockBackend writes the sheet size into the blob.
        assert_eq!(&blob.bytes()[..4], &2u32.to_le_bytes());
    }

    #[test]
    fn failed_encode_leaves_no_blob() {
        let mut exporter =
            Exporter::new(Arc::new(MockBackend::failing_encode()), Quality::default());
        exporter.invalidate(1);
        exporter.schedule(sheet(4, 3), &MimeType::png(), 1);
        exporter.settle();

        assert!(exporter.blob().is_none());
        assert_eq!(exporter.in_flight(), 0);
    }

    #[test]
    fn settle_without_work_returns_immediately() {
        let mut exporter = Exporter::new(Arc::new(RustBackend::new()), Quality::default());
        exporter.settle();
        exporter.poll();
        assert!(exporter.blob().is_none());
    }

    #[test]
    fn real_backend_encodes_png() {
        let mut exporter = Exporter::new(Arc::new(RustBackend::new()), Quality::default());
        exporter.invalidate(7);
        exporter.schedule(sheet(10, 10), &MimeType::png(), 7);
        exporter.settle();
        let blob = exporter.blob().unwrap();
        assert_eq!(
            image::guess_format(blob.bytes()).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn download_names_file_from_blob_mime() {
        let blob = ExportBlob::new(vec![1u8, 2, 3], MimeType::new("image/jpeg"), 3);
        let download = Download::new("passport", 1_700_000_000_000, blob);
        assert_eq!(download.file_name, "passport_IMG_1700000000000.jpg");
        assert_eq!(download.blob.len(), 3);
    }
}
