//! Export file naming.
//!
//! Downloads are named `<context>_IMG_<unix-millis>.<ext>`:
//!
//! - `context` identifies where the sheet came from (the CLI uses the input
//!   file stem). It is reduced to a filename-safe slug.
//! - the millisecond timestamp keeps repeated exports from colliding.
//! - `ext` follows the blob's MIME type, so a JPEG upload exports as `.jpg`.
//!
//! ```text
//! "Passport Photo"            → Passport-Photo_IMG_1700000000000.jpg
//! "file:///home/me/app.html"  → file-home-me-app-html_IMG_1700000000000.png
//! ""                          → idsheet_IMG_1700000000000.png
//! ```

use crate::types::MimeType;
use std::time::{SystemTime, UNIX_EPOCH};

/// Context used when the caller supplies nothing usable.
const FALLBACK_CONTEXT: &str = "idsheet";

/// Reduce an arbitrary context string to `[A-Za-z0-9_-]`.
///
/// Runs of other characters collapse to a single `-`; leading and trailing
/// dashes are trimmed.
pub fn sanitize_context(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_CONTEXT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build the download file name for an export.
pub fn export_file_name(context: &str, unix_millis: u128, mime: &MimeType) -> String {
    format!(
        "{}_IMG_{}.{}",
        sanitize_context(context),
        unix_millis,
        mime.extension()
    )
}

/// Milliseconds since the Unix epoch. A clock before 1970 yields 0.
pub fn unix_millis_now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
