//! # idsheet
//!
//! Turn one portrait into a printable sheet of identical ID photos. The user
//! uploads an image, picks a crop at a fixed aspect ratio, and the crop is
//! tiled onto a paper-sized canvas as a grid of outlined cells with a
//! configurable background. The sheet is encoded in the upload's own format
//! and offered for download.
//!
//! # Architecture: One Owned Session
//!
//! Every user action is an event applied to a single [`session::Session`]:
//!
//! ```text
//! upload        →  decode (rayon)  →  crop surface configured   [Cropping]
//! commit crop   →  compose sheet   →  encode (rayon)            [Composed]
//! grid / color  →  compose sheet   →  encode (rayon)
//! re-crop       →                                               [Cropping]
//! download      →  newest blob, named <context>_IMG_<millis>.<ext>
//! ```
//!
//! The session is the only owner of mutable state. Collaborators are injected
//! at the two seams that touch the outside world:
//!
//! - [`imaging::CropProvider`]: the interactive crop component. The CLI uses
//!   the deterministic [`imaging::RustCropProvider`].
//! - [`imaging::ImageBackend`]: decode and encode. [`imaging::RustBackend`]
//!   does both with the `image` crate.
//!
//! Tests substitute recording mocks for both.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Composition state manager: owns spec, crop, sheet, blob and tool state |
//! | [`tools`] | Two-state tool controller and the controls each state enables |
//! | [`export`] | Background encodes tagged by generation, and the download action |
//! | [`imaging`] | Grid layout engine, crop geometry, codec backend |
//! | [`config`] | `idsheet.toml` loading, merging onto stock defaults, validation |
//! | [`color`] | Background color values (`#rgb`, `#rrggbb`, CSS names) |
//! | [`types`] | Uploads, MIME types, committed crops |
//! | [`naming`] | Export file names |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Recompose Everything, Every Time
//!
//! Any change to the crop, the grid or the background redraws the whole sheet
//! into a fresh buffer and re-encodes it. A sheet is a few dozen rectangles;
//! there is nothing to gain from patching pixels in place, and a fresh buffer
//! means a stale cell can never survive a grid change.
//!
//! ## Newest Sheet Wins
//!
//! Encodes run in the background and may finish out of order. Each compose
//! bumps a generation number and the export layer only keeps a blob whose
//! generation matches the newest sheet, so the download always matches what
//! is on screen. Between a compose and its encode there is no blob at all,
//! and download does nothing.
//!
//! ## Validated Grid Input
//!
//! Row and column selections arrive as text. They are parsed into
//! [`imaging::GridCount`] (1 to 32); anything else is rejected per field and
//! the previous value kept, rather than letting a non-number reach the
//! layout math.
//!
//! ## Overflow Clips
//!
//! A grid larger than the paper is not an error. Cells past the edge are
//! drawn as far as the canvas allows. [`imaging::plan_grid`] reports which
//! cells are clipped so the CLI can say so.

pub mod color;
pub mod config;
pub mod export;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod session;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
