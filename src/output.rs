//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Layout
//!
//! ```text
//! Sheet 2480x3505 (a4)
//! Grid 1 row x 8 cols, cells 360x450
//!     001 r1 c1 at (25, 25)
//!     ...
//!     007 r1 c7 at (2485, 25) [clipped]
//!     008 r1 c8 at (2895, 25) [clipped]
//! 8 cells, 2 clipped (fits up to 7 rows x 6 cols)
//! ```
//!
//! ## Compose
//!
//! ```text
//! Sheet 2480x3505, 2 rows x 3 cols
//!     Saved: out/me_IMG_1700000000000.jpg
//!     Type: image/jpeg
//!     Size: 412.7 KB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::export::Download;
use crate::imaging::{GridPlan, GridSpec, PaperSize};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// `1 row`, `3 rows`.
fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Human-readable byte count.
fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

// ============================================================================
// layout
// ============================================================================

/// Format a grid plan, one line per cell in row-major order.
pub fn format_layout(plan: &GridPlan, paper: Option<PaperSize>) -> Vec<String> {
    let mut lines = Vec::new();
    match paper {
        Some(p) => lines.push(format!(
            "Sheet {}x{} ({})",
            plan.sheet_width, plan.sheet_height, p
        )),
        None => lines.push(format!("Sheet {}x{}", plan.sheet_width, plan.sheet_height)),
    }

    let cell_size = plan
        .cells
        .first()
        .map(|c| format!(", cells {}x{}", c.width, c.height))
        .unwrap_or_default();
    lines.push(format!(
        "Grid {} x {}{}",
        plural(plan.rows, "row"),
        plural(plan.cols, "col"),
        cell_size
    ));

    for (i, cell) in plan.cells.iter().enumerate() {
        let mut line = format!(
            "    {} r{} c{} at ({}, {})",
            format_index(i + 1),
            cell.row + 1,
            cell.col + 1,
            cell.x,
            cell.y
        );
        if !cell.inside {
            line.push_str(" [clipped]");
        }
        lines.push(line);
    }

    lines.push(format!(
        "{} cells, {} clipped (fits up to {} x {})",
        plan.cells.len(),
        plan.clipped,
        plural(plan.max_rows, "row"),
        plural(plan.max_cols, "col")
    ));
    lines
}

pub fn print_layout(plan: &GridPlan, paper: Option<PaperSize>) {
    for line in format_layout(plan, paper) {
        println!("{}", line);
    }
}

// ============================================================================
// compose
// ============================================================================

/// Format the result of a compose run: the sheet and where it was written.
pub fn format_export(spec: &GridSpec, download: &Download, saved_to: &Path) -> Vec<String> {
    vec![
        format!(
            "Sheet {}x{}, {} x {}",
            spec.sheet_width,
            spec.sheet_height,
            plural(spec.rows.get(), "row"),
            plural(spec.cols.get(), "col")
        ),
        format!("    Saved: {}", saved_to.display()),
        format!("    Type: {}", download.blob.mime()),
        format!("    Size: {}", format_size(download.blob.len())),
    ]
}

pub fn print_export(spec: &GridSpec, download: &Download, saved_to: &Path) {
    for line in format_export(spec, download, saved_to) {
        println!("{}", line);
    }
}
