//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Operations (`retouch ops`)
//!
//! ```text
//! Basic
//!     brightness
//!         amount: float -255..=255 (default 0) additive shift in 8-bit units
//!     crop
//!         x: int 0..=4294967295 (default 0) left edge
//!         w: int 1..=4294967295 (required) width
//! ```
//!
//! ## Presets (`retouch presets`)
//!
//! ```text
//! noir: High-contrast black and white
//!     Variables: contrast = 1.4
//!     Steps: grayscale → contrast → levels → vignette
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 a.jpg → out/a-edited.png (640x480, 35ms)
//! 002 bad.jpg FAILED: failed to decode bad.jpg: ...
//! 003 c.jpg skipped (output exists)
//!
//! Processed 1 of 3 images: 1 failed, 1 skipped
//! ```
//!
//! # Architecture
//!
//! Each listing has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary, SkipReason};
use crate::editing::{Category, OperationKind, PixelBuffer, Pipeline, PresetLibrary, schema};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Registry listing
// ============================================================================

const CATEGORIES: [Category; 4] = [
    Category::Basic,
    Category::Artistic,
    Category::Tone,
    Category::Special,
];

/// Every registered operation grouped by category, with its parameters.
pub fn format_registry() -> Vec<String> {
    let mut lines = Vec::new();
    for category in CATEGORIES {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        let mut title = category.to_string();
        if let Some(first) = title.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        lines.push(title);
        for kind in OperationKind::ALL.iter().filter(|k| k.category() == category) {
            lines.push(format!("{}{}", indent(1), kind));
            for spec in schema(*kind) {
                lines.push(format!(
                    "{}{}: {} ({}) {}",
                    indent(2),
                    spec.name,
                    spec.ty.describe(),
                    match spec.default.value() {
                        Some(v) => format!("default {v}"),
                        None => "required".to_string(),
                    },
                    spec.doc
                ));
            }
        }
    }
    lines
}

pub fn print_registry() {
    for line in format_registry() {
        println!("{}", line);
    }
}

// ============================================================================
// Preset listing
// ============================================================================

pub fn format_presets(library: &PresetLibrary) -> Vec<String> {
    let mut lines = Vec::new();
    for preset in library.iter() {
        if preset.description.is_empty() {
            lines.push(preset.name.clone());
        } else {
            lines.push(format!("{}: {}", preset.name, preset.description));
        }
        if !preset.variables.is_empty() {
            let vars: Vec<String> = preset
                .variables
                .iter()
                .map(|v| match &v.default {
                    Some(default) => format!("{} = {}", v.name, default),
                    None => format!("{} (required)", v.name),
                })
                .collect();
            lines.push(format!("{}Variables: {}", indent(1), vars.join(", ")));
        }
        let steps: Vec<&str> = preset.steps.iter().map(|s| s.kind.as_str()).collect();
        lines.push(format!("{}Steps: {}", indent(1), steps.join(" → ")));
    }
    lines
}

pub fn print_presets(library: &PresetLibrary) {
    for line in format_presets(library) {
        println!("{}", line);
    }
}

// ============================================================================
// Single-image edits
// ============================================================================

/// Summary of one `apply` or `preset` run.
///
/// ```text
/// photo.jpg (800x600) → photo-noir.png (800x600)
///     000 grayscale
///     001 contrast factor=1.4
/// ```
pub fn format_edit(
    input: &Path,
    before: &PixelBuffer,
    output: &Path,
    after: &PixelBuffer,
    pipeline: &Pipeline,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}x{}) → {} ({}x{})",
        file_name(input),
        before.width(),
        before.height(),
        output.display(),
        after.width(),
        after.height()
    )];
    for (i, op) in pipeline.operations().iter().enumerate() {
        let params: Vec<String> = op
            .params()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        let mut line = format!("{}{:0>3} {}", indent(1), i, op.kind());
        if !params.is_empty() {
            line.push(' ');
            line.push_str(&params.join(" "));
        }
        lines.push(line);
    }
    lines
}

pub fn print_edit(
    input: &Path,
    before: &PixelBuffer,
    output: &Path,
    after: &PixelBuffer,
    pipeline: &Pipeline,
) {
    for line in format_edit(input, before, output, after, pipeline) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch output
// ============================================================================

/// Format a single batch progress event. `Started` prints nothing; the
/// outcome line follows when the job ends.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { .. } => Vec::new(),
        BatchEvent::Finished {
            index,
            source,
            output,
            dimensions: (w, h),
            elapsed_ms,
        } => vec![format!(
            "{} {} → {} ({}x{}, {}ms)",
            format_index(*index),
            file_name(source),
            output.display(),
            w,
            h,
            elapsed_ms
        )],
        BatchEvent::Failed {
            index,
            source,
            error,
        } => vec![format!(
            "{} {} FAILED: {}",
            format_index(*index),
            file_name(source),
            error
        )],
        BatchEvent::Skipped {
            index,
            source,
            reason,
        } => {
            let why = match reason {
                SkipReason::OutputExists => "output exists",
                SkipReason::Cancelled => "cancelled",
            };
            vec![format!(
                "{} {} skipped ({})",
                format_index(*index),
                file_name(source),
                why
            )]
        }
    }
}

pub fn format_summary(summary: &BatchSummary) -> Vec<String> {
    let mut detail = Vec::new();
    if summary.failed() > 0 {
        detail.push(format!("{} failed", summary.failed()));
    }
    if summary.skipped > 0 {
        detail.push(format!("{} skipped", summary.skipped));
    }
    if summary.cancelled > 0 {
        detail.push(format!("{} cancelled", summary.cancelled));
    }
    let mut line = format!(
        "Processed {} of {} images",
        summary.processed, summary.total
    );
    if !detail.is_empty() {
        line.push_str(": ");
        line.push_str(&detail.join(", "));
    }
    vec![line]
}

pub fn print_summary(summary: &BatchSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}
