//! # retouch
//!
//! Deterministic, composable image editing. An edit is an ordered pipeline of
//! validated operations applied to an in-memory pixel buffer; presets are
//! named pipeline templates with variable slots.
//!
//! # Architecture: Validate, Then Execute
//!
//! ```text
//! 1. Validate   kind + JSON params  →  Operation   (schema check, defaults filled)
//! 2. Compose    [Operation]         →  Pipeline    (or Preset + variables → Pipeline)
//! 3. Execute    PixelBuffer         →  PixelBuffer (stage by stage, never in place)
//! ```
//!
//! Every parameter problem surfaces in step 1 with the offending parameter
//! named, before any pixel is touched. Execution can only fail on runtime
//! geometry (a crop that falls outside the current image), and reports the
//! failing stage.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`editing`] | The pure core: buffers, color, registry, operations, pipelines, presets |
//! | [`codec`] | Decode files into / encode buffers out of the `image` crate formats |
//! | [`batch`] | Run one pipeline over a directory tree on a bounded worker pool |
//! | [`config`] | `retouch.toml` loading and validation, preset library loading |
//! | [`output`] | CLI output formatting: registry, presets, batch progress |
//!
//! # Design Decisions
//!
//! ## Own Buffers, Not `image` Types
//!
//! The `image` crate is only used at the file boundary. Operations work on
//! [`editing::PixelBuffer`], which carries exactly what the pipeline needs
//! (RGB/RGBA, 8/16-bit) and nothing else, so every transform has one
//! implementation for both depths and exact, documented rounding.
//!
//! ## Determinism
//!
//! The same buffer and pipeline always produce the same bytes, including the
//! randomized filters: grain and crystallize take a `seed` parameter and never
//! read an ambient RNG. Parallel filters split work by rows with independent
//! outputs, so thread count never changes a result.
//!
//! ## Strict Parameters
//!
//! Unknown parameter names are rejected rather than ignored, so a typo in a
//! pipeline file or preset is an error, not a silently default-valued edit.

pub mod batch;
pub mod codec;
pub mod config;
pub mod editing;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
