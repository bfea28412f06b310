//! The editing core: buffers, operations, pipelines, presets.
//!
//! Everything in here is pure: no filesystem, no codecs, no threads of its
//! own (filters use rayon's global pool internally). The CLI and the
//! [`batch`](crate::batch) runner sit on top.
//!
//! | Module | Role |
//! |--------|------|
//! | [`buffer`] | [`PixelBuffer`]: validated RGB/RGBA raster at 8 or 16 bits |
//! | [`color`] | BT.601 luma, HSV/HSL conversion, `#rrggbb` color parsing |
//! | [`params`] | Parameter types, schema entries, validated [`ParamSet`] |
//! | [`registry`] | [`OperationKind`], per-kind schemas, [`validate`] |
//! | [`operation`] | [`Operation`]: a validated kind + params, and its `apply` |
//! | [`pipeline`] | [`Pipeline`] and [`execute`] |
//! | [`preset`] | [`Preset`] templates with `$variable` slots, [`PresetLibrary`] |
//! | [`error`] | Validation, apply, execution, and precondition errors |
//!
//! ## Determinism
//!
//! Same buffer, same pipeline, same result. Randomized filters (grain,
//! crystallize) take an explicit `seed` and derive every random value from it,
//! independent of thread scheduling.
//!
//! ## Alpha
//!
//! Tonal and color filters touch only the RGB channels. Geometric operations
//! (crop, resize, rotate, flip, swirl, wave, implode) move whole pixels,
//! alpha included.

pub mod buffer;
pub mod color;
pub mod error;
pub(crate) mod filters;
pub mod operation;
pub mod params;
pub mod pipeline;
pub mod preset;
pub mod registry;
pub(crate) mod sampling;

pub use buffer::{BitDepth, Channels, PixelBuffer, Samples};
pub use color::{Color, ColorSample, luma};
pub use error::{
    ApplyError, EditError, ExecutionError, PreconditionViolation, ValidationError,
    ValidationReason,
};
pub use operation::Operation;
pub use params::{ParamDefault, ParamSet, ParamSpec, ParamType, ParamValue};
pub use pipeline::{Pipeline, execute};
pub use preset::{Preset, PresetError, PresetLibrary, PresetStep, VariableSlot};
pub use registry::{Category, OperationKind, schema, validate};
