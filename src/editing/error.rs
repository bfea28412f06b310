//! Error taxonomy for the editing core.
//!
//! | Error | Raised by | Meaning |
//! |---|---|---|
//! | [`ValidationError`] | operation/preset construction | a parameter is out of range, mistyped, missing, or unknown |
//! | [`ApplyError`] | a single [`Operation::apply`](super::Operation::apply) | a runtime geometric failure (e.g. crop outside the buffer) |
//! | [`ExecutionError`] | [`execute`](super::execute) | an [`ApplyError`] tagged with the failing stage index and kind |
//! | [`PreconditionViolation`] | [`PixelBuffer::new`](super::PixelBuffer::new) | malformed buffer handed in by the calling layer |
//!
//! Nothing here is retried or silently corrected; callers decide.

use super::registry::OperationKind;
use thiserror::Error;

/// Why a parameter (or variable slot) was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationReason {
    #[error("value {value} is outside {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("expected {expected}")]
    WrongType { expected: &'static str },
    #[error("required value is missing")]
    Missing,
    #[error("unknown parameter")]
    UnknownParameter,
    #[error("'{value}' is not one of: {allowed}")]
    NotAllowed { value: String, allowed: String },
    #[error("unknown operation kind '{0}'")]
    UnknownKind(String),
    #[error("variable '${0}' has no supplied value and no default")]
    UnresolvedVariable(String),
    #[error("variable '${0}' is not declared by the preset")]
    UndeclaredVariable(String),
    #[error("{0}")]
    Invalid(String),
}

/// A rejected parameter, named by its owner (`context`) and its name (`param`).
///
/// `context` is the operation kind for direct construction, or
/// `<preset>#<step>:<kind>` / `<preset>` for preset instantiation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{context}.{param}: {reason}")]
pub struct ValidationError {
    pub context: String,
    pub param: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(
        context: impl Into<String>,
        param: impl Into<String>,
        reason: ValidationReason,
    ) -> Self {
        Self {
            context: context.into(),
            param: param.into(),
            reason,
        }
    }

    /// Replace the context, keeping the parameter and reason.
    pub fn within(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Runtime failure of a single operation against a concrete buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("crop rectangle {w}x{h}+{x}+{y} exceeds the {width}x{height} buffer")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },
    #[error("output dimensions {width}x{height} are not representable")]
    InvalidDimensions { width: u64, height: u64 },
}

/// A pipeline stage failed; the partial result was discarded.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("stage {stage} ({kind}): {source}")]
pub struct ExecutionError {
    pub stage: usize,
    pub kind: OperationKind,
    #[source]
    pub source: ApplyError,
}

/// A malformed [`PixelBuffer`](super::PixelBuffer) reached the core.
///
/// This is a bug in the calling layer (usually the codec), not bad user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionViolation {
    #[error("buffer dimensions must be positive, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("sample array holds {actual} samples, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Any failure surfaced by the editing core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("invalid parameter: {0}")]
    Validation(#[from] ValidationError),
    #[error("pipeline failed at {0}")]
    Execution(#[from] ExecutionError),
    #[error("malformed pixel buffer: {0}")]
    Precondition(#[from] PreconditionViolation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_context_and_param() {
        let err = ValidationError::new("resize", "w", ValidationReason::OutOfRange {
            value: 0.0,
            min: 1.0,
            max: 65535.0,
        });
        let msg = err.to_string();
        assert!(msg.starts_with("resize.w:"), "{msg}");
        assert!(msg.contains("outside 1..=65535"), "{msg}");
    }

    #[test]
    fn within_rewrites_context_only() {
        let err = ValidationError::new("sepia", "intensity", ValidationReason::Missing)
            .within("vintage#1:sepia");
        assert_eq!(err.context, "vintage#1:sepia");
        assert_eq!(err.param, "intensity");
        assert_eq!(err.reason, ValidationReason::Missing);
    }

    #[test]
    fn execution_error_reports_stage_and_kind() {
        let err = ExecutionError {
            stage: 2,
            kind: OperationKind::Crop,
            source: ApplyError::CropOutOfBounds {
                x: 3,
                y: 0,
                w: 4,
                h: 4,
                width: 4,
                height: 4,
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("stage 2 (crop):"), "{msg}");
        assert!(msg.contains("4x4+3+0"), "{msg}");
    }

    #[test]
    fn edit_error_wraps_all_layers() {
        let e: EditError = PreconditionViolation::LengthMismatch {
            expected: 12,
            actual: 11,
        }
        .into();
        assert!(e.to_string().contains("expected 12"));
    }
}
