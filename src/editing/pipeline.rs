//! Ordered operation sequences and their execution.

use super::buffer::PixelBuffer;
use super::error::{ExecutionError, ValidationError, ValidationReason};
use super::operation::Operation;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// An ordered list of operations. Order matters; the empty pipeline is the
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    ops: Vec<Operation>,
}

impl Pipeline {
    pub fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// Parse a JSON array of `{"kind": ..., "params": {...}}` steps. Every step
    /// is validated; the first invalid one is reported with its index.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let steps: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
            ValidationError::new("pipeline", "steps", ValidationReason::Invalid(e.to_string()))
        })?;
        let mut ops = Vec::with_capacity(steps.len());
        for (i, step) in steps.into_iter().enumerate() {
            let op = serde_json::from_value::<Operation>(step).map_err(|e| {
                ValidationError::new(
                    format!("pipeline#{i}"),
                    "step",
                    ValidationReason::Invalid(e.to_string()),
                )
            })?;
            ops.push(op);
        }
        Ok(Self { ops })
    }
}

impl FromIterator<Operation> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Run every stage in order, feeding each output into the next stage.
///
/// The first failing stage aborts the run; no partial result is returned.
pub fn execute(input: &PixelBuffer, pipeline: &Pipeline) -> Result<PixelBuffer, ExecutionError> {
    let Some((first, rest)) = pipeline.ops.split_first() else {
        return Ok(input.clone());
    };
    let mut current = run_stage(0, first, input)?;
    for (i, op) in rest.iter().enumerate() {
        current = run_stage(i + 1, op, &current)?;
    }
    Ok(current)
}

fn run_stage(
    stage: usize,
    op: &Operation,
    input: &PixelBuffer,
) -> Result<PixelBuffer, ExecutionError> {
    let start = Instant::now();
    let out = op.apply(input).map_err(|source| ExecutionError {
        stage,
        kind: op.kind(),
        source,
    })?;
    tracing::debug!(
        stage,
        kind = %op.kind(),
        width = out.width(),
        height = out.height(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "stage complete"
    );
    Ok(out)
}
