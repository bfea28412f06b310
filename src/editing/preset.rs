//! Named pipeline templates with variable slots.
//!
//! A preset is an ordered list of `{kind, params}` steps plus declared
//! variables. Any string parameter of the form `"$name"` is a slot reference,
//! filled at [`Preset::instantiate`] from the caller's values or the slot's
//! default. Instantiation then validates every step exactly like direct
//! [`Operation`] construction, so a preset can never produce an operation the
//! registry would reject.
//!
//! ## File shape
//!
//! ```json
//! {
//!   "vintage": {
//!     "description": "Warm faded film look",
//!     "variables": [{ "name": "warmth", "default": 4500 }],
//!     "steps": [
//!       { "kind": "color-temperature", "params": { "kelvin": "$warmth" } },
//!       { "kind": "sepia", "params": { "intensity": 0.4 } }
//!     ]
//!   }
//! }
//! ```
//!
//! ## Stock presets
//!
//! | Name | Variables | Steps |
//! |---|---|---|
//! | `vintage` | warmth, intensity, seed | color-temperature, sepia, contrast, vignette, grain |
//! | `noir` | contrast | grayscale, contrast, levels, vignette |
//! | `pop-art` | levels | saturation, posterize, contrast |
//! | `dreamy` | blur | blur, exposure, split-toning, vignette |
//! | `sketch` | sigma | charcoal, levels |
//! | `thumbnail` | width, height (required) | resize, sharpen |
//!
//! A user preset file is merged over the stock set; same-named user presets win.

use super::error::{ValidationError, ValidationReason};
use super::operation::Operation;
use super::pipeline::Pipeline;
use super::registry::OperationKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("preset file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid preset: {0}")]
    Invalid(#[from] ValidationError),
    #[error("unknown preset '{name}' (available: {available})")]
    Unknown { name: String, available: String },
}

/// A caller-suppliable value. Without a default, the caller must supply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSlot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One unvalidated step; parameters may contain `"$var"` references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetStep {
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    /// Filled from the library key.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Vec<VariableSlot>,
    pub steps: Vec<PresetStep>,
}

fn slot_ref(value: &Value) -> Option<&str> {
    value.as_str().and_then(|s| s.strip_prefix('$'))
}

impl Preset {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            variables: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Declare a variable with a default.
    pub fn variable(mut self, name: &str, default: Value) -> Self {
        self.variables.push(VariableSlot {
            name: name.to_string(),
            default: Some(default),
        });
        self
    }

    /// Declare a variable the caller must supply.
    pub fn required(mut self, name: &str) -> Self {
        self.variables.push(VariableSlot {
            name: name.to_string(),
            default: None,
        });
        self
    }

    /// Append a step. `params` must be a JSON object (use `json!({})` for
    /// all defaults).
    pub fn step(mut self, kind: OperationKind, params: Value) -> Self {
        debug_assert!(
            params.is_object() || params.is_null(),
            "preset step {kind} params must be a JSON object, got {params}"
        );
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.steps.push(PresetStep {
            kind: kind.name().to_string(),
            params,
        });
        self
    }

    fn slot(&self, name: &str) -> Option<&VariableSlot> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn step_context(&self, index: usize, kind: &str) -> String {
        format!("{}#{index}:{kind}", self.name)
    }

    /// Structural check: every step kind exists and every reference names a
    /// declared slot. Values are not validated until instantiation.
    pub fn check(&self) -> Result<(), ValidationError> {
        for (i, step) in self.steps.iter().enumerate() {
            step.kind
                .parse::<OperationKind>()
                .map_err(|e| e.within(self.step_context(i, &step.kind)))?;
            for (param, value) in &step.params {
                if let Some(var) = slot_ref(value).filter(|v| self.slot(v).is_none()) {
                    return Err(ValidationError::new(
                        self.step_context(i, &step.kind),
                        param.as_str(),
                        ValidationReason::UndeclaredVariable(var.to_string()),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Substitute `values` into the steps and validate every resulting operation.
    pub fn instantiate(&self, values: &BTreeMap<String, Value>) -> Result<Pipeline, ValidationError> {
        if let Some(name) = values.keys().find(|k| self.slot(k).is_none()) {
            return Err(ValidationError::new(
                self.name.as_str(),
                name.as_str(),
                ValidationReason::UndeclaredVariable(name.clone()),
            ));
        }

        let mut pipeline = Pipeline::default();
        for (i, step) in self.steps.iter().enumerate() {
            let context = self.step_context(i, &step.kind);
            let kind: OperationKind = step.kind.parse().map_err(|e: ValidationError| e.within(&context))?;

            let mut params = Map::new();
            for (param, value) in &step.params {
                let resolved = match slot_ref(value) {
                    None => value.clone(),
                    Some(var) => {
                        let slot = self.slot(var).ok_or_else(|| {
                            ValidationError::new(
                                &context,
                                param.as_str(),
                                ValidationReason::UndeclaredVariable(var.to_string()),
                            )
                        })?;
                        values
                            .get(var)
                            .or(slot.default.as_ref())
                            .cloned()
                            .ok_or_else(|| {
                                ValidationError::new(
                                    &context,
                                    param.as_str(),
                                    ValidationReason::UnresolvedVariable(var.to_string()),
                                )
                            })?
                    }
                };
                params.insert(param.clone(), resolved);
            }

            let op = Operation::new(kind, &params).map_err(|e| e.within(&context))?;
            pipeline.push(op);
        }
        Ok(pipeline)
    }

    pub fn required_variables(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(|v| v.default.is_none())
            .map(|v| v.name.as_str())
    }
}

/// A set of presets keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetLibrary {
    presets: BTreeMap<String, Preset>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, preset: Preset) {
        self.presets.insert(preset.name.clone(), preset);
    }

    /// Parse a preset file. Every preset is structurally checked.
    pub fn from_json_str(json: &str) -> Result<Self, PresetError> {
        let raw: BTreeMap<String, Preset> = serde_json::from_str(json)?;
        let mut library = Self::new();
        for (name, mut preset) in raw {
            preset.name = name;
            preset.check()?;
            library.insert(preset);
        }
        Ok(library)
    }

    /// Add every preset of `other`, replacing same-named ones.
    pub fn merge(&mut self, other: PresetLibrary) {
        self.presets.extend(other.presets);
    }

    pub fn get(&self, name: &str) -> Result<&Preset, PresetError> {
        self.presets.get(name).ok_or_else(|| PresetError::Unknown {
            name: name.to_string(),
            available: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn to_json_string(&self) -> Result<String, PresetError> {
        let named: BTreeMap<&str, &Preset> = self.presets.iter().map(|(k, v)| (k.as_str(), v)).collect();
        Ok(serde_json::to_string_pretty(&named)?)
    }

    /// The built-in presets.
    pub fn stock() -> Self {
        use OperationKind as K;
        let mut library = Self::new();
        library.insert(
            Preset::new("vintage", "Warm, faded film look with light grain")
                .variable("warmth", json!(4500))
                .variable("intensity", json!(0.4))
                .variable("seed", json!(0))
                .step(K::ColorTemperature, json!({"kelvin": "$warmth", "strength": 0.6}))
                .step(K::Sepia, json!({"intensity": "$intensity"}))
                .step(K::Contrast, json!({"factor": 0.9}))
                .step(K::Vignette, json!({"radius": 0.7, "softness": 0.5}))
                .step(K::Grain, json!({"amount": 0.04, "seed": "$seed"})),
        );
        library.insert(
            Preset::new("noir", "High-contrast black and white")
                .variable("contrast", json!(1.4))
                .step(K::Grayscale, json!({}))
                .step(K::Contrast, json!({"factor": "$contrast"}))
                .step(K::Levels, json!({"black": 0.05, "white": 0.95}))
                .step(K::Vignette, json!({"radius": 0.6, "softness": 0.6})),
        );
        library.insert(
            Preset::new("pop-art", "Saturated flat color bands")
                .variable("levels", json!(4))
                .step(K::Saturation, json!({"factor": 1.8}))
                .step(K::Posterize, json!({"levels": "$levels"}))
                .step(K::Contrast, json!({"factor": 1.2})),
        );
        library.insert(
            Preset::new("dreamy", "Soft glow with pastel split tones")
                .variable("blur", json!(2.0))
                .step(K::Blur, json!({"radius": 0, "sigma": "$blur"}))
                .step(K::Exposure, json!({"stops": 0.3}))
                .step(
                    K::SplitToning,
                    json!({"shadow": "#6a4c93", "highlight": "#ffcad4", "strength": 0.4}),
                )
                .step(
                    K::Vignette,
                    json!({"radius": 0.8, "softness": 0.6, "color": "#ffffff"}),
                ),
        );
        library.insert(
            Preset::new("sketch", "Charcoal drawing")
                .variable("sigma", json!(0.8))
                .step(K::Charcoal, json!({"radius": 1, "sigma": "$sigma"}))
                .step(K::Levels, json!({"gamma": 1.2})),
        );
        library.insert(
            Preset::new("thumbnail", "Resize to an exact size and sharpen")
                .required("width")
                .required("height")
                .step(K::Resize, json!({"w": "$width", "h": "$height"}))
                .step(K::Sharpen, json!({"sigma": 0.5, "amount": 0.6})),
        );
        library
    }
}
