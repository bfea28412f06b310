//! Parameter schema types and validated parameter sets.
//!
//! Raw parameters arrive as a JSON object (from the CLI, a pipeline file or a
//! preset). Each operation kind declares a list of [`ParamSpec`]s; validation
//! coerces every raw value against its [`ParamType`], fills defaults, and
//! produces a [`ParamSet`] holding only normalized values:
//!
//! | Type | Accepts | Normalized to |
//! |---|---|---|
//! | `Int` | integer, or float with zero fraction | [`ParamValue::Int`] |
//! | `Float` | any number | [`ParamValue::Float`] |
//! | `Enum` | string (case-insensitive) or bool | lowercase [`ParamValue::Text`] |
//! | `Point` | `[x, y]`, each `0.0..=1.0` of the image | [`ParamValue::Point`] |
//! | `Color` | `"#rgb"`, `"#rrggbb"`, `"#rrggbbaa"`, CSS name, `[r, g, b(, a)]` | [`ParamValue::Color`] |
//!
//! A normalized set converts back to JSON with [`ParamSet::to_json_map`] and
//! re-validates to itself.

use super::color::Color;
use super::error::{ValidationError, ValidationReason};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single normalized parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    Point([f64; 2]),
    Color(Color),
}

impl ParamValue {
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Int(v) => Value::from(*v),
            ParamValue::Float(v) => Value::from(*v),
            ParamValue::Text(s) => Value::from(s.as_str()),
            ParamValue::Point([x, y]) => Value::from(vec![*x, *y]),
            ParamValue::Color(c) => Value::from(c.to_hex()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Point([x, y]) => write!(f, "[{x}, {y}]"),
            ParamValue::Color(c) => write!(f, "{c}"),
        }
    }
}

/// Normalized parameters of one operation, keyed by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    // Typed accessors. Errors carry an empty context; the caller names the kind.

    pub fn int(&self, name: &str) -> Result<i64, ValidationError> {
        match self.require(name)? {
            ParamValue::Int(v) => Ok(*v),
            _ => Err(wrong_type(name, "integer")),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, ValidationError> {
        match self.require(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            _ => Err(wrong_type(name, "number")),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, ValidationError> {
        match self.require(name)? {
            ParamValue::Text(s) => Ok(s),
            _ => Err(wrong_type(name, "string")),
        }
    }

    pub fn point(&self, name: &str) -> Result<[f64; 2], ValidationError> {
        match self.require(name)? {
            ParamValue::Point(p) => Ok(*p),
            _ => Err(wrong_type(name, "point")),
        }
    }

    pub fn color(&self, name: &str) -> Result<Color, ValidationError> {
        match self.require(name)? {
            ParamValue::Color(c) => Ok(*c),
            _ => Err(wrong_type(name, "color")),
        }
    }

    fn require(&self, name: &str) -> Result<&ParamValue, ValidationError> {
        self.0
            .get(name)
            .ok_or_else(|| ValidationError::new("", name, ValidationReason::Missing))
    }
}

fn wrong_type(name: &str, expected: &'static str) -> ValidationError {
    ValidationError::new("", name, ValidationReason::WrongType { expected })
}

// ============================================================================
// Schema
// ============================================================================

/// Accepted type and bounds of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamType {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Enum(&'static [&'static str]),
    /// Position relative to the image, each axis `0.0..=1.0`.
    Point,
    Color,
}

impl ParamType {
    /// Coerce a raw JSON value to this type, checking bounds.
    pub fn coerce(&self, raw: &Value) -> Result<ParamValue, ValidationReason> {
        match *self {
            ParamType::Int { min, max } => {
                let v = as_integer(raw).ok_or(ValidationReason::WrongType {
                    expected: "integer",
                })?;
                check_range(v as f64, min as f64, max as f64)?;
                Ok(ParamValue::Int(v))
            }
            ParamType::Float { min, max } => {
                let v = raw.as_f64().ok_or(ValidationReason::WrongType {
                    expected: "number",
                })?;
                check_range(v, min, max)?;
                Ok(ParamValue::Float(v))
            }
            ParamType::Enum(allowed) => {
                let s = match raw {
                    Value::String(s) => s.trim().to_ascii_lowercase(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(ValidationReason::WrongType {
                            expected: "string",
                        });
                    }
                };
                if allowed.contains(&s.as_str()) {
                    Ok(ParamValue::Text(s))
                } else {
                    Err(ValidationReason::NotAllowed {
                        value: s,
                        allowed: allowed.join(", "),
                    })
                }
            }
            ParamType::Point => {
                let wrong = ValidationReason::WrongType {
                    expected: "[x, y] point",
                };
                let items = raw.as_array().ok_or(wrong.clone())?;
                let [x, y] = items.as_slice() else {
                    return Err(wrong);
                };
                let (x, y) = x.as_f64().zip(y.as_f64()).ok_or(wrong)?;
                check_range(x, 0.0, 1.0)?;
                check_range(y, 0.0, 1.0)?;
                Ok(ParamValue::Point([x, y]))
            }
            ParamType::Color => coerce_color(raw).map(ParamValue::Color),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ParamType::Int { min, max } => format!("int {min}..={max}"),
            ParamType::Float { min, max } => format!("float {min}..={max}"),
            ParamType::Enum(allowed) => allowed.join("|"),
            ParamType::Point => "point [x, y]".to_string(),
            ParamType::Color => "color".to_string(),
        }
    }
}

fn as_integer(raw: &Value) -> Option<i64> {
    if let Some(v) = raw.as_i64() {
        return Some(v);
    }
    let f = raw.as_f64()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn check_range(value: f64, min: f64, max: f64) -> Result<(), ValidationReason> {
    if value < min || value > max {
        Err(ValidationReason::OutOfRange { value, min, max })
    } else {
        Ok(())
    }
}

fn coerce_color(raw: &Value) -> Result<Color, ValidationReason> {
    match raw {
        Value::String(s) => {
            Color::parse(s).ok_or_else(|| ValidationReason::Invalid(format!("invalid color '{s}'")))
        }
        Value::Array(items) if items.len() == 3 || items.len() == 4 => {
            let mut rgba = [255u8; 4];
            for (slot, item) in rgba.iter_mut().zip(items) {
                let v = as_integer(item).ok_or(ValidationReason::WrongType {
                    expected: "color channel 0..=255",
                })?;
                check_range(v as f64, 0.0, 255.0)?;
                *slot = v as u8;
            }
            let [r, g, b, a] = rgba;
            Ok(Color::rgba(r, g, b, a))
        }
        _ => Err(ValidationReason::WrongType { expected: "color" }),
    }
}

/// Default applied when a parameter is omitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Required,
    Int(i64),
    Float(f64),
    Text(&'static str),
    Point([f64; 2]),
    Color(Color),
}

impl ParamDefault {
    pub fn value(&self) -> Option<ParamValue> {
        match *self {
            ParamDefault::Required => None,
            ParamDefault::Int(v) => Some(ParamValue::Int(v)),
            ParamDefault::Float(v) => Some(ParamValue::Float(v)),
            ParamDefault::Text(s) => Some(ParamValue::Text(s.to_string())),
            ParamDefault::Point(p) => Some(ParamValue::Point(p)),
            ParamDefault::Color(c) => Some(ParamValue::Color(c)),
        }
    }
}

impl fmt::Display for ParamDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("required"),
        }
    }
}

/// One entry of an operation's schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub default: ParamDefault,
    pub doc: &'static str,
}

impl ParamSpec {
    pub const fn int(name: &'static str, min: i64, max: i64, default: i64, doc: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Int { min, max },
            default: ParamDefault::Int(default),
            doc,
        }
    }

    pub const fn required_int(name: &'static str, min: i64, max: i64, doc: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Int { min, max },
            default: ParamDefault::Required,
            doc,
        }
    }

    pub const fn float(name: &'static str, min: f64, max: f64, default: f64, doc: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Float { min, max },
            default: ParamDefault::Float(default),
            doc,
        }
    }

    pub const fn choice(
        name: &'static str,
        allowed: &'static [&'static str],
        default: &'static str,
        doc: &'static str,
    ) -> Self {
        Self {
            name,
            ty: ParamType::Enum(allowed),
            default: ParamDefault::Text(default),
            doc,
        }
    }

    pub const fn point(name: &'static str, default: [f64; 2], doc: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Point,
            default: ParamDefault::Point(default),
            doc,
        }
    }

    pub const fn color(name: &'static str, default: Color, doc: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Color,
            default: ParamDefault::Color(default),
            doc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_accepts_whole_floats_only() {
        let ty = ParamType::Int { min: 0, max: 10 };
        assert_eq!(ty.coerce(&json!(4)), Ok(ParamValue::Int(4)));
        assert_eq!(ty.coerce(&json!(4.0)), Ok(ParamValue::Int(4)));
        assert_eq!(
            ty.coerce(&json!(4.5)),
            Err(ValidationReason::WrongType {
                expected: "integer"
            })
        );
        assert!(matches!(
            ty.coerce(&json!(11)),
            Err(ValidationReason::OutOfRange { .. })
        ));
    }

    #[test]
    fn float_rejects_strings() {
        let ty = ParamType::Float { min: 0.0, max: 1.0 };
        assert!(matches!(
            ty.coerce(&json!("0.5")),
            Err(ValidationReason::WrongType { .. })
        ));
        assert_eq!(ty.coerce(&json!(1)), Ok(ParamValue::Float(1.0)));
    }

    #[test]
    fn enum_is_case_insensitive_and_accepts_bools() {
        let ty = ParamType::Enum(&["nearest", "bilinear"]);
        assert_eq!(
            ty.coerce(&json!("Nearest")),
            Ok(ParamValue::Text("nearest".into()))
        );
        let flag = ParamType::Enum(&["true", "false"]);
        assert_eq!(flag.coerce(&json!(false)), Ok(ParamValue::Text("false".into())));
        let err = ty.coerce(&json!("cubic")).unwrap_err();
        assert_eq!(err.to_string(), "'cubic' is not one of: nearest, bilinear");
    }

    #[test]
    fn point_requires_two_relative_coordinates() {
        assert_eq!(
            ParamType::Point.coerce(&json!([0.25, 1])),
            Ok(ParamValue::Point([0.25, 1.0]))
        );
        assert!(ParamType::Point.coerce(&json!([0.5])).is_err());
        assert!(ParamType::Point.coerce(&json!([0.5, 1.5])).is_err());
    }

    #[test]
    fn colors_normalize_from_arrays_and_strings() {
        assert_eq!(
            ParamType::Color.coerce(&json!([255, 0, 0])),
            Ok(ParamValue::Color(Color::rgba(255, 0, 0, 255)))
        );
        assert_eq!(
            ParamType::Color.coerce(&json!("RED")).map(|v| v.to_json()),
            Ok(json!("#ff0000"))
        );
        assert!(ParamType::Color.coerce(&json!([255, 0, 300])).is_err());
        assert!(ParamType::Color.coerce(&json!("#zzz")).is_err());
    }

    #[test]
    fn accessors_report_missing_and_mistyped() {
        let mut set = ParamSet::new();
        set.insert("levels", ParamValue::Int(4));
        assert_eq!(set.int("levels"), Ok(4));
        assert_eq!(set.float("levels"), Ok(4.0));
        assert_eq!(set.int("nope").unwrap_err().reason, ValidationReason::Missing);
        assert!(matches!(
            set.text("levels").unwrap_err().reason,
            ValidationReason::WrongType { .. }
        ));
    }

    #[test]
    fn default_display() {
        assert_eq!(ParamDefault::Required.to_string(), "required");
        assert_eq!(ParamDefault::Color(Color::BLACK).to_string(), "#000000");
    }
}
