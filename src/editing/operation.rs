//! A single validated, immutable transform.
//!
//! [`Operation::new`] runs the registry's validation and then builds the
//! typed [`Filter`] for the kind, so every later [`Operation::apply`] works on
//! checked, typed parameters. `apply` is pure: the same buffer and operation
//! always give the same output, bit for bit. The only stochastic kinds (grain,
//! crystallize) take an explicit `seed`.

use super::buffer::PixelBuffer;
use super::error::{ApplyError, ValidationError, ValidationReason};
use super::filters::artistic::{
    Blur, Charcoal, Emboss, Grain, Implode, OilPainting, Sepia, Sharpen, Swirl, Vignette, Wave,
};
use super::filters::basic::{
    Brightness, ColorTemperature, Contrast, Crop, Exposure, Flip, Grayscale, Resize, Rotate,
    Saturation,
};
use super::filters::special::{Crystallize, EdgeDetect, Negative, Pixelate, Posterize, Solarize};
use super::filters::tone::{ColorBalance, Duotone, Levels, SplitToning};
use super::params::ParamSet;
use super::registry::{self, OperationKind};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Typed parameters for each kind. Exhaustive matching here and in
/// [`Operation::apply`] means a new kind cannot be half-wired.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Filter {
    Brightness(Brightness),
    Contrast(Contrast),
    Saturation(Saturation),
    Exposure(Exposure),
    ColorTemperature(ColorTemperature),
    Crop(Crop),
    Rotate(Rotate),
    Resize(Resize),
    Grayscale(Grayscale),
    Flip(Flip),
    OilPainting(OilPainting),
    Charcoal(Charcoal),
    Sepia(Sepia),
    Grain(Grain),
    Emboss(Emboss),
    Swirl(Swirl),
    Blur(Blur),
    Sharpen(Sharpen),
    Vignette(Vignette),
    Wave(Wave),
    Implode(Implode),
    Duotone(Duotone),
    SplitToning(SplitToning),
    Levels(Levels),
    ColorBalance(ColorBalance),
    Negative(Negative),
    Posterize(Posterize),
    Solarize(Solarize),
    Pixelate(Pixelate),
    Crystallize(Crystallize),
    EdgeDetect(EdgeDetect),
}

impl Filter {
    fn from_params(kind: OperationKind, p: &ParamSet) -> Result<Self, ValidationError> {
        use OperationKind as K;
        let filter = match kind {
            K::Brightness => Filter::Brightness(Brightness::from_params(p)?),
            K::Contrast => Filter::Contrast(Contrast::from_params(p)?),
            K::Saturation => Filter::Saturation(Saturation::from_params(p)?),
            K::Exposure => Filter::Exposure(Exposure::from_params(p)?),
            K::ColorTemperature => Filter::ColorTemperature(ColorTemperature::from_params(p)?),
            K::Crop => Filter::Crop(Crop::from_params(p)?),
            K::Rotate => Filter::Rotate(Rotate::from_params(p)?),
            K::Resize => Filter::Resize(Resize::from_params(p)?),
            K::Grayscale => Filter::Grayscale(Grayscale),
            K::Flip => Filter::Flip(Flip::from_params(p)?),
            K::OilPainting => Filter::OilPainting(OilPainting::from_params(p)?),
            K::Charcoal => Filter::Charcoal(Charcoal::from_params(p)?),
            K::Sepia => Filter::Sepia(Sepia::from_params(p)?),
            K::Grain => Filter::Grain(Grain::from_params(p)?),
            K::Emboss => Filter::Emboss(Emboss::from_params(p)?),
            K::Swirl => Filter::Swirl(Swirl::from_params(p)?),
            K::Blur => Filter::Blur(Blur::from_params(p)?),
            K::Sharpen => Filter::Sharpen(Sharpen::from_params(p)?),
            K::Vignette => Filter::Vignette(Vignette::from_params(p)?),
            K::Wave => Filter::Wave(Wave::from_params(p)?),
            K::Implode => Filter::Implode(Implode::from_params(p)?),
            K::Duotone => Filter::Duotone(Duotone::from_params(p)?),
            K::SplitToning => Filter::SplitToning(SplitToning::from_params(p)?),
            K::Levels => Filter::Levels(Levels::from_params(p)?),
            K::ColorBalance => Filter::ColorBalance(ColorBalance::from_params(p)?),
            K::Negative => Filter::Negative(Negative),
            K::Posterize => Filter::Posterize(Posterize::from_params(p)?),
            K::Solarize => Filter::Solarize(Solarize::from_params(p)?),
            K::Pixelate => Filter::Pixelate(Pixelate::from_params(p)?),
            K::Crystallize => Filter::Crystallize(Crystallize::from_params(p)?),
            K::EdgeDetect => Filter::EdgeDetect(EdgeDetect::from_params(p)?),
        };
        Ok(filter)
    }
}

/// A validated operation: kind, normalized parameters, typed filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    params: ParamSet,
    filter: Filter,
}

impl Operation {
    /// Validate `raw` against the schema of `kind` and build the operation.
    pub fn new(kind: OperationKind, raw: &Map<String, Value>) -> Result<Self, ValidationError> {
        let params = registry::validate(kind, raw)?;
        let filter = Filter::from_params(kind, &params).map_err(|e| e.within(kind.name()))?;
        Ok(Self {
            kind,
            params,
            filter,
        })
    }

    /// Parse a kind name and a JSON parameter value (an object, or `null`
    /// for all defaults).
    pub fn parse(kind: &str, raw: &Value) -> Result<Self, ValidationError> {
        let kind: OperationKind = kind.parse()?;
        match raw {
            Value::Null => Self::new(kind, &Map::new()),
            Value::Object(map) => Self::new(kind, map),
            _ => Err(ValidationError::new(
                kind.name(),
                "params",
                ValidationReason::WrongType { expected: "object" },
            )),
        }
    }

    /// Shorthand for an operation built entirely from defaults.
    pub fn with_defaults(kind: OperationKind) -> Result<Self, ValidationError> {
        Self::new(kind, &Map::new())
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn apply(&self, input: &PixelBuffer) -> Result<PixelBuffer, ApplyError> {
        let src = input.to_plane();
        let out = match &self.filter {
            Filter::Brightness(f) => f.apply(&src),
            Filter::Contrast(f) => f.apply(&src),
            Filter::Saturation(f) => f.apply(&src),
            Filter::Exposure(f) => f.apply(&src),
            Filter::ColorTemperature(f) => f.apply(&src),
            Filter::Crop(f) => f.apply(&src)?,
            Filter::Rotate(f) => f.apply(&src)?,
            Filter::Resize(f) => f.apply(&src)?,
            Filter::Grayscale(f) => f.apply(&src),
            Filter::Flip(f) => f.apply(&src),
            Filter::OilPainting(f) => f.apply(&src),
            Filter::Charcoal(f) => f.apply(&src),
            Filter::Sepia(f) => f.apply(&src),
            Filter::Grain(f) => f.apply(&src),
            Filter::Emboss(f) => f.apply(&src),
            Filter::Swirl(f) => f.apply(&src),
            Filter::Blur(f) => f.apply(&src),
            Filter::Sharpen(f) => f.apply(&src),
            Filter::Vignette(f) => f.apply(&src),
            Filter::Wave(f) => f.apply(&src),
            Filter::Implode(f) => f.apply(&src),
            Filter::Duotone(f) => f.apply(&src),
            Filter::SplitToning(f) => f.apply(&src),
            Filter::Levels(f) => f.apply(&src),
            Filter::ColorBalance(f) => f.apply(&src),
            Filter::Negative(f) => f.apply(&src),
            Filter::Posterize(f) => f.apply(&src),
            Filter::Solarize(f) => f.apply(&src),
            Filter::Pixelate(f) => f.apply(&src),
            Filter::Crystallize(f) => f.apply(&src),
            Filter::EdgeDetect(f) => f.apply(&src),
        };
        Ok(PixelBuffer::from_plane(&out, input.depth()))
    }

    /// `{"kind": ..., "params": {...}}` with normalized parameters.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "kind": self.kind.name(),
            "params": Value::Object(self.params.to_json_map()),
        })
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Operation", 2)?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("params", &self.params.to_json_map())?;
        s.end()
    }
}

/// Wire shape of one pipeline step.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    kind: String,
    #[serde(default)]
    params: Map<String, Value>,
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawStep::deserialize(deserializer)?;
        let kind: OperationKind = raw.kind.parse().map_err(serde::de::Error::custom)?;
        Operation::new(kind, &raw.params).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::buffer::Samples;
    use serde_json::json;

    fn gray(width: u32, height: u32, v: u8) -> PixelBuffer {
        PixelBuffer::from_rgb8(width, height, vec![v; (width * height * 3) as usize]).unwrap()
    }

    #[test]
    fn every_kind_builds_from_defaults_or_minimal_params() {
        for &kind in OperationKind::ALL {
            let raw = match kind {
                OperationKind::Crop | OperationKind::Resize => json!({"w": 2, "h": 2}),
                _ => json!({}),
            };
            let op = Operation::parse(kind.name(), &raw).unwrap();
            assert_eq!(op.kind(), kind);
            let out = op.apply(&gray(4, 4, 100));
            assert!(out.is_ok(), "{kind}: {out:?}");
        }
    }

    #[test]
    fn brightness_shifts_mid_gray() {
        let op = Operation::parse("brightness", &json!({"amount": 20})).unwrap();
        let out = op.apply(&gray(4, 4, 128)).unwrap();
        assert_eq!(out.samples(), &Samples::U8(vec![148; 48]));
    }

    #[test]
    fn brightness_clamps_at_white() {
        let op = Operation::parse("brightness", &json!({"amount": 200})).unwrap();
        let out = op.apply(&gray(2, 2, 128)).unwrap();
        assert_eq!(out.samples(), &Samples::U8(vec![255; 12]));
    }

    #[test]
    fn params_must_be_an_object() {
        let err = Operation::parse("sepia", &json!(0.5)).unwrap_err();
        assert_eq!(err.param, "params");
        assert!(matches!(err.reason, ValidationReason::WrongType { .. }));
    }

    #[test]
    fn serializes_with_normalized_params() {
        let op = Operation::parse("resize", &json!({"w": 8.0, "h": 4, "filter": "Nearest"})).unwrap();
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"kind": "resize", "params": {"w": 8, "h": 4, "filter": "nearest"}})
        );
    }

    #[test]
    fn deserialize_validates() {
        let ok: Operation =
            serde_json::from_value(json!({"kind": "posterize", "params": {"levels": 3}})).unwrap();
        assert_eq!(ok.kind(), OperationKind::Posterize);
        let bad = serde_json::from_value::<Operation>(json!({"kind": "posterize", "params": {"levels": 1}}));
        assert!(bad.unwrap_err().to_string().contains("posterize.levels"));
    }

    #[test]
    fn sixteen_bit_buffers_keep_depth() {
        let buf = PixelBuffer::from_rgb16(2, 1, vec![0, 1000, 65535, 30000, 30000, 30000]).unwrap();
        let out = Operation::with_defaults(OperationKind::Negative)
            .unwrap()
            .apply(&buf)
            .unwrap();
        assert_eq!(
            out.samples(),
            &Samples::U16(vec![65535, 64535, 0, 35535, 35535, 35535])
        );
    }
}
