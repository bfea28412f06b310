//! The operation registry: every kind, its schema, and validation.
//!
//! This is the single source of truth for what each operation accepts.
//! [`validate`] turns a raw JSON parameter object into a normalized
//! [`ParamSet`] or a [`ValidationError`] naming the offending parameter.
//!
//! | Category | Kinds |
//! |---|---|
//! | Basic | brightness, contrast, saturation, exposure, color-temperature, crop, rotate, resize, grayscale, flip |
//! | Artistic | oil-painting, charcoal, sepia, grain, emboss, swirl, blur, sharpen, vignette, wave, implode |
//! | Tone | duotone, split-toning, levels, color-balance |
//! | Special | negative, posterize, solarize, pixelate, crystallize, edge-detect |

use super::color::Color;
use super::error::{ValidationError, ValidationReason};
use super::params::{ParamSet, ParamSpec};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Grouping used for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Basic,
    Artistic,
    Tone,
    Special,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Basic => "basic",
            Category::Artistic => "artistic",
            Category::Tone => "tone",
            Category::Special => "special",
        })
    }
}

macro_rules! operation_kinds {
    ($($variant:ident => $name:literal, $category:ident;)*) => {
        /// Every operation the registry knows.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OperationKind {
            $($variant,)*
        }

        impl OperationKind {
            pub const ALL: &'static [OperationKind] = &[$(OperationKind::$variant,)*];

            /// Canonical kebab-case name.
            pub fn name(self) -> &'static str {
                match self {
                    $(OperationKind::$variant => $name,)*
                }
            }

            pub fn category(self) -> Category {
                match self {
                    $(OperationKind::$variant => Category::$category,)*
                }
            }
        }
    };
}

operation_kinds! {
    Brightness => "brightness", Basic;
    Contrast => "contrast", Basic;
    Saturation => "saturation", Basic;
    Exposure => "exposure", Basic;
    ColorTemperature => "color-temperature", Basic;
    Crop => "crop", Basic;
    Rotate => "rotate", Basic;
    Resize => "resize", Basic;
    Grayscale => "grayscale", Basic;
    Flip => "flip", Basic;
    OilPainting => "oil-painting", Artistic;
    Charcoal => "charcoal", Artistic;
    Sepia => "sepia", Artistic;
    Grain => "grain", Artistic;
    Emboss => "emboss", Artistic;
    Swirl => "swirl", Artistic;
    Blur => "blur", Artistic;
    Sharpen => "sharpen", Artistic;
    Vignette => "vignette", Artistic;
    Wave => "wave", Artistic;
    Implode => "implode", Artistic;
    Duotone => "duotone", Tone;
    SplitToning => "split-toning", Tone;
    Levels => "levels", Tone;
    ColorBalance => "color-balance", Tone;
    Negative => "negative", Special;
    Posterize => "posterize", Special;
    Solarize => "solarize", Special;
    Pixelate => "pixelate", Special;
    Crystallize => "crystallize", Special;
    EdgeDetect => "edge-detect", Special;
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = ValidationError;

    /// Case-insensitive; `_` and spaces are read as `-`. A few common
    /// alternative names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        let alias = match normalized.as_str() {
            "temperature" => Some(OperationKind::ColorTemperature),
            "oil" => Some(OperationKind::OilPainting),
            "greyscale" | "gray" | "grey" => Some(OperationKind::Grayscale),
            "invert" => Some(OperationKind::Negative),
            "edge-detection" | "edges" => Some(OperationKind::EdgeDetect),
            "split-tone" => Some(OperationKind::SplitToning),
            _ => None,
        };
        alias
            .or_else(|| {
                OperationKind::ALL
                    .iter()
                    .copied()
                    .find(|k| k.name() == normalized)
            })
            .ok_or_else(|| {
                ValidationError::new(
                    "operation",
                    "kind",
                    ValidationReason::UnknownKind(s.to_string()),
                )
            })
    }
}

impl Serialize for OperationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for OperationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Schemas
// ============================================================================

const MAX_DIM: i64 = 65535;
const MAX_COORD: i64 = u32::MAX as i64;
const MAX_SEED: i64 = u32::MAX as i64;
const CENTER: [f64; 2] = [0.5, 0.5];
const INTERPOLATION: &[&str] = &["nearest", "bilinear"];

const BRIGHTNESS: &[ParamSpec] = &[ParamSpec::float(
    "amount",
    -255.0,
    255.0,
    0.0,
    "additive shift in 8-bit units (scaled for 16-bit)",
)];
const CONTRAST: &[ParamSpec] = &[ParamSpec::float(
    "factor",
    0.0,
    4.0,
    1.0,
    "linear gain around mid-gray",
)];
const SATURATION: &[ParamSpec] = &[ParamSpec::float(
    "factor",
    0.0,
    4.0,
    1.0,
    "HSV saturation multiplier",
)];
const EXPOSURE: &[ParamSpec] = &[ParamSpec::float(
    "stops",
    -5.0,
    5.0,
    0.0,
    "multiply by 2^stops",
)];
const COLOR_TEMPERATURE: &[ParamSpec] = &[
    ParamSpec::int("kelvin", 1000, 40000, 6500, "white point; below 6500 warms, above cools"),
    ParamSpec::float("strength", 0.0, 1.0, 1.0, "blend with the original"),
];
const CROP: &[ParamSpec] = &[
    ParamSpec::int("x", 0, MAX_COORD, 0, "left edge"),
    ParamSpec::int("y", 0, MAX_COORD, 0, "top edge"),
    ParamSpec::required_int("w", 1, MAX_COORD, "width"),
    ParamSpec::required_int("h", 1, MAX_COORD, "height"),
];
const ROTATE: &[ParamSpec] = &[
    ParamSpec::float("angle", -360.0, 360.0, 0.0, "degrees, positive is clockwise"),
    ParamSpec::choice("interpolation", INTERPOLATION, "bilinear", "resampling for non-right angles"),
    ParamSpec::color("fill", Color::TRANSPARENT, "exposed corners (alpha dropped on RGB)"),
    ParamSpec::choice("expand", &["true", "false"], "true", "grow the canvas to fit"),
];
const RESIZE: &[ParamSpec] = &[
    ParamSpec::required_int("w", 1, MAX_DIM, "target width"),
    ParamSpec::required_int("h", 1, MAX_DIM, "target height"),
    ParamSpec::choice("filter", INTERPOLATION, "bilinear", "resampling policy"),
];
const FLIP: &[ParamSpec] = &[ParamSpec::choice(
    "direction",
    &["horizontal", "vertical"],
    "horizontal",
    "mirror axis",
)];
const OIL_PAINTING: &[ParamSpec] = &[
    ParamSpec::int("radius", 1, 16, 3, "window radius"),
    ParamSpec::int("levels", 2, 256, 20, "intensity bins"),
];
const CHARCOAL: &[ParamSpec] = &[
    ParamSpec::int("radius", 1, 10, 1, "edge kernel reach"),
    ParamSpec::float("sigma", 0.1, 10.0, 0.5, "pre-blur strength"),
];
const SEPIA: &[ParamSpec] = &[ParamSpec::float(
    "intensity",
    0.0,
    1.0,
    0.8,
    "blend toward full sepia",
)];
const GRAIN: &[ParamSpec] = &[
    ParamSpec::float("amount", 0.0, 1.0, 0.1, "noise standard deviation"),
    ParamSpec::int("size", 1, 16, 1, "grain size in pixels"),
    ParamSpec::int("seed", 0, MAX_SEED, 0, "noise seed"),
    ParamSpec::choice("mode", &["mono", "color"], "mono", "shared or per-channel noise"),
];
const EMBOSS: &[ParamSpec] = &[
    ParamSpec::float("azimuth", 0.0, 360.0, 135.0, "light direction in degrees"),
    ParamSpec::float("elevation", 0.0, 90.0, 45.0, "light height in degrees"),
    ParamSpec::float("depth", 0.1, 20.0, 1.0, "relief strength"),
];
const SWIRL: &[ParamSpec] = &[
    ParamSpec::float("degrees", -1080.0, 1080.0, 90.0, "twist at the center"),
    ParamSpec::float("radius", 0.01, 1.0, 1.0, "fraction of half the short side"),
    ParamSpec::point("center", CENTER, "swirl center"),
];
const BLUR: &[ParamSpec] = &[
    ParamSpec::int("radius", 0, 64, 2, "kernel radius; 0 derives it from sigma"),
    ParamSpec::float("sigma", 0.1, 32.0, 1.0, "gaussian standard deviation"),
];
const SHARPEN: &[ParamSpec] = &[
    ParamSpec::float("sigma", 0.1, 32.0, 1.0, "blur used for the mask"),
    ParamSpec::float("amount", 0.0, 5.0, 1.0, "mask gain"),
];
const VIGNETTE: &[ParamSpec] = &[
    ParamSpec::float("radius", 0.0, 1.5, 0.75, "untouched inner radius, relative"),
    ParamSpec::float("softness", 0.01, 1.0, 0.45, "falloff width"),
    ParamSpec::point("center", CENTER, "vignette center"),
    ParamSpec::color("color", Color::BLACK, "edge color"),
];
const WAVE: &[ParamSpec] = &[
    ParamSpec::float("amplitude", 0.0, 256.0, 5.0, "vertical displacement in pixels"),
    ParamSpec::float("wavelength", 1.0, 2048.0, 40.0, "period in pixels"),
];
const IMPLODE: &[ParamSpec] = &[
    ParamSpec::float("amount", -1.0, 1.0, 0.5, "pull toward the center; negative explodes"),
    ParamSpec::float("radius", 0.01, 1.0, 1.0, "fraction of half the short side"),
    ParamSpec::point("center", CENTER, "implode center"),
];
const DUOTONE: &[ParamSpec] = &[
    ParamSpec::color("shadow", Color::rgba(0x1b, 0x14, 0x64, 255), "color for black"),
    ParamSpec::color("highlight", Color::rgba(0xff, 0xd1, 0x66, 255), "color for white"),
];
const SPLIT_TONING: &[ParamSpec] = &[
    ParamSpec::color("shadow", Color::rgba(0x2a, 0x6f, 0x97, 255), "shadow tint"),
    ParamSpec::color("highlight", Color::rgba(0xf4, 0xa2, 0x61, 255), "highlight tint"),
    ParamSpec::float("balance", -1.0, 1.0, 0.0, "moves the shadow/highlight pivot"),
    ParamSpec::float("strength", 0.0, 1.0, 0.5, "tint strength"),
];
const LEVELS: &[ParamSpec] = &[
    ParamSpec::float("black", 0.0, 1.0, 0.0, "input black point"),
    ParamSpec::float("white", 0.0, 1.0, 1.0, "input white point"),
    ParamSpec::float("gamma", 0.1, 10.0, 1.0, "midtone gamma"),
    ParamSpec::choice("channel", &["all", "red", "green", "blue"], "all", "channels affected"),
];
const COLOR_BALANCE: &[ParamSpec] = &[
    ParamSpec::float("shadows_r", -1.0, 1.0, 0.0, "shadow red shift"),
    ParamSpec::float("shadows_g", -1.0, 1.0, 0.0, "shadow green shift"),
    ParamSpec::float("shadows_b", -1.0, 1.0, 0.0, "shadow blue shift"),
    ParamSpec::float("midtones_r", -1.0, 1.0, 0.0, "midtone red shift"),
    ParamSpec::float("midtones_g", -1.0, 1.0, 0.0, "midtone green shift"),
    ParamSpec::float("midtones_b", -1.0, 1.0, 0.0, "midtone blue shift"),
    ParamSpec::float("highlights_r", -1.0, 1.0, 0.0, "highlight red shift"),
    ParamSpec::float("highlights_g", -1.0, 1.0, 0.0, "highlight green shift"),
    ParamSpec::float("highlights_b", -1.0, 1.0, 0.0, "highlight blue shift"),
];
const POSTERIZE: &[ParamSpec] = &[ParamSpec::int("levels", 2, 256, 4, "output levels per channel")];
const SOLARIZE: &[ParamSpec] = &[ParamSpec::float(
    "threshold",
    0.0,
    1.0,
    0.5,
    "values above are inverted",
)];
const PIXELATE: &[ParamSpec] = &[ParamSpec::int("block", 1, 1024, 8, "block size in pixels")];
const CRYSTALLIZE: &[ParamSpec] = &[
    ParamSpec::int("cell", 2, 512, 16, "approximate cell size in pixels"),
    ParamSpec::int("seed", 0, MAX_SEED, 0, "cell placement seed"),
];
const EDGE_DETECT: &[ParamSpec] = &[
    ParamSpec::choice("kernel", &["sobel", "prewitt", "laplacian"], "sobel", "gradient operator"),
    ParamSpec::float("threshold", 0.0, 1.0, 0.2, "binarize above; 0 keeps the magnitude"),
];

/// The parameter schema of `kind`.
pub fn schema(kind: OperationKind) -> &'static [ParamSpec] {
    use OperationKind::*;
    match kind {
        Brightness => BRIGHTNESS,
        Contrast => CONTRAST,
        Saturation => SATURATION,
        Exposure => EXPOSURE,
        ColorTemperature => COLOR_TEMPERATURE,
        Crop => CROP,
        Rotate => ROTATE,
        Resize => RESIZE,
        Grayscale | Negative => &[],
        Flip => FLIP,
        OilPainting => OIL_PAINTING,
        Charcoal => CHARCOAL,
        Sepia => SEPIA,
        Grain => GRAIN,
        Emboss => EMBOSS,
        Swirl => SWIRL,
        Blur => BLUR,
        Sharpen => SHARPEN,
        Vignette => VIGNETTE,
        Wave => WAVE,
        Implode => IMPLODE,
        Duotone => DUOTONE,
        SplitToning => SPLIT_TONING,
        Levels => LEVELS,
        ColorBalance => COLOR_BALANCE,
        Posterize => POSTERIZE,
        Solarize => SOLARIZE,
        Pixelate => PIXELATE,
        Crystallize => CRYSTALLIZE,
        EdgeDetect => EDGE_DETECT,
    }
}

/// Validate raw parameters for `kind`, returning the normalized set.
///
/// Unknown names are rejected, omitted names take their default, and a
/// `null` value counts as omitted.
pub fn validate(kind: OperationKind, raw: &Map<String, Value>) -> Result<ParamSet, ValidationError> {
    let specs = schema(kind);
    let context = kind.name();

    if let Some(unknown) = raw.keys().find(|k| !specs.iter().any(|s| s.name == k.as_str())) {
        return Err(ValidationError::new(
            context,
            unknown.as_str(),
            ValidationReason::UnknownParameter,
        ));
    }

    let mut set = ParamSet::new();
    for spec in specs {
        let value = match raw.get(spec.name).filter(|v| !v.is_null()) {
            Some(v) => spec
                .ty
                .coerce(v)
                .map_err(|reason| ValidationError::new(context, spec.name, reason))?,
            None => spec
                .default
                .value()
                .ok_or_else(|| ValidationError::new(context, spec.name, ValidationReason::Missing))?,
        };
        set.insert(spec.name, value);
    }

    check_cross_field(kind, &set).map_err(|e| e.within(context))?;
    Ok(set)
}

fn check_cross_field(kind: OperationKind, set: &ParamSet) -> Result<(), ValidationError> {
    if kind == OperationKind::Levels {
        let black = set.float("black")?;
        let white = set.float("white")?;
        if white <= black {
            return Err(ValidationError::new(
                "",
                "white",
                ValidationReason::Invalid(format!("must exceed black ({black})")),
            ));
        }
    }
    Ok(())
}
