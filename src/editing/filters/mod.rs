//! The transforms, one parameter struct per operation kind.
//!
//! Each struct is built from a validated [`ParamSet`] by `from_params` and
//! applied to a unit-float [`Plane`](super::buffer::Plane). Pointwise filters
//! are infallible; geometric ones return [`ApplyError`](super::ApplyError)
//! when the concrete buffer cannot satisfy them.
//!
//! | Module | Kinds |
//! |---|---|
//! | [`basic`] | adjustments, grayscale, flip, crop, rotate, resize |
//! | [`artistic`] | oil-painting, charcoal, sepia, grain, emboss, swirl, blur, sharpen, vignette, wave, implode |
//! | [`tone`] | duotone, split-toning, levels, color-balance |
//! | [`special`] | negative, posterize, solarize, pixelate, crystallize, edge-detect |

pub mod artistic;
pub mod basic;
pub mod special;
pub mod tone;

use super::error::{ValidationError, ValidationReason};
use super::params::ParamSet;
use std::str::FromStr;

/// Read an enum parameter into its typed form.
pub(crate) fn choice<T>(params: &ParamSet, name: &str) -> Result<T, ValidationError>
where
    T: FromStr<Err = String>,
{
    params
        .text(name)?
        .parse()
        .map_err(|reason| ValidationError::new("", name, ValidationReason::Invalid(reason)))
}

/// Convert a validated integer parameter, rejecting values the target type
/// cannot hold.
pub(crate) fn whole<T>(params: &ParamSet, name: &str) -> Result<T, ValidationError>
where
    T: TryFrom<i64>,
{
    let v = params.int(name)?;
    T::try_from(v).map_err(|_| {
        ValidationError::new(
            "",
            name,
            ValidationReason::Invalid(format!("{v} does not fit")),
        )
    })
}

/// Seed parameters are validated to the `u32` range and widened.
pub(crate) fn seed(params: &ParamSet, name: &str) -> Result<u64, ValidationError> {
    whole::<u32>(params, name).map(u64::from)
}

/// Center point parameter in relative coordinates.
pub(crate) fn center(params: &ParamSet, name: &str) -> Result<[f32; 2], ValidationError> {
    let [x, y] = params.point(name)?;
    Ok([x as f32, y as f32])
}

pub(crate) fn float(params: &ParamSet, name: &str) -> Result<f32, ValidationError> {
    params.float(name).map(|v| v as f32)
}

#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
