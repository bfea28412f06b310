//! Basic adjustments and geometry.
//!
//! Adjustments are pointwise on the color channels. Geometry changes the
//! buffer's dimensions:
//!
//! - **crop** copies a rectangle; it fails if the rectangle leaves the buffer.
//! - **resize** samples at output pixel centers (`nearest` or `bilinear`).
//! - **rotate** turns clockwise for positive angles. Right angles are exact
//!   remaps. Other angles inverse-map every output pixel into the source and
//!   resample it; positions outside the source read the `fill` color. With
//!   `expand` the canvas grows to the rotated bounds, otherwise it keeps the
//!   source size and the corners are clipped.

use super::{choice, float, lerp, whole};
use crate::editing::buffer::Plane;
use crate::editing::color::{ColorSample, luma};
use crate::editing::error::{ApplyError, ValidationError};
use crate::editing::params::ParamSet;
use crate::editing::sampling::{
    generate, map_rgb, sample_bilinear, sample_bilinear_or, sample_nearest, sample_nearest_or,
};
use std::str::FromStr;

/// Largest pixel count a geometric operation may produce.
const MAX_OUTPUT_PIXELS: u64 = 1 << 30;

fn check_output(width: u64, height: u64) -> Result<(usize, usize), ApplyError> {
    if width == 0 || height == 0 || width.saturating_mul(height) > MAX_OUTPUT_PIXELS {
        return Err(ApplyError::InvalidDimensions { width, height });
    }
    Ok((width as usize, height as usize))
}

/// Resampling policy for geometric operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    Bilinear,
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Self::Nearest),
            "bilinear" => Ok(Self::Bilinear),
            other => Err(format!("unknown interpolation '{other}'")),
        }
    }
}

// ============================================================================
// Adjustments
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Brightness {
    /// Shift in unit range (`amount / 255`).
    pub shift: f32,
}

impl Brightness {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            shift: float(p, "amount")? / 255.0,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let d = self.shift;
        map_rgb(src, |c| c.map(|v| v + d))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contrast {
    pub factor: f32,
}

impl Contrast {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            factor: float(p, "factor")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let f = self.factor;
        map_rgb(src, |c| c.map(|v| (v - 0.5) * f + 0.5))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Saturation {
    pub factor: f32,
}

impl Saturation {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            factor: float(p, "factor")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let f = self.factor;
        map_rgb(src, |c| {
            let mut hsv = ColorSample(c).to_hsv();
            hsv.0[1] = (hsv.0[1] * f).min(1.0);
            ColorSample::from_hsv(hsv).0
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exposure {
    pub stops: f32,
}

impl Exposure {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            stops: float(p, "stops")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let gain = 2f32.powf(self.stops);
        map_rgb(src, |c| c.map(|v| v * gain))
    }
}

/// White-balance shift toward the color of a black body at `kelvin`.
///
/// Channel gains are the black-body color divided by the 6500 K reference, so
/// 6500 is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTemperature {
    pub kelvin: u32,
    pub strength: f32,
}

impl ColorTemperature {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            kelvin: whole(p, "kelvin")?,
            strength: float(p, "strength")?,
        })
    }

    pub fn gains(&self) -> [f32; 3] {
        let target = kelvin_to_rgb(self.kelvin as f32);
        let reference = kelvin_to_rgb(6500.0);
        std::array::from_fn(|c| lerp(1.0, target[c] / reference[c], self.strength))
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let [gr, gg, gb] = self.gains();
        map_rgb(src, |[r, g, b]| [r * gr, g * gg, b * gb])
    }
}

/// Tanner Helland's black-body approximation, unit-range RGB.
fn kelvin_to_rgb(kelvin: f32) -> [f32; 3] {
    let t = kelvin / 100.0;
    let r = if t <= 66.0 {
        255.0
    } else {
        329.698_73 * (t - 60.0).powf(-0.133_204_76)
    };
    let g = if t <= 66.0 {
        99.470_8 * t.ln() - 161.119_57
    } else {
        288.122_17 * (t - 60.0).powf(-0.075_514_85)
    };
    let b = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.517_73 * (t - 10.0).ln() - 305.044_8
    };
    [r, g, b].map(|v| v.clamp(0.0, 255.0) / 255.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grayscale;

impl Grayscale {
    pub fn apply(&self, src: &Plane) -> Plane {
        map_rgb(src, |[r, g, b]| {
            let y = luma(r, g, b);
            [y, y, y]
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

impl FromStr for FlipDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flip {
    pub direction: FlipDirection,
}

impl Flip {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            direction: choice(p, "direction")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let (w, h) = (src.width, src.height);
        generate(w, h, src.channels, |x, y, px| {
            let (sx, sy) = match self.direction {
                FlipDirection::Horizontal => (w - 1 - x, y),
                FlipDirection::Vertical => (x, h - 1 - y),
            };
            px.copy_from_slice(src.px(sx, sy));
        })
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Crop {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            x: whole(p, "x")?,
            y: whole(p, "y")?,
            w: whole(p, "w")?,
            h: whole(p, "h")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Result<Plane, ApplyError> {
        let right = self.x as u64 + self.w as u64;
        let bottom = self.y as u64 + self.h as u64;
        if right > src.width as u64 || bottom > src.height as u64 {
            return Err(ApplyError::CropOutOfBounds {
                x: self.x,
                y: self.y,
                w: self.w,
                h: self.h,
                width: src.width as u32,
                height: src.height as u32,
            });
        }
        let (ox, oy) = (self.x as usize, self.y as usize);
        Ok(generate(self.w as usize, self.h as usize, src.channels, |x, y, px| {
            px.copy_from_slice(src.px(x + ox, y + oy));
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resize {
    pub w: u32,
    pub h: u32,
    pub filter: Interpolation,
}

impl Resize {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            w: whole(p, "w")?,
            h: whole(p, "h")?,
            filter: choice(p, "filter")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Result<Plane, ApplyError> {
        let (w, h) = check_output(self.w as u64, self.h as u64)?;
        let sx = src.width as f32 / w as f32;
        let sy = src.height as f32 / h as f32;
        Ok(match self.filter {
            Interpolation::Nearest => generate(w, h, src.channels, |x, y, px| {
                sample_nearest(src, (x as f32 + 0.5) * sx, (y as f32 + 0.5) * sy, px);
            }),
            Interpolation::Bilinear => generate(w, h, src.channels, |x, y, px| {
                sample_bilinear(
                    src,
                    (x as f32 + 0.5) * sx - 0.5,
                    (y as f32 + 0.5) * sy - 0.5,
                    px,
                );
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rotate {
    /// Degrees, clockwise.
    pub angle: f64,
    pub interpolation: Interpolation,
    pub fill: [f32; 4],
    pub expand: bool,
}

impl Rotate {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            angle: p.float("angle")?,
            interpolation: choice(p, "interpolation")?,
            fill: p.color("fill")?.unit(),
            expand: p.text("expand")? == "true",
        })
    }

    pub fn apply(&self, src: &Plane) -> Result<Plane, ApplyError> {
        let turn = self.angle.rem_euclid(360.0);
        let square = src.width == src.height;
        if turn == 0.0 {
            return Ok(src.clone());
        }
        if turn == 180.0 {
            return Ok(remap_right_angle(src, 180));
        }
        if (turn == 90.0 || turn == 270.0) && (self.expand || square) {
            return Ok(remap_right_angle(src, turn as u32));
        }
        self.resample(src, turn)
    }

    fn resample(&self, src: &Plane, turn: f64) -> Result<Plane, ApplyError> {
        let theta = turn.to_radians();
        let (sin, cos) = theta.sin_cos();
        let (w, h) = (src.width as f64, src.height as f64);
        let (out_w, out_h) = if self.expand {
            // Trim float noise so a 45 degree turn of a square doesn't gain a column.
            let bw = (w * cos.abs() + h * sin.abs() - 1e-6).ceil().max(1.0);
            let bh = (w * sin.abs() + h * cos.abs() - 1e-6).ceil().max(1.0);
            check_output(bw as u64, bh as u64)?
        } else {
            (src.width, src.height)
        };

        let fill = &self.fill[..src.channels];
        let (sin, cos) = (sin as f32, cos as f32);
        let (cx, cy) = (src.width as f32 / 2.0, src.height as f32 / 2.0);
        let (ncx, ncy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);
        let bilinear = self.interpolation == Interpolation::Bilinear;

        Ok(generate(out_w, out_h, src.channels, |x, y, px| {
            let dx = x as f32 + 0.5 - ncx;
            let dy = y as f32 + 0.5 - ncy;
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;
            if bilinear {
                sample_bilinear_or(src, sx - 0.5, sy - 0.5, fill, px);
            } else {
                sample_nearest_or(src, sx, sy, fill, px);
            }
        }))
    }
}

/// Lossless clockwise rotation by 90, 180 or 270 degrees.
fn remap_right_angle(src: &Plane, degrees: u32) -> Plane {
    let (w, h) = (src.width, src.height);
    let (out_w, out_h) = if degrees == 180 { (w, h) } else { (h, w) };
    generate(out_w, out_h, src.channels, |x, y, px| {
        let (sx, sy) = match degrees {
            90 => (y, h - 1 - x),
            180 => (w - 1 - x, h - 1 - y),
            _ => (w - 1 - y, x),
        };
        px.copy_from_slice(src.px(sx, sy));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: usize, height: usize) -> Plane {
        generate(width, height, 3, |x, y, px| {
            let v = (y * width + x) as f32 / 255.0;
            px.copy_from_slice(&[v, v, v]);
        })
    }

    fn id(p: &Plane, x: usize, y: usize) -> usize {
        (p.px(x, y)[0] * 255.0).round() as usize
    }

    #[test]
    fn color_temperature_6500_is_identity() {
        let t = ColorTemperature {
            kelvin: 6500,
            strength: 1.0,
        };
        for g in t.gains() {
            assert!((g - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn low_kelvin_warms() {
        let [r, _, b] = ColorTemperature {
            kelvin: 3000,
            strength: 1.0,
        }
        .gains();
        assert!(r >= 1.0 && b < 1.0);
    }

    #[test]
    fn saturation_zero_gives_gray() {
        let src = generate(1, 1, 3, |_, _, px| px.copy_from_slice(&[0.8, 0.2, 0.4]));
        let out = Saturation { factor: 0.0 }.apply(&src);
        let p = out.px(0, 0);
        assert!((p[0] - p[1]).abs() < 1e-6 && (p[1] - p[2]).abs() < 1e-6);
    }

    #[test]
    fn crop_outside_bounds_fails() {
        let src = numbered(4, 4);
        let err = Crop {
            x: 3,
            y: 0,
            w: 2,
            h: 2,
        }
        .apply(&src)
        .unwrap_err();
        assert!(matches!(err, ApplyError::CropOutOfBounds { width: 4, .. }));
    }

    #[test]
    fn crop_copies_offset_pixels() {
        let src = numbered(4, 4);
        let out = Crop {
            x: 1,
            y: 2,
            w: 3,
            h: 2,
        }
        .apply(&src)
        .unwrap();
        assert_eq!((out.width, out.height), (3, 2));
        assert_eq!(id(&out, 0, 0), 9);
        assert_eq!(id(&out, 2, 1), 15);
    }

    #[test]
    fn rotate_90_moves_top_left_to_top_right() {
        let src = numbered(3, 2);
        let rot = Rotate {
            angle: 90.0,
            interpolation: Interpolation::Bilinear,
            fill: [0.0; 4],
            expand: true,
        };
        let out = rot.apply(&src).unwrap();
        assert_eq!((out.width, out.height), (2, 3));
        assert_eq!(id(&out, 1, 0), 0);
        assert_eq!(id(&out, 0, 0), 3);
        assert_eq!(id(&out, 1, 2), 2);
    }

    #[test]
    fn rotate_minus_90_is_rotate_270() {
        let src = numbered(3, 2);
        let mk = |angle| Rotate {
            angle,
            interpolation: Interpolation::Nearest,
            fill: [0.0; 4],
            expand: true,
        };
        assert_eq!(mk(-90.0).apply(&src), mk(270.0).apply(&src));
    }

    #[test]
    fn rotate_45_expands_and_fills_corners() {
        let src = generate(10, 10, 4, |_, _, px| px.fill(1.0));
        let out = Rotate {
            angle: 45.0,
            interpolation: Interpolation::Bilinear,
            fill: [0.0; 4],
            expand: true,
        }
        .apply(&src)
        .unwrap();
        assert_eq!((out.width, out.height), (15, 15));
        assert_eq!(out.px(0, 0), &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(out.px(7, 7), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn rotate_without_expand_keeps_size() {
        let src = numbered(6, 4);
        let out = Rotate {
            angle: 30.0,
            interpolation: Interpolation::Nearest,
            fill: [0.0; 4],
            expand: false,
        }
        .apply(&src)
        .unwrap();
        assert_eq!((out.width, out.height), (6, 4));
    }

    #[test]
    fn resize_bilinear_of_flat_plane_stays_flat() {
        let src = generate(7, 5, 3, |_, _, px| px.fill(0.25));
        let out = Resize {
            w: 3,
            h: 11,
            filter: Interpolation::Bilinear,
        }
        .apply(&src)
        .unwrap();
        assert!(out.data.iter().all(|v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn flip_twice_is_identity() {
        let src = numbered(5, 3);
        for direction in [FlipDirection::Horizontal, FlipDirection::Vertical] {
            let f = Flip { direction };
            assert_eq!(f.apply(&f.apply(&src)), src);
        }
    }
}
