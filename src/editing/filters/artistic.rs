//! Artistic filters.
//!
//! | Filter | Algorithm |
//! |---|---|
//! | oil-painting | per-window luminance histogram; output the mean color of the fullest bin |
//! | charcoal | blur, Sobel magnitude at `radius` reach, normalize, invert to gray |
//! | sepia | sepia matrix blended by `intensity` |
//! | grain | seeded Gaussian noise in `size`-pixel blocks |
//! | emboss | bump-map shading of luminance against a directional light |
//! | swirl | rotation by `degrees * (1 - d/r)^2` inside the radius |
//! | blur / sharpen | separable Gaussian; unsharp mask |
//! | vignette | smoothstep blend toward `color` by distance from `center` |
//! | wave | vertical sine displacement along x |
//! | implode | radial remap `d * sin(π/2 · d/r)^-amount`; negative amounts explode |
//!
//! Window reads use clamp-to-edge. Grain is the only stochastic filter and is
//! a pure function of its `seed`.

use super::{center, choice, float, lerp, seed, smoothstep, whole};
use crate::editing::buffer::Plane;
use crate::editing::error::ValidationError;
use crate::editing::params::ParamSet;
use crate::editing::sampling::{
    SOBEL_X, SOBEL_Y, clamp_coord, gaussian_blur, generate, gradient_magnitude, luma_plane,
    map_rgb, radius_for_sigma, sample_bilinear,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::str::FromStr;

/// Remap radius in pixels: `fraction` of half the shorter side.
fn effect_radius(src: &Plane, fraction: f32) -> f32 {
    (src.width.min(src.height) as f32 / 2.0 * fraction).max(f32::EPSILON)
}

fn center_px(src: &Plane, rel: [f32; 2]) -> (f32, f32) {
    (rel[0] * src.width as f32, rel[1] * src.height as f32)
}

/// Resample `src` through a coordinate mapping from output pixel centers to
/// source positions (continuous coordinates).
fn remap<F>(src: &Plane, map: F) -> Plane
where
    F: Fn(f32, f32) -> (f32, f32) + Sync + Send,
{
    generate(src.width, src.height, src.channels, |x, y, px| {
        let (sx, sy) = map(x as f32 + 0.5, y as f32 + 0.5);
        sample_bilinear(src, sx - 0.5, sy - 0.5, px);
    })
}

// ============================================================================
// Neighborhood filters
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OilPainting {
    pub radius: usize,
    pub levels: usize,
}

impl OilPainting {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            radius: whole(p, "radius")?,
            levels: whole(p, "levels")?,
        })
    }

    /// Histograms are allocated once per row and cleared for each pixel.
    pub fn apply(&self, src: &Plane) -> Plane {
        let r = self.radius as isize;
        let levels = self.levels;
        let bins = levels as f32;
        let intensity = luma_plane(src);
        let mut out = Plane::new(src.width, src.height, src.channels);
        let stride = out.stride();
        out.data
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                let mut counts = vec![0u32; levels];
                let mut sums = vec![[0f32; 3]; levels];
                for (x, px) in row.chunks_exact_mut(src.channels).enumerate() {
                    counts.fill(0);
                    sums.fill([0.0; 3]);
                    for dy in -r..=r {
                        let sy = clamp_coord(y as isize + dy, src.height);
                        for dx in -r..=r {
                            let sx = clamp_coord(x as isize + dx, src.width);
                            let bin = ((intensity.at(sx, sy) * bins) as usize).min(levels - 1);
                            let p = src.px(sx, sy);
                            counts[bin] += 1;
                            for c in 0..3 {
                                sums[bin][c] += p[c];
                            }
                        }
                    }
                    let (best, count) = counts
                        .iter()
                        .enumerate()
                        .fold((0, 0), |acc, (i, &n)| if n > acc.1 { (i, n) } else { acc });
                    px.copy_from_slice(src.px(x, y));
                    for c in 0..3 {
                        px[c] = sums[best][c] / count as f32;
                    }
                }
            });
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Charcoal {
    pub radius: usize,
    pub sigma: f32,
}

impl Charcoal {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            radius: whole(p, "radius")?,
            sigma: float(p, "sigma")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let soft = gaussian_blur(&luma_plane(src), radius_for_sigma(self.sigma), self.sigma);
        let edges = gradient_magnitude(&soft, &SOBEL_X, &SOBEL_Y, self.radius, 4.0);
        let peak = edges.data.iter().copied().fold(0.0f32, f32::max);
        let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
        generate(src.width, src.height, src.channels, |x, y, px| {
            px.copy_from_slice(src.px(x, y));
            let v = 1.0 - edges.at(x, y) * scale;
            px[..3].fill(v);
        })
    }
}

/// Bump-map emboss: luminance is treated as a height field lit from
/// `azimuth`/`elevation`. Flat regions shade to `sin(elevation)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Emboss {
    pub azimuth: f32,
    pub elevation: f32,
    pub depth: f32,
}

impl Emboss {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            azimuth: float(p, "azimuth")?,
            elevation: float(p, "elevation")?,
            depth: float(p, "depth")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let (az, el) = (self.azimuth.to_radians(), self.elevation.to_radians());
        let light = [az.cos() * el.cos(), az.sin() * el.cos(), el.sin()];
        let nz = 6.0 / self.depth;
        let height = luma_plane(src);
        generate(src.width, src.height, src.channels, |x, y, px| {
            let at = |dx: isize, dy: isize| {
                height.at(
                    clamp_coord(x as isize + dx, src.width),
                    clamp_coord(y as isize + dy, src.height),
                )
            };
            let nx = at(-1, -1) + at(-1, 0) + at(-1, 1) - at(1, -1) - at(1, 0) - at(1, 1);
            let ny = at(-1, 1) + at(0, 1) + at(1, 1) - at(-1, -1) - at(0, -1) - at(1, -1);
            let shade = if nx == 0.0 && ny == 0.0 {
                light[2]
            } else {
                let dot = nx * light[0] + ny * light[1] + nz * light[2];
                (dot / (nx * nx + ny * ny + nz * nz).sqrt()).max(0.0)
            };
            px.copy_from_slice(src.px(x, y));
            px[..3].fill(shade);
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blur {
    pub radius: usize,
    pub sigma: f32,
}

impl Blur {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        let sigma = float(p, "sigma")?;
        let radius: usize = whole(p, "radius")?;
        Ok(Self {
            radius: if radius == 0 { radius_for_sigma(sigma) } else { radius },
            sigma,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        gaussian_blur(src, self.radius, self.sigma)
    }
}

/// Unsharp mask: `src + amount * (src - blur(src))` on the color channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Sharpen {
    pub sigma: f32,
    pub amount: f32,
}

impl Sharpen {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            sigma: float(p, "sigma")?,
            amount: float(p, "amount")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let blurred = gaussian_blur(src, radius_for_sigma(self.sigma), self.sigma);
        generate(src.width, src.height, src.channels, |x, y, px| {
            let (s, b) = (src.px(x, y), blurred.px(x, y));
            px.copy_from_slice(s);
            for c in 0..3 {
                px[c] = s[c] + self.amount * (s[c] - b[c]);
            }
        })
    }
}

// ============================================================================
// Pointwise color
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Sepia {
    pub intensity: f32,
}

impl Sepia {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            intensity: float(p, "intensity")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let t = self.intensity;
        map_rgb(src, |[r, g, b]| {
            let toned = [
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ];
            [
                lerp(r, toned[0], t),
                lerp(g, toned[1], t),
                lerp(b, toned[2], t),
            ]
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrainMode {
    Mono,
    Color,
}

impl FromStr for GrainMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mono" => Ok(Self::Mono),
            "color" => Ok(Self::Color),
            other => Err(format!("unknown grain mode '{other}'")),
        }
    }
}

/// Film grain. Noise is drawn per `size`×`size` block from a generator seeded
/// by `(seed, block row)`, so output is identical regardless of thread count.
#[derive(Debug, Clone, PartialEq)]
pub struct Grain {
    pub amount: f32,
    pub size: usize,
    pub seed: u64,
    pub mode: GrainMode,
}

impl Grain {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            amount: float(p, "amount")?,
            size: whole(p, "size")?,
            seed: seed(p, "seed")?,
            mode: choice(p, "mode")?,
        })
    }

    fn block_row_noise(&self, block_row: usize, blocks: usize) -> Vec<[f32; 3]> {
        let row_seed = self.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ block_row as u64;
        let mut rng = StdRng::seed_from_u64(row_seed);
        (0..blocks)
            .map(|_| match self.mode {
                GrainMode::Mono => [gaussian(&mut rng); 3],
                GrainMode::Color => [gaussian(&mut rng), gaussian(&mut rng), gaussian(&mut rng)],
            })
            .collect()
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let mut out = src.clone();
        let (channels, size) = (src.channels, self.size);
        let blocks = src.width.div_ceil(size);
        let stride = out.stride();
        out.data
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                let noise = self.block_row_noise(y / size, blocks);
                for (x, px) in row.chunks_exact_mut(channels).enumerate() {
                    let n = noise[x / size];
                    for c in 0..3 {
                        px[c] += self.amount * n[c];
                    }
                }
            });
        out
    }
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f32 {
    let u1: f32 = 1.0 - rng.random::<f32>();
    let u2: f32 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vignette {
    pub radius: f32,
    pub softness: f32,
    pub center: [f32; 2],
    pub color: [f32; 4],
}

impl Vignette {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            radius: float(p, "radius")?,
            softness: float(p, "softness")?,
            center: center(p, "center")?,
            color: p.color("color")?.unit(),
        })
    }

    /// Distance is `2 * |offset|` in relative coordinates: 1.0 at the edge
    /// midpoints of a centered vignette.
    pub fn apply(&self, src: &Plane) -> Plane {
        let [cx, cy] = self.center;
        let (w, h) = (src.width as f32, src.height as f32);
        generate(src.width, src.height, src.channels, |x, y, px| {
            let u = (x as f32 + 0.5) / w - cx;
            let v = (y as f32 + 0.5) / h - cy;
            let d = 2.0 * (u * u + v * v).sqrt();
            let t = smoothstep(self.radius, self.radius + self.softness, d) * self.color[3];
            px.copy_from_slice(src.px(x, y));
            for c in 0..3 {
                px[c] = lerp(px[c], self.color[c], t);
            }
        })
    }
}

// ============================================================================
// Distortions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Swirl {
    pub degrees: f32,
    pub radius: f32,
    pub center: [f32; 2],
}

impl Swirl {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            degrees: float(p, "degrees")?,
            radius: float(p, "radius")?,
            center: center(p, "center")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let radius = effect_radius(src, self.radius);
        let (cx, cy) = center_px(src, self.center);
        let twist = self.degrees.to_radians();
        remap(src, |x, y| {
            let (dx, dy) = (x - cx, y - cy);
            let d = (dx * dx + dy * dy).sqrt();
            if d >= radius {
                return (x, y);
            }
            let t = 1.0 - d / radius;
            let (sin, cos) = (twist * t * t).sin_cos();
            (cos * dx - sin * dy + cx, sin * dx + cos * dy + cy)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    pub amplitude: f32,
    pub wavelength: f32,
}

impl Wave {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            amplitude: float(p, "amplitude")?,
            wavelength: float(p, "wavelength")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let k = TAU / self.wavelength;
        remap(src, |x, y| (x, y + self.amplitude * (k * x).sin()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Implode {
    pub amount: f32,
    pub radius: f32,
    pub center: [f32; 2],
}

impl Implode {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            amount: float(p, "amount")?,
            radius: float(p, "radius")?,
            center: center(p, "center")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let radius = effect_radius(src, self.radius);
        let (cx, cy) = center_px(src, self.center);
        remap(src, |x, y| {
            let (dx, dy) = (x - cx, y - cy);
            let d = (dx * dx + dy * dy).sqrt();
            if d >= radius || d == 0.0 {
                return (x, y);
            }
            let factor = (FRAC_PI_2 * d / radius).sin().powf(-self.amount);
            (cx + dx * factor, cy + dy * factor)
        })
    }
}
