//! Special effects: negative, posterize, solarize, pixelate, crystallize,
//! edge-detect.

use super::{choice, float, seed, whole};
use crate::editing::buffer::Plane;
use crate::editing::error::ValidationError;
use crate::editing::params::ParamSet;
use crate::editing::sampling::{
    LAPLACIAN, PREWITT_X, PREWITT_Y, SOBEL_X, SOBEL_Y, convolve3x3, generate, gradient_magnitude,
    luma_plane, map_rgb,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Negative;

impl Negative {
    pub fn apply(&self, src: &Plane) -> Plane {
        map_rgb(src, |c| c.map(|v| 1.0 - v))
    }
}

/// Quantize each channel to `levels` evenly spaced values.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterize {
    pub levels: u32,
}

impl Posterize {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            levels: whole(p, "levels")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let steps = (self.levels - 1) as f32;
        map_rgb(src, |c| c.map(|v| (v.clamp(0.0, 1.0) * steps).round() / steps))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solarize {
    pub threshold: f32,
}

impl Solarize {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            threshold: float(p, "threshold")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let t = self.threshold;
        map_rgb(src, |c| c.map(|v| if v > t { 1.0 - v } else { v }))
    }
}

/// Cell-average helper shared by pixelate and crystallize: `labels[i]` is the
/// cell of pixel `i`; returns the mean color of each cell.
fn cell_means(src: &Plane, labels: &[u32], cells: usize) -> Vec<[f32; 3]> {
    let mut sums = vec![[0f32; 4]; cells];
    for (px, &label) in src.data.chunks_exact(src.channels).zip(labels) {
        let s = &mut sums[label as usize];
        s[0] += px[0];
        s[1] += px[1];
        s[2] += px[2];
        s[3] += 1.0;
    }
    sums.into_iter()
        .map(|[r, g, b, n]| {
            if n > 0.0 {
                [r / n, g / n, b / n]
            } else {
                [0.0; 3]
            }
        })
        .collect()
}

fn fill_cells(src: &Plane, labels: &[u32], means: &[[f32; 3]]) -> Plane {
    generate(src.width, src.height, src.channels, |x, y, px| {
        px.copy_from_slice(src.px(x, y));
        let mean = means[labels[y * src.width + x] as usize];
        px[..3].copy_from_slice(&mean);
    })
}

/// Flatten `block`×`block` tiles to their mean color. Edge tiles average
/// only the pixels they contain.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixelate {
    pub block: usize,
}

impl Pixelate {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            block: whole(p, "block")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let b = self.block;
        let cols = src.width.div_ceil(b);
        let cells = cols * src.height.div_ceil(b);
        let labels: Vec<u32> = (0..src.width * src.height)
            .map(|i| ((i / src.width / b) * cols + (i % src.width) / b) as u32)
            .collect();
        fill_cells(src, &labels, &cell_means(src, &labels, cells))
    }
}

/// Voronoi cells around one jittered seed point per `cell`×`cell` grid
/// square; every pixel takes the mean color of its nearest seed's cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Crystallize {
    pub cell: usize,
    pub seed: u64,
}

impl Crystallize {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            cell: whole(p, "cell")?,
            seed: seed(p, "seed")?,
        })
    }

    fn seed_points(&self, cols: usize, rows: usize) -> Vec<(f32, f32)> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let size = self.cell as f32;
        (0..rows)
            .flat_map(|gy| (0..cols).map(move |gx| (gx, gy)))
            .map(|(gx, gy)| {
                let jx: f32 = rng.random();
                let jy: f32 = rng.random();
                ((gx as f32 + jx) * size, (gy as f32 + jy) * size)
            })
            .collect()
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let size = self.cell;
        let cols = src.width.div_ceil(size);
        let rows = src.height.div_ceil(size);
        let points = self.seed_points(cols, rows);

        let mut labels = vec![0u32; src.width * src.height];
        labels
            .par_chunks_mut(src.width)
            .enumerate()
            .for_each(|(y, row)| {
                let gy = (y / size) as isize;
                for (x, label) in row.iter_mut().enumerate() {
                    let gx = (x / size) as isize;
                    let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                    let mut best = (f32::MAX, 0u32);
                    for ny in (gy - 2).max(0)..=(gy + 2).min(rows as isize - 1) {
                        for nx in (gx - 2).max(0)..=(gx + 2).min(cols as isize - 1) {
                            let i = ny as usize * cols + nx as usize;
                            let (sx, sy) = points[i];
                            let d = (sx - px).powi(2) + (sy - py).powi(2);
                            if d < best.0 {
                                best = (d, i as u32);
                            }
                        }
                    }
                    *label = best.1;
                }
            });

        fill_cells(src, &labels, &cell_means(src, &labels, points.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKernel {
    Sobel,
    Prewitt,
    Laplacian,
}

impl FromStr for EdgeKernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sobel" => Ok(Self::Sobel),
            "prewitt" => Ok(Self::Prewitt),
            "laplacian" => Ok(Self::Laplacian),
            other => Err(format!("unknown kernel '{other}'")),
        }
    }
}

/// Gradient magnitude of luminance, normalized so a full black-to-white step
/// reads 1.0. A positive `threshold` binarizes the result.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDetect {
    pub kernel: EdgeKernel,
    pub threshold: f32,
}

impl EdgeDetect {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            kernel: choice(p, "kernel")?,
            threshold: float(p, "threshold")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let intensity = luma_plane(src);
        let edges = match self.kernel {
            EdgeKernel::Sobel => gradient_magnitude(&intensity, &SOBEL_X, &SOBEL_Y, 1, 4.0),
            EdgeKernel::Prewitt => gradient_magnitude(&intensity, &PREWITT_X, &PREWITT_Y, 1, 3.0),
            EdgeKernel::Laplacian => {
                let mut lap = convolve3x3(&intensity, &LAPLACIAN);
                for v in &mut lap.data {
                    *v = v.abs() / 4.0;
                }
                lap
            }
        };
        let t = self.threshold;
        generate(src.width, src.height, src.channels, |x, y, px| {
            px.copy_from_slice(src.px(x, y));
            let m = edges.at(x, y);
            let v = if t > 0.0 {
                if m > t { 1.0 } else { 0.0 }
            } else {
                m
            };
            px[..3].fill(v);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(vals: &[f32]) -> Plane {
        generate(vals.len(), 1, 3, |x, _, px| px.fill(vals[x]))
    }

    fn quantized(p: &Plane) -> Vec<u8> {
        p.data.iter().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8).collect()
    }

    #[test]
    fn posterize_two_levels() {
        let src = values(&[0.0, 64.0 / 255.0, 128.0 / 255.0, 192.0 / 255.0, 1.0]);
        let out = Posterize { levels: 2 }.apply(&src);
        let mut distinct = quantized(&out);
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct, vec![0, 255]);
    }

    #[test]
    fn solarize_inverts_above_threshold() {
        let out = Solarize { threshold: 0.5 }.apply(&values(&[0.2, 0.8]));
        assert!((out.px(0, 0)[0] - 0.2).abs() < 1e-6);
        assert!((out.px(1, 0)[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn pixelate_averages_blocks_including_partial_edges() {
        let src = values(&[0.0, 0.2, 0.4, 0.6, 0.8]);
        let out = Pixelate { block: 2 }.apply(&src);
        assert!((out.px(0, 0)[0] - 0.1).abs() < 1e-6);
        assert!((out.px(1, 0)[0] - 0.1).abs() < 1e-6);
        assert!((out.px(3, 0)[0] - 0.5).abs() < 1e-6);
        assert!((out.px(4, 0)[0] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn crystallize_is_seeded_and_flattens_cells() {
        let src = generate(32, 24, 3, |x, y, px| px.fill(((x * 7 + y * 3) % 17) as f32 / 16.0));
        let a = Crystallize { cell: 8, seed: 1 }.apply(&src);
        let b = Crystallize { cell: 8, seed: 1 }.apply(&src);
        assert_eq!(a, b);
        let mut colors: Vec<u8> = quantized(&a);
        colors.sort_unstable();
        colors.dedup();
        assert!(colors.len() <= 12, "at most one color per cell");
    }

    #[test]
    fn sobel_binarized_marks_step_edges() {
        let src = values(&[0.0, 0.0, 1.0, 1.0]);
        let out = EdgeDetect {
            kernel: EdgeKernel::Sobel,
            threshold: 0.5,
        }
        .apply(&src);
        let got: Vec<f32> = (0..4).map(|x| out.px(x, 0)[0]).collect();
        assert_eq!(got, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn laplacian_is_zero_on_flat_input() {
        let out = EdgeDetect {
            kernel: EdgeKernel::Laplacian,
            threshold: 0.0,
        }
        .apply(&values(&[0.4; 5]));
        assert!(out.data.iter().all(|v| *v == 0.0));
    }
}
