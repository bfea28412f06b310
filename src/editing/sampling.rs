//! Shared pixel plumbing for the filters: row-parallel iteration, the
//! clamp-to-edge policy, resampling, and separable Gaussian blur.
//!
//! Every helper reads from an immutable source [`Plane`] and writes a fresh
//! one. Rows of the output are handed to rayon as disjoint `&mut` chunks, so
//! no window ever reads from memory another worker is writing.

use super::buffer::Plane;
use super::color::luma;
use rayon::prelude::*;

/// Apply `f` to the color channels of every pixel. Alpha is carried through.
pub fn map_rgb<F>(src: &Plane, f: F) -> Plane
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync + Send,
{
    let mut out = src.clone();
    let channels = out.channels;
    let stride = out.stride();
    out.data.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(channels) {
            let [r, g, b] = f([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    });
    out
}

/// Build a plane by computing each output pixel from its coordinates.
pub fn generate<F>(width: usize, height: usize, channels: usize, f: F) -> Plane
where
    F: Fn(usize, usize, &mut [f32]) + Sync + Send,
{
    let mut out = Plane::new(width, height, channels);
    let stride = out.stride();
    out.data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(channels).enumerate() {
                f(x, y, px);
            }
        });
    out
}

/// Clamp-to-edge coordinate.
#[inline]
pub fn clamp_coord(v: isize, len: usize) -> usize {
    v.clamp(0, len as isize - 1) as usize
}

/// Copy the pixel nearest to `(x, y)`, clamping to the edge.
pub fn sample_nearest(src: &Plane, x: f32, y: f32, out: &mut [f32]) {
    let sx = clamp_coord(x.floor() as isize, src.width);
    let sy = clamp_coord(y.floor() as isize, src.height);
    out.copy_from_slice(src.px(sx, sy));
}

/// Bilinear sample at `(x, y)` in pixel-center coordinates, clamping to the edge.
pub fn sample_bilinear(src: &Plane, x: f32, y: f32, out: &mut [f32]) {
    let x0f = x.floor();
    let y0f = y.floor();
    let fx = x - x0f;
    let fy = y - y0f;
    let x0 = clamp_coord(x0f as isize, src.width);
    let x1 = clamp_coord(x0f as isize + 1, src.width);
    let y0 = clamp_coord(y0f as isize, src.height);
    let y1 = clamp_coord(y0f as isize + 1, src.height);
    let (p00, p10, p01, p11) = (src.px(x0, y0), src.px(x1, y0), src.px(x0, y1), src.px(x1, y1));
    for c in 0..out.len() {
        let top = p00[c] + (p10[c] - p00[c]) * fx;
        let bottom = p01[c] + (p11[c] - p01[c]) * fx;
        out[c] = top + (bottom - top) * fy;
    }
}

/// Like [`sample_bilinear`], but taps outside the source read `fill`.
pub fn sample_bilinear_or(src: &Plane, x: f32, y: f32, fill: &[f32], out: &mut [f32]) {
    let x0f = x.floor();
    let y0f = y.floor();
    let fx = x - x0f;
    let fy = y - y0f;
    let (x0, y0) = (x0f as isize, y0f as isize);
    let p00 = tap_or(src, x0, y0, fill);
    let p10 = tap_or(src, x0 + 1, y0, fill);
    let p01 = tap_or(src, x0, y0 + 1, fill);
    let p11 = tap_or(src, x0 + 1, y0 + 1, fill);
    for c in 0..out.len() {
        let top = p00[c] + (p10[c] - p00[c]) * fx;
        let bottom = p01[c] + (p11[c] - p01[c]) * fx;
        out[c] = top + (bottom - top) * fy;
    }
}

fn tap_or<'a>(src: &'a Plane, x: isize, y: isize, fill: &'a [f32]) -> &'a [f32] {
    if x < 0 || y < 0 || x >= src.width as isize || y >= src.height as isize {
        fill
    } else {
        src.px(x as usize, y as usize)
    }
}

/// Like [`sample_nearest`], but positions outside the source read `fill`.
pub fn sample_nearest_or(src: &Plane, x: f32, y: f32, fill: &[f32], out: &mut [f32]) {
    let sx = x.floor();
    let sy = y.floor();
    if sx < 0.0 || sy < 0.0 || sx >= src.width as f32 || sy >= src.height as f32 {
        out.copy_from_slice(fill);
    } else {
        out.copy_from_slice(src.px(sx as usize, sy as usize));
    }
}

// ============================================================================
// Gaussian blur
// ============================================================================

/// Kernel radius covering three standard deviations.
pub fn radius_for_sigma(sigma: f32) -> usize {
    (sigma * 3.0).ceil().max(1.0) as usize
}

/// Normalized 1-D Gaussian weights, `2 * radius + 1` long.
pub fn gaussian_kernel(radius: usize, sigma: f32) -> Vec<f32> {
    let r = radius as isize;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Separable Gaussian blur over all channels, clamp-to-edge.
pub fn gaussian_blur(src: &Plane, radius: usize, sigma: f32) -> Plane {
    if radius == 0 {
        return src.clone();
    }
    let kernel = gaussian_kernel(radius, sigma);
    let horizontal = convolve_1d(src, &kernel, true);
    convolve_1d(&horizontal, &kernel, false)
}

fn convolve_1d(src: &Plane, kernel: &[f32], horizontal: bool) -> Plane {
    let r = (kernel.len() / 2) as isize;
    let c = src.channels;
    generate(src.width, src.height, c, |x, y, px| {
        px.fill(0.0);
        for (k, &w) in kernel.iter().enumerate() {
            let d = k as isize - r;
            let (sx, sy) = if horizontal {
                (clamp_coord(x as isize + d, src.width), y)
            } else {
                (x, clamp_coord(y as isize + d, src.height))
            };
            for (o, s) in px.iter_mut().zip(src.px(sx, sy)) {
                *o += w * s;
            }
        }
    })
}

// ============================================================================
// Luminance and 3x3 kernels
// ============================================================================

pub const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
pub const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
pub const PREWITT_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0]];
pub const PREWITT_Y: [[f32; 3]; 3] = [[-1.0, -1.0, -1.0], [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
pub const LAPLACIAN: [[f32; 3]; 3] = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];

/// Gradient magnitude `sqrt(gx² + gy²) / scale` of a single-channel plane.
pub fn gradient_magnitude(
    src: &Plane,
    kx: &[[f32; 3]; 3],
    ky: &[[f32; 3]; 3],
    reach: usize,
    scale: f32,
) -> Plane {
    let gx = convolve3x3_spread(src, kx, reach);
    let gy = convolve3x3_spread(src, ky, reach);
    let mut out = gx;
    for (m, y) in out.data.iter_mut().zip(&gy.data) {
        *m = (*m * *m + y * y).sqrt() / scale;
    }
    out
}

/// Single-channel BT.601 luminance plane.
pub fn luma_plane(src: &Plane) -> Plane {
    generate(src.width, src.height, 1, |x, y, px| {
        let p = src.px(x, y);
        px[0] = luma(p[0], p[1], p[2]);
    })
}

/// Correlate a single-channel plane with a 3x3 kernel, clamp-to-edge.
pub fn convolve3x3(src: &Plane, kernel: &[[f32; 3]; 3]) -> Plane {
    convolve3x3_spread(src, kernel, 1)
}

/// [`convolve3x3`] with taps `reach` pixels apart instead of adjacent.
pub fn convolve3x3_spread(src: &Plane, kernel: &[[f32; 3]; 3], reach: usize) -> Plane {
    let reach = reach as isize;
    generate(src.width, src.height, 1, |x, y, px| {
        let mut acc = 0.0;
        for (ky, row) in kernel.iter().enumerate() {
            let sy = clamp_coord(y as isize + (ky as isize - 1) * reach, src.height);
            for (kx, &w) in row.iter().enumerate() {
                let sx = clamp_coord(x as isize + (kx as isize - 1) * reach, src.width);
                acc += w * src.at(sx, sy);
            }
        }
        px[0] = acc;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Plane {
        generate(width, height, 3, |x, y, px| {
            let v = (x + y * width) as f32 / (width * height) as f32;
            px.copy_from_slice(&[v, v, v]);
        })
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(3, 1.2);
        assert_eq!(k.len(), 7);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(k[0], k[6]);
        assert!(k[3] > k[2]);
    }

    #[test]
    fn blur_of_constant_plane_is_constant() {
        let src = generate(5, 4, 4, |_, _, px| px.copy_from_slice(&[0.2, 0.4, 0.6, 1.0]));
        let out = gaussian_blur(&src, 2, 1.5);
        for (a, b) in out.data.iter().zip(&src.data) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn bilinear_at_pixel_centers_reads_exact_values() {
        let src = ramp(4, 3);
        let mut out = [0.0; 3];
        sample_bilinear(&src, 2.0, 1.0, &mut out);
        assert_eq!(&out[..], src.px(2, 1));
    }

    #[test]
    fn bilinear_or_blends_toward_fill_outside() {
        let src = generate(2, 2, 3, |_, _, px| px.fill(1.0));
        let mut out = [0.0; 3];
        sample_bilinear_or(&src, 1.5, 0.0, &[0.0; 3], &mut out);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sobel_finds_vertical_edge() {
        let src = generate(4, 3, 1, |x, _, px| px[0] = if x < 2 { 0.0 } else { 1.0 });
        let mag = gradient_magnitude(&src, &SOBEL_X, &SOBEL_Y, 1, 4.0);
        assert_eq!(mag.at(0, 1), 0.0);
        assert!((mag.at(1, 1) - 1.0).abs() < 1e-6);
        assert!((mag.at(2, 1) - 1.0).abs() < 1e-6);
        assert_eq!(mag.at(3, 1), 0.0);
    }

    #[test]
    fn clamp_coord_stays_in_bounds() {
        assert_eq!(clamp_coord(-3, 5), 0);
        assert_eq!(clamp_coord(9, 5), 4);
        assert_eq!(clamp_coord(2, 5), 2);
    }

    #[test]
    fn map_rgb_leaves_alpha() {
        let src = generate(2, 1, 4, |_, _, px| px.copy_from_slice(&[0.1, 0.2, 0.3, 0.4]));
        let out = map_rgb(&src, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]);
        assert!((out.px(1, 0)[0] - 0.9).abs() < 1e-6);
        assert_eq!(out.px(1, 0)[3], 0.4);
    }

    #[test]
    fn laplacian_of_flat_plane_is_zero() {
        let src = luma_plane(&generate(3, 3, 3, |_, _, px| px.fill(0.5)));
        let out = convolve3x3(&src, &LAPLACIAN);
        assert!(out.data.iter().all(|v| v.abs() < 1e-6));
    }
}
