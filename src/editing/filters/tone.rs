//! Tone mapping: duotone, split-toning, levels, color-balance.
//!
//! All four derive their weights from BT.601 luminance or work per channel,
//! and every result is clamped when the plane is quantized.

use super::{choice, float, lerp};
use crate::editing::buffer::Plane;
use crate::editing::color::{ColorSample, luma};
use crate::editing::error::ValidationError;
use crate::editing::params::ParamSet;
use crate::editing::sampling::map_rgb;
use std::str::FromStr;

/// Luminance interpolates between `shadow` (black) and `highlight` (white).
#[derive(Debug, Clone, PartialEq)]
pub struct Duotone {
    pub shadow: [f32; 3],
    pub highlight: [f32; 3],
}

impl Duotone {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            shadow: p.color("shadow")?.sample().0,
            highlight: p.color("highlight")?.sample().0,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let (lo, hi) = (self.shadow, self.highlight);
        map_rgb(src, |[r, g, b]| {
            let l = luma(r, g, b);
            std::array::from_fn(|c| lerp(lo[c], hi[c], l))
        })
    }
}

/// Tints shadows and highlights separately.
///
/// Each tint contributes only its chroma (the color minus its own luminance),
/// so brightness is left mostly intact. `balance` moves the pivot between the
/// two ranges: positive values widen the highlight range.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitToning {
    pub shadow: [f32; 3],
    pub highlight: [f32; 3],
    pub balance: f32,
    pub strength: f32,
}

impl SplitToning {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            shadow: p.color("shadow")?.sample().0,
            highlight: p.color("highlight")?.sample().0,
            balance: float(p, "balance")?,
            strength: float(p, "strength")?,
        })
    }

    fn chroma(color: [f32; 3]) -> [f32; 3] {
        let l = ColorSample(color).to_gray();
        color.map(|v| v - l)
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let pivot = (0.5 * (1.0 - self.balance)).clamp(0.01, 0.99);
        let shadow = Self::chroma(self.shadow);
        let highlight = Self::chroma(self.highlight);
        let k = self.strength;
        map_rgb(src, |[r, g, b]| {
            let l = luma(r, g, b);
            let ws = ((pivot - l) / pivot).clamp(0.0, 1.0);
            let wh = ((l - pivot) / (1.0 - pivot)).clamp(0.0, 1.0);
            let px = [r, g, b];
            std::array::from_fn(|c| px[c] + k * (ws * shadow[c] + wh * highlight[c]))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelsChannel {
    All,
    Red,
    Green,
    Blue,
}

impl LevelsChannel {
    fn applies_to(self, c: usize) -> bool {
        match self {
            LevelsChannel::All => true,
            LevelsChannel::Red => c == 0,
            LevelsChannel::Green => c == 1,
            LevelsChannel::Blue => c == 2,
        }
    }
}

impl FromStr for LevelsChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            other => Err(format!("unknown channel '{other}'")),
        }
    }
}

/// Input levels: `((v - black) / (white - black))^(1 / gamma)`, clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct Levels {
    pub black: f32,
    pub white: f32,
    pub gamma: f32,
    pub channel: LevelsChannel,
}

impl Levels {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        Ok(Self {
            black: float(p, "black")?,
            white: float(p, "white")?,
            gamma: float(p, "gamma")?,
            channel: choice(p, "channel")?,
        })
    }

    pub fn map(&self, v: f32) -> f32 {
        let t = ((v - self.black) / (self.white - self.black)).clamp(0.0, 1.0);
        t.powf(1.0 / self.gamma)
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        let channel = self.channel;
        map_rgb(src, |px| {
            std::array::from_fn(|c| {
                if channel.applies_to(c) {
                    self.map(px[c])
                } else {
                    px[c]
                }
            })
        })
    }
}

/// Additive per-channel shifts weighted by tonal range.
///
/// Weights come from luminance `l`: shadows `(1 - 2l)²`, highlights
/// `(2l - 1)²` (each zero past mid-gray), midtones the remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBalance {
    pub shadows: [f32; 3],
    pub midtones: [f32; 3],
    pub highlights: [f32; 3],
}

impl ColorBalance {
    pub fn from_params(p: &ParamSet) -> Result<Self, ValidationError> {
        let triple = |range: &str| -> Result<[f32; 3], ValidationError> {
            Ok([
                float(p, &format!("{range}_r"))?,
                float(p, &format!("{range}_g"))?,
                float(p, &format!("{range}_b"))?,
            ])
        };
        Ok(Self {
            shadows: triple("shadows")?,
            midtones: triple("midtones")?,
            highlights: triple("highlights")?,
        })
    }

    pub fn apply(&self, src: &Plane) -> Plane {
        map_rgb(src, |px| {
            let l = luma(px[0], px[1], px[2]);
            let sw = (1.0 - 2.0 * l).max(0.0).powi(2);
            let hw = (2.0 * l - 1.0).max(0.0).powi(2);
            let mw = (1.0 - sw - hw).max(0.0);
            std::array::from_fn(|c| {
                px[c] + sw * self.shadows[c] + mw * self.midtones[c] + hw * self.highlights[c]
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::sampling::generate;

    fn gray_ramp() -> Plane {
        generate(11, 1, 3, |x, _, px| px.fill(x as f32 / 10.0))
    }

    #[test]
    fn duotone_maps_black_and_white_to_endpoints() {
        let d = Duotone {
            shadow: [0.1, 0.0, 0.4],
            highlight: [1.0, 0.8, 0.2],
        };
        let out = d.apply(&gray_ramp());
        let close = |a: &[f32], b: [f32; 3]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5);
        assert!(close(out.px(0, 0), d.shadow));
        assert!(close(out.px(10, 0), d.highlight));
    }

    #[test]
    fn split_toning_leaves_neutral_tints_alone() {
        let s = SplitToning {
            shadow: [0.5, 0.5, 0.5],
            highlight: [0.2, 0.2, 0.2],
            balance: 0.3,
            strength: 1.0,
        };
        let src = gray_ramp();
        let out = s.apply(&src);
        for (a, b) in out.data.iter().zip(&src.data) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn split_toning_tints_shadows_toward_shadow_color() {
        let s = SplitToning {
            shadow: [0.0, 0.0, 1.0],
            highlight: [1.0, 1.0, 1.0],
            balance: 0.0,
            strength: 1.0,
        };
        let out = s.apply(&gray_ramp());
        let p = out.px(1, 0);
        assert!(p[2] > p[0]);
    }

    #[test]
    fn levels_stretches_range() {
        let l = Levels {
            black: 0.2,
            white: 0.6,
            gamma: 1.0,
            channel: LevelsChannel::All,
        };
        assert_eq!(l.map(0.1), 0.0);
        assert!((l.map(0.4) - 0.5).abs() < 1e-6);
        assert_eq!(l.map(0.9), 1.0);
    }

    #[test]
    fn levels_single_channel_leaves_others() {
        let l = Levels {
            black: 0.5,
            white: 1.0,
            gamma: 1.0,
            channel: LevelsChannel::Green,
        };
        let src = generate(1, 1, 3, |_, _, px| px.copy_from_slice(&[0.3, 0.3, 0.3]));
        let out = l.apply(&src);
        assert_eq!(out.px(0, 0), &[0.3, 0.0, 0.3]);
    }

    #[test]
    fn color_balance_targets_tonal_ranges() {
        let cb = ColorBalance {
            shadows: [0.2, 0.0, 0.0],
            midtones: [0.0; 3],
            highlights: [0.0, 0.0, -0.2],
        };
        let out = cb.apply(&gray_ramp());
        assert!((out.px(0, 0)[0] - 0.2).abs() < 1e-6);
        assert!((out.px(10, 0)[2] - 0.8).abs() < 1e-5);
        assert!((out.px(5, 0)[0] - 0.5).abs() < 1e-6);
    }
}
