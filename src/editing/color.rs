//! Color space conversions shared by the filters.
//!
//! All conversions work on unit-range RGB ([`ColorSample`] channels in
//! `0.0..=1.0`). Hue is expressed in degrees (`0.0..360.0`); saturation,
//! value and lightness are unit-range.
//!
//! | Function | Used by |
//! |---|---|
//! | [`ColorSample::to_hsv`] / [`ColorSample::from_hsv`] | saturation |
//! | [`ColorSample::to_hsl`] / [`ColorSample::from_hsl`] | color-balance, split-toning |
//! | [`luma`] / [`ColorSample::to_gray`] | grayscale, duotone, charcoal, edge-detect, emboss, levels |
//!
//! Luminance uses ITU-R BT.601 weights throughout.

use serde::{Deserialize, Serialize};
use std::fmt;

/// BT.601 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// One pixel's three color channels. Meaning depends on the space it was
/// produced in: `[r, g, b]`, `[h, s, v]` or `[h, s, l]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample(pub [f32; 3]);

impl ColorSample {
    pub fn new(a: f32, b: f32, c: f32) -> Self {
        Self([a, b, c])
    }

    /// Build from an interleaved pixel slice, ignoring alpha.
    ///
    /// # Panics
    ///
    /// Panics when `px` is not 3 or 4 samples long. A pixel of any other
    /// length means the caller broke the buffer layout.
    pub fn from_slice(px: &[f32]) -> Self {
        assert!(
            px.len() == 3 || px.len() == 4,
            "pixel must have 3 or 4 channels, got {}",
            px.len()
        );
        Self([px[0], px[1], px[2]])
    }

    pub fn to_gray(self) -> f32 {
        let [r, g, b] = self.0;
        luma(r, g, b)
    }

    pub fn to_hsv(self) -> Self {
        let [r, g, b] = self.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let h = hue(r, g, b, max, delta);
        let s = if max > 0.0 { delta / max } else { 0.0 };
        Self([h, s, max])
    }

    pub fn from_hsv(hsv: ColorSample) -> Self {
        let [h, s, v] = hsv.0;
        let c = v * s;
        Self::from_chroma(h, c, v - c)
    }

    pub fn to_hsl(self) -> Self {
        let [r, g, b] = self.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let l = (max + min) / 2.0;
        let s = if delta == 0.0 {
            0.0
        } else {
            delta / (1.0 - (2.0 * l - 1.0).abs())
        };
        Self([hue(r, g, b, max, delta), s, l])
    }

    pub fn from_hsl(hsl: ColorSample) -> Self {
        let [h, s, l] = hsl.0;
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        Self::from_chroma(h, c, l - c / 2.0)
    }

    fn from_chroma(h: f32, c: f32, m: f32) -> Self {
        let h = h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Self([r + m, g + m, b + m])
    }
}

fn hue(r: f32, g: f32, b: f32, max: f32, delta: f32) -> f32 {
    if delta == 0.0 {
        return 0.0;
    }
    let h = if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    h.rem_euclid(360.0)
}

// ============================================================================
// Parameter colors
// ============================================================================

/// An 8-bit RGBA color as written in operation parameters.
///
/// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and a small set of CSS names.
/// Displays as lowercase `#rrggbb`, or `#rrggbbaa` when not opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("orange", [255, 165, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("navy", [0, 0, 128, 255]),
    ("teal", [0, 128, 128, 255]),
    ("transparent", [0, 0, 0, 0]),
];

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_ascii_lowercase();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        NAMED
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, [r, g, b, a])| Self::rgba(*r, *g, *b, *a))
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Unit-range `[r, g, b, a]`.
    pub fn unit(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn sample(self) -> ColorSample {
        let [r, g, b, _] = self.unit();
        ColorSample::new(r, g, b)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Color::rgba(nib(0)?, nib(1)?, nib(2)?, 255))
        }
        6 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("invalid color '{value}'"))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantize(v: f32) -> i32 {
        (v.clamp(0.0, 1.0) * 255.0).round() as i32
    }

    fn roundtrip_error(convert: impl Fn(ColorSample) -> ColorSample) -> i32 {
        let mut worst = 0;
        for r in (0..=255).step_by(5) {
            for g in (0..=255).step_by(5) {
                for b in (0..=255).step_by(15) {
                    let rgb = ColorSample::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
                    let back = convert(rgb);
                    for (orig, out) in [r, g, b].into_iter().zip(back.0) {
                        worst = worst.max((orig - quantize(out)).abs());
                    }
                }
            }
        }
        worst
    }

    #[test]
    fn hsv_roundtrip_within_one_unit() {
        assert!(roundtrip_error(|c| ColorSample::from_hsv(c.to_hsv())) <= 1);
    }

    #[test]
    fn hsl_roundtrip_within_one_unit() {
        assert!(roundtrip_error(|c| ColorSample::from_hsl(c.to_hsl())) <= 1);
    }

    #[test]
    fn primary_hues() {
        assert_eq!(ColorSample::new(1.0, 0.0, 0.0).to_hsv().0, [0.0, 1.0, 1.0]);
        assert_eq!(ColorSample::new(0.0, 1.0, 0.0).to_hsv().0, [120.0, 1.0, 1.0]);
        assert_eq!(ColorSample::new(0.0, 0.0, 1.0).to_hsv().0, [240.0, 1.0, 1.0]);
    }

    #[test]
    fn gray_uses_bt601() {
        let g = ColorSample::new(1.0, 0.0, 0.0).to_gray();
        assert!((g - 0.299).abs() < 1e-6);
        assert!((ColorSample::new(1.0, 1.0, 1.0).to_gray() - 1.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "3 or 4 channels")]
    fn from_slice_rejects_bad_length() {
        ColorSample::from_slice(&[0.0, 0.5]);
    }

    #[test]
    fn parse_hex_and_names() {
        assert_eq!(Color::parse("#FFD166"), Some(Color::rgba(255, 209, 102, 255)));
        assert_eq!(Color::parse("#f00"), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(Color::parse("#00000080"), Some(Color::rgba(0, 0, 0, 128)));
        assert_eq!(Color::parse("Navy"), Some(Color::rgba(0, 0, 128, 255)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn hex_output_is_lowercase_and_drops_opaque_alpha() {
        assert_eq!(Color::rgba(255, 209, 102, 255).to_hex(), "#ffd166");
        assert_eq!(Color::TRANSPARENT.to_hex(), "#00000000");
    }
}
