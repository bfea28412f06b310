//! The raster unit every operation consumes and produces.
//!
//! A [`PixelBuffer`] is row-major, interleaved, 3 (RGB) or 4 (RGBA) channels,
//! 8 or 16 bits per channel. Its fields are private so the length invariant
//! (`samples.len() == width * height * channels`) is checked once, in
//! [`PixelBuffer::new`], and holds everywhere after.
//!
//! Transforms do not work on the integer samples directly. They read a
//! [`Plane`]: the same raster as `f32` in `0.0..=1.0`, which lets one
//! implementation serve both bit depths. Quantizing back rounds to the nearest
//! code value and clamps, so out-of-range intermediates never wrap.

use super::color::ColorSample;
use super::error::PreconditionViolation;
use serde::{Deserialize, Serialize};

/// Channel layout of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    Rgb,
    Rgba,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        self == Channels::Rgba
    }

    fn from_count(count: usize) -> Self {
        if count >= 4 {
            Channels::Rgba
        } else {
            Channels::Rgb
        }
    }
}

/// Bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    /// Largest code value (255 or 65535).
    pub fn max_value(self) -> f32 {
        match self {
            BitDepth::Eight => 255.0,
            BitDepth::Sixteen => 65535.0,
        }
    }
}

/// Contiguous sample storage at the buffer's bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self) -> BitDepth {
        match self {
            Samples::U8(_) => BitDepth::Eight,
            Samples::U16(_) => BitDepth::Sixteen,
        }
    }
}

/// An in-memory image: dimensions, layout, depth, and samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: Channels,
    samples: Samples,
}

impl PixelBuffer {
    /// Wrap decoded samples, checking dimensions and length.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        samples: Samples,
    ) -> Result<Self, PreconditionViolation> {
        if width == 0 || height == 0 {
            return Err(PreconditionViolation::EmptyDimensions { width, height });
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(channels.count()))
            .ok_or(PreconditionViolation::EmptyDimensions { width, height })?;
        if samples.len() != expected {
            return Err(PreconditionViolation::LengthMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PreconditionViolation> {
        Self::new(width, height, Channels::Rgb, Samples::U8(data))
    }

    pub fn from_rgba8(
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<Self, PreconditionViolation> {
        Self::new(width, height, Channels::Rgba, Samples::U8(data))
    }

    pub fn from_rgb16(
        width: u32,
        height: u32,
        data: Vec<u16>,
    ) -> Result<Self, PreconditionViolation> {
        Self::new(width, height, Channels::Rgb, Samples::U16(data))
    }

    pub fn from_rgba16(
        width: u32,
        height: u32,
        data: Vec<u16>,
    ) -> Result<Self, PreconditionViolation> {
        Self::new(width, height, Channels::Rgba, Samples::U16(data))
    }

    /// A buffer where every pixel is `value` (unit floats; alpha ignored for RGB).
    pub fn filled(
        width: u32,
        height: u32,
        channels: Channels,
        depth: BitDepth,
        value: [f32; 4],
    ) -> Result<Self, PreconditionViolation> {
        if width == 0 || height == 0 {
            return Err(PreconditionViolation::EmptyDimensions { width, height });
        }
        let mut plane = Plane::new(width as usize, height as usize, channels.count());
        for px in plane.data.chunks_exact_mut(plane.channels) {
            px.copy_from_slice(&value[..px.len()]);
        }
        Ok(Self::from_plane(&plane, depth))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn depth(&self) -> BitDepth {
        self.samples.depth()
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    /// Color channels of the pixel at `(x, y)` as unit floats, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<ColorSample> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels.count();
        let i = (y as usize * self.width as usize + x as usize) * c;
        let scale = self.depth().max_value();
        let read = |k: usize| match &self.samples {
            Samples::U8(v) => v[i + k] as f32 / scale,
            Samples::U16(v) => v[i + k] as f32 / scale,
        };
        Some(ColorSample::new(read(0), read(1), read(2)))
    }

    /// Alpha of the pixel at `(x, y)` as a unit float; opaque for RGB buffers.
    pub fn alpha(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        if !self.channels.has_alpha() {
            return Some(1.0);
        }
        let i = (y as usize * self.width as usize + x as usize) * 4 + 3;
        Some(match &self.samples {
            Samples::U8(v) => v[i] as f32 / 255.0,
            Samples::U16(v) => v[i] as f32 / 65535.0,
        })
    }

    pub(crate) fn to_plane(&self) -> Plane {
        let scale = self.depth().max_value();
        let data = match &self.samples {
            Samples::U8(v) => v.iter().map(|&s| s as f32 / scale).collect(),
            Samples::U16(v) => v.iter().map(|&s| s as f32 / scale).collect(),
        };
        Plane {
            width: self.width as usize,
            height: self.height as usize,
            channels: self.channels.count(),
            data,
        }
    }

    /// Quantize a working plane. The plane must have 3 or 4 channels and
    /// positive dimensions; every transform preserves both.
    pub(crate) fn from_plane(plane: &Plane, depth: BitDepth) -> Self {
        let scale = depth.max_value();
        let quantize = |v: f32| (v.clamp(0.0, 1.0) * scale).round();
        let samples = match depth {
            BitDepth::Eight => Samples::U8(plane.data.iter().map(|&v| quantize(v) as u8).collect()),
            BitDepth::Sixteen => {
                Samples::U16(plane.data.iter().map(|&v| quantize(v) as u16).collect())
            }
        };
        Self {
            width: plane.width as u32,
            height: plane.height as u32,
            channels: Channels::from_count(plane.channels),
            samples,
        }
    }
}

/// Unit-float working copy of a raster. `channels` is 1 for derived planes
/// (luminance, edge magnitude), otherwise 3 or 4.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plane {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    pub fn stride(&self) -> usize {
        self.width * self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.channels
    }

    #[inline]
    pub fn px(&self, x: usize, y: usize) -> &[f32] {
        let i = self.index(x, y);
        &self.data[i..i + self.channels]
    }

    /// Single-channel plane accessor.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}
