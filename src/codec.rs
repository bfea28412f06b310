//! File codecs: decode into and encode out of [`PixelBuffer`].
//!
//! The editing core never touches files. This module is the only place the
//! `image` crate appears, and only for container formats; every transform is
//! done on our own buffers.
//!
//! ## Format mapping
//!
//! | Extension | Decode | Encode |
//! |---|---|---|
//! | `jpg`, `jpeg` | 8-bit, alpha dropped | RGB8 at the configured quality |
//! | `png` | 8/16-bit, RGB or RGBA | as-is |
//! | `tif`, `tiff` | 8/16-bit, RGB or RGBA | as-is |
//! | `webp` | 8-bit, RGB or RGBA | lossless, narrowed to 8-bit |
//!
//! Grayscale sources decode as RGB; float sources decode as 16-bit.

use crate::editing::{Channels, PixelBuffer, PreconditionViolation, Samples};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, ImageFormat, ImageReader, Rgb, Rgba};
use std::io::BufWriter;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("failed to encode {path}: {message}")]
    Encode { path: String, message: String },
    #[error("unsupported image format: '{0}'")]
    UnsupportedFormat(String),
    #[error("decoded image is malformed: {0}")]
    Buffer(#[from] PreconditionViolation),
}

const FORMATS: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    FORMATS
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Extensions whose decoders are compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

pub fn is_supported_input(path: &Path) -> bool {
    extension(path).is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Resolve an extension (without the dot, any case) to an output format.
pub fn format_for_extension(ext: &str) -> Result<ImageFormat, CodecError> {
    let lower = ext.to_ascii_lowercase();
    FORMATS
        .iter()
        .find(|(e, _)| *e == lower)
        .map(|(_, fmt)| *fmt)
        .ok_or(CodecError::UnsupportedFormat(lower))
}

/// Decode/encode seam. Batch runs and the CLI go through this trait so tests
/// can substitute a recording mock.
pub trait ImageCodec: Sync {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, CodecError>;

    /// Encode to `path`; the format follows the extension.
    fn encode(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), CodecError>;
}

/// Codec backed by the `image` crate's pure-Rust decoders and encoders.
#[derive(Debug, Clone)]
pub struct RustCodec {
    jpeg_quality: u8,
}

impl RustCodec {
    pub fn new() -> Self {
        Self { jpeg_quality: 90 }
    }

    /// JPEG quality, 1-100. Other formats are lossless.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> CodecError {
    CodecError::Decode {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn encode_error(path: &Path, e: impl std::fmt::Display) -> CodecError {
    CodecError::Encode {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Convert a decoded image, keeping alpha and 16-bit precision when present.
pub fn from_dynamic(img: DynamicImage) -> Result<PixelBuffer, PreconditionViolation> {
    let color = img.color();
    let wide = color.bytes_per_pixel() / color.channel_count() > 1;
    let (width, height) = (img.width(), img.height());
    match (color.has_alpha(), wide) {
        (false, false) => PixelBuffer::from_rgb8(width, height, img.into_rgb8().into_raw()),
        (true, false) => PixelBuffer::from_rgba8(width, height, img.into_rgba8().into_raw()),
        (false, true) => PixelBuffer::from_rgb16(width, height, img.into_rgb16().into_raw()),
        (true, true) => PixelBuffer::from_rgba16(width, height, img.into_rgba16().into_raw()),
    }
}

/// Wrap a buffer's samples as an `image` value without reinterpreting them.
pub fn to_dynamic(buffer: &PixelBuffer) -> Option<DynamicImage> {
    let (w, h) = buffer.dimensions();
    match (buffer.channels(), buffer.samples()) {
        (Channels::Rgb, Samples::U8(d)) => {
            ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, d.clone()).map(DynamicImage::ImageRgb8)
        }
        (Channels::Rgba, Samples::U8(d)) => {
            ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, d.clone()).map(DynamicImage::ImageRgba8)
        }
        (Channels::Rgb, Samples::U16(d)) => {
            ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, d.clone()).map(DynamicImage::ImageRgb16)
        }
        (Channels::Rgba, Samples::U16(d)) => {
            ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, d.clone()).map(DynamicImage::ImageRgba16)
        }
    }
}

/// Narrow to what each encoder accepts.
fn fit_for(format: ImageFormat, img: DynamicImage) -> DynamicImage {
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        ImageFormat::WebP if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        ImageFormat::WebP => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, CodecError> {
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| decode_error(path, e))?;
        Ok(from_dynamic(img)?)
    }

    fn encode(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), CodecError> {
        let ext = extension(path).unwrap_or_default();
        let format = format_for_extension(&ext)?;
        let img = to_dynamic(buffer)
            .ok_or_else(|| encode_error(path, "sample count does not match dimensions"))?;
        let img = fit_for(format, img);

        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        match format {
            ImageFormat::Jpeg => img
                .write_with_encoder(JpegEncoder::new_with_quality(writer, self.jpeg_quality))
                .map_err(|e| encode_error(path, e)),
            _ => {
                let mut writer = writer;
                img.write_to(&mut writer, format)
                    .map_err(|e| encode_error(path, e))
            }
        }
    }
}
