//! Shared test utilities: file-tree fixtures and buffer builders.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_files(tmp.path(), &["a.jpg", "trip/b.png"]);
//! let buf = gradient_rgb8(6, 4);
//! ```

use crate::editing::PixelBuffer;
use std::path::Path;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create empty files (and their parent directories) under `root`.
///
/// Codec mocks never read file contents, so an empty file is enough for
/// anything that only walks or names inputs.
pub fn write_files(root: &Path, relative: &[&str]) {
    for rel in relative {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();
    }
}

// =========================================================================
// Buffer builders
// =========================================================================

/// RGB8 buffer whose red channel ramps along x and green along y.
pub fn gradient_rgb8(width: u32, height: u32) -> PixelBuffer {
    let data = (0..height)
        .flat_map(|y| {
            (0..width).flat_map(move |x| {
                [
                    (x * 255 / (width - 1).max(1)) as u8,
                    (y * 255 / (height - 1).max(1)) as u8,
                    128,
                ]
            })
        })
        .collect();
    PixelBuffer::from_rgb8(width, height, data).unwrap()
}
