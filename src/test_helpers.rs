//! Shared test utilities for the heic-converter test suite.
//!
//! Builds small in-memory bitmaps and encoded files so tests never depend on
//! fixture files on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = png_bytes(20, 10);
//! let job = source("holiday.png", png);
//! ```

use crate::job::SourceFile;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Bitmaps
// =========================================================================

/// Opaque mid-grey RGB bitmap.
pub fn solid_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
}

/// Half-transparent red RGBA bitmap.
pub fn solid_rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([200, 20, 20, 128]),
    ))
}

/// RGB bitmap with detail on both axes, so lossy quality changes size.
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x ^ y) & 0xFF) as u8,
        ])
    }))
}

// =========================================================================
// Encoded files
// =========================================================================

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// PNG file bytes of a gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_rgb(width, height), ImageFormat::Png)
}

/// Baseline JPEG file bytes of a gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_rgb(width, height), ImageFormat::Jpeg)
}

/// Uncompressed TIFF file bytes of a gradient.
pub fn tiff_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_rgb(width, height), ImageFormat::Tiff)
}

/// A named in-memory source file.
pub fn source(name: &str, bytes: Vec<u8>) -> SourceFile {
    SourceFile::new(name, bytes)
}
