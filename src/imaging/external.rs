//! Decoders that depend on optional cargo features.
//!
//! - `heif`: HEIC/HEIF through `libheif-rs` (links the system libheif).
//! - `raw`: camera RAW through `rawloader` (sensor data) and `imagepipe`
//!   (demosaic, white balance, sRGB output).
//!
//! Without the feature the decoder reports [`CodecError::Unavailable`], which
//! fails only the jobs that need it.

use super::backend::CodecError;
use crate::formats::RawFormat;
use image::DynamicImage;

#[cfg(feature = "heif")]
pub fn decode_heif(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let failed = |e: libheif_rs::HeifError| CodecError::ProcessingFailed(e.to_string());

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(failed)?;
    let handle = ctx.primary_image_handle().map_err(failed)?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(failed)?;

    let width = decoded.width();
    let height = decoded.height();
    let planes = decoded.planes();
    let plane = planes.interleaved.ok_or_else(|| {
        CodecError::ProcessingFailed("HEIF image has no interleaved RGBA plane".into())
    })?;

    // Rows are padded to `stride`; copy them out tightly packed
    let row_len = width as usize * 4;
    let mut rgba = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        rgba.extend_from_slice(&row[..row_len]);
    }

    image::RgbaImage::from_raw(width, height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| CodecError::ProcessingFailed("Truncated HEIF pixel data".into()))
}

#[cfg(not(feature = "heif"))]
pub fn decode_heif(_bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    Err(CodecError::Unavailable(
        "HEIC/HEIF decoding is not available in this build (enable the `heif` feature)".into(),
    ))
}

#[cfg(feature = "raw")]
pub fn decode_raw(bytes: &[u8], format: RawFormat) -> Result<DynamicImage, CodecError> {
    let raw = rawloader::decode(&mut std::io::Cursor::new(bytes)).map_err(|e| {
        CodecError::ProcessingFailed(format!("Failed to read {} data: {e:?}", format.name()))
    })?;
    let mut pipeline = imagepipe::Pipeline::new_from_source(imagepipe::ImageSource::Raw(raw))
        .map_err(CodecError::ProcessingFailed)?;
    let developed = pipeline
        .output_8bit(None)
        .map_err(CodecError::ProcessingFailed)?;

    image::RgbImage::from_raw(
        developed.width as u32,
        developed.height as u32,
        developed.data,
    )
    .map(DynamicImage::ImageRgb8)
    .ok_or_else(|| {
        CodecError::ProcessingFailed(format!("Truncated {} pixel data", format.name()))
    })
}

#[cfg(not(feature = "raw"))]
pub fn decode_raw(_bytes: &[u8], format: RawFormat) -> Result<DynamicImage, CodecError> {
    Err(CodecError::Unavailable(format!(
        "{} decoding is not available in this build (enable the `raw` feature)",
        format.name()
    )))
}
