//! Pure Rust codec backend.
//!
//! Everything except the optional HEIF/RAW decoders is statically linked.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode JPEG, PNG, WebP, TIFF, BMP, GIF, ICO | `image` crate (pure Rust decoders) |
//! | Decode AVIF | `avif-parse` (container) + `rav1d` (AV1 decode) + BT.601 YUV→RGB |
//! | Decode HEIC/HEIF | `libheif-rs`, `heif` feature ([`external`](super::external)) |
//! | Decode RAW | `rawloader` + `imagepipe`, `raw` feature ([`external`](super::external)) |
//! | Encode JPEG / AVIF | `JpegEncoder` / `AvifEncoder` (rav1e) with quality |
//! | Encode PNG | `PngEncoder`, compression level mapped to `CompressionType` |
//! | Encode WebP | `webp` (libwebp) when lossy, `WebPEncoder` when lossless |
//! | Encode TIFF, BMP | `TiffEncoder`, `BmpEncoder` |
//! | Encode GIF | `GifEncoder` (NeuQuant palette) |
//! | Encode ICO | one PNG frame per profile size via `IcoEncoder` |

use super::backend::{CodecBackend, CodecError};
use super::external;
use super::params::EncodeParams;
use crate::formats::{EncoderOptions, RawFormat, SupportedFormat};
use image::codecs::png::{CompressionType, FilterType as PngFilter};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageFormat, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// `image` crate format for a registry format. HEIC/HEIF have none.
fn image_format(format: SupportedFormat) -> Option<ImageFormat> {
    match format {
        SupportedFormat::Jpeg => Some(ImageFormat::Jpeg),
        SupportedFormat::Png => Some(ImageFormat::Png),
        SupportedFormat::Webp => Some(ImageFormat::WebP),
        SupportedFormat::Avif => Some(ImageFormat::Avif),
        SupportedFormat::Tiff => Some(ImageFormat::Tiff),
        SupportedFormat::Bmp => Some(ImageFormat::Bmp),
        SupportedFormat::Gif => Some(ImageFormat::Gif),
        SupportedFormat::Ico => Some(ImageFormat::Ico),
        SupportedFormat::Heic | SupportedFormat::Heif => None,
    }
}

/// Load raster bytes, trusting content sniffing over the extension.
fn load_bytes(bytes: &[u8], hint: SupportedFormat) -> Result<DynamicImage, CodecError> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none() {
        if let Some(fmt) = image_format(hint) {
            reader.set_format(fmt);
        }
    }
    // The `image` crate's "avif" feature only enables the encoder.
    if reader.format() == Some(ImageFormat::Avif) {
        return avif::decode(bytes);
    }
    reader
        .decode()
        .map_err(|e| CodecError::ProcessingFailed(format!("Failed to decode {hint}: {e}")))
}

/// Drop precision and color spaces the 8-bit encoders cannot take.
fn to_8bit(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

fn encode_failed(format: SupportedFormat, e: image::ImageError) -> CodecError {
    CodecError::ProcessingFailed(format!("{format} encode failed: {e}"))
}

/// Lossy WebP through libwebp. `quality` is 0-100.
fn encode_webp_lossy(image: &DynamicImage, quality: f32) -> Result<Vec<u8>, CodecError> {
    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(false, quality)
            .map(|memory| memory.to_vec())
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
            .encode_simple(false, quality)
            .map(|memory| memory.to_vec())
    };
    encoded.map_err(|e| CodecError::ProcessingFailed(format!("WEBP encode failed: {e:?}")))
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_ico(image: &DynamicImage, sizes: &[u32]) -> Result<Vec<u8>, CodecError> {
    use image::codecs::ico::{IcoEncoder, IcoFrame};

    let frames = sizes
        .iter()
        .map(|&size| {
            let frame = image
                .resize_exact(size, size, FilterType::Lanczos3)
                .to_rgba8();
            IcoFrame::as_png(frame.as_raw(), size, size, ExtendedColorType::Rgba8)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| encode_failed(SupportedFormat::Ico, e))?;

    let mut out = Vec::new();
    IcoEncoder::new(&mut out)
        .encode_images(&frames)
        .map_err(|e| encode_failed(SupportedFormat::Ico, e))?;
    Ok(out)
}

impl CodecBackend for RustBackend {
    fn decode_heif(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        external::decode_heif(bytes)
    }

    fn decode_raw(&self, bytes: &[u8], format: RawFormat) -> Result<DynamicImage, CodecError> {
        external::decode_raw(bytes, format)
    }

    fn decode_tiff(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory_with_format(bytes, ImageFormat::Tiff)
            .map_err(|e| CodecError::ProcessingFailed(format!("Failed to decode TIFF: {e}")))
    }

    fn load_raster(
        &self,
        bytes: &[u8],
        hint: SupportedFormat,
    ) -> Result<DynamicImage, CodecError> {
        load_bytes(bytes, hint)
    }

    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, CodecError> {
        let format = params.format;
        let quality = params.quality.percent();
        let mut out = Vec::new();

        match (format, params.options) {
            (SupportedFormat::Jpeg, _) => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))?;
            }
            (SupportedFormat::Png, options) => {
                let level = match options {
                    EncoderOptions::Png {
                        compression_level, ..
                    } => compression_level,
                    _ => 6,
                };
                let encoder = image::codecs::png::PngEncoder::new_with_quality(
                    &mut out,
                    png_compression(level),
                    PngFilter::Adaptive,
                );
                to_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))?;
            }
            (SupportedFormat::Webp, EncoderOptions::Webp { lossless: false, .. }) => {
                out = encode_webp_lossy(image, params.quality.value() * 100.0)?;
            }
            (SupportedFormat::Webp, _) => {
                let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut out);
                to_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))?;
            }
            (SupportedFormat::Avif, options) => {
                let speed = match options {
                    EncoderOptions::Avif { speed, .. } => speed,
                    _ => 6,
                };
                let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
                    &mut out, speed, quality,
                );
                to_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))?;
            }
            (SupportedFormat::Tiff, _) => {
                // TIFF needs a seekable writer
                let mut cursor = Cursor::new(Vec::new());
                let encoder = image::codecs::tiff::TiffEncoder::new(&mut cursor);
                to_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))?;
                out = cursor.into_inner();
            }
            (SupportedFormat::Bmp, _) => {
                let encoder = image::codecs::bmp::BmpEncoder::new(&mut out);
                to_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| encode_failed(format, e))?;
            }
            (SupportedFormat::Gif, _) => {
                let rgba = image.to_rgba8();
                let mut encoder = image::codecs::gif::GifEncoder::new_with_speed(&mut out, 10);
                encoder
                    .encode(
                        rgba.as_raw(),
                        rgba.width(),
                        rgba.height(),
                        ExtendedColorType::Rgba8,
                    )
                    .map_err(|e| encode_failed(format, e))?;
            }
            (SupportedFormat::Ico, options) => {
                let sizes: &[u32] = match options {
                    EncoderOptions::Ico { sizes } => sizes,
                    _ => &[32],
                };
                out = encode_ico(image, sizes)?;
            }
            (SupportedFormat::Heic | SupportedFormat::Heif, _) => {
                return Err(CodecError::Unavailable(format!(
                    "Unsupported output format: {format}"
                )));
            }
        }

        Ok(out)
    }
}

/// AVIF decoding through `avif-parse` + `rav1d`.
///
/// `rav1d` is a pure Rust port of dav1d exposing dav1d's C API. The calls
/// below follow that API's open → send → get → unref → close protocol.
mod avif {
    use super::CodecError;
    use image::{DynamicImage, RgbImage};
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::ptr::NonNull;

    fn failed(msg: impl Into<String>) -> CodecError {
        CodecError::ProcessingFailed(msg.into())
    }

    pub(super) fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        let container = avif_parse::read_avif(&mut std::io::Cursor::new(bytes))
            .map_err(|e| failed(format!("Failed to parse AVIF: {e:?}")))?;
        let av1: &[u8] = &container.primary_item;

        let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
        // SAFETY: dav1d_default_settings fully initialises the struct.
        let mut settings = unsafe {
            dav1d::dav1d_default_settings(NonNull::from(&mut settings).cast::<Dav1dSettings>());
            settings.assume_init()
        };
        settings.n_threads = 1;
        settings.max_frame_delay = 1;

        let mut ctx = None;
        let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
        if rc.0 != 0 {
            return Err(failed(format!("rav1d open failed ({})", rc.0)));
        }

        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1.len()) };
        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };

        let outcome = if buf.is_null() {
            Err(failed("rav1d data_create failed"))
        } else {
            unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf, av1.len()) };
            let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
            if rc.0 != 0 {
                unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
                Err(failed(format!("rav1d send_data failed ({})", rc.0)))
            } else {
                let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
                if rc.0 != 0 {
                    Err(failed(format!("rav1d get_picture failed ({})", rc.0)))
                } else {
                    let rgb = picture_to_rgb(&pic);
                    unsafe { dav1d::dav1d_picture_unref(NonNull::new(&mut pic)) };
                    rgb
                }
            }
        };

        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };

        let (width, height, rgb) = outcome?;
        RgbImage::from_raw(width, height, rgb)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| failed("Decoded AVIF buffer does not match its dimensions"))
    }

    /// One plane of a decoded picture.
    struct Plane {
        ptr: *const u8,
        stride: isize,
    }

    impl Plane {
        /// Sample at (x, y). 10/12-bit content is stored as u16.
        fn sample(&self, x: u32, y: u32, high_bitdepth: bool) -> f32 {
            let row = y as isize * self.stride;
            // SAFETY: callers stay within the plane's width/height.
            unsafe {
                if high_bitdepth {
                    *(self.ptr.offset(row + x as isize * 2) as *const u16) as f32
                } else {
                    *self.ptr.offset(row + x as isize) as f32
                }
            }
        }
    }

    fn picture_to_rgb(pic: &Dav1dPicture) -> Result<(u32, u32, Vec<u8>), CodecError> {
        let width = pic.p.w as u32;
        let height = pic.p.h as u32;
        let bpc = pic.p.bpc as u32;
        let high = bpc > 8;
        let layout = pic.p.layout;

        let plane = |i: usize, stride: isize| {
            pic.data[i].map(|p| Plane {
                ptr: p.as_ptr() as *const u8,
                stride,
            })
        };
        let luma = plane(0, pic.stride[0]).ok_or_else(|| failed("AVIF picture has no luma"))?;

        let (ss_x, ss_y) = match layout {
            DAV1D_PIXEL_LAYOUT_I400 => (false, false),
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            other => return Err(failed(format!("Unsupported AVIF pixel layout: {other}"))),
        };
        let chroma = if layout == DAV1D_PIXEL_LAYOUT_I400 {
            None
        } else {
            match (plane(1, pic.stride[1]), plane(2, pic.stride[1])) {
                (Some(u), Some(v)) => Some((u, v)),
                _ => return Err(failed("AVIF picture is missing chroma planes")),
            }
        };

        let scale = 255.0 / ((1u32 << bpc) - 1) as f32;
        let center = (1u32 << (bpc - 1)) as f32;
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);

        for y in 0..height {
            for x in 0..width {
                let luma_v = luma.sample(x, y, high);
                let (r, g, b) = match &chroma {
                    None => (luma_v, luma_v, luma_v),
                    Some((u, v)) => {
                        let cx = if ss_x { x / 2 } else { x };
                        let cy = if ss_y { y / 2 } else { y };
                        let cb = u.sample(cx, cy, high) - center;
                        let cr = v.sample(cx, cy, high) - center;
                        // BT.601
                        (
                            luma_v + 1.402 * cr,
                            luma_v - 0.344136 * cb - 0.714136 * cr,
                            luma_v + 1.772 * cb,
                        )
                    }
                };
                for c in [r, g, b] {
                    rgb.push((c * scale).clamp(0.0, 255.0) as u8);
                }
            }
        }

        Ok((width, height, rgb))
    }
}
