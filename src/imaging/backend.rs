//! Codec backend trait and shared types.
//!
//! The [`CodecBackend`] trait covers every call the pipeline makes into a
//! decoder or encoder: the three format-specific decoders (HEIF, RAW, TIFF),
//! the generic raster loader, and the encoder.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording [`MockBackend`](tests::MockBackend), which can be told to fail.

use super::params::EncodeParams;
use crate::formats::{RawFormat, SupportedFormat};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    ProcessingFailed(String),
    /// The codec for this format is not compiled in.
    #[error("{0}")]
    Unavailable(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn longer_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

/// Trait for codec backends.
///
/// Decoders return a full bitmap; the pipeline owns everything between
/// decode and encode.
pub trait CodecBackend {
    /// Decode the primary image of a HEIC/HEIF container.
    fn decode_heif(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Decode and develop a camera RAW file.
    fn decode_raw(&self, bytes: &[u8], format: RawFormat) -> Result<DynamicImage, CodecError>;

    /// Decode the first page of a TIFF.
    fn decode_tiff(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Load an already-raster file. `hint` is the format its extension claims.
    fn load_raster(&self, bytes: &[u8], hint: SupportedFormat)
    -> Result<DynamicImage, CodecError>;

    /// Encode a bitmap into the target format.
    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, CodecError>;

    /// Whether lowering quality shrinks output for this format.
    fn honors_quality(&self, format: SupportedFormat) -> bool {
        matches!(
            format,
            SupportedFormat::Jpeg | SupportedFormat::Webp | SupportedFormat::Avif
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::sync::Mutex;

    /// Mock backend that records operations and returns synthetic results.
    ///
    /// Decoders hand back a solid bitmap of the configured size. Encoded
    /// output is `encoded_len * quality` zero bytes, so size-reduction tests
    /// can reason about how many attempts a ceiling needs.
    pub struct MockBackend {
        pub dimensions: (u32, u32),
        pub encoded_len: usize,
        pub lossy: Vec<SupportedFormat>,
        /// Sources containing this marker fail to decode with the message.
        pub decode_failure: Option<(Vec<u8>, String)>,
        pub encode_failure: Option<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        DecodeHeif,
        DecodeRaw(RawFormat),
        DecodeTiff,
        LoadRaster(SupportedFormat),
        Encode {
            format: SupportedFormat,
            quality: u8,
            width: u32,
            height: u32,
        },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                dimensions: (40, 30),
                encoded_len: 1000,
                lossy: vec![
                    SupportedFormat::Jpeg,
                    SupportedFormat::Webp,
                    SupportedFormat::Avif,
                ],
                decode_failure: None,
                encode_failure: None,
                operations: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: (width, height),
                ..Self::default()
            }
        }

        pub fn failing_decode(marker: &[u8], message: &str) -> Self {
            Self {
                decode_failure: Some((marker.to_vec(), message.to_string())),
                ..Self::default()
            }
        }

        pub fn failing_encode(message: &str) -> Self {
            Self {
                encode_failure: Some(message.to_string()),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }

        fn decoded(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
            if let Some((marker, message)) = &self.decode_failure {
                if bytes.windows(marker.len()).any(|w| w == marker.as_slice()) {
                    return Err(CodecError::ProcessingFailed(message.clone()));
                }
            }
            let (w, h) = self.dimensions;
            Ok(DynamicImage::new_rgba8(w, h))
        }
    }

    impl CodecBackend for MockBackend {
        fn decode_heif(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
            self.record(RecordedOp::DecodeHeif);
            self.decoded(bytes)
        }

        fn decode_raw(&self, bytes: &[u8], format: RawFormat) -> Result<DynamicImage, CodecError> {
            self.record(RecordedOp::DecodeRaw(format));
            self.decoded(bytes)
        }

        fn decode_tiff(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
            self.record(RecordedOp::DecodeTiff);
            self.decoded(bytes)
        }

        fn load_raster(
            &self,
            bytes: &[u8],
            hint: SupportedFormat,
        ) -> Result<DynamicImage, CodecError> {
            self.record(RecordedOp::LoadRaster(hint));
            self.decoded(bytes)
        }

        fn encode(
            &self,
            image: &DynamicImage,
            params: &EncodeParams,
        ) -> Result<Vec<u8>, CodecError> {
            self.record(RecordedOp::Encode {
                format: params.format,
                quality: params.quality.percent(),
                width: image.width(),
                height: image.height(),
            });
            if let Some(message) = &self.encode_failure {
                return Err(CodecError::ProcessingFailed(message.clone()));
            }
            let len = (self.encoded_len as f32 * params.quality.value()).round() as usize;
            Ok(vec![0; len])
        }

        fn honors_quality(&self, format: SupportedFormat) -> bool {
            self.lossy.contains(&format)
        }
    }

    #[test]
    fn mock_records_decode_and_encode() {
        let backend = MockBackend::with_dimensions(8, 6);

        let img = backend.decode_tiff(b"tiff").unwrap();
        assert_eq!(Dimensions::of(&img), Dimensions { width: 8, height: 6 });

        let params =
            EncodeParams::for_format(SupportedFormat::Jpeg).with_quality(Quality::new(0.5));
        let out = backend.encode(&img, &params).unwrap();
        assert_eq!(out.len(), 500);

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::DecodeTiff,
                RecordedOp::Encode {
                    format: SupportedFormat::Jpeg,
                    quality: 50,
                    width: 8,
                    height: 6,
                },
            ]
        );
    }

    #[test]
    fn mock_fails_only_on_marker() {
        let backend = MockBackend::failing_decode(b"CORRUPT", "bad header");
        assert!(backend.load_raster(b"fine", SupportedFormat::Png).is_ok());

        let err = backend
            .decode_heif(b"xxCORRUPTxx")
            .expect_err("marker should fail");
        assert_eq!(err.to_string(), "bad header");
    }

    #[test]
    fn dimensions_helpers() {
        let d = Dimensions {
            width: 300,
            height: 800,
        };
        assert_eq!(d.longer_edge(), 800);
        assert!(!d.is_empty());
        assert!(
            Dimensions {
                width: 0,
                height: 5
            }
            .is_empty()
        );
    }
}
