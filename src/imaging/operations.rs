//! High-level image operations.
//!
//! These combine pure calculations with backend calls. The size-reduction
//! pass is a stepper rather than a loop so the pipeline can report progress
//! between attempts:
//!
//! ```text
//! SizeReduction::new ──▶ attempt() ─Retry─▶ attempt() ─Retry─▶ … ─Finished─▶ Compressed
//! ```
//!
//! Each attempt encodes once. The pass finishes when the output fits the
//! byte ceiling, when the format ignores quality, when quality reaches
//! [`Quality::FLOOR`], or when the attempt budget runs out. The last
//! attempt's bytes are kept in every case.

use super::backend::{CodecBackend, CodecError, Dimensions};
use super::calculations::fit_within;
use super::params::{CompressionParams, EncodeParams, Quality};
use crate::formats::SupportedFormat;
use image::DynamicImage;
use image::imageops::FilterType;

/// Encode `image` once with the format's registry defaults.
pub fn encode_once(
    backend: &impl CodecBackend,
    image: &DynamicImage,
    format: SupportedFormat,
) -> Result<Vec<u8>, CodecError> {
    backend.encode(image, &EncodeParams::for_format(format))
}

/// Downscale to the dimension ceiling unless resolution is kept.
///
/// Returns the input untouched when it already fits.
pub fn limit_dimensions(image: DynamicImage, params: &CompressionParams) -> DynamicImage {
    if params.keep_resolution {
        return image;
    }
    let source = Dimensions::of(&image);
    let target = fit_within(source, params.max_dimension);
    if target == source {
        return image;
    }
    tracing::debug!(
        from = %format!("{}x{}", source.width, source.height),
        to = %format!("{}x{}", target.width, target.height),
        "downscaling to dimension ceiling"
    );
    image.resize_exact(target.width, target.height, FilterType::Lanczos3)
}

/// Output of a finished size-reduction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub quality: Quality,
    pub attempts: u32,
}

/// Result of one [`SizeReduction::attempt`].
#[derive(Debug, PartialEq)]
pub enum Attempt {
    /// Still above the ceiling; another attempt will run at lower quality.
    Retry { attempt: u32, size: usize },
    Finished(Compressed),
}

/// Iterative quality step-down towards a byte ceiling.
#[derive(Debug)]
pub struct SizeReduction {
    params: EncodeParams,
    max_size_bytes: u64,
    max_iterations: u32,
    step: f32,
    lossy: bool,
    attempts: u32,
}

impl SizeReduction {
    pub fn new(
        backend: &impl CodecBackend,
        format: SupportedFormat,
        compression: &CompressionParams,
    ) -> Self {
        let mut params = EncodeParams::for_format(format);
        if let Some(quality) = compression.initial_quality {
            params.quality = quality;
        }
        Self {
            params,
            max_size_bytes: compression.max_size_bytes,
            max_iterations: compression.max_iterations.max(1),
            step: compression.quality_step,
            lossy: backend.honors_quality(format),
            attempts: 0,
        }
    }

    /// Attempt budget, for progress scaling.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Quality the next attempt will use.
    pub fn quality(&self) -> Quality {
        self.params.quality
    }

    /// Encode once and decide whether another attempt is needed.
    pub fn attempt(
        &mut self,
        backend: &impl CodecBackend,
        image: &DynamicImage,
    ) -> Result<Attempt, CodecError> {
        let bytes = backend.encode(image, &self.params)?;
        self.attempts += 1;
        let size = bytes.len();
        let quality = self.params.quality;

        let fits = size as u64 <= self.max_size_bytes;
        let next = if fits || !self.lossy || self.attempts >= self.max_iterations {
            None
        } else {
            quality.step_down(self.step)
        };

        match next {
            Some(lower) => {
                tracing::debug!(
                    attempt = self.attempts,
                    size,
                    quality = quality.value(),
                    "output above ceiling, lowering quality"
                );
                self.params.quality = lower;
                Ok(Attempt::Retry {
                    attempt: self.attempts,
                    size,
                })
            }
            None => {
                if !fits {
                    tracing::debug!(
                        attempts = self.attempts,
                        size,
                        ceiling = self.max_size_bytes,
                        "keeping last attempt above ceiling"
                    );
                }
                Ok(Attempt::Finished(Compressed {
                    bytes,
                    quality,
                    attempts: self.attempts,
                }))
            }
        }
    }

    /// Run attempts until finished.
    pub fn run(
        mut self,
        backend: &impl CodecBackend,
        image: &DynamicImage,
    ) -> Result<Compressed, CodecError> {
        loop {
            if let Attempt::Finished(done) = self.attempt(backend, image)? {
                return Ok(done);
            }
        }
    }
}
