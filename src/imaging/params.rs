//! Parameter types for codec operations.
//!
//! These structs describe *what* to produce, not *how*. They sit between the
//! pipeline (which decides quality and ceilings per job) and the
//! [`backend`](super::backend) (which does the pixel work), so tests can
//! swap in a mock backend without touching pipeline logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality in `[0, 1]`. Clamped on construction.
//! - [`EncodeParams`]: Target format, quality and encoder options for one encode.
//! - [`CompressionParams`]: Ceilings and iteration budget for the size-reduction pass.

use crate::formats::{EncoderOptions, SupportedFormat, profile_for};

/// Quality setting for lossy encoding, `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality(f32);

impl Quality {
    /// Lowest quality the size-reduction pass will step down to.
    pub const FLOOR: f32 = 0.1;

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale integer encoders take.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// One step lower, or `None` once the floor is reached.
    pub fn step_down(self, step: f32) -> Option<Self> {
        let next = ((self.0 - step) * 100.0).round() / 100.0;
        if next + f32::EPSILON < Self::FLOOR {
            None
        } else {
            Some(Self(next))
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.92)
    }
}

/// Parameters for one encode into a target format.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub format: SupportedFormat,
    pub quality: Quality,
    pub options: EncoderOptions,
}

impl EncodeParams {
    /// Encode with the format's registry defaults.
    pub fn for_format(format: SupportedFormat) -> Self {
        let profile = profile_for(format);
        Self {
            format,
            quality: Quality::new(profile.default_quality),
            options: profile.encoder_options,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

/// Limits for the size-reduction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionParams {
    /// Byte ceiling for the encoded output.
    pub max_size_bytes: u64,
    /// Longest edge allowed when resolution is not kept.
    pub max_dimension: u32,
    /// Quality of the first attempt; `None` uses the format default.
    pub initial_quality: Option<Quality>,
    /// Maximum number of encode attempts.
    pub max_iterations: u32,
    /// Never downscale, even above `max_dimension`.
    pub keep_resolution: bool,
    /// Quality decrement between attempts.
    pub quality_step: f32,
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024,
            max_dimension: 8192,
            initial_quality: None,
            max_iterations: 10,
            keep_resolution: true,
            quality_step: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_unit_range() {
        assert_eq!(Quality::new(-0.5).value(), 0.0);
        assert_eq!(Quality::new(0.5).value(), 0.5);
        assert_eq!(Quality::new(1.5).value(), 1.0);
    }

    #[test]
    fn quality_nan_falls_back_to_default() {
        assert_eq!(Quality::new(f32::NAN), Quality::default());
    }

    #[test]
    fn quality_default_is_092() {
        assert_eq!(Quality::default().value(), 0.92);
    }

    #[test]
    fn quality_percent_rounds_and_floors_at_one() {
        assert_eq!(Quality::new(0.92).percent(), 92);
        assert_eq!(Quality::new(0.855).percent(), 86);
        assert_eq!(Quality::new(0.0).percent(), 1);
        assert_eq!(Quality::new(1.0).percent(), 100);
    }

    #[test]
    fn step_down_stops_at_floor() {
        let q = Quality::new(0.2);
        let q = q.step_down(0.05).unwrap();
        assert_eq!(q.value(), 0.15);
        let q = q.step_down(0.05).unwrap();
        assert_eq!(q.value(), 0.1);
        assert_eq!(q.step_down(0.05), None);
    }

    #[test]
    fn encode_params_use_registry_defaults() {
        let params = EncodeParams::for_format(SupportedFormat::Avif);
        assert_eq!(params.quality.value(), 0.85);
        assert!(matches!(params.options, EncoderOptions::Avif { speed: 5, .. }));
    }

    #[test]
    fn compression_defaults() {
        let c = CompressionParams::default();
        assert_eq!(c.max_size_bytes, 10_485_760);
        assert_eq!(c.max_dimension, 8192);
        assert_eq!(c.max_iterations, 10);
        assert!(c.keep_resolution);
        assert_eq!(c.initial_quality, None);
    }
}
