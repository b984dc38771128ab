//! Converter configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Stock defaults (below)
//! 2. `heic-converter.toml` in the working directory, or the file given with
//!    `--config`
//! 3. Command-line flags (`--to`, `--output`, `--no-compress`)
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "JPEG"           # Target format: JPEG, PNG, WEBP, AVIF, TIFF, ICO, BMP, GIF
//! dir = "converted"         # Where converted files are written
//!
//! [compression]
//! enabled = true            # Run the size-reduction pass
//! max_size_mb = 10.0        # Byte ceiling per output file
//! max_dimension = 8192      # Longest edge when resolution is not kept
//! keep_resolution = true    # Never downscale
//! max_iterations = 10       # Encode attempts before keeping the last one
//! # initial_quality = 0.92  # Omit to use the target format's quality
//! ```
//!
//! Config files are sparse; override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::formats::SupportedFormat;
use crate::imaging::{CompressionParams, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File picked up from the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "heic-converter.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `heic-converter.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub compression: CompressionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Target format for every converted file.
    pub format: SupportedFormat,
    /// Output directory.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: SupportedFormat::Jpeg,
            dir: PathBuf::from("converted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub max_size_mb: f64,
    pub max_dimension: u32,
    pub keep_resolution: bool,
    pub max_iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_quality: Option<f32>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_mb: 10.0,
            max_dimension: 8192,
            keep_resolution: true,
            max_iterations: 10,
            initial_quality: None,
        }
    }
}

/// Values given on the command line. `None` leaves the config value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub format: Option<SupportedFormat>,
    pub output_dir: Option<PathBuf>,
    pub no_compress: bool,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.output.format.is_output() {
            return Err(ConfigError::Validation(format!(
                "output.format {} cannot be written; choose one of JPEG, PNG, WEBP, AVIF, TIFF, ICO, BMP, GIF",
                self.output.format
            )));
        }
        let c = &self.compression;
        if !(c.max_size_mb > 0.0 && c.max_size_mb.is_finite()) {
            return Err(ConfigError::Validation(
                "compression.max_size_mb must be a positive number".into(),
            ));
        }
        if c.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "compression.max_dimension must be non-zero".into(),
            ));
        }
        if c.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "compression.max_iterations must be at least 1".into(),
            ));
        }
        if let Some(q) = c.initial_quality {
            if !(0.0..=1.0).contains(&q) {
                return Err(ConfigError::Validation(
                    "compression.initial_quality must be between 0 and 1".into(),
                ));
            }
        }
        Ok(())
    }

    /// Layer command-line values on top and re-validate.
    pub fn apply(&mut self, overrides: &CliOverrides) -> Result<(), ConfigError> {
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        if let Some(dir) = &overrides.output_dir {
            self.output.dir = dir.clone();
        }
        if overrides.no_compress {
            self.compression.enabled = false;
        }
        self.validate()
    }

    /// Size-reduction settings, or `None` when compression is off.
    pub fn compression_params(&self) -> Option<CompressionParams> {
        let c = &self.compression;
        c.enabled.then(|| CompressionParams {
            max_size_bytes: (c.max_size_mb * 1024.0 * 1024.0).round() as u64,
            max_dimension: c.max_dimension,
            initial_quality: c.initial_quality.map(Quality::new),
            max_iterations: c.max_iterations,
            keep_resolution: c.keep_resolution,
            ..CompressionParams::default()
        })
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `heic-converter.toml` in
/// `dir` is used if present, and stock defaults otherwise.
pub fn load_config(path: Option<&Path>, dir: &Path) -> Result<AppConfig, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if !candidate.exists() {
                return Ok(AppConfig::default());
            }
            candidate
        }
    };
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `heic-converter.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# HEIC Converter Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the directory you run the converter from, or pass it
# with --config. Command-line flags override these values.
# Unknown keys will cause an error.

[output]
# Target format. One of: JPEG, PNG, WEBP, AVIF, TIFF, ICO, BMP, GIF.
# HEIC and HEIF are accepted as inputs only.
format = "JPEG"
# Directory converted files are written to. Created if missing.
dir = "converted"

[compression]
# Run the size-reduction pass after decoding. When off, each file is
# encoded once at its format's default quality.
enabled = true
# Byte ceiling per converted file, in MiB. Quality is lowered in 0.05 steps
# (JPEG and AVIF only) until the output fits or attempts run out.
max_size_mb = 10.0
# Longest edge in pixels. Only applied when keep_resolution is false.
max_dimension = 8192
# Never downscale, even above max_dimension.
keep_resolution = true
# Encode attempts before the last one is kept, fitting or not.
max_iterations = 10
# Quality of the first attempt, 0.0 to 1.0. Omit to use the target
# format's default (JPEG 0.92, AVIF 0.85, WEBP 0.85, ICO 0.95).
# initial_quality = 0.92
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_expected_values() {
        let config = AppConfig::default();
        assert_eq!(config.output.format, SupportedFormat::Jpeg);
        assert_eq!(config.output.dir, PathBuf::from("converted"));
        assert!(config.compression.enabled);
        assert_eq!(config.compression.max_size_mb, 10.0);
        assert_eq!(config.compression.max_dimension, 8192);
        assert!(config.compression.keep_resolution);
        assert_eq!(config.compression.max_iterations, 10);
        assert_eq!(config.compression.initial_quality, None);
    }

    #[test]
    fn stock_toml_parses_to_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = parse_config(
            r#"
[output]
format = "webp"

[compression]
max_size_mb = 2.5
"#,
        )
        .unwrap();
        assert_eq!(config.output.format, SupportedFormat::Webp);
        assert_eq!(config.output.dir, PathBuf::from("converted"));
        assert_eq!(config.compression.max_size_mb, 2.5);
        assert_eq!(config.compression.max_iterations, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = parse_config("[output]\nformt = \"PNG\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let result = parse_config("[output]\nformat = \"PSD\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn input_only_format_fails_validation() {
        let result = parse_config("[output]\nformat = \"HEIC\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validation_ranges() {
        for body in [
            "[compression]\nmax_size_mb = 0.0\n",
            "[compression]\nmax_dimension = 0\n",
            "[compression]\nmax_iterations = 0\n",
            "[compression]\ninitial_quality = 1.5\n",
        ] {
            assert!(
                matches!(parse_config(body), Err(ConfigError::Validation(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn compression_params_follow_config() {
        let mut config = AppConfig::default();
        config.compression.max_size_mb = 1.5;
        config.compression.initial_quality = Some(0.7);
        config.compression.keep_resolution = false;

        let params = config.compression_params().unwrap();
        assert_eq!(params.max_size_bytes, 1_572_864);
        assert_eq!(params.initial_quality, Some(Quality::new(0.7)));
        assert!(!params.keep_resolution);
        assert_eq!(params.quality_step, 0.05);
    }

    #[test]
    fn disabled_compression_has_no_params() {
        let mut config = AppConfig::default();
        config.compression.enabled = false;
        assert_eq!(config.compression_params(), None);
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = AppConfig::default();
        config
            .apply(&CliOverrides {
                format: Some(SupportedFormat::Png),
                output_dir: Some(PathBuf::from("out")),
                no_compress: true,
            })
            .unwrap();
        assert_eq!(config.output.format, SupportedFormat::Png);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert!(!config.compression.enabled);
    }

    #[test]
    fn cli_override_to_input_only_format_fails() {
        let mut config = AppConfig::default();
        let result = config.apply(&CliOverrides {
            format: Some(SupportedFormat::Heif),
            ..CliOverrides::default()
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_config_reads_working_directory_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[output]\nformat = \"AVIF\"\n",
        )
        .unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config.output.format, SupportedFormat::Avif);
    }

    #[test]
    fn load_config_explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")), tmp.path());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        let result = load_config(Some(&path), tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
