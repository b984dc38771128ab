//! Format registry.
//!
//! Static tables mapping accepted input extensions to canonical formats, and
//! each format to the profile used when encoding into it. Everything here is
//! a pure lookup over fixed data; a miss is `None`, never an error.
//!
//! ## Accepted inputs
//!
//! | Extensions | Format | Route |
//! |---|---|---|
//! | `heic`, `heif` | HEIC, HEIF | [`Route::Heif`] |
//! | `tif`, `tiff` | TIFF | [`Route::Tiff`] |
//! | `cr2`, `nef`, `arw`, `orf`, `raf`, `rw2`, `dng`, `pef` | camera RAW | [`Route::Raw`] |
//! | `jpg`, `jpeg`, `png`, `webp`, `avif`, `bmp`, `gif`, `ico` | as named | [`Route::Raster`] |
//!
//! ## Output profiles
//!
//! Quality is a float in `[0, 1]`. Lossless formats carry `1.0`; the value
//! is ignored by their encoders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A format the converter recognises by name or extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SupportedFormat {
    Heic,
    Heif,
    Jpeg,
    Png,
    Webp,
    Avif,
    Tiff,
    Bmp,
    Gif,
    Ico,
}

/// Camera RAW formats accepted by the extended pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RawFormat {
    Cr2,
    Nef,
    Arw,
    Orf,
    Raf,
    Rw2,
    Dng,
    Pef,
}

/// Detected format of an accepted input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum InputFormat {
    Standard(SupportedFormat),
    Raw(RawFormat),
}

/// Which decode path a job takes through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// HEIC/HEIF container, decoded by the HEIF collaborator.
    Heif,
    /// Camera RAW, decoded by the RAW collaborator.
    Raw,
    /// TIFF, decoded up front and painted onto a canvas.
    Tiff,
    /// Everything else: the original bytes go straight to the canvas.
    Raster,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown image format: {0}")]
pub struct UnknownFormat(pub String);

const INPUT_EXTENSIONS: &[(&str, SupportedFormat)] = &[
    ("heic", SupportedFormat::Heic),
    ("heif", SupportedFormat::Heif),
    ("jpg", SupportedFormat::Jpeg),
    ("jpeg", SupportedFormat::Jpeg),
    ("png", SupportedFormat::Png),
    ("webp", SupportedFormat::Webp),
    ("avif", SupportedFormat::Avif),
    ("tiff", SupportedFormat::Tiff),
    ("tif", SupportedFormat::Tiff),
    ("bmp", SupportedFormat::Bmp),
    ("gif", SupportedFormat::Gif),
    ("ico", SupportedFormat::Ico),
];

const RAW_EXTENSIONS: &[(&str, RawFormat)] = &[
    ("cr2", RawFormat::Cr2),
    ("nef", RawFormat::Nef),
    ("arw", RawFormat::Arw),
    ("orf", RawFormat::Orf),
    ("raf", RawFormat::Raf),
    ("rw2", RawFormat::Rw2),
    ("dng", RawFormat::Dng),
    ("pef", RawFormat::Pef),
];

/// Formats offered as conversion targets, in selector order.
const OUTPUT_FORMATS: &[SupportedFormat] = &[
    SupportedFormat::Jpeg,
    SupportedFormat::Png,
    SupportedFormat::Webp,
    SupportedFormat::Avif,
    SupportedFormat::Tiff,
    SupportedFormat::Ico,
    SupportedFormat::Bmp,
    SupportedFormat::Gif,
];

/// Look up a standard format by file extension (case-insensitive).
pub fn lookup(extension: &str) -> Option<SupportedFormat> {
    let ext = extension.to_ascii_lowercase();
    INPUT_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, fmt)| *fmt)
}

/// Look up any accepted input format, RAW variants included.
pub fn lookup_input(extension: &str) -> Option<InputFormat> {
    if let Some(fmt) = lookup(extension) {
        return Some(InputFormat::Standard(fmt));
    }
    let ext = extension.to_ascii_lowercase();
    RAW_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, raw)| InputFormat::Raw(*raw))
}

/// Every accepted input extension, standard first, then RAW.
pub fn accepted_extensions() -> impl Iterator<Item = &'static str> {
    INPUT_EXTENSIONS
        .iter()
        .map(|(e, _)| *e)
        .chain(RAW_EXTENSIONS.iter().map(|(e, _)| *e))
}

/// Formats a user can convert into.
pub fn output_formats() -> &'static [SupportedFormat] {
    OUTPUT_FORMATS
}

impl SupportedFormat {
    pub const ALL: [SupportedFormat; 10] = [
        Self::Heic,
        Self::Heif,
        Self::Jpeg,
        Self::Png,
        Self::Webp,
        Self::Avif,
        Self::Tiff,
        Self::Bmp,
        Self::Gif,
        Self::Ico,
    ];

    /// Canonical upper-case name (`"JPEG"`, `"WEBP"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Heic => "HEIC",
            Self::Heif => "HEIF",
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Webp => "WEBP",
            Self::Avif => "AVIF",
            Self::Tiff => "TIFF",
            Self::Bmp => "BMP",
            Self::Gif => "GIF",
            Self::Ico => "ICO",
        }
    }

    pub fn is_output(self) -> bool {
        OUTPUT_FORMATS.contains(&self)
    }

    pub fn profile(self) -> &'static FormatProfile {
        profile_for(self)
    }
}

impl fmt::Display for SupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts canonical names and extensions in any case: `JPEG`, `jpg`, `Tif`.
impl FromStr for SupportedFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        lookup(trimmed)
            .or_else(|| {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|f| f.name().eq_ignore_ascii_case(trimmed))
            })
            .ok_or_else(|| UnknownFormat(trimmed.to_string()))
    }
}

impl TryFrom<String> for SupportedFormat {
    type Error = UnknownFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SupportedFormat> for String {
    fn from(value: SupportedFormat) -> Self {
        value.name().to_string()
    }
}

impl RawFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cr2 => "CR2",
            Self::Nef => "NEF",
            Self::Arw => "ARW",
            Self::Orf => "ORF",
            Self::Raf => "RAF",
            Self::Rw2 => "RW2",
            Self::Dng => "DNG",
            Self::Pef => "PEF",
        }
    }
}

impl InputFormat {
    pub fn route(self) -> Route {
        match self {
            Self::Raw(_) => Route::Raw,
            Self::Standard(SupportedFormat::Heic | SupportedFormat::Heif) => Route::Heif,
            Self::Standard(SupportedFormat::Tiff) => Route::Tiff,
            Self::Standard(_) => Route::Raster,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Standard(f) => f.name(),
            Self::Raw(r) => r.name(),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Output profiles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaSubsampling {
    Yuv444,
    Yuv420,
}

impl fmt::Display for ChromaSubsampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv444 => f.write_str("4:4:4"),
            Self::Yuv420 => f.write_str("4:2:0"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    None,
    Lzw,
}

/// Encoder knobs recorded per format.
///
/// Backends apply what their encoder exposes; the rest is informational.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncoderOptions {
    None,
    Jpeg {
        chroma_subsampling: ChromaSubsampling,
        optimize_scans: bool,
    },
    Png {
        /// 0 (fastest) to 9 (smallest).
        compression_level: u8,
        palette: bool,
    },
    Webp {
        lossless: bool,
        effort: u8,
        smart_subsample: bool,
    },
    Avif {
        /// rav1e speed, 1 (slowest) to 10.
        speed: u8,
        chroma_subsampling: ChromaSubsampling,
    },
    Tiff {
        compression: TiffCompression,
    },
    Gif {
        colors: u16,
        dither: bool,
    },
    Ico {
        /// Square frame sizes written into the icon.
        sizes: &'static [u32],
    },
}

impl EncoderOptions {
    /// Option name/value pairs for display.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        match *self {
            Self::None => Vec::new(),
            Self::Jpeg {
                chroma_subsampling,
                optimize_scans,
            } => vec![
                ("chromaSubsampling", chroma_subsampling.to_string()),
                ("optimizeScans", optimize_scans.to_string()),
            ],
            Self::Png {
                compression_level,
                palette,
            } => vec![
                ("compressionLevel", compression_level.to_string()),
                ("palette", palette.to_string()),
            ],
            Self::Webp {
                lossless,
                effort,
                smart_subsample,
            } => vec![
                ("lossless", lossless.to_string()),
                ("effort", effort.to_string()),
                ("smartSubsample", smart_subsample.to_string()),
            ],
            Self::Avif {
                speed,
                chroma_subsampling,
            } => vec![
                ("speed", speed.to_string()),
                ("chromaSubsampling", chroma_subsampling.to_string()),
            ],
            Self::Tiff { compression } => {
                let name = match compression {
                    TiffCompression::None => "none",
                    TiffCompression::Lzw => "lzw",
                };
                vec![("compression", name.to_string())]
            }
            Self::Gif { colors, dither } => vec![
                ("colors", colors.to_string()),
                ("dither", dither.to_string()),
            ],
            Self::Ico { sizes } => {
                let list: Vec<String> = sizes.iter().map(u32::to_string).collect();
                vec![("sizes", list.join(","))]
            }
        }
    }
}

impl EncoderOptions {
    /// Option names the encoder reads. The others are shown for reference.
    pub fn applied(&self) -> &'static [&'static str] {
        match self {
            Self::Png { .. } => &["compressionLevel"],
            Self::Webp { .. } => &["lossless"],
            Self::Avif { .. } => &["speed"],
            Self::Ico { .. } => &["sizes"],
            Self::None | Self::Jpeg { .. } | Self::Tiff { .. } | Self::Gif { .. } => &[],
        }
    }
}

/// Everything needed to encode into one format.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatProfile {
    pub format: SupportedFormat,
    pub mime_type: &'static str,
    pub file_extension: &'static str,
    /// Default encoder quality in `[0, 1]`.
    pub default_quality: f32,
    pub encoder_options: EncoderOptions,
    /// One-line description shown next to the format selector.
    pub description: &'static str,
}

/// Indexed by `SupportedFormat` discriminant.
static PROFILES: [FormatProfile; 10] = [
    FormatProfile {
        format: SupportedFormat::Heic,
        mime_type: "image/heic",
        file_extension: "heic",
        default_quality: 0.92,
        encoder_options: EncoderOptions::None,
        description: "Apple's default photo container. Readable here, not writable.",
    },
    FormatProfile {
        format: SupportedFormat::Heif,
        mime_type: "image/heif",
        file_extension: "heif",
        default_quality: 0.92,
        encoder_options: EncoderOptions::None,
        description: "High Efficiency Image Format container. Readable here, not writable.",
    },
    FormatProfile {
        format: SupportedFormat::Jpeg,
        mime_type: "image/jpeg",
        file_extension: "jpg",
        default_quality: 0.92,
        encoder_options: EncoderOptions::Jpeg {
            chroma_subsampling: ChromaSubsampling::Yuv444,
            optimize_scans: true,
        },
        description: "Ideal for photographs: a good balance of quality and size, supported everywhere.",
    },
    FormatProfile {
        format: SupportedFormat::Png,
        mime_type: "image/png",
        file_extension: "png",
        default_quality: 1.0,
        encoder_options: EncoderOptions::Png {
            compression_level: 9,
            palette: false,
        },
        description: "Lossless, ideal for images with text or graphics. Supports transparency.",
    },
    FormatProfile {
        format: SupportedFormat::Webp,
        mime_type: "image/webp",
        file_extension: "webp",
        default_quality: 0.85,
        encoder_options: EncoderOptions::Webp {
            lossless: false,
            effort: 6,
            smart_subsample: true,
        },
        description: "Google's modern format: strong compression, transparency and animation.",
    },
    FormatProfile {
        format: SupportedFormat::Avif,
        mime_type: "image/avif",
        file_extension: "avif",
        default_quality: 0.85,
        encoder_options: EncoderOptions::Avif {
            speed: 5,
            chroma_subsampling: ChromaSubsampling::Yuv444,
        },
        description: "Newer format with better compression than WEBP. Limited support in older browsers.",
    },
    FormatProfile {
        format: SupportedFormat::Tiff,
        mime_type: "image/tiff",
        file_extension: "tiff",
        default_quality: 1.0,
        encoder_options: EncoderOptions::Tiff {
            compression: TiffCompression::Lzw,
        },
        description: "Professional lossless format for editing and archiving, high color depth.",
    },
    FormatProfile {
        format: SupportedFormat::Bmp,
        mime_type: "image/bmp",
        file_extension: "bmp",
        default_quality: 1.0,
        encoder_options: EncoderOptions::None,
        description: "Basic uncompressed format, compatible with old software.",
    },
    FormatProfile {
        format: SupportedFormat::Gif,
        mime_type: "image/gif",
        file_extension: "gif",
        default_quality: 1.0,
        encoder_options: EncoderOptions::Gif {
            colors: 256,
            dither: true,
        },
        description: "Simple animation and transparency. Limited to 256 colors.",
    },
    FormatProfile {
        format: SupportedFormat::Ico,
        mime_type: "image/x-icon",
        file_extension: "ico",
        default_quality: 0.95,
        encoder_options: EncoderOptions::Ico {
            sizes: &[16, 32, 48],
        },
        description: "Website favicon format. Holds several sizes in one file.",
    },
];

/// Profile for `format`. Total over [`SupportedFormat`].
pub fn profile_for(format: SupportedFormat) -> &'static FormatProfile {
    &PROFILES[format as usize]
}
