//! Filename parsing shared by intake and the conversion pipeline.
//!
//! A file's extension is the substring after its final period, compared
//! case-insensitively. Output files keep the source stem and swap the
//! extension for the target format's canonical one:
//!
//! - `photo.HEIC` → JPEG → `photo.jpg`
//! - `scan.tif` → PNG → `scan.png`
//! - `IMG.2024.01.heic` → WEBP → `IMG.2024.01.webp`

/// Result of splitting a file name on its final period.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Everything before the final period. The full name when there is none.
    pub stem: String,
    /// Lowercased text after the final period. `None` when the name has no
    /// period or ends with one.
    pub extension: Option<String>,
}

/// Split a file name into stem and lowercased extension.
///
/// Handles these patterns:
/// - `"photo.HEIC"` → stem="photo", extension=Some("heic")
/// - `"archive.tar.gz"` → stem="archive.tar", extension=Some("gz")
/// - `"README"` → stem="README", extension=None
/// - `"broken."` → stem="broken.", extension=None
pub fn parse_file_name(name: &str) -> ParsedName {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => ParsedName {
            stem: stem.to_string(),
            extension: Some(ext.to_ascii_lowercase()),
        },
        _ => ParsedName {
            stem: name.to_string(),
            extension: None,
        },
    }
}

/// Lowercased extension of `name`, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    parse_file_name(name).extension
}

/// Derive the output file name for a conversion.
///
/// The final extension is replaced; a name without one gets `extension`
/// appended.
pub fn output_file_name(name: &str, extension: &str) -> String {
    let parsed = parse_file_name(name);
    format!("{}.{}", parsed.stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        let p = parse_file_name("photo.HEIC");
        assert_eq!(p.stem, "photo");
        assert_eq!(p.extension.as_deref(), Some("heic"));
    }

    #[test]
    fn only_final_period_counts() {
        let p = parse_file_name("archive.tar.gz");
        assert_eq!(p.stem, "archive.tar");
        assert_eq!(p.extension.as_deref(), Some("gz"));
    }

    #[test]
    fn no_period_has_no_extension() {
        let p = parse_file_name("README");
        assert_eq!(p.stem, "README");
        assert_eq!(p.extension, None);
    }

    #[test]
    fn trailing_period_has_no_extension() {
        assert_eq!(extension_of("broken."), None);
    }

    #[test]
    fn hidden_file_extension() {
        let p = parse_file_name(".heic");
        assert_eq!(p.stem, "");
        assert_eq!(p.extension.as_deref(), Some("heic"));
    }

    #[test]
    fn output_name_replaces_uppercase_extension() {
        assert_eq!(output_file_name("photo.HEIC", "jpg"), "photo.jpg");
    }

    #[test]
    fn output_name_tif_to_png() {
        assert_eq!(output_file_name("scan.tif", "png"), "scan.png");
    }

    #[test]
    fn output_name_keeps_inner_periods() {
        assert_eq!(
            output_file_name("IMG.2024.01.heic", "webp"),
            "IMG.2024.01.webp"
        );
    }

    #[test]
    fn output_name_appends_when_missing() {
        assert_eq!(output_file_name("README", "png"), "README.png");
    }
}
