//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Dimensions that fit within `max_edge` on the longer side.
///
/// Preserves aspect ratio. Returns the source unchanged when it already fits
/// or when `max_edge` is zero (no ceiling). The shorter edge never rounds
/// down to zero.
///
/// # Examples
/// - 10000x5000, max 8192 → 8192x4096
/// - 3000x4000, max 2000 → 1500x2000
/// - 800x600, max 8192 → 800x600
pub fn fit_within(source: Dimensions, max_edge: u32) -> Dimensions {
    let longer = source.longer_edge();
    if max_edge == 0 || longer <= max_edge {
        return source;
    }

    let scale = max_edge as f64 / longer as f64;
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);

    if source.width >= source.height {
        Dimensions {
            width: max_edge,
            height: scaled(source.height),
        }
    } else {
        Dimensions {
            width: scaled(source.width),
            height: max_edge,
        }
    }
}

/// Percentage size reduction from `original` to `converted` bytes.
///
/// Negative when the output grew. Zero-byte originals report 0.
pub fn reduction_percent(original: u64, converted: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    ((1.0 - converted as f64 / original as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn fit_landscape_above_ceiling() {
        assert_eq!(fit_within(dims(10000, 5000), 8192), dims(8192, 4096));
    }

    #[test]
    fn fit_portrait_above_ceiling() {
        assert_eq!(fit_within(dims(3000, 4000), 2000), dims(1500, 2000));
    }

    #[test]
    fn fit_square_above_ceiling() {
        assert_eq!(fit_within(dims(9000, 9000), 8192), dims(8192, 8192));
    }

    #[test]
    fn fit_below_ceiling_unchanged() {
        assert_eq!(fit_within(dims(800, 600), 8192), dims(800, 600));
    }

    #[test]
    fn fit_exactly_at_ceiling_unchanged() {
        assert_eq!(fit_within(dims(8192, 100), 8192), dims(8192, 100));
    }

    #[test]
    fn fit_zero_ceiling_means_unbounded() {
        assert_eq!(fit_within(dims(20000, 10), 0), dims(20000, 10));
    }

    #[test]
    fn fit_extreme_panorama_keeps_one_pixel() {
        assert_eq!(fit_within(dims(100000, 1), 1000), dims(1000, 1));
    }

    #[test]
    fn reduction_percent_shrink() {
        assert_eq!(reduction_percent(1000, 400), 60);
    }

    #[test]
    fn reduction_percent_growth_is_negative() {
        assert_eq!(reduction_percent(1000, 1500), -50);
    }

    #[test]
    fn reduction_percent_zero_original() {
        assert_eq!(reduction_percent(0, 10), 0);
    }
}
