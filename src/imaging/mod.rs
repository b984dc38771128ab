//! Image decoding and encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode HEIC/HEIF** | `libheif-rs` (`heif` feature) |
//! | **Decode RAW** | `rawloader` + `imagepipe` (`raw` feature) |
//! | **Decode TIFF / raster** | `image` crate, AVIF via `avif-parse` + `rav1d` |
//! | **Downscale** | Lanczos3 `resize_exact` |
//! | **Encode** | `image` encoders, one per output format |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and size math (unit testable)
//! - **Parameters**: Data structures describing codec operations
//! - **Backend**: [`CodecBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
mod external;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{CodecBackend, CodecError, Dimensions};
pub use calculations::{fit_within, reduction_percent};
pub use operations::{Compressed, SizeReduction, encode_once, limit_dimensions};
pub use params::{CompressionParams, EncodeParams, Quality};
pub use rust_backend::RustBackend;
