//! # HEIC Converter
//!
//! Batch image format conversion with a focus on Apple's HEIC/HEIF photos.
//! Hand it files or directories; every file with a recognised extension
//! becomes a job that is decoded, rendered onto a canvas, optionally shrunk
//! below a size ceiling, and encoded into the selected target format.
//!
//! # Architecture
//!
//! ```text
//! files ─▶ intake ─▶ pending jobs ─▶ pipeline (per job) ─▶ Done / Failed
//!             │                          │                     │
//!             └─ rejections              └─ progress events    └─ object URL ─▶ download
//!                       \                        │                 /
//!                        └────────────▶ presenter ◀───────────────┘
//! ```
//!
//! Jobs run one at a time. A failed job reports its error verbatim and the
//! batch moves on.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formats`] | Static registry: extensions, output formats, encoder profiles |
//! | [`naming`] | File name parsing and output name derivation |
//! | [`intake`] | Accept/reject incoming files, directory expansion, drop hint |
//! | [`job`] | `ConversionJob` and its forward-only status machine |
//! | [`pipeline`] | Decode → Render → Compress → Encode as a lazy event iterator |
//! | [`imaging`] | Codec backend trait, pure-Rust backend, size-reduction pass |
//! | [`blob`] | Object URLs for converted files, released exactly once |
//! | [`presenter`] | Job list state and terminal formatting |
//! | [`session`] | Application state tying the above together, downloads, reports |
//! | [`config`] | `heic-converter.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Optional Native Decoders
//!
//! Everything on the default build is pure Rust. HEIC/HEIF decoding needs
//! the system libheif and sits behind the `heif` feature; camera RAW sits
//! behind `raw`. Without them those jobs fail with a clear message and the
//! rest of the batch converts normally.
//!
//! ## Scoped Download URLs
//!
//! Each converted file gets one [`blob::ObjectUrl`]. The handle is released
//! after a download or when its job is discarded, so clearing the list never
//! leaves URLs behind.
//!
//! ## Iterator Pipeline
//!
//! [`pipeline::run`] returns an iterator of progress events instead of taking
//! callbacks. The caller decides how to display progress, and tests collect
//! the events into a `Vec` and compare.

pub mod blob;
pub mod config;
pub mod formats;
pub mod imaging;
pub mod intake;
pub mod job;
pub mod naming;
pub mod pipeline;
pub mod presenter;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
