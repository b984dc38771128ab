//! Intake: turn user-supplied files into jobs.
//!
//! Every incoming file is either accepted (its extension is in the
//! registry, so a pending [`ConversionJob`] is created for it) or rejected
//! with a [`Rejection`]. Nothing here decodes; content problems surface
//! later as pipeline failures.
//!
//! Command-line paths go through [`collect_paths`] first, which expands
//! directories the way a folder drop would.

use crate::formats::{self, SupportedFormat};
use crate::job::{ConversionJob, JobIdSource, SourceFile};
use crate::naming::extension_of;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnsupportedExtension,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnsupportedExtension => f.write_str("unsupported extension"),
        }
    }
}

/// A file turned away at intake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub file_name: String,
    pub reason: RejectReason,
}

impl Rejection {
    /// User-facing notice, e.g. `notes.txt: unsupported extension`.
    pub fn message(&self) -> String {
        format!("{}: {}", self.file_name, self.reason)
    }
}

/// Outcome of dispatching one batch.
#[derive(Debug, Default)]
pub struct Intake {
    /// Pending jobs in submission order.
    pub accepted: Vec<ConversionJob>,
    pub rejected: Vec<Rejection>,
}

/// Whether a file name would be accepted.
pub fn is_accepted(name: &str) -> bool {
    extension_of(name)
        .and_then(|ext| formats::lookup_input(&ext))
        .is_some()
}

/// Classify `files` and create a pending job per accepted file.
///
/// Order is preserved within both lists. Ids come from `ids`, so they keep
/// increasing across batches of one session.
pub fn dispatch(
    files: Vec<SourceFile>,
    target: SupportedFormat,
    ids: &mut JobIdSource,
) -> Intake {
    let mut intake = Intake::default();
    for file in files {
        let input = extension_of(&file.name).and_then(|ext| formats::lookup_input(&ext));
        match input {
            Some(input_format) => {
                let id = ids.next_id();
                tracing::debug!(job = %id, file = %file.name, format = %input_format, "accepted");
                intake
                    .accepted
                    .push(ConversionJob::new(id, file, input_format, target));
            }
            None => {
                tracing::warn!(file = %file.name, "rejected: unsupported extension");
                intake.rejected.push(Rejection {
                    file_name: file.name,
                    reason: RejectReason::UnsupportedExtension,
                });
            }
        }
    }
    intake
}

/// Drop-zone hint while files hover over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropHint {
    /// At least one hovered file would be accepted.
    Valid,
    Invalid,
}

/// Hint for a set of hovered file names.
pub fn hover_state<'a>(names: impl IntoIterator<Item = &'a str>) -> DropHint {
    if names.into_iter().any(is_accepted) {
        DropHint::Valid
    } else {
        DropHint::Invalid
    }
}

/// A path that could not be expanded, with the reason.
pub type Skipped = (PathBuf, std::io::Error);

/// Expand command-line paths into files.
///
/// Files are kept as given, even with unsupported extensions, so intake can
/// report them. Directories are walked recursively; inside them only files
/// with accepted extensions are picked up, sorted by name. Missing paths and
/// unreadable directory entries are returned apart so the rest still runs.
pub fn collect_paths(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<Skipped>) {
    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                match entry {
                    Ok(entry)
                        if entry.file_type().is_file()
                            && is_accepted(&entry.file_name().to_string_lossy()) =>
                    {
                        files.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let at = e.path().unwrap_or(path.as_path()).to_path_buf();
                        skipped.push((at, std::io::Error::other(e)));
                    }
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            skipped.push((
                path.clone(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        }
    }
    (files, skipped)
}

/// Read collected paths into memory. Unreadable files are returned apart.
pub fn read_sources(paths: &[PathBuf]) -> (Vec<SourceFile>, Vec<Skipped>) {
    let mut sources = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match SourceFile::read(path) {
            Ok(file) => sources.push(file),
            Err(e) => failures.push((path.clone(), e)),
        }
    }
    (sources, failures)
}

/// Directory-relative display for a path, falling back to the full path.
pub fn display_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
