//! Conversion jobs and their lifecycle.
//!
//! One [`ConversionJob`] exists per accepted input file. Its status only
//! moves forward:
//!
//! ```text
//! Pending → Decoding → Rendering → Compressing → Encoding → Done
//!     └──────────┴──────────┴────────────┴────────────┴──→ Failed
//! ```
//!
//! Stages may be skipped (compression off skips `Compressing`), but never
//! revisited. A job carries a result and download URL iff it is `Done`, and
//! an error iff it is `Failed`. Fields are private so those rules hold; the
//! pipeline drives jobs through [`ConversionJob::advance`],
//! [`ConversionJob::complete`] and [`ConversionJob::fail`].

use crate::blob::{Blob, ObjectUrl};
use crate::formats::{InputFormat, SupportedFormat};
use crate::imaging::{Dimensions, Quality};
use crate::pipeline::ConvertError;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Stable identifier for a job within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out increasing job ids.
#[derive(Debug, Default)]
pub struct JobIdSource {
    next: u64,
}

impl JobIdSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> JobId {
        self.next += 1;
        JobId(self.next)
    }
}

/// Lifecycle stage. Ordered: comparisons follow the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Decoding,
    Rendering,
    Compressing,
    Encoding,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Decoding => "decoding",
            JobStatus::Rendering => "rendering",
            JobStatus::Compressing => "compressing",
            JobStatus::Encoding => "encoding",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum JobError {
    #[error("job {job} cannot move from {from} to {to}")]
    InvalidTransition {
        job: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

/// A user-supplied file: its name and full contents.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, named by its final path component.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Output of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub blob: Blob,
    pub file_name: String,
    pub dimensions: Dimensions,
    /// Quality of the kept encode; `None` when the format ignores quality.
    pub quality: Option<Quality>,
    pub attempts: u32,
}

impl ConversionResult {
    pub fn size(&self) -> u64 {
        self.blob.len() as u64
    }
}

#[derive(Debug)]
pub struct ConversionJob {
    id: JobId,
    source: SourceFile,
    input_format: InputFormat,
    target: SupportedFormat,
    status: JobStatus,
    progress: u8,
    result: Option<ConversionResult>,
    download: Option<ObjectUrl>,
    error: Option<ConvertError>,
}

impl ConversionJob {
    pub fn new(
        id: JobId,
        source: SourceFile,
        input_format: InputFormat,
        target: SupportedFormat,
    ) -> Self {
        Self {
            id,
            source,
            input_format,
            target,
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            download: None,
            error: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn input_format(&self) -> InputFormat {
        self.input_format
    }

    pub fn target(&self) -> SupportedFormat {
        self.target
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&ConvertError> {
        self.error.as_ref()
    }

    /// Href of the live download URL, if any.
    pub fn download_href(&self) -> Option<String> {
        self.download.as_ref().map(ObjectUrl::href)
    }

    /// Give up ownership of the download URL, e.g. to revoke it.
    pub fn take_download(&mut self) -> Option<ObjectUrl> {
        self.download.take()
    }

    /// Move to a later, non-terminal stage.
    pub fn advance(&mut self, to: JobStatus) -> Result<(), JobError> {
        if to.is_terminal() || to <= self.status || self.status.is_terminal() {
            return Err(self.invalid(to));
        }
        self.status = to;
        Ok(())
    }

    /// Raise progress. Lower values are ignored; values cap at 100.
    pub fn set_progress(&mut self, percent: u8) {
        self.progress = self.progress.max(percent.min(100));
    }

    pub fn complete(
        &mut self,
        result: ConversionResult,
        download: ObjectUrl,
    ) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(self.invalid(JobStatus::Done));
        }
        self.status = JobStatus::Done;
        self.progress = 100;
        self.result = Some(result);
        self.download = Some(download);
        Ok(())
    }

    pub fn fail(&mut self, error: ConvertError) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(self.invalid(JobStatus::Failed));
        }
        self.status = JobStatus::Failed;
        self.error = Some(error);
        Ok(())
    }

    fn invalid(&self, to: JobStatus) -> JobError {
        JobError::InvalidTransition {
            job: self.id,
            from: self.status,
            to,
        }
    }
}
