//! Application state for one run of the converter.
//!
//! A [`Session`] owns the selected target format, the job list (most recent
//! first), the blob store, the codec backend and the presenter. Batches are
//! processed sequentially: each job reaches Done or Failed before the next
//! one starts, and a failing job never stops the batch.
//!
//! ```text
//! submit(files) ──dispatch──▶ rejections ──▶ presenter notices
//!                     │
//!                     └──▶ jobs ──run one by one──▶ events ──▶ presenter
//!                                                     │
//! download(id, dir) ◀── Done jobs with a live URL ◀───┘
//! ```

use crate::blob::{BlobStore, StoreStats};
use crate::config::AppConfig;
use crate::formats::{InputFormat, SupportedFormat};
use crate::imaging::{CodecBackend, CompressionParams, reduction_percent};
use crate::intake::{self, Rejection};
use crate::job::{ConversionJob, JobId, JobIdSource, JobStatus, SourceFile};
use crate::naming::parse_file_name;
use crate::pipeline::{self, ProgressEvent};
use crate::presenter::Presenter;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no job {0}")]
    UnknownJob(JobId),
    #[error("job {0} has not finished converting")]
    NotDone(JobId),
    #[error("download link for job {0} was already used")]
    LinkReleased(JobId),
    #[error("{0} cannot be written; it is accepted as input only")]
    NotOutputFormat(SupportedFormat),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which jobs a call to [`Session::submit`] created.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Accepted jobs in submission order.
    pub accepted: Vec<JobId>,
    pub rejected: usize,
}

/// Machine-readable summary written by `--report`.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub target: SupportedFormat,
    pub jobs: Vec<JobReport>,
    pub rejected: Vec<Rejection>,
    pub download_urls: StoreStats,
}

#[derive(Debug, Serialize)]
pub struct JobReport {
    pub id: JobId,
    pub source: String,
    pub input_format: InputFormat,
    pub status: JobStatus,
    pub original_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_percent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl JobReport {
    fn of(job: &ConversionJob) -> Self {
        let result = job.result();
        let original = job.source().size();
        Self {
            id: job.id(),
            source: job.source().name.clone(),
            input_format: job.input_format(),
            status: job.status(),
            original_bytes: original,
            output: result.map(|r| r.file_name.clone()),
            output_bytes: result.map(|r| r.size()),
            reduction_percent: result.map(|r| reduction_percent(original, r.size())),
            quality: result.and_then(|r| r.quality).map(|q| q.value()),
            attempts: result.map(|r| r.attempts),
            error: job.error().map(|e| e.message().to_string()),
            error_kind: job.error().map(|e| e.kind()),
        }
    }
}

pub struct Session<B: CodecBackend> {
    backend: B,
    store: BlobStore,
    target: SupportedFormat,
    compression: Option<CompressionParams>,
    ids: JobIdSource,
    /// Most recent first.
    jobs: Vec<ConversionJob>,
    rejected: Vec<Rejection>,
    presenter: Presenter,
}

impl<B: CodecBackend> Session<B> {
    /// JPEG output with default compression settings.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            store: BlobStore::new(),
            target: SupportedFormat::Jpeg,
            compression: Some(CompressionParams::default()),
            ids: JobIdSource::new(),
            jobs: Vec::new(),
            rejected: Vec::new(),
            presenter: Presenter::new(),
        }
    }

    /// Session set up from a validated config.
    pub fn from_config(backend: B, config: &AppConfig) -> Result<Self, SessionError> {
        let mut session = Self::new(backend).with_compression(config.compression_params());
        session.select_format(config.output.format)?;
        Ok(session)
    }

    /// Replace compression settings; `None` turns the pass off.
    pub fn with_compression(mut self, compression: Option<CompressionParams>) -> Self {
        self.compression = compression;
        self
    }

    /// Change the target for future submissions. Returns its description.
    pub fn select_format(&mut self, format: SupportedFormat) -> Result<&'static str, SessionError> {
        if !format.is_output() {
            return Err(SessionError::NotOutputFormat(format));
        }
        self.target = format;
        Ok(format.profile().description)
    }

    pub fn selected_format(&self) -> SupportedFormat {
        self.target
    }

    pub fn jobs(&self) -> &[ConversionJob] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&ConversionJob> {
        self.jobs.iter().find(|j| j.id() == id)
    }

    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    pub fn blob_store(&self) -> &BlobStore {
        &self.store
    }

    pub fn submit(&mut self, files: Vec<SourceFile>) -> BatchOutcome {
        self.submit_with(files, |_, _| {})
    }

    /// Dispatch `files` and run every accepted job to completion.
    ///
    /// `observer` sees each progress event after the presenter has applied it.
    pub fn submit_with(
        &mut self,
        files: Vec<SourceFile>,
        mut observer: impl FnMut(&ProgressEvent, &Presenter),
    ) -> BatchOutcome {
        let intake = intake::dispatch(files, self.target, &mut self.ids);

        for rejection in &intake.rejected {
            self.presenter.report_rejection(rejection);
        }
        for job in &intake.accepted {
            self.presenter.render(job);
        }

        let outcome = BatchOutcome {
            accepted: intake.accepted.iter().map(ConversionJob::id).collect(),
            rejected: intake.rejected.len(),
        };
        self.rejected.extend(intake.rejected);

        for mut job in intake.accepted {
            let run = pipeline::run(
                &self.backend,
                &self.store,
                self.compression.as_ref(),
                &mut job,
            );
            for event in run {
                self.presenter.apply(&event);
                observer(&event, &self.presenter);
            }
            self.presenter.render(&job);
            self.jobs.insert(0, job);
        }
        outcome
    }

    /// Write a Done job's output into `dir` and release its URL.
    ///
    /// An existing file of the same name is kept; the new one gets a
    /// ` (1)`, ` (2)`, ... suffix.
    pub fn download(&mut self, id: JobId, dir: &Path) -> Result<PathBuf, SessionError> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.id() == id)
            .ok_or(SessionError::UnknownJob(id))?;
        if job.status() != JobStatus::Done {
            return Err(SessionError::NotDone(id));
        }
        let href = job.download_href().ok_or(SessionError::LinkReleased(id))?;
        let blob = self
            .store
            .resolve(&href)
            .ok_or(SessionError::LinkReleased(id))?;
        let file_name = job
            .result()
            .map(|r| r.file_name.clone())
            .ok_or(SessionError::NotDone(id))?;

        fs::create_dir_all(dir)?;
        let path = unique_path(dir, &file_name);
        fs::write(&path, &*blob.bytes)?;

        if let Some(url) = job.take_download() {
            url.revoke();
        }
        self.presenter.mark_saved(id, &path);
        tracing::info!(job = %id, path = %path.display(), bytes = blob.len(), "downloaded");
        Ok(path)
    }

    /// Download every Done job that still has a live URL, oldest first.
    pub fn download_all(&mut self, dir: &Path) -> Result<Vec<PathBuf>, SessionError> {
        let ready: Vec<JobId> = self
            .jobs
            .iter()
            .rev()
            .filter(|j| j.status() == JobStatus::Done && j.download_href().is_some())
            .map(ConversionJob::id)
            .collect();
        ready.into_iter().map(|id| self.download(id, dir)).collect()
    }

    /// Discard every job, releasing outstanding URLs.
    pub fn clear(&mut self) {
        let count = self.jobs.len();
        self.jobs.clear();
        self.rejected.clear();
        self.presenter.clear();
        tracing::debug!(jobs = count, active_urls = self.store.active_count(), "cleared");
    }

    pub fn report(&self) -> BatchReport {
        BatchReport {
            target: self.target,
            jobs: self.jobs.iter().rev().map(JobReport::of).collect(),
            rejected: self.rejected.clone(),
            download_urls: self.store.stats(),
        }
    }

    pub fn write_report(&self, path: &Path) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(&self.report())?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// `dir/name`, or `dir/stem (n).ext` for the first free `n`.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let parsed = parse_file_name(name);
    (1..)
        .map(|n| match &parsed.extension {
            Some(ext) => dir.join(format!("{} ({n}).{ext}", parsed.stem)),
            None => dir.join(format!("{} ({n})", parsed.stem)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
