//! Conversion pipeline: drive one job from Pending to a terminal status.
//!
//! [`run`] returns a [`JobRun`], an iterator that performs one stage per
//! `next()` and yields a [`ProgressEvent`] for it. The run is lazy (no work
//! happens until it is polled), finite (it ends after Done or Failed), and
//! not restartable (a job that already left Pending yields nothing).
//!
//! ## Stages
//!
//! | Stage | Route | Work | Progress |
//! |---|---|---|---|
//! | Decoding | Heif / Raw / Tiff | format decoder → bitmap | 10 |
//! | Decoding | Raster | none, bytes pass through | 10 |
//! | Rendering | all | bitmap (or raster bytes) → canvas | 30 |
//! | Compressing | all, when enabled | size-reduction pass, one event per attempt | 40–90 |
//! | Encoding | all | single encode when compression is off | 95 |
//! | Done | all | result + download URL | 100 |
//!
//! Any error moves the job to Failed with the message kept verbatim. Other
//! jobs are unaffected.

use crate::blob::{Blob, BlobStore};
use crate::formats::{InputFormat, Route};
use crate::imaging::operations::{self, Attempt, Compressed, SizeReduction};
use crate::imaging::{CodecBackend, CompressionParams, Dimensions};
use crate::job::{ConversionJob, ConversionResult, JobError, JobId, JobStatus};
use crate::naming::output_file_name;
use image::DynamicImage;
use thiserror::Error;

/// Why a job failed. The inner text is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("{0}")]
    UnsupportedFormat(String),
    #[error("{0}")]
    DecodeFailure(String),
    #[error("{0}")]
    RenderFailure(String),
    #[error("{0}")]
    CompressionFailure(String),
    #[error("{0}")]
    EncodeFailure(String),
}

impl ConvertError {
    pub fn message(&self) -> &str {
        match self {
            ConvertError::UnsupportedFormat(m)
            | ConvertError::DecodeFailure(m)
            | ConvertError::RenderFailure(m)
            | ConvertError::CompressionFailure(m)
            | ConvertError::EncodeFailure(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::UnsupportedFormat(_) => "unsupported_format",
            ConvertError::DecodeFailure(_) => "decode_failure",
            ConvertError::RenderFailure(_) => "render_failure",
            ConvertError::CompressionFailure(_) => "compression_failure",
            ConvertError::EncodeFailure(_) => "encode_failure",
        }
    }
}

/// One step of a job's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub job: JobId,
    pub stage: JobStatus,
    pub percent: u8,
    /// Failure message, set only when `stage` is Failed.
    pub error: Option<String>,
}

pub const DECODING_PERCENT: u8 = 10;
pub const RENDERING_PERCENT: u8 = 30;
pub const COMPRESSING_START: u8 = 40;
pub const COMPRESSING_END: u8 = 90;
pub const ENCODING_PERCENT: u8 = 95;

/// Progress after `attempt` of `max` compression attempts.
pub fn compression_percent(attempt: u32, max: u32) -> u8 {
    let span = u32::from(COMPRESSING_END - COMPRESSING_START);
    let done = attempt.min(max.max(1));
    COMPRESSING_START + (span * done / max.max(1)) as u8
}

/// What came out of the decode stage.
enum Decoded {
    Bitmap(DynamicImage),
    /// Raster inputs are loaded at render time.
    Passthrough,
}

enum State {
    Start,
    Decode,
    Render(Decoded),
    Compress(DynamicImage, SizeReduction),
    Encode(DynamicImage),
    Finalize(DynamicImage, Compressed),
    Finished,
}

/// Lazy per-job stage iterator. See the [module docs](self).
pub struct JobRun<'a, B: CodecBackend> {
    backend: &'a B,
    store: &'a BlobStore,
    compression: Option<&'a CompressionParams>,
    job: &'a mut ConversionJob,
    state: State,
}

/// Start a run for `job`. Nothing happens until the run is polled.
///
/// `compression: None` skips the size-reduction pass.
pub fn run<'a, B: CodecBackend>(
    backend: &'a B,
    store: &'a BlobStore,
    compression: Option<&'a CompressionParams>,
    job: &'a mut ConversionJob,
) -> JobRun<'a, B> {
    let state = if job.status() == JobStatus::Pending {
        State::Start
    } else {
        State::Finished
    };
    JobRun {
        backend,
        store,
        compression,
        job,
        state,
    }
}

impl<B: CodecBackend> JobRun<'_, B> {
    /// Poll to completion and return the terminal status.
    pub fn finish(mut self) -> JobStatus {
        for _ in self.by_ref() {}
        self.job.status()
    }

    fn event(&self, error: Option<String>) -> ProgressEvent {
        ProgressEvent {
            job: self.job.id(),
            stage: self.job.status(),
            percent: self.job.progress(),
            error,
        }
    }

    fn enter(&mut self, stage: JobStatus, percent: u8) -> Result<(), StepError> {
        self.job.advance(stage)?;
        self.job.set_progress(percent);
        tracing::debug!(job = %self.job.id(), stage = %stage, percent, "stage");
        Ok(())
    }

    fn step(&mut self, state: State) -> Result<State, StepError> {
        match state {
            State::Start => {
                self.enter(JobStatus::Decoding, DECODING_PERCENT)?;
                Ok(State::Decode)
            }
            State::Decode => {
                let decoded = self.decode()?;
                self.enter(JobStatus::Rendering, RENDERING_PERCENT)?;
                Ok(State::Render(decoded))
            }
            State::Render(decoded) => {
                let canvas = self.render(decoded)?;
                match self.compression {
                    Some(params) => {
                        let canvas = operations::limit_dimensions(canvas, params);
                        let reduction = SizeReduction::new(self.backend, self.job.target(), params);
                        self.enter(JobStatus::Compressing, COMPRESSING_START)?;
                        Ok(State::Compress(canvas, reduction))
                    }
                    None => {
                        self.enter(JobStatus::Encoding, ENCODING_PERCENT)?;
                        Ok(State::Encode(canvas))
                    }
                }
            }
            State::Compress(canvas, mut reduction) => {
                let outcome = reduction
                    .attempt(self.backend, &canvas)
                    .map_err(|e| ConvertError::CompressionFailure(e.to_string()))?;
                match outcome {
                    Attempt::Retry { attempt, .. } => {
                        let percent = compression_percent(attempt, reduction.max_iterations());
                        self.job.set_progress(percent);
                        Ok(State::Compress(canvas, reduction))
                    }
                    Attempt::Finished(compressed) => {
                        self.enter(JobStatus::Encoding, ENCODING_PERCENT)?;
                        Ok(State::Finalize(canvas, compressed))
                    }
                }
            }
            State::Encode(canvas) => {
                let bytes = operations::encode_once(self.backend, &canvas, self.job.target())
                    .map_err(|e| ConvertError::EncodeFailure(e.to_string()))?;
                let compressed = Compressed {
                    bytes,
                    quality: crate::imaging::EncodeParams::for_format(self.job.target()).quality,
                    attempts: 1,
                };
                self.complete(&canvas, compressed)?;
                Ok(State::Finished)
            }
            State::Finalize(canvas, compressed) => {
                self.complete(&canvas, compressed)?;
                Ok(State::Finished)
            }
            State::Finished => Ok(State::Finished),
        }
    }

    fn decode(&self) -> Result<Decoded, ConvertError> {
        let bytes = &self.job.source().bytes;
        let input = self.job.input_format();
        let decoded = match input.route() {
            Route::Heif => self.backend.decode_heif(bytes),
            Route::Raw => match input {
                InputFormat::Raw(raw) => self.backend.decode_raw(bytes, raw),
                InputFormat::Standard(fmt) => {
                    return Err(ConvertError::UnsupportedFormat(format!(
                        "Unsupported format: {fmt}"
                    )));
                }
            },
            Route::Tiff => self.backend.decode_tiff(bytes),
            Route::Raster => return Ok(Decoded::Passthrough),
        };
        decoded
            .map(Decoded::Bitmap)
            .map_err(|e| ConvertError::DecodeFailure(e.to_string()))
    }

    fn render(&self, decoded: Decoded) -> Result<DynamicImage, ConvertError> {
        let canvas = match decoded {
            Decoded::Bitmap(image) => image,
            Decoded::Passthrough => {
                let hint = match self.job.input_format() {
                    InputFormat::Standard(fmt) => fmt,
                    InputFormat::Raw(raw) => {
                        return Err(ConvertError::UnsupportedFormat(format!(
                            "Unsupported format: {}",
                            raw.name()
                        )));
                    }
                };
                self.backend
                    .load_raster(&self.job.source().bytes, hint)
                    .map_err(|e| ConvertError::DecodeFailure(e.to_string()))?
            }
        };
        if Dimensions::of(&canvas).is_empty() {
            return Err(ConvertError::RenderFailure(
                "Image has zero width or height".into(),
            ));
        }
        Ok(canvas)
    }

    fn complete(&mut self, canvas: &DynamicImage, compressed: Compressed) -> Result<(), StepError> {
        let target = self.job.target();
        let profile = target.profile();
        let file_name = output_file_name(&self.job.source().name, profile.file_extension);
        let blob = Blob::new(compressed.bytes, profile.mime_type);
        let url = self.store.create(blob.clone());
        let result = ConversionResult {
            blob,
            file_name,
            dimensions: Dimensions::of(canvas),
            quality: self
                .backend
                .honors_quality(target)
                .then_some(compressed.quality),
            attempts: compressed.attempts,
        };
        tracing::info!(
            job = %self.job.id(),
            file = %self.job.source().name,
            output = %result.file_name,
            bytes = result.size(),
            attempts = result.attempts,
            "converted"
        );
        self.job.complete(result, url)?;
        Ok(())
    }
}

/// Errors while stepping: job failures, or a broken state machine.
#[derive(Debug)]
enum StepError {
    Convert(ConvertError),
    Transition(JobError),
}

impl From<ConvertError> for StepError {
    fn from(e: ConvertError) -> Self {
        StepError::Convert(e)
    }
}

impl From<JobError> for StepError {
    fn from(e: JobError) -> Self {
        StepError::Transition(e)
    }
}

impl<B: CodecBackend> Iterator for JobRun<'_, B> {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<ProgressEvent> {
        let state = std::mem::replace(&mut self.state, State::Finished);
        if matches!(state, State::Finished) {
            return None;
        }

        match self.step(state) {
            Ok(next) => {
                self.state = next;
                Some(self.event(None))
            }
            Err(err) => {
                let error = match err {
                    StepError::Convert(e) => e,
                    StepError::Transition(e) => ConvertError::EncodeFailure(e.to_string()),
                };
                tracing::warn!(
                    job = %self.job.id(),
                    file = %self.job.source().name,
                    stage = %self.job.status(),
                    error = %error,
                    "conversion failed"
                );
                let message = error.message().to_string();
                if self.job.fail(error).is_err() {
                    return None;
                }
                Some(self.event(Some(message)))
            }
        }
    }
}
