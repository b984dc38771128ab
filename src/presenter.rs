//! Terminal rendering of jobs, progress and results.
//!
//! # Job List
//!
//! The [`Presenter`] keeps one [`Row`] per job, most recent first, plus
//! batch-level notices for rejected files. Rows are created by
//! [`Presenter::render`] and updated from progress events.
//!
//! ```text
//! rejected: notes.txt: unsupported extension
//! 002 bad.heic (1.2 MB)
//!     [##------------------]  10% ✗ failed
//!     Error: Could not parse HEIF container
//! 001 photo.HEIC (2.35 MB)
//!     [####################] 100% ✓ done
//!     Download: photo.jpg (blob:heic-converter/1)
//!     Converted: 2.35 MB → 812.4 KB (66% smaller)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure,
//! with no I/O.

use crate::formats::{SupportedFormat, output_formats};
use crate::imaging::reduction_percent;
use crate::intake::Rejection;
use crate::job::{ConversionJob, JobId, JobStatus};
use crate::pipeline::ProgressEvent;
use std::path::{Path, PathBuf};

const BAR_WIDTH: usize = 20;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Working,
    Done,
    Failed,
}

impl Badge {
    fn label(self) -> &'static str {
        match self {
            Badge::Working => "…",
            Badge::Done => "✓ done",
            Badge::Failed => "✗ failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadLine {
    pub href: String,
    pub file_name: String,
    /// Where the file was written, once downloaded.
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub job: JobId,
    pub file_name: String,
    pub size: u64,
    pub percent: u8,
    pub stage: JobStatus,
    pub badge: Badge,
    /// Progress text, or the error line once failed.
    pub text: String,
    pub download: Option<DownloadLine>,
    /// Original and converted byte sizes once done.
    pub sizes: Option<(u64, u64)>,
}

#[derive(Debug, Default)]
pub struct Presenter {
    rows: Vec<Row>,
    notices: Vec<String>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows, most recent first.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, job: JobId) -> Option<&Row> {
        self.rows.iter().find(|r| r.job == job)
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    fn row_mut(&mut self, job: JobId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.job == job)
    }

    /// Create (prepend) or refresh the row for `job`.
    pub fn render(&mut self, job: &ConversionJob) {
        if self.row(job.id()).is_none() {
            self.rows.insert(
                0,
                Row {
                    job: job.id(),
                    file_name: job.source().name.clone(),
                    size: job.source().size(),
                    percent: 0,
                    stage: JobStatus::Pending,
                    badge: Badge::Working,
                    text: "Starting conversion...".into(),
                    download: None,
                    sizes: None,
                },
            );
        }

        if let Some(row) = self.row_mut(job.id()) {
            row.percent = job.progress();
            row.stage = job.status();
        }
        match job.status() {
            JobStatus::Done => {
                if let (Some(result), Some(href)) = (job.result(), job.download_href()) {
                    self.attach_download(job.id(), &href, &result.file_name);
                    if let Some(row) = self.row_mut(job.id()) {
                        row.sizes = Some((job.source().size(), result.size()));
                    }
                }
            }
            JobStatus::Failed => {
                if let Some(error) = job.error() {
                    self.report_error(job.id(), error.message());
                }
            }
            _ => {}
        }
    }

    /// Fold a progress event into its row.
    pub fn apply(&mut self, event: &ProgressEvent) {
        if event.stage == JobStatus::Failed {
            if let Some(message) = &event.error {
                self.report_error(event.job, message);
            }
            return;
        }
        if let Some(row) = self.row_mut(event.job) {
            row.percent = event.percent;
            row.stage = event.stage;
            if event.stage != JobStatus::Done {
                row.text = format!("Progress: {}%", event.percent);
            }
        }
    }

    pub fn attach_download(&mut self, job: JobId, href: &str, file_name: &str) {
        if let Some(row) = self.row_mut(job) {
            row.badge = Badge::Done;
            row.percent = 100;
            row.stage = JobStatus::Done;
            row.text = "Conversion complete".into();
            row.download = Some(DownloadLine {
                href: href.to_string(),
                file_name: file_name.to_string(),
                saved_to: None,
            });
        }
    }

    pub fn report_error(&mut self, job: JobId, message: &str) {
        if let Some(row) = self.row_mut(job) {
            row.badge = Badge::Failed;
            row.stage = JobStatus::Failed;
            row.text = format!("Error: {message}");
        }
    }

    pub fn report_rejection(&mut self, rejection: &Rejection) {
        self.notices.push(rejection.message());
    }

    /// Record that a job's download was written to `path`.
    pub fn mark_saved(&mut self, job: JobId, path: &Path) {
        if let Some(download) = self.row_mut(job).and_then(|r| r.download.as_mut()) {
            download.saved_to = Some(path.to_path_buf());
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.notices.clear();
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Human-readable byte size, base 1024.
///
/// Two decimals with trailing zeros dropped:
/// `0 Bytes`, `1023 Bytes`, `1 KB`, `1.5 KB`, `2.35 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Fixed-width bar, e.g. `[#####---------------]` for 25%.
pub fn format_progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Format a 1-based job id as 3-digit zero-padded.
fn format_index(job: JobId) -> String {
    format!("{:0>3}", job.0)
}

/// `Converted: 2.35 MB → 812.4 KB (66% smaller)`
pub fn format_size_change(original: u64, converted: u64) -> String {
    let pct = reduction_percent(original, converted);
    let change = if pct >= 0 {
        format!("{pct}% smaller")
    } else {
        format!("{}% larger", -pct)
    };
    format!(
        "Converted: {} \u{2192} {} ({change})",
        format_file_size(original),
        format_file_size(converted)
    )
}

// ============================================================================
// Views
// ============================================================================

/// Lines for one job row.
pub fn format_row(row: &Row) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} ({})",
        format_index(row.job),
        row.file_name,
        format_file_size(row.size)
    )];
    let status = match row.badge {
        Badge::Working => format!("{} {}", Badge::Working.label(), row.stage),
        badge => badge.label().to_string(),
    };
    lines.push(format!(
        "    {} {:>3}% {}",
        format_progress_bar(row.percent),
        row.percent,
        status
    ));
    match (&row.badge, &row.download) {
        (Badge::Done, Some(download)) => {
            let target = match &download.saved_to {
                Some(path) => path.display().to_string(),
                None => download.href.clone(),
            };
            lines.push(format!("    Download: {} ({})", download.file_name, target));
        }
        (Badge::Failed, _) => lines.push(format!("    {}", row.text)),
        _ => {}
    }
    if let Some((original, converted)) = row.sizes {
        lines.push(format!("    {}", format_size_change(original, converted)));
    }
    lines
}

/// Notices followed by every row, most recent first.
pub fn format_job_list(presenter: &Presenter) -> Vec<String> {
    let mut lines: Vec<String> = presenter
        .notices()
        .iter()
        .map(|n| format!("rejected: {n}"))
        .collect();
    for row in presenter.rows() {
        lines.extend(format_row(row));
    }
    lines
}

/// One live progress line, e.g. `001 photo.heic [########------------]  40% compressing`.
pub fn format_event(event: &ProgressEvent, file_name: &str) -> String {
    let mut line = format!(
        "{} {} {} {:>3}% {}",
        format_index(event.job),
        file_name,
        format_progress_bar(event.percent),
        event.percent,
        event.stage
    );
    if let Some(error) = &event.error {
        line.push_str(&format!(": {error}"));
    }
    line
}

/// Totals across the rows: converted/failed counts and byte sizes.
pub fn format_batch_summary(presenter: &Presenter) -> Vec<String> {
    let rows = presenter.rows();
    let done: Vec<&Row> = rows.iter().filter(|r| r.badge == Badge::Done).collect();
    let failed = rows.iter().filter(|r| r.badge == Badge::Failed).count();
    let rejected = presenter.notices().len();

    let mut lines = vec![format!(
        "Converted {} of {} files ({failed} failed, {rejected} rejected)",
        done.len(),
        rows.len() + rejected
    )];
    if !done.is_empty() {
        let original: u64 = done.iter().filter_map(|r| r.sizes).map(|(o, _)| o).sum();
        let converted: u64 = done.iter().filter_map(|r| r.sizes).map(|(_, c)| c).sum();
        lines.push(format_size_change(original, converted));
    }
    lines
}

/// The format selector: every output format with its description.
pub fn format_format_list(selected: SupportedFormat) -> Vec<String> {
    output_formats()
        .iter()
        .map(|&format| {
            let profile = format.profile();
            let marker = if format == selected { "*" } else { " " };
            let mut line = format!(
                "{marker} {:<5} .{:<4} {}",
                format.name(),
                profile.file_extension,
                profile.description
            );
            let applied = profile.encoder_options.applied();
            let (used, informational): (Vec<_>, Vec<_>) = profile
                .encoder_options
                .entries()
                .into_iter()
                .partition(|(k, _)| applied.contains(k));
            let joined = |options: Vec<(&str, String)>| {
                options
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            if !used.is_empty() {
                line.push_str(&format!(" [{}]", joined(used)));
            }
            if !informational.is_empty() {
                line.push_str(&format!(" (informational: {})", joined(informational)));
            }
            line
        })
        .collect()
}

/// Intake dry run: one line per path, accepted or rejected.
pub fn format_intake_check(names: &[(String, bool)]) -> Vec<String> {
    names
        .iter()
        .map(|(name, accepted)| {
            if *accepted {
                format!("accept  {name}")
            } else {
                format!("reject  {name} (unsupported extension)")
            }
        })
        .collect()
}

/// Print lines to stdout.
pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

pub fn print_job_list(presenter: &Presenter) {
    print_lines(&format_job_list(presenter));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{Blob, BlobStore};
    use crate::formats::InputFormat;
    use crate::imaging::{Dimensions, Quality};
    use crate::intake::RejectReason;
    use crate::job::{ConversionResult, SourceFile};
    use crate::pipeline::ConvertError;

    fn job(id: u64, name: &str, size: usize) -> ConversionJob {
        ConversionJob::new(
            JobId(id),
            SourceFile::new(name, vec![0; size]),
            InputFormat::Standard(SupportedFormat::Heic),
            SupportedFormat::Jpeg,
        )
    }

    fn event(job: u64, stage: JobStatus, percent: u8) -> ProgressEvent {
        ProgressEvent {
            job: JobId(job),
            stage,
            percent,
            error: None,
        }
    }

    // =========================================================================
    // format_file_size
    // =========================================================================

    #[test]
    fn file_size_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
        assert_eq!(format_file_size(2_464_153), "2.35 MB");
        assert_eq!(format_file_size(1_073_741_824), "1 GB");
    }

    #[test]
    fn file_size_caps_at_gb() {
        assert_eq!(format_file_size(2 * 1024 * 1_073_741_824), "2048 GB");
    }

    #[test]
    fn progress_bar_widths() {
        assert_eq!(format_progress_bar(0), format!("[{}]", "-".repeat(20)));
        assert_eq!(format_progress_bar(25), format!("[{}{}]", "#".repeat(5), "-".repeat(15)));
        assert_eq!(format_progress_bar(100), format!("[{}]", "#".repeat(20)));
        assert_eq!(format_progress_bar(200), format_progress_bar(100));
    }

    #[test]
    fn size_change_wording() {
        assert_eq!(
            format_size_change(2048, 1024),
            "Converted: 2 KB \u{2192} 1 KB (50% smaller)"
        );
        assert_eq!(
            format_size_change(600, 900),
            "Converted: 600 Bytes \u{2192} 900 Bytes (50% larger)"
        );
        assert_eq!(
            format_size_change(1000, 1500),
            "Converted: 1000 Bytes \u{2192} 1.46 KB (50% larger)"
        );
    }

    // =========================================================================
    // Presenter state
    // =========================================================================

    #[test]
    fn render_prepends_new_rows() {
        let mut p = Presenter::new();
        p.render(&job(1, "a.heic", 10));
        p.render(&job(2, "b.heic", 10));
        let ids: Vec<JobId> = p.rows().iter().map(|r| r.job).collect();
        assert_eq!(ids, vec![JobId(2), JobId(1)]);
        assert_eq!(p.rows()[0].text, "Starting conversion...");
    }

    #[test]
    fn render_updates_existing_row() {
        let mut p = Presenter::new();
        let mut j = job(1, "a.heic", 10);
        p.render(&j);
        j.advance(JobStatus::Decoding).unwrap();
        j.set_progress(10);
        p.render(&j);
        assert_eq!(p.rows().len(), 1);
        assert_eq!(p.rows()[0].percent, 10);
        assert_eq!(p.rows()[0].stage, JobStatus::Decoding);
    }

    #[test]
    fn apply_sets_progress_text() {
        let mut p = Presenter::new();
        p.render(&job(1, "a.heic", 10));
        p.apply(&event(1, JobStatus::Compressing, 45));
        let row = p.row(JobId(1)).unwrap();
        assert_eq!(row.text, "Progress: 45%");
        assert_eq!(row.percent, 45);
        assert_eq!(row.badge, Badge::Working);
    }

    #[test]
    fn failed_event_reports_error_verbatim() {
        let mut p = Presenter::new();
        p.render(&job(1, "a.heic", 10));
        p.apply(&ProgressEvent {
            error: Some("Could not parse HEIF container".into()),
            ..event(1, JobStatus::Failed, 10)
        });
        let row = p.row(JobId(1)).unwrap();
        assert_eq!(row.badge, Badge::Failed);
        assert_eq!(row.text, "Error: Could not parse HEIF container");
    }

    #[test]
    fn render_done_job_attaches_download_and_sizes() {
        let store = BlobStore::new();
        let mut j = job(1, "photo.HEIC", 4096);
        let blob = Blob::new(vec![0; 1024], "image/jpeg");
        let url = store.create(blob.clone());
        j.complete(
            ConversionResult {
                blob,
                file_name: "photo.jpg".into(),
                dimensions: Dimensions {
                    width: 1,
                    height: 1,
                },
                quality: Some(Quality::default()),
                attempts: 1,
            },
            url,
        )
        .unwrap();

        let mut p = Presenter::new();
        p.render(&j);
        let row = p.row(JobId(1)).unwrap();
        assert_eq!(row.badge, Badge::Done);
        assert_eq!(
            row.download.as_ref().map(|d| d.href.as_str()),
            Some("blob:heic-converter/1")
        );
        assert_eq!(row.sizes, Some((4096, 1024)));

        let lines = format_row(row);
        assert_eq!(lines[0], "001 photo.HEIC (4 KB)");
        assert!(lines[1].ends_with("100% ✓ done"));
        assert_eq!(lines[2], "    Download: photo.jpg (blob:heic-converter/1)");
        assert_eq!(lines[3], "    Converted: 4 KB \u{2192} 1 KB (75% smaller)");
    }

    #[test]
    fn render_failed_job_shows_error_line() {
        let mut j = job(3, "bad.heic", 10);
        j.fail(ConvertError::DecodeFailure("boom".into())).unwrap();
        let mut p = Presenter::new();
        p.render(&j);
        let lines = format_row(p.row(JobId(3)).unwrap());
        assert!(lines[1].ends_with("✗ failed"));
        assert_eq!(lines[2], "    Error: boom");
    }

    #[test]
    fn saved_path_replaces_href() {
        let mut p = Presenter::new();
        p.render(&job(1, "a.heic", 10));
        p.attach_download(JobId(1), "blob:heic-converter/9", "a.jpg");
        p.mark_saved(JobId(1), Path::new("out/a.jpg"));
        let lines = format_row(p.row(JobId(1)).unwrap());
        assert_eq!(lines[2], "    Download: a.jpg (out/a.jpg)");
    }

    #[test]
    fn rejections_lead_the_list() {
        let mut p = Presenter::new();
        p.render(&job(1, "a.heic", 10));
        p.report_rejection(&Rejection {
            file_name: "notes.txt".into(),
            reason: RejectReason::UnsupportedExtension,
        });
        let lines = format_job_list(&p);
        assert_eq!(lines[0], "rejected: notes.txt: unsupported extension");
        assert_eq!(lines[1], "001 a.heic (10 Bytes)");
    }

    #[test]
    fn clear_empties_everything() {
        let mut p = Presenter::new();
        p.render(&job(1, "a.heic", 10));
        p.report_rejection(&Rejection {
            file_name: "x".into(),
            reason: RejectReason::UnsupportedExtension,
        });
        p.clear();
        assert!(p.rows().is_empty());
        assert!(p.notices().is_empty());
    }

    // =========================================================================
    // Other views
    // =========================================================================

    #[test]
    fn event_line() {
        let line = format_event(&event(1, JobStatus::Compressing, 40), "photo.heic");
        assert_eq!(
            line,
            format!("001 photo.heic [{}{}]  40% compressing", "#".repeat(8), "-".repeat(12))
        );
    }

    #[test]
    fn batch_summary_counts() {
        let mut p = Presenter::new();
        p.render(&job(1, "a.heic", 10));
        p.attach_download(JobId(1), "blob:heic-converter/1", "a.jpg");
        p.render(&job(2, "b.heic", 10));
        p.report_error(JobId(2), "boom");
        p.report_rejection(&Rejection {
            file_name: "c.txt".into(),
            reason: RejectReason::UnsupportedExtension,
        });
        assert_eq!(
            format_batch_summary(&p)[0],
            "Converted 1 of 3 files (1 failed, 1 rejected)"
        );
    }

    #[test]
    fn format_list_marks_selection() {
        let lines = format_format_list(SupportedFormat::Png);
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("  JPEG  .jpg"));
        assert!(lines[1].starts_with("* PNG   .png"));
        assert!(lines.iter().all(|l| !l.contains("HEIC")));
    }

    #[test]
    fn format_list_flags_options_the_encoder_ignores() {
        let lines = format_format_list(SupportedFormat::Jpeg);
        let jpeg = &lines[0];
        assert!(jpeg.ends_with("(informational: chromaSubsampling=4:4:4, optimizeScans=true)"));
        assert!(!jpeg.contains(" ["));

        let png = &lines[1];
        assert!(png.contains(" [compressionLevel=9] (informational: palette=false)"));

        let ico = lines.iter().find(|l| l.contains(".ico")).unwrap();
        assert!(!ico.contains("informational"));
    }

    #[test]
    fn intake_check_lines() {
        let lines = format_intake_check(&[("a.heic".into(), true), ("b.txt".into(), false)]);
        assert_eq!(
            lines,
            vec![
                "accept  a.heic".to_string(),
                "reject  b.txt (unsupported extension)".to_string(),
            ]
        );
    }
}
