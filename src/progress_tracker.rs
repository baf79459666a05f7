use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::errors::CutoutError;

/// A successfully written cutout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    /// `false` when the cutout was fully transparent and written uncropped.
    pub subject_found: bool,
}

/// Per-file results of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<FileOutcome>,
    pub failed: Vec<(PathBuf, CutoutError)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn no_subject_count(&self) -> usize {
        self.succeeded.iter().filter(|o| !o.subject_found).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log_report(&self) {
        info!(
            processed = self.succeeded.len(),
            no_subject = self.no_subject_count(),
            failed = self.failed.len(),
            "batch finished: {} of {} images processed",
            self.succeeded.len(),
            self.total()
        );
        for (path, error) in &self.failed {
            warn!("failed: {}: {error}", path.display());
        }
    }
}

/// プログレスバーとバッチ処理の集計
pub(crate) struct ProgressTracker {
    progress_bar: ProgressBar,
    summary: BatchSummary,
}

impl ProgressTracker {
    pub(crate) fn new(len: usize) -> Self {
        let progress_bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style);

        Self {
            progress_bar,
            summary: BatchSummary::default(),
        }
    }

    pub(crate) fn record(&mut self, input: &Path, result: Result<FileOutcome, CutoutError>) {
        match result {
            Ok(outcome) => {
                self.progress_bar.suspend(|| {
                    info!(
                        "processed: {} -> {}",
                        outcome.input.display(),
                        outcome.output.display()
                    )
                });
                self.summary.succeeded.push(outcome);
            }
            Err(error) => {
                self.progress_bar.suspend(|| {
                    warn!("failed to process {}: {error}", input.display())
                });
                self.summary.failed.push((input.to_path_buf(), error));
            }
        }
        self.progress_bar.inc(1);
    }

    /// Runs `f` with the bar hidden so log lines don't tear it.
    pub(crate) fn suspend<T>(&self, f: impl FnOnce() -> T) -> T {
        self.progress_bar.suspend(f)
    }

    pub(crate) fn finish(self) -> BatchSummary {
        self.progress_bar.finish_and_clear();
        self.summary
    }
}
