pub mod config;
pub mod cropper;
pub mod errors;
pub mod imageops_ai;
pub mod mocks;
pub mod model;
pub mod progress_tracker;
pub mod traits;

#[cfg(test)]
mod test_support;

use image::ImageFormat;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub use config::{Config, Mode};
pub use cropper::{compute_bounding_box, crop, crop_with_outcome, CropOutcome, CropRequest};
pub use errors::{CutoutError, InputKind, Result};
pub use imageops_ai::BoundingBox;
pub use mocks::MockRemover;
pub use model::OnnxRemover;
pub use progress_tracker::{BatchSummary, FileOutcome};
pub use traits::BackgroundRemover;

use progress_tracker::ProgressTracker;

/// Extensions picked up in batch mode, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

pub fn is_supported_image_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Runs background removal and cropping over single files or directories.
///
/// Files are processed one after another; each is read, cut out, cropped and
/// written before the next one starts.
pub struct CutoutProcessor<R: BackgroundRemover> {
    remover: R,
    request: CropRequest,
    recursive: bool,
}

impl<R: BackgroundRemover> CutoutProcessor<R> {
    pub const fn new(remover: R, request: CropRequest) -> Self {
        Self {
            remover,
            request,
            recursive: false,
        }
    }

    pub fn from_config(remover: R, config: &Config) -> Self {
        Self::new(remover, config.crop_request()).with_recursive(config.recursive())
    }

    pub const fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub const fn request(&self) -> CropRequest {
        self.request
    }

    /// Processes one file. Failures are returned, not logged; reporting them
    /// is up to the caller.
    pub fn process_single(&self, input: &Path, output: &Path) -> Result<FileOutcome> {
        if !input.is_file() {
            return Err(CutoutError::MissingInput {
                path: input.to_path_buf(),
                kind: InputKind::File,
            });
        }

        let outcome = self.process_file(input, output)?;
        info!("processed: {} -> {}", input.display(), output.display());
        Ok(outcome)
    }

    /// Processes every supported image in `input_dir`, writing PNGs with the
    /// same relative path into `output_dir`.
    ///
    /// Only a missing input directory or an unwritable output directory is an
    /// error; per-file failures are collected in the returned summary.
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchSummary> {
        if !input_dir.is_dir() {
            return Err(CutoutError::MissingInput {
                path: input_dir.to_path_buf(),
                kind: InputKind::Directory,
            });
        }

        fs::create_dir_all(output_dir).map_err(|e| CutoutError::FileSystem {
            path: output_dir.to_path_buf(),
            operation: "creating output directory".to_string(),
            source: e,
        })?;

        let image_files = self.collect_image_files(input_dir);
        if image_files.is_empty() {
            info!("no supported images found in {}", input_dir.display());
            return Ok(BatchSummary::default());
        }
        info!(
            count = image_files.len(),
            "processing images from {}",
            input_dir.display()
        );

        let mut tracker = ProgressTracker::new(image_files.len());
        let mut written = HashSet::new();
        for input_file in &image_files {
            let result = output_path_for(input_dir, output_dir, input_file).and_then(|output_file| {
                if !written.insert(output_file.clone()) {
                    // a.jpg と a.png は同じ a.png に出力される（後のファイルが上書き）
                    tracker.suspend(|| {
                        warn!(
                            "{} overwrites an earlier output at {}",
                            input_file.display(),
                            output_file.display()
                        )
                    });
                }
                self.process_file(input_file, &output_file)
            });
            tracker.record(input_file, result);
        }

        Ok(tracker.finish())
    }

    /// Read, remove the background, crop, and save one image as PNG.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<FileOutcome> {
        let bytes = fs::read(input).map_err(|e| CutoutError::FileSystem {
            path: input.to_path_buf(),
            operation: "reading input".to_string(),
            source: e,
        })?;

        let removed = self
            .remover
            .remove(&bytes)
            .map_err(|e| CutoutError::segmentation(input, e))?;
        drop(bytes);

        let image = image::load_from_memory(&removed)
            .map_err(|e| CutoutError::Decode {
                path: input.to_path_buf(),
                source: e,
            })?
            .into_rgba8();
        debug!(
            width = image.width(),
            height = image.height(),
            "background removed from {}",
            input.display()
        );

        let outcome = crop_with_outcome(&image, self.request);
        let subject_found = outcome.subject_found();

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CutoutError::FileSystem {
                path: parent.to_path_buf(),
                operation: "creating output directory".to_string(),
                source: e,
            })?;
        }

        outcome
            .image()
            .save_with_format(output, ImageFormat::Png)
            .map_err(|e| CutoutError::Encoding {
                path: output.to_path_buf(),
                source: e,
            })?;

        Ok(FileOutcome {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            subject_found,
        })
    }

    fn collect_image_files(&self, input_dir: &Path) -> Vec<PathBuf> {
        let walker = WalkDir::new(input_dir).min_depth(1).sort_by_file_name();
        let walker = if self.recursive {
            walker
        } else {
            walker.max_depth(1)
        };

        walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_supported_image_format(path))
            .collect()
    }
}

/// `input_file` relocated from `input_dir` into `output_dir`, with a `.png` extension.
pub fn output_path_for(input_dir: &Path, output_dir: &Path, input_file: &Path) -> Result<PathBuf> {
    input_file
        .strip_prefix(input_dir)
        .map(|relative| output_dir.join(relative).with_extension("png"))
        .map_err(|_| CutoutError::FileSystem {
            path: input_file.to_path_buf(),
            operation: "resolving relative path".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "input file is not inside the input directory",
            ),
        })
}
