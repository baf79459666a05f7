use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::cropper::CropRequest;
use crate::errors::{CutoutError, InputKind, Result};

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub mode: Mode,

    /// Pixels of margin kept around the subject
    #[arg(short, long, default_value_t = 10)]
    pub padding: u32,

    /// Pad the crop to a square with transparent borders
    #[arg(short = 's', long)]
    pub force_square: bool,

    /// ONNX segmentation model (U²-Net family)
    #[arg(short, long)]
    pub model_path: PathBuf,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Process one image
    Single {
        input: PathBuf,

        /// Defaults to `<input stem>-cutout.png` next to the input
        output: Option<PathBuf>,
    },
    /// Process every supported image in a directory
    Batch {
        input_dir: PathBuf,

        #[arg(default_value = "output")]
        output_dir: PathBuf,

        /// Also process images in subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
}

impl Config {
    pub const fn crop_request(&self) -> CropRequest {
        CropRequest::new(self.padding, self.force_square)
    }

    /// Whether batch mode should walk subdirectories.
    pub const fn recursive(&self) -> bool {
        matches!(self.mode, Mode::Batch { recursive: true, .. })
    }
}

impl Mode {
    /// Fails with `MissingInput` when the input file or directory is absent.
    pub fn check_input(&self) -> Result<()> {
        match self {
            Self::Single { input, .. } if !input.is_file() => Err(CutoutError::MissingInput {
                path: input.clone(),
                kind: InputKind::File,
            }),
            Self::Batch { input_dir, .. } if !input_dir.is_dir() => {
                Err(CutoutError::MissingInput {
                    path: input_dir.clone(),
                    kind: InputKind::Directory,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Output path for single mode when none is given.
pub fn default_single_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}-cutout.png"))
}
