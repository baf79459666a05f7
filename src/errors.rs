use std::path::PathBuf;
use thiserror::Error;

/// Boxed error source carried by the variants that wrap foreign errors.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while turning one input file into a cropped cutout.
///
/// Each variant names the stage that failed so the batch driver can report
/// the failure next to the file it belongs to and keep going.
#[derive(Error, Debug)]
pub enum CutoutError {
    #[error("Input {kind} does not exist: {path:?}")]
    MissingInput { path: PathBuf, kind: InputKind },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Background removal failed for {path:?}")]
    Segmentation {
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },

    #[error("Could not decode the cutout of {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Could not save {path:?}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxedSource,
    },
}

/// What kind of input path was expected when reporting `MissingInput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    File,
    Directory,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CutoutError>;

impl CutoutError {
    /// Attributes a remover failure to the file it was working on.
    ///
    /// Removers only see bytes, so a `Segmentation` they return carries a
    /// placeholder path that is replaced here.
    pub fn segmentation(path: impl Into<PathBuf>, source: CutoutError) -> Self {
        match source {
            Self::Segmentation { source, .. } => Self::Segmentation {
                path: path.into(),
                source,
            },
            other => Self::Segmentation {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Segmentation failure raised by a remover before the file is known.
    pub fn segmentation_in_memory(source: impl Into<BoxedSource>) -> Self {
        Self::Segmentation {
            path: PathBuf::from("<memory>"),
            source: source.into(),
        }
    }

    pub fn model(operation: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Call sites that know the path construct `CutoutError::FileSystem`
/// directly; this is the fallback for the rest.
impl From<std::io::Error> for CutoutError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Image errors without a known file are treated as decode failures.
impl From<image::ImageError> for CutoutError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode {
            path: PathBuf::from("unknown"),
            source: err,
        }
    }
}

impl From<ort::Error> for CutoutError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort 処理", err)
    }
}

/// Shape errors come out of tensor reshaping around inference, so they are
/// reported as model errors.
impl From<ndarray::ShapeError> for CutoutError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("テンソル形状変換", err)
    }
}
