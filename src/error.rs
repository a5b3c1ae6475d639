use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::ItemName;

/// Errors produced while enumerating, indexing or decoding IR datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// I/O error while reading a dataset file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A dataset was configured without any include patterns.
    #[error("dataset '{dataset}' declares no include patterns")]
    NoPatterns {
        /// Display name of the misconfigured dataset.
        dataset: String,
    },

    /// An include or exclude pattern is not valid glob syntax.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        source: glob::PatternError,
    },

    /// A dataset root path contains non-UTF-8 components and cannot be
    /// turned into a glob pattern.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// `get_ir` was called with a name that is absent from the index.
    #[error("no IR named {name} in this dataset")]
    UnknownItem {
        /// The name that failed to resolve.
        name: ItemName,
    },

    /// A decoded buffer is not of shape (channels, samples).
    #[error("shape should be (channels, samples) but is {shape:?}")]
    BadShape {
        /// The offending shape.
        shape: Vec<usize>,
    },

    /// A file has an extension no format adapter understands.
    #[error("unsupported file format: {path}")]
    UnsupportedFormat {
        /// The path with the unrecognized extension.
        path: PathBuf,
    },

    /// An audio container failed to parse or decode.
    #[error("invalid audio file {path}: {reason}")]
    Audio {
        /// The path to the invalid audio file.
        path: PathBuf,
        /// Decoder error text.
        reason: String,
    },

    /// A container file is structurally broken (truncated, wrong
    /// dimensions, size not divisible by the element width, ...).
    #[error("malformed file {path}: {reason}")]
    Malformed {
        /// The path to the malformed file.
        path: PathBuf,
        /// What exactly is wrong with it.
        reason: String,
    },

    /// A container is missing a variable or field the adapter expects.
    #[error("{path} has no variable '{variable}'")]
    MissingVariable {
        /// The container path.
        path: PathBuf,
        /// The expected variable or struct field.
        variable: String,
    },

    /// An optional decoding backend was compiled out.
    #[error("{what} requires the `{feature}` cargo feature (system libhdf5)")]
    MissingFeature {
        /// What was attempted.
        what: &'static str,
        /// The cargo feature that provides it.
        feature: &'static str,
    },

    /// HDF5 backend error (SOFA containers).
    #[cfg(feature = "sofa")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl DatasetError {
    /// Creates an I/O error tagged with the path it occurred on.
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A specialized `Result` for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
