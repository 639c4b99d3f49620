//! Error types for the converter module.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that end a conversion attempt.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Source missing, unreadable, or its size could not be determined.
    #[error("Cannot read input file {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Target file could not be created.
    #[error("Cannot create output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Synthetic transient corruption injected mid-stream.
    #[error("Data error while converting {path} at byte {offset}")]
    Data { path: PathBuf, offset: u64 },

    /// I/O error while streaming.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker running the conversion panicked or was aborted.
    #[error("Conversion worker failed: {reason}")]
    Worker { reason: String },

    /// Job was cancelled.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConverterError {
    pub fn input(path: &Path, source: std::io::Error) -> Self {
        Self::Input {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn output(path: &Path, source: std::io::Error) -> Self {
        Self::Output {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this outcome reflects user intent rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether a fresh attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Data { .. } | Self::Io(_))
    }

    /// Short category name, used for metric labels and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::Output { .. } => "output",
            Self::Data { .. } => "data",
            Self::Io(_) => "io",
            Self::Worker { .. } => "worker",
            Self::Cancelled => "cancelled",
        }
    }
}
