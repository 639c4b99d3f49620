//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::document::ConversionFormat;

/// A single conversion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Unique job identifier.
    pub job_id: String,
    /// Source file.
    pub input_path: PathBuf,
    /// Final output location.
    pub output_path: PathBuf,
    /// Requested target format.
    pub format: ConversionFormat,
}

impl ConversionJob {
    /// Creates a job whose output path follows [`output_path_for`].
    pub fn new(job_id: impl Into<String>, input_path: impl Into<PathBuf>, format: ConversionFormat) -> Self {
        let input_path = input_path.into();
        Self {
            job_id: job_id.into(),
            output_path: output_path_for(&input_path, format),
            input_path,
            format,
        }
    }

    /// Where bytes are streamed before the output is finalized.
    pub fn partial_path(&self) -> PathBuf {
        let file_name = self
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.format.extension().to_string());
        self.output_path
            .with_file_name(format!(".{}.{}.part", file_name, self.job_id))
    }
}

/// Progress update emitted once per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Job this update belongs to.
    pub job_id: String,
    /// Cumulative bytes written.
    pub bytes_written: u64,
    /// Total source bytes, measured before streaming started.
    pub total_bytes: u64,
}

impl ConversionProgress {
    /// Fraction of the source written, in `[0.0, 1.0]`. An empty source is complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_written as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub job_id: String,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
}

/// Deterministic output location: the source path with its extension replaced
/// by the format's, in the same directory.
pub fn output_path_for(source: &Path, format: ConversionFormat) -> PathBuf {
    source.with_extension(format.extension())
}
