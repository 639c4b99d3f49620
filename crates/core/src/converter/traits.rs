//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::ConverterError;
use super::types::{output_path_for, ConversionJob, ConversionProgress, ConversionResult};
use crate::document::ConversionFormat;

/// A converter that streams a source file into a target format.
///
/// Implementations must produce exactly one outcome per call: `Ok` on success,
/// `Err(ConverterError::Cancelled)` once `cancel` is observed, or another error.
/// Every progress update is sent before the call returns.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Where the output for `input` in `format` will be written.
    fn output_path(&self, input: &Path, format: ConversionFormat) -> PathBuf {
        output_path_for(input, format)
    }

    /// Converts a file with progress reporting and cooperative cancellation.
    ///
    /// If the progress receiver is dropped, conversion continues without reporting.
    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError>;

    /// Converts a file without progress reporting or cancellation.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        let (progress_tx, progress_rx) = mpsc::channel(1);
        drop(progress_rx);
        self.convert_with_progress(job, progress_tx, CancellationToken::new())
            .await
    }
}
