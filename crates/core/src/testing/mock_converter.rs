//! Mock converter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::converter::{
    ConversionJob, ConversionProgress, ConversionResult, Converter, ConverterError,
};

/// How a recorded conversion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// How the conversion ended.
    pub outcome: RecordedOutcome,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track started and finished jobs for assertions
/// - Simulate failures with a queued error
/// - Control duration and number of progress steps
/// - Observe cancellation between steps
///
/// # Example
///
/// ```rust,ignore
/// use convertino_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_conversion_duration(Duration::from_millis(50)).await;
///
/// let result = converter.convert(job).await?;
///
/// let conversions = converter.recorded_conversions().await;
/// assert_eq!(conversions.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    /// Jobs in the order they were started.
    started: Arc<RwLock<Vec<ConversionJob>>>,
    /// Finished conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next conversion to finish will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
    /// Number of progress updates per conversion.
    progress_steps: Arc<RwLock<u64>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            started: Arc::new(RwLock::new(Vec::new())),
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            conversion_duration_ms: Arc::new(RwLock::new(100)),
            progress_steps: Arc::new(RwLock::new(5)),
        }
    }

    /// Get all finished conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get every job that was started, finished or not.
    pub async fn started_jobs(&self) -> Vec<ConversionJob> {
        self.started.read().await.clone()
    }

    /// Clear recorded jobs.
    pub async fn clear_recorded(&self) {
        self.started.write().await.clear();
        self.conversions.write().await.clear();
    }

    /// Get the number of finished conversions.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Set how many progress updates each conversion emits.
    pub async fn set_progress_steps(&self, steps: u64) {
        *self.progress_steps.write().await = steps;
    }

    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, job: ConversionJob, outcome: RecordedOutcome) {
        self.conversions
            .write()
            .await
            .push(RecordedConversion { job, outcome });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        self.started.write().await.push(job.clone());

        let duration_ms = *self.conversion_duration_ms.read().await;
        let steps = *self.progress_steps.read().await;
        let step_duration = Duration::from_millis(duration_ms / steps.max(1));

        for i in 0..steps {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.record(job, RecordedOutcome::Cancelled).await;
                    return Err(ConverterError::Cancelled);
                }
                _ = tokio::time::sleep(step_duration) => {}
            }

            let _ = progress_tx
                .send(ConversionProgress {
                    job_id: job.job_id.clone(),
                    bytes_written: i + 1,
                    total_bytes: steps,
                })
                .await;
        }

        if cancel.is_cancelled() {
            self.record(job, RecordedOutcome::Cancelled).await;
            return Err(ConverterError::Cancelled);
        }

        if let Some(err) = self.take_error().await {
            self.record(job, RecordedOutcome::Failed).await;
            return Err(err);
        }

        self.record(job.clone(), RecordedOutcome::Completed).await;

        Ok(ConversionResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: steps,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ConversionFormat;

    fn create_test_job(id: &str) -> ConversionJob {
        ConversionJob::new(id, "/input/part.shapr", ConversionFormat::Stl)
    }

    #[tokio::test]
    async fn test_basic_conversion() {
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;

        let result = converter.convert(create_test_job("test-1")).await.unwrap();

        assert_eq!(result.job_id, "test-1");
        assert_eq!(result.output_path.to_str(), Some("/input/part.stl"));
    }

    #[tokio::test]
    async fn test_progress_updates() {
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;
        converter.set_progress_steps(4).await;
        let (tx, mut rx) = mpsc::channel(10);

        converter
            .convert_with_progress(create_test_job("p"), tx, CancellationToken::new())
            .await
            .unwrap();

        let mut fractions = Vec::new();
        while let Ok(update) = rx.try_recv() {
            fractions.push(update.fraction());
        }
        assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[tokio::test]
    async fn test_recorded_conversions() {
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;

        converter.convert(create_test_job("job-1")).await.unwrap();
        converter.convert(create_test_job("job-2")).await.unwrap();

        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 2);
        assert_eq!(conversions[0].outcome, RecordedOutcome::Completed);
        assert_eq!(conversions[0].job.job_id, "job-1");
        assert_eq!(converter.started_jobs().await.len(), 2);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;
        converter
            .set_next_error(ConverterError::Worker {
                reason: "test error".to_string(),
            })
            .await;

        let result = converter.convert(create_test_job("fail")).await;
        assert!(result.is_err());

        // Error should be consumed
        assert!(converter.convert(create_test_job("ok")).await.is_ok());
        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions[0].outcome, RecordedOutcome::Failed);
        assert_eq!(conversions[1].outcome, RecordedOutcome::Completed);
    }

    #[tokio::test]
    async fn test_cleared_error_is_not_injected() {
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;
        converter
            .set_next_error(ConverterError::Worker {
                reason: "test error".to_string(),
            })
            .await;
        converter.clear_next_error().await;

        assert!(converter.convert(create_test_job("ok")).await.is_ok());
        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions[0].outcome, RecordedOutcome::Completed);
    }

    #[tokio::test]
    async fn test_clear_recorded_forgets_jobs() {
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;
        converter.convert(create_test_job("first")).await.unwrap();
        assert_eq!(converter.started_jobs().await.len(), 1);

        converter.clear_recorded().await;
        assert!(converter.started_jobs().await.is_empty());
        assert_eq!(converter.conversion_count().await, 0);

        converter.convert(create_test_job("second")).await.unwrap();
        let started = converter.started_jobs().await;
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].job_id, "second");
    }

    #[tokio::test]
    async fn test_cancellation_is_observed() {
        let converter = Arc::new(MockConverter::new());
        converter.set_conversion_duration(Duration::from_secs(10)).await;
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(10);

        let task = {
            let converter = Arc::clone(&converter);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                converter
                    .convert_with_progress(create_test_job("c"), tx, cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions[0].outcome, RecordedOutcome::Cancelled);
    }
}
