//! Streaming byte converter implementation.

use async_trait::async_trait;
use rand::Rng;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{ConversionJob, ConversionProgress, ConversionResult};

/// Converter that streams the source in fixed-size chunks through a
/// reversible byte transform.
///
/// Each call runs on its own blocking worker. After reading each chunk the
/// worker may inject a synthetic [`ConverterError::Data`], sleeps for a random
/// pacing delay and polls the cancellation token before writing the chunk.
///
/// Bytes are streamed into a hidden, job-unique partial file next to the
/// output and renamed into place only on success, so a superseded job can
/// never clobber its successor's output.
pub struct ByteConverter {
    config: ConverterConfig,
}

impl ByteConverter {
    /// Creates a new byte converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }
}

/// Placeholder format transform: bitwise complement of every byte.
///
/// Deterministic, bijective and chunk-independent; applying it twice restores the input.
pub fn transform_chunk(chunk: &mut [u8]) {
    for byte in chunk.iter_mut() {
        *byte = !*byte;
    }
}

/// Runs one conversion to completion on the current (blocking) thread.
fn run_conversion(
    config: &ConverterConfig,
    job: &ConversionJob,
    progress_tx: &mpsc::Sender<ConversionProgress>,
    cancel: &CancellationToken,
) -> Result<ConversionResult, ConverterError> {
    let start = Instant::now();
    let partial_path = job.partial_path();

    let streamed = stream_chunks(config, job, &partial_path, progress_tx, cancel).and_then(
        |bytes_written| {
            fs::rename(&partial_path, &job.output_path)
                .map_err(|e| ConverterError::output(&job.output_path, e))?;
            Ok(bytes_written)
        },
    );

    match streamed {
        Ok(bytes_written) => Ok(ConversionResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: bytes_written,
            duration_ms: start.elapsed().as_millis() as u64,
        }),
        Err(e) => {
            if config.remove_partial_output {
                remove_partial(&partial_path);
            }
            Err(e)
        }
    }
}

/// Streams every chunk into `partial_path`. Returns the number of bytes written.
fn stream_chunks(
    config: &ConverterConfig,
    job: &ConversionJob,
    partial_path: &Path,
    progress_tx: &mpsc::Sender<ConversionProgress>,
    cancel: &CancellationToken,
) -> Result<u64, ConverterError> {
    let total_bytes = fs::metadata(&job.input_path)
        .map_err(|e| ConverterError::input(&job.input_path, e))?
        .len();
    let mut input =
        File::open(&job.input_path).map_err(|e| ConverterError::input(&job.input_path, e))?;

    if job.output_path == job.input_path {
        return Err(ConverterError::output(
            &job.output_path,
            io::Error::new(io::ErrorKind::InvalidInput, "output path equals input path"),
        ));
    }
    let mut output =
        File::create(partial_path).map_err(|e| ConverterError::output(&job.output_path, e))?;

    let mut buffer = vec![0u8; config.buffer_size.max(1)];
    let mut rng = rand::rng();
    let pacing = config.pacing();
    let mut bytes_written = 0u64;

    loop {
        let read = read_chunk(&mut input, &mut buffer)
            .map_err(|e| ConverterError::input(&job.input_path, e))?;
        if read == 0 {
            break;
        }

        // Faults and pacing apply per data chunk, never after the final report
        if config.failure_one_in > 0 && rng.random_ratio(1, config.failure_one_in) {
            return Err(ConverterError::Data {
                path: job.input_path.clone(),
                offset: bytes_written,
            });
        }

        if let Some((min, max)) = pacing {
            let micros = rng.random_range(min.as_micros() as u64..=max.as_micros() as u64);
            thread::sleep(Duration::from_micros(micros));
        }

        if cancel.is_cancelled() {
            debug!(job_id = %job.job_id, bytes_written, "Conversion observed cancellation");
            return Err(ConverterError::Cancelled);
        }

        transform_chunk(&mut buffer[..read]);
        output.write_all(&buffer[..read])?;
        bytes_written += read as u64;

        report(progress_tx, job, bytes_written, total_bytes);
    }

    output.flush()?;

    // An empty source produces no chunks; still report completion.
    if total_bytes == 0 {
        report(progress_tx, job, 0, 0);
    }

    Ok(bytes_written)
}

fn read_chunk(input: &mut File, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match input.read(buffer) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

fn report(
    progress_tx: &mpsc::Sender<ConversionProgress>,
    job: &ConversionJob,
    bytes_written: u64,
    total_bytes: u64,
) {
    // A closed receiver only means nobody is watching
    let _ = progress_tx.blocking_send(ConversionProgress {
        job_id: job.job_id.clone(),
        bytes_written,
        total_bytes,
    });
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}

#[async_trait]
impl Converter for ByteConverter {
    fn name(&self) -> &str {
        "byte"
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        debug!(
            job_id = %job.job_id,
            input = %job.input_path.display(),
            output = %job.output_path.display(),
            "Starting byte conversion"
        );

        let config = self.config.clone();
        tokio::task::spawn_blocking(move || run_conversion(&config, &job, &progress_tx, &cancel))
            .await
            .map_err(|e| ConverterError::Worker {
                reason: e.to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ConversionFormat;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fast_config() -> ConverterConfig {
        ConverterConfig::default()
            .with_buffer_size(1024)
            .without_fault_injection()
            .with_delay_ms(0, 0)
    }

    fn write_source(dir: &TempDir, name: &str, len: usize) -> PathBuf {
        let path = dir.path().join(name);
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        fs::write(&path, data).unwrap();
        path
    }

    fn drain(rx: &mut mpsc::Receiver<ConversionProgress>) -> Vec<ConversionProgress> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    #[test]
    fn test_transform_is_reversible() {
        let original = b"shapr\x00\xff".to_vec();
        let mut data = original.clone();
        transform_chunk(&mut data);
        assert_ne!(data, original);
        transform_chunk(&mut data);
        assert_eq!(data, original);
    }

    #[tokio::test]
    async fn test_convert_writes_complemented_output() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "part.shapr", 3000);
        let converter = ByteConverter::new(fast_config());
        let job = ConversionJob::new("job-1", &source, ConversionFormat::Obj);
        let (tx, mut rx) = mpsc::channel(100);

        let result = converter
            .convert_with_progress(job.clone(), tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.output_path, dir.path().join("part.obj"));
        assert_eq!(result.output_size_bytes, 3000);

        let input = fs::read(&source).unwrap();
        let output = fs::read(&result.output_path).unwrap();
        assert_eq!(output.len(), input.len());
        assert!(input.iter().zip(&output).all(|(a, b)| *b == !*a));
        assert!(!job.partial_path().exists());

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 3);
        let fractions: Vec<f64> = updates.iter().map(|u| u.fraction()).collect();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
        assert_eq!(*fractions.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_convert_empty_file_reports_completion() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "empty.shapr", 0);
        let converter = ByteConverter::new(fast_config());
        let (tx, mut rx) = mpsc::channel(10);

        let result = converter
            .convert_with_progress(
                ConversionJob::new("job-e", &source, ConversionFormat::Stl),
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.output_size_bytes, 0);
        assert!(result.output_path.exists());
        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].fraction(), 1.0);
    }

    #[tokio::test]
    async fn test_missing_input_is_input_error() {
        let dir = TempDir::new().unwrap();
        let converter = ByteConverter::new(fast_config());
        let job = ConversionJob::new("job-m", dir.path().join("missing.shapr"), ConversionFormat::Obj);

        let err = converter.convert(job.clone()).await.unwrap_err();
        assert!(matches!(err, ConverterError::Input { .. }));
        assert!(!job.output_path.exists());
    }

    #[tokio::test]
    async fn test_uncreatable_output_is_output_error() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "part.shapr", 10);
        let converter = ByteConverter::new(fast_config());
        let job = ConversionJob {
            job_id: "job-o".to_string(),
            input_path: source,
            output_path: dir.path().join("no-such-dir").join("part.obj"),
            format: ConversionFormat::Obj,
        };

        let err = converter.convert(job).await.unwrap_err();
        assert!(matches!(err, ConverterError::Output { .. }));
    }

    #[tokio::test]
    async fn test_output_equal_to_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "part.obj", 10);
        let converter = ByteConverter::new(fast_config());
        let job = ConversionJob::new("job-same", &source, ConversionFormat::Obj);

        let err = converter.convert(job).await.unwrap_err();
        assert!(matches!(err, ConverterError::Output { .. }));
        assert_eq!(fs::read(&source).unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_injected_fault_is_data_error_and_never_completes() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "part.shapr", 4096);
        let converter = ByteConverter::new(fast_config().with_failure_one_in(1));
        let job = ConversionJob::new("job-d", &source, ConversionFormat::Step);

        let err = converter.convert(job.clone()).await.unwrap_err();
        assert!(matches!(err, ConverterError::Data { offset: 0, .. }));
        assert!(!job.output_path.exists());
        assert!(!job.partial_path().exists());
    }

    #[tokio::test]
    async fn test_fault_never_follows_final_chunk() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "empty.shapr", 0);
        let converter = ByteConverter::new(fast_config().with_failure_one_in(1));
        let job = ConversionJob::new("job-eof", &source, ConversionFormat::Obj);
        let (tx, mut rx) = mpsc::channel(10);

        let result = converter
            .convert_with_progress(job.clone(), tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.output_size_bytes, 0);
        assert!(job.output_path.exists());
        assert_eq!(drain(&mut rx).last().map(|u| u.fraction()), Some(1.0));
    }

    #[tokio::test]
    async fn test_pre_cancelled_job_reports_cancelled() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "part.shapr", 4096);
        let converter = ByteConverter::new(fast_config());
        let job = ConversionJob::new("job-c", &source, ConversionFormat::Obj);
        let (tx, mut rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = converter
            .convert_with_progress(job.clone(), tx, cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(drain(&mut rx).is_empty());
        assert!(!job.output_path.exists());
    }

    #[tokio::test]
    async fn test_cancel_mid_stream() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "big.shapr", 64 * 1024);
        let converter = ByteConverter::new(fast_config().with_delay_ms(2, 4));
        let job = ConversionJob::new("job-mid", &source, ConversionFormat::Obj);
        let (tx, mut rx) = mpsc::channel(100);
        let cancel = CancellationToken::new();

        let task = {
            let cancel = cancel.clone();
            let job = job.clone();
            tokio::spawn(async move { converter.convert_with_progress(job, tx, cancel).await })
        };

        let first = rx.recv().await.expect("at least one progress update");
        assert!(first.fraction() < 1.0);
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(!job.output_path.exists());
        assert!(!job.partial_path().exists());
    }

    #[tokio::test]
    async fn test_partial_output_kept_when_configured() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "part.shapr", 4096);
        let converter = ByteConverter::new(
            fast_config()
                .with_failure_one_in(1)
                .with_remove_partial_output(false),
        );
        let job = ConversionJob::new("job-k", &source, ConversionFormat::Obj);

        let err = converter.convert(job.clone()).await.unwrap_err();
        assert!(matches!(err, ConverterError::Data { .. }));
        assert!(job.partial_path().exists());
        assert!(!job.output_path.exists());
    }
}
