use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{JobKey, ManagerMessage};
use crate::converter::{ConversionJob, ConversionResult, Converter, ConverterError};
use crate::document::{ConversionFormat, ConversionState, Document, DocumentEvent};
use crate::metrics;

/// Capacity of the per-job progress channel between converter and forwarder.
const PROGRESS_BUFFER: usize = 32;

struct ActiveJob {
    document: Arc<Document>,
    generation: u64,
    cancel: CancellationToken,
    started_at: Instant,
}

/// Background task that owns every running job and is the only writer of
/// document conversion states.
pub struct ManagerLoop {
    rx: mpsc::Receiver<ManagerMessage>,
    tx: mpsc::WeakSender<ManagerMessage>,
    converter: Arc<dyn Converter>,
    events: broadcast::Sender<DocumentEvent>,
    jobs: HashMap<JobKey, ActiveJob>,
    next_generation: u64,
}

impl ManagerLoop {
    pub(crate) fn new(
        rx: mpsc::Receiver<ManagerMessage>,
        tx: mpsc::WeakSender<ManagerMessage>,
        converter: Arc<dyn Converter>,
        events: broadcast::Sender<DocumentEvent>,
    ) -> Self {
        Self {
            rx,
            tx,
            converter,
            events,
            jobs: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Run the loop until shutdown or until every handle is dropped.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(converter = self.converter.name(), "Conversion manager started");

        while let Some(message) = self.rx.recv().await {
            match message {
                ManagerMessage::Start {
                    document,
                    format,
                    reply,
                } => {
                    self.start(document, format);
                    let _ = reply.send(());
                }
                ManagerMessage::Cancel {
                    document,
                    format,
                    reply,
                } => {
                    self.cancel(&document, format);
                    let _ = reply.send(());
                }
                ManagerMessage::CancelAll { document, reply } => {
                    for format in ConversionFormat::ALL {
                        self.cancel(&document, format);
                    }
                    let _ = reply.send(());
                }
                ManagerMessage::ActiveJobs { reply } => {
                    let _ = reply.send(self.jobs.keys().copied().collect());
                }
                ManagerMessage::Progress {
                    key,
                    generation,
                    fraction,
                } => self.on_progress(key, generation, fraction),
                ManagerMessage::Finished {
                    key,
                    generation,
                    outcome,
                } => self.on_finished(key, generation, outcome),
                ManagerMessage::Shutdown { reply } => {
                    self.cancel_everything();
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.cancel_everything();
        info!("Conversion manager shutting down");
    }

    fn start(&mut self, document: Arc<Document>, format: ConversionFormat) {
        let key = JobKey::new(document.id(), format);

        if let Some(previous) = self.jobs.remove(&key) {
            previous.cancel.cancel();
            record_finished(format, "superseded", previous.started_at);
            debug!(job = %key, generation = previous.generation, "Superseded running conversion");
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();

        let input_path = document.source_path().to_path_buf();
        let job = ConversionJob {
            job_id: Uuid::new_v4().to_string(),
            output_path: self.converter.output_path(&input_path, format),
            input_path,
            format,
        };

        info!(
            job = %key,
            job_id = %job.job_id,
            file_name = %document.file_name(),
            "Starting conversion"
        );

        self.apply_state(&document, format, ConversionState::converting(0.0));
        self.spawn_job(key, generation, job, cancel.clone());
        self.jobs.insert(
            key,
            ActiveJob {
                document,
                generation,
                cancel,
                started_at: Instant::now(),
            },
        );

        metrics::CONVERSIONS_STARTED
            .with_label_values(&[format.as_str()])
            .inc();
        metrics::ACTIVE_JOBS.set(self.jobs.len() as i64);
    }

    fn cancel(&mut self, document: &Arc<Document>, format: ConversionFormat) {
        let key = JobKey::new(document.id(), format);

        if let Some(job) = self.jobs.remove(&key) {
            job.cancel.cancel();
            record_finished(format, "cancelled", job.started_at);
            metrics::ACTIVE_JOBS.set(self.jobs.len() as i64);
            info!(job = %key, "Cancelled conversion");
        }

        self.apply_state(document, format, ConversionState::Idle);
    }

    fn cancel_everything(&mut self) {
        for (key, job) in self.jobs.drain() {
            job.cancel.cancel();
            record_finished(key.format, "cancelled", job.started_at);
            apply_state(&self.events, &job.document, key.format, ConversionState::Idle);
        }
        metrics::ACTIVE_JOBS.set(0);
    }

    fn on_progress(&mut self, key: JobKey, generation: u64, fraction: f64) {
        let Some(job) = self.jobs.get(&key).filter(|job| job.generation == generation) else {
            return;
        };
        let document = Arc::clone(&job.document);
        self.apply_state(&document, key.format, ConversionState::converting(fraction));
    }

    fn on_finished(
        &mut self,
        key: JobKey,
        generation: u64,
        outcome: Result<ConversionResult, ConverterError>,
    ) {
        let is_current = self
            .jobs
            .get(&key)
            .is_some_and(|job| job.generation == generation);
        if !is_current {
            debug!(job = %key, generation, "Ignoring outcome of a stale conversion");
            return;
        }
        let Some(job) = self.jobs.remove(&key) else {
            return;
        };
        metrics::ACTIVE_JOBS.set(self.jobs.len() as i64);

        let (state, outcome_label) = match outcome {
            Ok(result) => {
                info!(
                    job = %key,
                    output = %result.output_path.display(),
                    bytes = result.output_size_bytes,
                    duration_ms = result.duration_ms,
                    "Conversion completed"
                );
                (
                    ConversionState::Completed {
                        output_path: result.output_path,
                    },
                    "completed",
                )
            }
            Err(e) if e.is_cancelled() => (ConversionState::Idle, "cancelled"),
            Err(e) => {
                warn!(job = %key, error = %e, kind = e.kind(), "Conversion failed");
                (
                    ConversionState::Failed {
                        message: e.to_string(),
                    },
                    "failed",
                )
            }
        };

        record_finished(key.format, outcome_label, job.started_at);
        self.apply_state(&job.document, key.format, state);
    }

    /// Runs the converter on its own task and relays its progress and outcome
    /// back to the loop, tagged with `generation`.
    fn spawn_job(
        &self,
        key: JobKey,
        generation: u64,
        job: ConversionJob,
        cancel: CancellationToken,
    ) {
        let converter = Arc::clone(&self.converter);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::channel(PROGRESS_BUFFER);
            let worker = tokio::spawn(async move {
                converter
                    .convert_with_progress(job, progress_tx, cancel)
                    .await
            });

            while let Some(progress) = progress_rx.recv().await {
                let message = ManagerMessage::Progress {
                    key,
                    generation,
                    fraction: progress.fraction(),
                };
                if !forward(&tx, message).await {
                    break;
                }
            }
            drop(progress_rx);

            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => Err(ConverterError::Worker {
                    reason: e.to_string(),
                }),
            };

            forward(
                &tx,
                ManagerMessage::Finished {
                    key,
                    generation,
                    outcome,
                },
            )
            .await;
        });
    }

    fn apply_state(&self, document: &Document, format: ConversionFormat, state: ConversionState) {
        apply_state(&self.events, document, format, state);
    }
}

/// Sets the state and publishes an event if it changed.
fn apply_state(
    events: &broadcast::Sender<DocumentEvent>,
    document: &Document,
    format: ConversionFormat,
    state: ConversionState,
) {
    if document.set_state(format, state.clone()) {
        let _ = events.send(DocumentEvent::state_changed(document.id(), format, state));
    }
}

/// Sends to the loop if it is still running.
async fn forward(tx: &mpsc::WeakSender<ManagerMessage>, message: ManagerMessage) -> bool {
    match tx.upgrade() {
        Some(tx) => tx.send(message).await.is_ok(),
        None => false,
    }
}

fn record_finished(format: ConversionFormat, outcome: &str, started_at: Instant) {
    metrics::CONVERSIONS_FINISHED
        .with_label_values(&[format.as_str(), outcome])
        .inc();
    metrics::CONVERSION_DURATION
        .with_label_values(&[format.as_str(), outcome])
        .observe(started_at.elapsed().as_secs_f64());
}
