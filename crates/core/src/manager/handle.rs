use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::runner::ManagerLoop;
use super::types::{JobKey, ManagerMessage};
use super::ManagerError;
use crate::converter::Converter;
use crate::document::{ConversionFormat, Document, DocumentEvent};

/// Default capacity of the request channel.
pub const DEFAULT_REQUEST_BUFFER: usize = 256;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Handle for driving conversions.
///
/// This is cheaply cloneable and can be shared across tasks. Every request
/// resolves after the manager loop has applied it, so the document already
/// shows the resulting state when the call returns.
#[derive(Clone)]
pub struct ConversionManager {
    tx: mpsc::Sender<ManagerMessage>,
    events: broadcast::Sender<DocumentEvent>,
}

impl ConversionManager {
    pub(crate) fn new(
        tx: mpsc::Sender<ManagerMessage>,
        events: broadcast::Sender<DocumentEvent>,
    ) -> Self {
        Self { tx, events }
    }

    /// Create the manager and spawn its loop on the current runtime.
    pub fn spawn(converter: Arc<dyn Converter>) -> (Self, JoinHandle<()>) {
        let (manager, runner) = create_conversion_manager(converter, DEFAULT_REQUEST_BUFFER);
        let handle = tokio::spawn(runner.run());
        (manager, handle)
    }

    /// Start converting `document` into `format`.
    ///
    /// Any job already running for the same document and format is cancelled
    /// and superseded. The state is `Converting { progress: 0.0 }` on return.
    pub async fn start_conversion(
        &self,
        document: &Arc<Document>,
        format: ConversionFormat,
    ) -> Result<(), ManagerError> {
        self.request(|reply| ManagerMessage::Start {
            document: Arc::clone(document),
            format,
            reply,
        })
        .await
    }

    /// Cancel the job for `document` and `format`, if any. The state is
    /// `Idle` on return regardless of what it was before.
    pub async fn cancel_conversion(
        &self,
        document: &Arc<Document>,
        format: ConversionFormat,
    ) -> Result<(), ManagerError> {
        self.request(|reply| ManagerMessage::Cancel {
            document: Arc::clone(document),
            format,
            reply,
        })
        .await
    }

    /// Cancel every format of `document`.
    pub async fn cancel_all_conversions(&self, document: &Arc<Document>) -> Result<(), ManagerError> {
        self.request(|reply| ManagerMessage::CancelAll {
            document: Arc::clone(document),
            reply,
        })
        .await
    }

    /// Keys of the jobs currently running.
    pub async fn active_jobs(&self) -> Result<Vec<JobKey>, ManagerError> {
        self.request(|reply| ManagerMessage::ActiveJobs { reply }).await
    }

    /// Cancel all running jobs and stop the loop.
    pub async fn shutdown(&self) -> Result<(), ManagerError> {
        self.request(|reply| ManagerMessage::Shutdown { reply }).await
    }

    /// Subscribe to document events.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    /// Publish an event to all subscribers. Dropped if nobody listens.
    pub fn publish(&self, event: DocumentEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ManagerMessage,
    ) -> Result<T, ManagerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ManagerError::Stopped)?;
        rx.await.map_err(|_| ManagerError::Stopped)
    }
}

/// Create a complete conversion manager
///
/// Returns:
/// - `ConversionManager` - for issuing requests (clone this to share across tasks)
/// - `ManagerLoop` - spawn this as a background task with `tokio::spawn(runner.run())`
///
/// The loop stops when it receives a shutdown request or when every
/// `ConversionManager` clone has been dropped.
pub fn create_conversion_manager(
    converter: Arc<dyn Converter>,
    buffer_size: usize,
) -> (ConversionManager, ManagerLoop) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let (events, _) = broadcast::channel(DEFAULT_EVENT_BUFFER);
    let runner = ManagerLoop::new(rx, tx.downgrade(), converter, events.clone());
    (ConversionManager::new(tx, events), runner)
}
