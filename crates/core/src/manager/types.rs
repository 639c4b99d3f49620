use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::converter::{ConversionResult, ConverterError};
use crate::document::{ConversionFormat, Document, DocumentId};

/// Identifies the single job slot for one format of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct JobKey {
    pub document_id: DocumentId,
    pub format: ConversionFormat,
}

impl JobKey {
    pub fn new(document_id: DocumentId, format: ConversionFormat) -> Self {
        Self {
            document_id,
            format,
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.document_id, self.format)
    }
}

/// Messages processed by the manager loop.
///
/// Requests from handles carry a reply channel that is answered once the
/// mutation has been applied to the document. Job messages are tagged with
/// the generation of the job that produced them.
pub(crate) enum ManagerMessage {
    Start {
        document: Arc<Document>,
        format: ConversionFormat,
        reply: oneshot::Sender<()>,
    },
    Cancel {
        document: Arc<Document>,
        format: ConversionFormat,
        reply: oneshot::Sender<()>,
    },
    CancelAll {
        document: Arc<Document>,
        reply: oneshot::Sender<()>,
    },
    ActiveJobs {
        reply: oneshot::Sender<Vec<JobKey>>,
    },
    Progress {
        key: JobKey,
        generation: u64,
        fraction: f64,
    },
    Finished {
        key: JobKey,
        generation: u64,
        outcome: Result<ConversionResult, ConverterError>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
