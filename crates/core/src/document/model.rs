//! The observable document entity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use super::types::{ConversionFormat, ConversionState, ConversionStates, DocumentId};

/// A user-managed source file with independent conversion state per format.
///
/// The per-format states live in a `watch` channel: every mutation is visible
/// to all receivers as soon as the mutating call returns. Only the conversion
/// manager mutates them.
///
/// Equality and hashing use the id alone, never the mutable states.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    source_path: PathBuf,
    file_name: String,
    file_size: Option<u64>,
    imported_at: DateTime<Utc>,
    states: watch::Sender<ConversionStates>,
}

impl Document {
    /// Creates a new document with a fresh id and every format idle.
    pub fn new(source_path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            source_path: source_path.into(),
            file_name: file_name.into(),
            file_size: None,
            imported_at: Utc::now(),
            states: watch::Sender::new(ConversionStates::idle()),
        }
    }

    /// Sets an explicit id (used when restoring from cache).
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }

    /// Sets explicit initial states.
    pub fn with_states(self, states: ConversionStates) -> Self {
        self.states.send_replace(states);
        self
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = Some(file_size);
        self
    }

    pub fn with_imported_at(mut self, imported_at: DateTime<Utc>) -> Self {
        self.imported_at = imported_at;
        self
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Location of the managed source file.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Display name (the name the file had when it was picked).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    pub fn imported_at(&self) -> DateTime<Utc> {
        self.imported_at
    }

    /// Current state for one format.
    pub fn state(&self, format: ConversionFormat) -> ConversionState {
        self.states.borrow().get(format).clone()
    }

    /// Snapshot of all per-format states.
    pub fn states(&self) -> ConversionStates {
        self.states.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConversionStates> {
        self.states.subscribe()
    }

    /// Path of the produced artifact, if `format` has completed.
    pub fn output_path(&self, format: ConversionFormat) -> Option<PathBuf> {
        match self.state(format) {
            ConversionState::Completed { output_path } => Some(output_path),
            _ => None,
        }
    }

    /// Replaces the state for `format`, notifying subscribers if it changed.
    pub(crate) fn set_state(&self, format: ConversionFormat, state: ConversionState) -> bool {
        self.states.send_if_modified(|states| states.set(format, state))
    }

    /// Serializable view of the document.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            id: self.id,
            file_name: self.file_name.clone(),
            source_path: self.source_path.clone(),
            file_size: self.file_size,
            imported_at: self.imported_at,
            states: self.states(),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Point-in-time copy of a document, for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub file_name: String,
    pub source_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub imported_at: DateTime<Utc>,
    pub states: ConversionStates,
}
