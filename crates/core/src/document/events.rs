//! Events published for every observable document change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ConversionFormat, ConversionState, DocumentId};

/// A change in the document collection or in one (document, format) state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEvent {
    /// A per-format state changed.
    StateChanged {
        document_id: DocumentId,
        format: ConversionFormat,
        state: ConversionState,
        timestamp: DateTime<Utc>,
    },
    /// A document was imported.
    DocumentAdded {
        document_id: DocumentId,
        file_name: String,
        timestamp: DateTime<Utc>,
    },
    /// A document was deleted.
    DocumentRemoved {
        document_id: DocumentId,
        timestamp: DateTime<Utc>,
    },
}

impl DocumentEvent {
    pub fn state_changed(
        document_id: DocumentId,
        format: ConversionFormat,
        state: ConversionState,
    ) -> Self {
        Self::StateChanged {
            document_id,
            format,
            state,
            timestamp: Utc::now(),
        }
    }

    pub fn document_added(document_id: DocumentId, file_name: &str) -> Self {
        Self::DocumentAdded {
            document_id,
            file_name: file_name.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn document_removed(document_id: DocumentId) -> Self {
        Self::DocumentRemoved {
            document_id,
            timestamp: Utc::now(),
        }
    }

    /// The document this event concerns.
    pub fn document_id(&self) -> DocumentId {
        match self {
            Self::StateChanged { document_id, .. }
            | Self::DocumentAdded { document_id, .. }
            | Self::DocumentRemoved { document_id, .. } => *document_id,
        }
    }

    /// Short type name, used for metric labels.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::DocumentAdded { .. } => "document_added",
            Self::DocumentRemoved { .. } => "document_removed",
        }
    }

    /// True if this event moved a format into `completed` or `failed`.
    pub fn is_terminal_state(&self) -> bool {
        matches!(self, Self::StateChanged { state, .. } if state.is_terminal())
    }
}
