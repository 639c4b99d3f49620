//! On-disk representation of the document list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::document::{ConversionFormat, ConversionState, ConversionStates, Document, DocumentId};

/// One format's state as a type tag plus the payload that tag needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl CachedState {
    fn tag(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            progress: None,
            message: None,
            output_path: None,
        }
    }

    /// Decodes the state, or `None` if the tag is unknown or its payload is missing.
    pub fn to_state(&self) -> Option<ConversionState> {
        match self.kind.as_str() {
            "idle" => Some(ConversionState::Idle),
            "converting" => self.progress.map(ConversionState::converting),
            "completed" => self
                .output_path
                .clone()
                .map(|output_path| ConversionState::Completed { output_path }),
            "failed" => self
                .message
                .clone()
                .map(|message| ConversionState::Failed { message }),
            _ => None,
        }
    }
}

impl From<&ConversionState> for CachedState {
    fn from(state: &ConversionState) -> Self {
        let mut cached = Self::tag(state.state_type());
        match state {
            ConversionState::Idle => {}
            ConversionState::Converting { progress } => cached.progress = Some(*progress),
            ConversionState::Completed { output_path } => {
                cached.output_path = Some(output_path.clone())
            }
            ConversionState::Failed { message } => cached.message = Some(message.clone()),
        }
        cached
    }
}

/// One document as stored in the cache file.
///
/// Only the final path component of the source is stored; the absolute path
/// is rebuilt from the documents directory on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDocument {
    pub id: DocumentId,
    pub display_name: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_states")]
    pub conversion_states: BTreeMap<String, CachedState>,
}

impl CachedDocument {
    pub fn from_document(document: &Document) -> Self {
        let file_name = document
            .source_path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id: document.id(),
            display_name: document.file_name().to_string(),
            file_name,
            file_size: document.file_size(),
            imported_at: Some(document.imported_at()),
            conversion_states: document
                .states()
                .iter()
                .map(|(format, state)| (format.as_str().to_string(), CachedState::from(state)))
                .collect(),
        }
    }

    /// Rebuilds the document under `documents_dir`.
    ///
    /// Returns `None` when the stored file name is not a plain file name or
    /// the file no longer exists. Unknown formats and undecodable states are
    /// skipped; those formats start idle. No job survives a restart, so a
    /// stored `converting` state also comes back idle.
    pub fn to_document(&self, documents_dir: &Path) -> Option<Document> {
        if Path::new(&self.file_name).file_name() != Some(OsStr::new(&self.file_name)) {
            debug!(id = %self.id, file_name = %self.file_name, "Dropping cached document with invalid file name");
            return None;
        }

        let source_path = documents_dir.join(&self.file_name);
        let metadata = match std::fs::metadata(&source_path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                debug!(id = %self.id, path = %source_path.display(), "Dropping cached document whose file is gone");
                return None;
            }
        };

        let states = ConversionStates::from_entries(self.conversion_states.iter().filter_map(
            |(key, cached)| {
                let format = key.parse::<ConversionFormat>().ok()?;
                let state = match cached.to_state()? {
                    ConversionState::Converting { .. } => ConversionState::Idle,
                    state => state,
                };
                Some((format, state))
            },
        ));

        let mut document = Document::new(source_path, self.display_name.clone())
            .with_id(self.id)
            .with_file_size(metadata.len())
            .with_states(states);
        if let Some(imported_at) = self.imported_at {
            document = document.with_imported_at(imported_at);
        }
        Some(document)
    }
}

/// Keeps the entries that decode as a `CachedState`; drops the rest.
fn lenient_states<'de, D>(deserializer: D) -> Result<BTreeMap<String, CachedState>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| {
            serde_json::from_value::<CachedState>(value)
                .ok()
                .map(|state| (key, state))
        })
        .collect())
}
