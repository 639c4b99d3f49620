//! Source file selection.
//!
//! A picker turns a selection surface into source paths for new documents.
//! The only implementation here, [`PathListPicker`], filters a list of
//! candidate paths supplied by the caller (for example an HTTP request body).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::PickerConfig;

/// Constraints for one pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    /// The single accepted input extension, without the leading dot.
    pub allowed_extension: String,
    /// Whether more than one file may be chosen.
    pub allow_multiple: bool,
}

impl PickRequest {
    pub fn new(allowed_extension: impl Into<String>, allow_multiple: bool) -> Self {
        Self {
            allowed_extension: allowed_extension.into(),
            allow_multiple,
        }
    }

    /// Whether `path` carries the allowed extension (case-insensitive).
    pub fn matches_extension(&self, path: &Path) -> bool {
        let wanted = self.allowed_extension.trim_start_matches('.');
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
    }
}

impl From<&PickerConfig> for PickRequest {
    fn from(config: &PickerConfig) -> Self {
        Self::new(config.allowed_extension.clone(), config.allow_multiple)
    }
}

/// Produces source locations for new documents.
#[async_trait]
pub trait DocumentPicker: Send + Sync {
    /// Returns the chosen source paths; empty when nothing was chosen.
    async fn pick(&self, request: &PickRequest) -> Vec<PathBuf>;
}

/// Picker over a fixed list of candidate paths.
#[derive(Debug, Clone, Default)]
pub struct PathListPicker {
    candidates: Vec<PathBuf>,
}

impl PathListPicker {
    pub fn new(candidates: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl DocumentPicker for PathListPicker {
    async fn pick(&self, request: &PickRequest) -> Vec<PathBuf> {
        let matching = self
            .candidates
            .iter()
            .filter(|path| request.matches_extension(path))
            .cloned();

        if request.allow_multiple {
            matching.collect()
        } else {
            matching.take(1).collect()
        }
    }
}
