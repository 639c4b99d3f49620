use convertino_core::{Config, DocumentLibrary, PickRequest};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    library: Arc<DocumentLibrary>,
}

impl AppState {
    pub fn new(config: Config, library: Arc<DocumentLibrary>) -> Self {
        Self { config, library }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> &Arc<DocumentLibrary> {
        &self.library
    }

    /// Constraints applied to paths submitted for import.
    pub fn pick_request(&self) -> PickRequest {
        PickRequest::from(&self.config.picker)
    }
}
