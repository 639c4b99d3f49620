use thiserror::Error;

use crate::document::DocumentId;
use crate::manager::ManagerError;

/// Errors surfaced by [`super::DocumentLibrary`].
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error(transparent)]
    Manager(#[from] ManagerError),
}
