//! The active document list and the operations that change it.
//!
//! [`DocumentLibrary`] ties together managed file storage, the document
//! cache and the conversion manager. Collaborator failures (copy, remove,
//! cache writes) are logged and absorbed; only unknown documents and a
//! stopped manager are reported to callers.

mod error;
mod service;

pub use error::LibraryError;
pub use service::DocumentLibrary;
