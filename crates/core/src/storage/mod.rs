//! Managed file storage.
//!
//! Picked files are copied into the documents directory before they become
//! documents, and removed from it when a document is deleted.

mod error;
mod fs_store;
mod traits;

pub use error::StorageError;
pub use fs_store::FsFileStore;
pub use traits::{FileStore, StoredFile};
