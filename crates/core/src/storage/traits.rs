//! Trait definitions for the storage module.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::error::StorageError;

/// A file copied into managed storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    /// The original file name, for display.
    pub display_name: String,
    /// Where the copy now lives.
    pub path: PathBuf,
    /// Size of the copy.
    pub size_bytes: u64,
}

/// Copies picked files into managed storage and removes them again.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Copies `source` into `destination_dir` under a collision-free name.
    async fn copy(&self, source: &Path, destination_dir: &Path) -> Result<StoredFile, StorageError>;

    /// Removes a managed file. Removing a file that does not exist succeeds.
    async fn remove(&self, path: &Path) -> Result<(), StorageError>;
}
