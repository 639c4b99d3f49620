//! File system store implementation.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use super::error::StorageError;
use super::traits::{FileStore, StoredFile};

/// File system based store.
///
/// Copies are named `{uuid}_{original name}` so repeated imports of the same
/// file never collide.
#[derive(Debug, Default, Clone)]
pub struct FsFileStore;

impl FsFileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn copy(&self, source: &Path, destination_dir: &Path) -> Result<StoredFile, StorageError> {
        let display_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::InvalidSource {
                path: source.to_path_buf(),
            })?;

        match fs::metadata(source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StorageError::InvalidSource {
                    path: source.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::SourceNotFound {
                    path: source.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(StorageError::copy_failed(
                    source.to_path_buf(),
                    destination_dir.to_path_buf(),
                    e,
                ))
            }
        }

        fs::create_dir_all(destination_dir)
            .await
            .map_err(|e| StorageError::DirectoryCreationFailed {
                path: destination_dir.to_path_buf(),
                source: e,
            })?;

        let destination = destination_dir.join(format!("{}_{}", Uuid::new_v4(), display_name));
        let size_bytes = fs::copy(source, &destination).await.map_err(|e| {
            StorageError::copy_failed(source.to_path_buf(), destination.clone(), e)
        })?;

        debug!(
            source = %source.display(),
            destination = %destination.display(),
            size_bytes,
            "Copied file into storage"
        );

        Ok(StoredFile {
            display_name,
            path: destination,
            size_bytes,
        })
    }

    async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed file from storage");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}
