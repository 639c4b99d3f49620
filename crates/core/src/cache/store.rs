use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::CacheError;
use super::types::CachedDocument;
use crate::document::Document;
use crate::metrics;

/// Default name of the cache file inside the documents directory.
pub const CACHE_FILE_NAME: &str = ".documents_cache.json";

/// Reads and writes the JSON document list.
///
/// Saves are fire-and-forget: the snapshot is taken synchronously, the write
/// happens on a background task and failures are only logged. Writes are
/// serialized, and a snapshot older than one already on disk is skipped.
#[derive(Debug, Clone)]
pub struct DocumentCache {
    documents_dir: PathBuf,
    cache_path: PathBuf,
    sequence: Arc<AtomicU64>,
    written: Arc<Mutex<u64>>,
}

impl DocumentCache {
    pub fn new(documents_dir: impl Into<PathBuf>, cache_file_name: &str) -> Self {
        let documents_dir = documents_dir.into();
        Self {
            cache_path: documents_dir.join(cache_file_name),
            documents_dir,
            sequence: Arc::new(AtomicU64::new(0)),
            written: Arc::new(Mutex::new(0)),
        }
    }

    /// Cache with the default file name.
    pub fn in_dir(documents_dir: impl Into<PathBuf>) -> Self {
        Self::new(documents_dir, CACHE_FILE_NAME)
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Encodes the documents as pretty-printed JSON.
    pub fn encode(documents: &[Arc<Document>]) -> Result<Vec<u8>, CacheError> {
        let cached: Vec<CachedDocument> = documents
            .iter()
            .map(|d| CachedDocument::from_document(d))
            .collect();
        Ok(serde_json::to_vec_pretty(&cached)?)
    }

    /// Decodes a cache file, rebuilding source paths under `documents_dir`.
    ///
    /// Malformed documents and documents whose file is gone are skipped.
    /// Fails only if the payload is not a JSON array.
    pub fn decode(bytes: &[u8], documents_dir: &Path) -> Result<Vec<Document>, CacheError> {
        let entries: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
        let total = entries.len();

        let documents: Vec<Document> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<CachedDocument>(entry) {
                Ok(cached) => cached.to_document(documents_dir),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed cached document");
                    None
                }
            })
            .collect();

        if documents.len() < total {
            debug!(
                restored = documents.len(),
                dropped = total - documents.len(),
                "Dropped cached documents"
            );
        }
        Ok(documents)
    }

    /// Reads the cache file. A missing file yields an empty list.
    ///
    /// Decoding stats every source file, so it runs on the blocking pool.
    pub async fn load(&self) -> Result<Vec<Document>, CacheError> {
        let bytes = match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.cache_path, e)),
        };
        let documents_dir = self.documents_dir.clone();
        tokio::task::spawn_blocking(move || Self::decode(&bytes, &documents_dir))
            .await
            .map_err(|e| CacheError::Worker {
                reason: e.to_string(),
            })?
    }

    /// Like [`load`](Self::load), but any error yields an empty list.
    pub async fn restore(&self) -> Vec<Document> {
        match self.load().await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(path = %self.cache_path.display(), error = %e, "Ignoring unreadable document cache");
                Vec::new()
            }
        }
    }

    /// Writes the encoded list, replacing the cache file atomically.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.documents_dir)
            .await
            .map_err(|e| CacheError::io(&self.documents_dir, e))?;

        let mut temp_name = self.cache_path.clone().into_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, bytes)
            .await
            .map_err(|e| CacheError::io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.cache_path)
            .await
            .map_err(|e| CacheError::io(&self.cache_path, e))?;
        Ok(())
    }

    /// Snapshots `documents` now and writes them in the background.
    ///
    /// The returned handle may be awaited (e.g. at shutdown) or dropped.
    pub fn save(&self, documents: &[Arc<Document>]) -> JoinHandle<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let encoded = Self::encode(documents);
        let count = documents.len();
        let cache = self.clone();

        tokio::spawn(async move {
            let bytes = match encoded {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Failed to encode document cache");
                    metrics::CACHE_SAVES.with_label_values(&["failure"]).inc();
                    return;
                }
            };

            let mut written = cache.written.lock().await;
            if *written > sequence {
                metrics::CACHE_SAVES.with_label_values(&["skipped"]).inc();
                return;
            }

            match cache.write(&bytes).await {
                Ok(()) => {
                    *written = sequence;
                    metrics::CACHE_SAVES.with_label_values(&["success"]).inc();
                    debug!(documents = count, path = %cache.cache_path.display(), "Saved document cache");
                }
                Err(e) => {
                    metrics::CACHE_SAVES.with_label_values(&["failure"]).inc();
                    warn!(error = %e, "Failed to save document cache");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ConversionFormat, ConversionState, ConversionStates};
    use tempfile::TempDir;

    fn document_in(dir: &Path, name: &str) -> Arc<Document> {
        let path = dir.join(format!("uuid_{}", name));
        std::fs::write(&path, b"data").unwrap();
        Arc::new(Document::new(path, name))
    }

    #[tokio::test]
    async fn test_missing_cache_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path());
        assert!(cache.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path());
        let first = document_in(dir.path(), "a.shapr");
        let output = dir.path().join("uuid_a.obj");
        let second = Arc::new(
            Document::new(dir.path().join("uuid_b.shapr"), "b.shapr").with_states(
                ConversionStates::from_entries([
                    (ConversionFormat::Obj, ConversionState::Completed { output_path: output.clone() }),
                    (ConversionFormat::Stl, ConversionState::Failed { message: "Data error".to_string() }),
                ]),
            ),
        );
        std::fs::write(second.source_path(), b"data").unwrap();

        cache.save(&[first.clone(), second.clone()]).await.unwrap();

        let restored = cache.load().await.unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].id(), first.id());
        assert_eq!(restored[1].states(), second.states());
        assert_eq!(restored[1].output_path(ConversionFormat::Obj), Some(output));
    }

    #[tokio::test]
    async fn test_cache_stores_file_name_only() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path());
        let document = document_in(dir.path(), "part.shapr");

        cache.save(&[document]).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(cache.cache_path()).unwrap()).unwrap();
        assert_eq!(raw[0]["file_name"], "uuid_part.shapr");
        assert_eq!(raw[0]["display_name"], "part.shapr");
        assert_eq!(raw[0]["conversion_states"]["obj"]["type"], "idle");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_load_resets_interrupted_conversions() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path());
        let document = document_in(dir.path(), "part.shapr");
        document.set_state(ConversionFormat::Step, ConversionState::converting(0.4));

        cache.save(&[document.clone()]).await.unwrap();
        let raw = std::fs::read_to_string(cache.cache_path()).unwrap();
        assert!(raw.contains("\"converting\""));

        let restored = cache.load().await.unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id(), document.id());
        assert_eq!(restored[0].state(ConversionFormat::Step), ConversionState::Idle);
    }

    #[tokio::test]
    async fn test_deleted_file_is_dropped_on_restore() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path());
        let kept = document_in(dir.path(), "kept.shapr");
        let removed = document_in(dir.path(), "removed.shapr");

        cache.save(&[kept.clone(), removed.clone()]).await.unwrap();
        std::fs::remove_file(removed.source_path()).unwrap();

        let restored = cache.restore().await;
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id(), kept.id());
    }

    #[tokio::test]
    async fn test_decode_skips_malformed_documents() {
        let dir = TempDir::new().unwrap();
        let document = document_in(dir.path(), "ok.shapr");
        let mut entries: serde_json::Value =
            serde_json::from_slice(&DocumentCache::encode(&[document]).unwrap()).unwrap();
        entries
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({ "display_name": "no id" }));

        let decoded =
            DocumentCache::decode(&serde_json::to_vec(&entries).unwrap(), dir.path()).unwrap();
        assert_eq!(decoded.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cache_restores_empty() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path());
        std::fs::write(cache.cache_path(), b"{ not json").unwrap();

        assert!(matches!(
            cache.load().await,
            Err(CacheError::Serialization(_))
        ));
        assert!(cache.restore().await.is_empty());
    }

    #[tokio::test]
    async fn test_later_save_wins() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path());
        let a = document_in(dir.path(), "a.shapr");
        let b = document_in(dir.path(), "b.shapr");

        let first = cache.save(&[a.clone()]);
        let second = cache.save(&[a, b]);
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(cache.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_creates_documents_dir() {
        let dir = TempDir::new().unwrap();
        let cache = DocumentCache::in_dir(dir.path().join("nested"));

        cache.save(&[]).await.unwrap();

        assert!(cache.cache_path().exists());
        assert!(cache.load().await.unwrap().is_empty());
    }
}
