use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::LibraryError;
use crate::cache::DocumentCache;
use crate::document::{ConversionFormat, Document, DocumentEvent, DocumentId};
use crate::manager::ConversionManager;
use crate::metrics;
use crate::picker::{DocumentPicker, PickRequest};
use crate::storage::FileStore;

pub struct DocumentLibrary {
    documents: RwLock<Vec<Arc<Document>>>,
    store: Arc<dyn FileStore>,
    cache: DocumentCache,
    manager: ConversionManager,
}

impl DocumentLibrary {
    pub fn new(store: Arc<dyn FileStore>, cache: DocumentCache, manager: ConversionManager) -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            store,
            cache,
            manager,
        }
    }

    pub fn manager(&self) -> &ConversionManager {
        &self.manager
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Directory that holds managed source files.
    pub fn documents_dir(&self) -> PathBuf {
        self.cache.documents_dir().to_path_buf()
    }

    /// Replaces the document list with the cached one.
    ///
    /// Interrupted conversions come back idle. Returns the number of restored documents.
    pub async fn restore(&self) -> usize {
        let restored: Vec<Arc<Document>> = self
            .cache
            .restore()
            .await
            .into_iter()
            .map(Arc::new)
            .collect();

        let count = restored.len();
        *self.documents.write().await = restored;
        info!(documents = count, path = %self.cache.cache_path().display(), "Restored document library");
        count
    }

    /// Copies each source into managed storage and creates a document for it.
    ///
    /// Sources that cannot be copied are skipped. Returns the created documents.
    pub async fn import(&self, sources: &[PathBuf]) -> Vec<Arc<Document>> {
        let documents_dir = self.documents_dir();
        let mut created = Vec::with_capacity(sources.len());

        for source in sources {
            match self.store.copy(source, &documents_dir).await {
                Ok(stored) => {
                    let document = Document::new(stored.path, stored.display_name)
                        .with_file_size(stored.size_bytes);
                    debug!(id = %document.id(), source = %source.display(), "Imported document");
                    created.push(Arc::new(document));
                }
                Err(e) => {
                    metrics::IMPORT_FAILURES.inc();
                    warn!(source = %source.display(), error = %e, "Skipping file that could not be imported");
                }
            }
        }

        if created.is_empty() {
            return created;
        }

        self.documents.write().await.extend(created.iter().cloned());
        self.persist().await;

        for document in &created {
            self.manager
                .publish(DocumentEvent::document_added(document.id(), document.file_name()));
        }
        metrics::DOCUMENTS_IMPORTED.inc_by(created.len() as u64);
        info!(imported = created.len(), requested = sources.len(), "Imported documents");

        created
    }

    /// Picks sources with `picker` and imports them.
    pub async fn import_picked(
        &self,
        picker: &dyn DocumentPicker,
        request: &PickRequest,
    ) -> Vec<Arc<Document>> {
        let sources = picker.pick(request).await;
        if sources.is_empty() {
            debug!(extension = %request.allowed_extension, "Nothing picked");
            return Vec::new();
        }
        self.import(&sources).await
    }

    /// Removes a document: its jobs are cancelled, its managed file removed,
    /// and the updated list persisted.
    pub async fn delete(&self, id: DocumentId) -> Result<(), LibraryError> {
        let document = {
            let mut documents = self.documents.write().await;
            let index = documents
                .iter()
                .position(|d| d.id() == id)
                .ok_or(LibraryError::DocumentNotFound(id))?;
            documents.remove(index)
        };

        self.manager.cancel_all_conversions(&document).await?;

        if let Err(e) = self.store.remove(document.source_path()).await {
            warn!(id = %id, error = %e, "Failed to remove document file");
        }

        self.persist().await;
        self.manager.publish(DocumentEvent::document_removed(id));
        metrics::DOCUMENTS_DELETED.inc();
        info!(id = %id, file_name = %document.file_name(), "Deleted document");

        Ok(())
    }

    /// Snapshot of the document list in import order.
    pub async fn documents(&self) -> Vec<Arc<Document>> {
        self.documents.read().await.clone()
    }

    pub async fn get(&self, id: DocumentId) -> Result<Arc<Document>, LibraryError> {
        self.documents
            .read()
            .await
            .iter()
            .find(|d| d.id() == id)
            .cloned()
            .ok_or(LibraryError::DocumentNotFound(id))
    }

    /// Starts (or restarts) a conversion. The document shows
    /// `Converting { progress: 0.0 }` on return.
    pub async fn start_conversion(
        &self,
        id: DocumentId,
        format: ConversionFormat,
    ) -> Result<Arc<Document>, LibraryError> {
        // Held across the request so a concurrent delete cannot miss this job
        let documents = self.documents.read().await;
        let document = documents
            .iter()
            .find(|d| d.id() == id)
            .ok_or(LibraryError::DocumentNotFound(id))?;
        self.manager.start_conversion(document, format).await?;
        Ok(Arc::clone(document))
    }

    /// Cancels a conversion; the state is idle on return.
    pub async fn cancel_conversion(
        &self,
        id: DocumentId,
        format: ConversionFormat,
    ) -> Result<Arc<Document>, LibraryError> {
        let document = self.get(id).await?;
        self.manager.cancel_conversion(&document, format).await?;
        Ok(document)
    }

    /// Saves the current list in the background.
    pub async fn persist(&self) -> JoinHandle<()> {
        let documents = self.documents.read().await;
        self.cache.save(&documents)
    }

    /// Saves the list whenever a conversion reaches a terminal state.
    ///
    /// The task holds only a weak reference and ends once the library is dropped.
    pub fn spawn_persistence(self: &Arc<Self>) -> JoinHandle<()> {
        let library = Arc::downgrade(self);
        let mut events = self.manager.subscribe();

        tokio::spawn(async move {
            loop {
                let save = match events.recv().await {
                    Ok(event) => event.is_terminal_state(),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Persistence fell behind document events");
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if !save {
                    continue;
                }
                let Some(library) = library.upgrade() else {
                    break;
                };
                library.persist().await;
            }
            debug!("Persistence task stopped");
        })
    }
}
