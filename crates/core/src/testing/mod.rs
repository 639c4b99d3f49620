//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use convertino_core::testing::{fixtures, MockConverter};
//!
//! let converter = Arc::new(MockConverter::new());
//! let (manager, _loop) = ConversionManager::spawn(converter.clone());
//!
//! let dir = tempfile::TempDir::new()?;
//! let document = fixtures::document_at(&dir, "part.shapr", 2048);
//! manager.start_conversion(&document, ConversionFormat::Obj).await?;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion, RecordedOutcome};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use tokio::sync::watch;

    use crate::document::{ConversionFormat, ConversionState, ConversionStates, Document};

    /// Write a source file of `len` patterned bytes into `dir`.
    pub fn source_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, data).expect("failed to write fixture source file");
        path
    }

    /// Create a document backed by a freshly written source file.
    pub fn document_at(dir: &Path, name: &str, len: usize) -> Arc<Document> {
        let path = source_file(dir, name, len);
        Arc::new(Document::new(path, name).with_file_size(len as u64))
    }

    /// Wait until `format` on the watched document satisfies `predicate`.
    ///
    /// Returns the matching state, or `None` if the document is dropped first.
    pub async fn wait_for_state<F>(
        rx: &mut watch::Receiver<ConversionStates>,
        format: ConversionFormat,
        predicate: F,
    ) -> Option<ConversionState>
    where
        F: Fn(&ConversionState) -> bool,
    {
        rx.wait_for(|states| predicate(states.get(format)))
            .await
            .ok()
            .map(|states| states.get(format).clone())
    }
}
