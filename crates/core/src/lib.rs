pub mod cache;
pub mod config;
pub mod converter;
pub mod document;
pub mod library;
pub mod manager;
pub mod metrics;
pub mod picker;
pub mod storage;
pub mod testing;

pub use cache::{CacheError, DocumentCache};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use converter::{ByteConverter, Converter, ConverterConfig, ConverterError};
pub use document::{
    ConversionFormat, ConversionState, ConversionStates, Document, DocumentEvent, DocumentId,
    DocumentSnapshot,
};
pub use library::{DocumentLibrary, LibraryError};
pub use manager::{ConversionManager, ManagerError};
pub use picker::{DocumentPicker, PathListPicker, PickRequest};
pub use storage::{FileStore, FsFileStore, StorageError};
