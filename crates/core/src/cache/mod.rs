//! Restart-surviving document list.
//!
//! The cache is a single pretty-printed JSON array inside the documents
//! directory. Each record holds the document id, display name, the source's
//! final path component and a tagged state per format:
//!
//! ```json
//! [
//!   {
//!     "id": "5f0c…",
//!     "display_name": "part.shapr",
//!     "file_name": "1b9e…_part.shapr",
//!     "conversion_states": {
//!       "obj": { "type": "completed", "output_path": "/docs/1b9e…_part.obj" },
//!       "step": { "type": "idle" },
//!       "stl": { "type": "failed", "message": "Data error while converting /docs/1b9e…_part.shapr at byte 2048" }
//!     }
//!   }
//! ]
//! ```

mod error;
mod store;
mod types;

pub use error::CacheError;
pub use store::{DocumentCache, CACHE_FILE_NAME};
pub use types::{CachedDocument, CachedState};
