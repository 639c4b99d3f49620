//! Document entity and per-format conversion state model.
//!
//! A [`Document`] is a managed source file. Each [`ConversionFormat`] has its
//! own independent [`ConversionState`]; consumers observe changes either via
//! [`Document::subscribe`] (latest snapshot) or via the [`DocumentEvent`]
//! stream published by the conversion manager.

mod events;
mod model;
mod types;

pub use events::DocumentEvent;
pub use model::{Document, DocumentSnapshot};
pub use types::{ConversionFormat, ConversionState, ConversionStates, DocumentId, UnknownFormat};
