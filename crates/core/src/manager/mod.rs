//! Single-flight conversion job management.
//!
//! A [`ConversionManager`] handle sends requests to a [`ManagerLoop`] task
//! that owns every running job. At most one job exists per
//! (document, format) pair: starting again supersedes the running job, and
//! events from a superseded or cancelled job are discarded by generation.
//! The loop is the only writer of document conversion states, so the
//! per-format state machine is linearized:
//!
//! ```text
//! Idle ──start──▶ Converting(p) ──ok──▶ Completed(path)
//!   ▲                  │   └──error──▶ Failed(message)
//!   └─────cancel───────┘
//! ```

mod error;
mod handle;
mod runner;
mod types;

pub use error::ManagerError;
pub use handle::{
    create_conversion_manager, ConversionManager, DEFAULT_EVENT_BUFFER, DEFAULT_REQUEST_BUFFER,
};
pub use runner::ManagerLoop;
pub use types::JobKey;
