//! HTTP front end for the document conversion engine.

pub mod api;
pub mod metrics;
pub mod state;
