//! Conversion engine.
//!
//! The [`Converter`] trait is the seam between the job manager and the code
//! that actually produces output files. [`ByteConverter`] is the production
//! implementation: it streams the source in fixed-size chunks through
//! [`transform_chunk`], reports progress per chunk, injects rare synthetic
//! data errors and honours cooperative cancellation.
//!
//! # Example
//!
//! ```ignore
//! use convertino_core::converter::{ByteConverter, Converter, ConversionJob, ConverterConfig};
//! use convertino_core::document::ConversionFormat;
//!
//! let converter = ByteConverter::new(ConverterConfig::default());
//! let job = ConversionJob::new("job-1", "/docs/part.shapr", ConversionFormat::Obj);
//! let result = converter.convert(job).await?;
//! println!("Wrote {} bytes to {}", result.output_size_bytes, result.output_path.display());
//! ```

mod config;
mod engine;
mod error;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use engine::{transform_chunk, ByteConverter};
pub use error::ConverterError;
pub use traits::Converter;
pub use types::{output_path_for, ConversionJob, ConversionProgress, ConversionResult};
