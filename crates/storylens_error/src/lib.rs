//! Error types for the Storylens pipeline.
//!
//! This crate provides the error types shared by every Storylens crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum names the specific failure
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! The taxonomy mirrors how the pipeline treats failures:
//! - [`IngestError`] rejects input before any stage runs
//! - [`TranslationError`] and [`ExtractionError`] describe provider failures,
//!   which the pipeline degrades around instead of propagating
//! - [`InvariantError`] is fatal for a run and names the stage and record
//! - [`BundleError`] reports exactly which integrity check a bundle failed
//!
//! # Examples
//!
//! ```
//! use storylens_error::{IngestError, IngestErrorKind, StorylensResult};
//!
//! fn ingest(raw: &str) -> StorylensResult<usize> {
//!     if raw.trim().is_empty() {
//!         Err(IngestError::new(IngestErrorKind::EmptyInput))?
//!     }
//!     Ok(raw.len())
//! }
//!
//! assert!(ingest("   ").is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bundle;
mod config;
mod error;
mod extraction;
mod ingest;
mod invariant;
mod json;
mod storage;
mod translation;

pub use bundle::{BundleError, BundleErrorKind};
pub use config::ConfigError;
pub use error::{StorylensError, StorylensErrorKind, StorylensResult};
pub use extraction::{ExtractionError, ExtractionErrorKind};
pub use ingest::{IngestError, IngestErrorKind};
pub use invariant::InvariantError;
pub use json::JsonError;
pub use storage::{StorageError, StorageErrorKind};
pub use translation::{RetryableError, TranslationError, TranslationErrorKind};
