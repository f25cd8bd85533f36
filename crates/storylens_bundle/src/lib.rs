//! `.sgb` bundle codec for Storylens analysis runs.
//!
//! A bundle packs one [`AnalysisRun`](storylens_core::AnalysisRun) together
//! with its dashboard projection, timeline lanes, alignments, arc points and
//! graph export into a single checksummed file:
//!
//! ```text
//! ┌────────┬──────────┬───────────────────┬──────────────────┐
//! │ header │ manifest │ zlib payload      │ trailer          │
//! │ 21 B   │ JSON     │ records, in order │ 2 × SHA-256      │
//! └────────┴──────────┴───────────────────┴──────────────────┘
//! ```
//!
//! Decoding never returns partial data. Every integrity check has its own
//! [`BundleErrorKind`](storylens_error::BundleErrorKind).
//!
//! # Example
//!
//! ```no_run
//! use storylens_bundle::{BUNDLE_SCHEMA_VERSION, pack_bundle, read_manifest};
//!
//! # fn demo(run: &storylens_core::AnalysisRun) -> Result<(), storylens_error::BundleError> {
//! let bytes = pack_bundle(run)?;
//! let manifest = read_manifest(&bytes)?;
//! assert_eq!(manifest.bundle_schema_version, BUNDLE_SCHEMA_VERSION);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod format;
mod manifest;
mod records;

pub use codec::{load_bundle, pack_bundle, pack_bundle_at, read_manifest, save_bundle, unpack_bundle};
pub use format::{BUNDLE_EXTENSION, BUNDLE_FORMAT_VERSION, BUNDLE_MAGIC};
pub use manifest::{BUNDLE_COMPRESSION, BUNDLE_SCHEMA_VERSION, BundleManifest, RecordEntry};
pub use records::{BundleRecord, UnpackedBundle};
