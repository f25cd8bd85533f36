//! Capability traits for the Storylens pipeline.
//!
//! Providers are selected once at run start and injected into the pipeline
//! as trait objects. Only translation is asynchronous: it is the one stage
//! that may call out of process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod providers;
mod repository;

pub use providers::{ExtractionProvider, LanguageDetector, TranslationProvider};
pub use repository::{AnalysisRepository, RunFilter};
