//! Provider capability traits.

use async_trait::async_trait;
use storylens_core::{LanguageDetection, SegmentFacts, Translation};
use storylens_error::{ExtractionError, TranslationError};

/// Detects the language of a piece of text.
pub trait LanguageDetector: Send + Sync {
    /// Detector name recorded in diagnostics.
    fn name(&self) -> &str;

    /// Detect the language of `text`.
    ///
    /// Returns `und` when nothing can be determined.
    fn detect(&self, text: &str) -> LanguageDetection;
}

/// Translates text between languages.
///
/// Implementations report failures as errors; retry, timeout, and circuit
/// breaking are applied around them by the caller.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Provider name, used as the circuit-breaker key.
    fn name(&self) -> &str;

    /// Whether this provider can translate `source_language` into
    /// `target_language`. Unsupported pairs are never sent to it.
    fn supports(&self, _source_language: &str, _target_language: &str) -> bool {
        true
    }

    /// Translate `text` from `source_language` into `target_language`.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Translation, TranslationError>;
}

/// Reads events and entity mentions from a segment.
///
/// Extraction is deterministic and in-process. A provider that fails is
/// replaced by a coarse fallback for the affected segment.
pub trait ExtractionProvider: Send + Sync {
    /// Provider name recorded in diagnostics.
    fn name(&self) -> &str;

    /// Extract facts from one segment's analysis text.
    fn extract(&self, segment_id: &str, text: &str) -> Result<SegmentFacts, ExtractionError>;
}
