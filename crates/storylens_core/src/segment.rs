//! Segments and per-segment translation records.

use crate::SourceType;
use serde::{Deserialize, Serialize};

/// Smallest addressable unit of source text.
///
/// Segments are created once by ingestion. Translation fills
/// `translated_text`; nothing else changes them within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Content-derived identifier, stable across re-runs of the same text
    pub segment_id: String,
    /// Zero-based position in the source
    pub order_index: usize,
    /// Kind of source the segment came from
    pub source_type: SourceType,
    /// Normalized source text
    pub source_text: String,
    /// Text after translation, if translation ran for this segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    /// Detected language code (`und` when undetermined)
    pub detected_language: String,
    /// Detector confidence in `[0, 1]`
    pub language_confidence: f64,
    /// Character offset of the segment start in the normalized source
    pub char_start: usize,
    /// Character offset one past the segment end
    pub char_end: usize,
    /// Transcript speaker label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Transcript timestamp in seconds from the start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_seconds: Option<u32>,
}

impl Segment {
    /// Text the analysis stages read: the translation when present.
    pub fn analysis_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.source_text)
    }
}

/// Result of a language detector call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    /// Language code
    pub language: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

/// Result of a translation provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Translated text
    pub text: String,
    /// Provider-reported quality in `[0, 1]`
    pub quality_score: f64,
}

/// How a segment's target text was produced.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMethod {
    /// Segment was already in the target language
    #[display("passthrough_same_language")]
    PassthroughSameLanguage,
    /// Provider translated the segment
    #[display("provider")]
    Provider,
    /// Provider was unavailable and the source text was kept
    #[display("fallback_passthrough")]
    FallbackPassthrough,
}

/// Character-span alignment between a source segment and its target text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAlignment {
    /// Aligned segment
    pub segment_id: String,
    /// Span of the source text, in characters
    pub source_offsets: (usize, usize),
    /// Span of the target text, in characters
    pub target_offsets: (usize, usize),
    /// Provider that produced the target text
    pub provider: String,
    /// How the target text was produced
    pub method: AlignmentMethod,
    /// Quality score in `[0, 1]`
    pub quality_score: f64,
}
