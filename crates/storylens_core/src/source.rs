//! Pipeline input types.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use storylens_error::{IngestError, IngestErrorKind};

/// Kind of narrative source material.
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
pub enum SourceType {
    /// Plain prose
    #[display("text")]
    Text,
    /// Excerpt from a paginated document
    #[display("document")]
    Document,
    /// Speaker-turn transcript
    #[display("transcript")]
    Transcript,
}

impl SourceType {
    /// String form used in records and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Text => "text",
            SourceType::Document => "document",
            SourceType::Transcript => "transcript",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(SourceType::Text),
            "document" => Ok(SourceType::Document),
            "transcript" => Ok(SourceType::Transcript),
            other => Err(IngestError::new(IngestErrorKind::UnsupportedSourceType(
                other.to_string(),
            ))),
        }
    }
}

/// Source material for one analysis run.
///
/// Exactly one of `source_text` or `segments` must be supplied.
///
/// # Examples
///
/// ```
/// use storylens_core::{SourceType, StoryInputBuilder};
///
/// let input = StoryInputBuilder::default()
///     .story_id("story-1")
///     .owner_id("owner-1")
///     .source_type(SourceType::Text)
///     .source_text(Some("Mara opened the archive.".to_string()))
///     .target_language("en")
///     .build()
///     .unwrap();
///
/// assert_eq!(input.story_id(), "story-1");
/// assert!(input.idempotency_key().is_none());
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct StoryInput {
    /// Story being analyzed.
    story_id: String,

    /// Owner of the story.
    owner_id: String,

    /// Kind of source material.
    #[builder(default = "SourceType::Text")]
    #[serde(default = "default_source_type")]
    source_type: SourceType,

    /// Raw source text.
    #[builder(default)]
    #[serde(default)]
    source_text: Option<String>,

    /// Pre-split segments, used instead of `source_text`.
    #[builder(default)]
    #[serde(default)]
    segments: Option<Vec<String>>,

    /// Language every segment is translated into.
    #[builder(default = "\"en\".to_string()")]
    #[serde(default = "default_target_language")]
    target_language: String,

    /// Caller-supplied key used for deduplicating re-submissions.
    #[builder(default)]
    #[serde(default)]
    idempotency_key: Option<String>,
}

fn default_source_type() -> SourceType {
    SourceType::Text
}

fn default_target_language() -> String {
    "en".to_string()
}
