//! Insight records.

use crate::StoryStage;
use serde::{Deserialize, Serialize};

/// Scope of an insight.
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
pub enum Granularity {
    /// Whole-story thesis
    #[display("macro")]
    Macro,
    /// Per-stage summary
    #[display("meso")]
    Meso,
    /// Per-beat or per-theme observation
    #[display("micro")]
    Micro,
}

/// A synthesized observation about the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Stable identifier
    pub insight_id: String,
    /// Scope
    pub granularity: Granularity,
    /// Stage for meso and micro insights
    #[serde(default)]
    pub stage: Option<StoryStage>,
    /// Short title
    pub title: String,
    /// Insight text
    pub text: String,
    /// Terms the insight claims are present in its evidence
    pub referenced_terms: Vec<String>,
    /// Cited segments; never empty
    pub evidence_segment_ids: Vec<String>,
    /// Confidence in `(0, 1]`
    pub confidence: f64,
}
