//! The analysis run aggregate.

use crate::{
    ArcPoint, Beat, ConflictShift, DialogueAnalysis, EmotionSignal, Entity, Event,
    IngestWarning, Insight, ProviderDiagnostic, QualityGateResult, Segment, SegmentAlignment,
    SourceType, ThemeSignal, TimelineView,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storylens_error::JsonError;

/// Canonical schema key for [`AnalysisRun`] records.
pub const SCHEMA_VERSION: &str = "story_analysis.v1";

/// Field excluded from deterministic serialization.
const TIMESTAMP_FIELD: &str = "created_at";

/// Everything one pipeline invocation produced.
///
/// A run is built in memory across every stage and is immutable once the
/// quality gate has decided. It is persisted and exported as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    /// Content-derived run identifier
    pub run_id: String,
    /// Story analyzed
    pub story_id: String,
    /// Story owner
    pub owner_id: String,
    /// Always [`SCHEMA_VERSION`] for records this build writes
    pub schema_version: String,
    /// Wall-clock creation time; not part of the deterministic form
    pub created_at: DateTime<Utc>,
    /// Kind of source material
    pub source_type: SourceType,
    /// SHA-256 of the normalized source
    pub source_hash: String,
    /// SHA-256 of `{idempotency_key}|{source_hash}`
    pub dedupe_key: String,
    /// Majority detected source language
    pub source_language: String,
    /// Translation target language
    pub target_language: String,
    /// True when any provider degraded
    pub degraded: bool,
    /// Segments in source order
    pub segments: Vec<Segment>,
    /// Per-segment translation alignment
    pub alignments: Vec<SegmentAlignment>,
    /// Events in narrative order
    pub events: Vec<Event>,
    /// Entities sorted by kind then name
    pub entities: Vec<Entity>,
    /// Dialogue details
    pub dialogue: DialogueAnalysis,
    /// Beats in narrative order
    pub beats: Vec<Beat>,
    /// Theme signals
    pub themes: Vec<ThemeSignal>,
    /// Character, conflict, and emotion arc points
    pub arcs: Vec<ArcPoint>,
    /// Conflict intensity shifts between stages
    pub conflicts: Vec<ConflictShift>,
    /// Emotion per stage
    pub emotions: Vec<EmotionSignal>,
    /// Narrative and chronological views
    pub timeline: TimelineView,
    /// Published insights
    pub insights: Vec<Insight>,
    /// Insights dropped by the evidence-consistency check
    pub excluded_insight_ids: Vec<String>,
    /// Publishability decision
    pub quality_gate: QualityGateResult,
    /// Normalization warnings
    pub warnings: Vec<IngestWarning>,
    /// Degraded-provider diagnostics
    pub diagnostics: Vec<ProviderDiagnostic>,
}

impl AnalysisRun {
    /// Serialize with every field except `created_at`.
    ///
    /// Two runs over identical input and configuration produce identical
    /// bytes. Object keys are emitted in sorted order.
    pub fn to_deterministic_json(&self) -> Result<Vec<u8>, JsonError> {
        let mut value =
            serde_json::to_value(self).map_err(|e| JsonError::new(e.to_string()))?;
        if let Some(object) = value.as_object_mut() {
            object.remove(TIMESTAMP_FIELD);
        }
        serde_json::to_vec(&value).map_err(|e| JsonError::new(e.to_string()))
    }

    /// Lightweight summary for listings.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            story_id: self.story_id.clone(),
            dedupe_key: self.dedupe_key.clone(),
            created_at: self.created_at,
            passed: self.quality_gate.passed,
        }
    }
}

/// Listing entry for a stored run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: String,
    /// Story identifier
    pub story_id: String,
    /// Deduplication key
    pub dedupe_key: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Whether the quality gate passed
    pub passed: bool,
}
