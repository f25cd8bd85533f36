//! Quality gate records.

use serde::{Deserialize, Serialize};

/// Stable code for a failed gate check.
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
pub enum GateReason {
    /// Lowest insight confidence is below the floor
    #[display("confidence_below_threshold")]
    ConfidenceBelowThreshold,
    /// Too many evidence links point nowhere
    #[display("hallucination_risk_high")]
    HallucinationRiskHigh,
    /// Translation quality is below the floor
    #[display("translation_quality_low")]
    TranslationQualityLow,
    /// Timeline consistency is below the floor
    #[display("timeline_consistency_low")]
    TimelineConsistencyLow,
    /// More insights failed the evidence check than tolerated
    #[display("insight_evidence_inconsistent")]
    InsightEvidenceInconsistent,
}

impl GateReason {
    /// String form used in records.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateReason::ConfidenceBelowThreshold => "confidence_below_threshold",
            GateReason::HallucinationRiskHigh => "hallucination_risk_high",
            GateReason::TranslationQualityLow => "translation_quality_low",
            GateReason::TimelineConsistencyLow => "timeline_consistency_low",
            GateReason::InsightEvidenceInconsistent => "insight_evidence_inconsistent",
        }
    }
}

/// Publishability decision for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateResult {
    /// True iff every check passed
    pub passed: bool,
    /// Lowest confidence among published insights
    pub confidence_floor: f64,
    /// Share of insight evidence links that cite unknown segments
    pub hallucination_risk: f64,
    /// Aggregate translation quality
    pub translation_quality: f64,
    /// Timeline consistency score
    pub timeline_consistency: f64,
    /// Insights excluded by the evidence-consistency check
    pub inconsistent_insight_count: usize,
    /// Every failing check, in a fixed order
    pub reasons: Vec<GateReason>,
}
