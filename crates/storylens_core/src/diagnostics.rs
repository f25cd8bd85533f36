//! Non-fatal warnings and degraded-provider diagnostics.

use serde::{Deserialize, Serialize};

/// Pipeline stage, used to attribute diagnostics and failures.
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
pub enum PipelineStage {
    /// Ingestion and normalization
    #[display("ingestion")]
    Ingestion,
    /// Translation
    #[display("translation")]
    Translation,
    /// Event, entity, and dialogue extraction
    #[display("extraction")]
    Extraction,
    /// Beat, theme, and arc trackers
    #[display("signals")]
    Signals,
    /// Timeline composition
    #[display("timeline")]
    Timeline,
    /// Insight generation
    #[display("insights")]
    Insights,
    /// Quality gate
    #[display("quality_gate")]
    QualityGate,
}

/// A provider failure the pipeline degraded around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDiagnostic {
    /// Stage that called the provider
    pub stage: PipelineStage,
    /// Provider name
    pub provider: String,
    /// Stable reason code, e.g. `circuit_open`
    pub reason: String,
    /// Affected segment, when the failure is per-segment
    #[serde(default)]
    pub segment_id: Option<String>,
    /// Human-readable detail
    pub detail: String,
}

/// A normalization issue that did not stop ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestWarning {
    /// Stable warning code, e.g. `transcript_timestamp_unparseable`
    pub code: String,
    /// Human-readable detail
    pub message: String,
    /// Segment position the warning relates to
    #[serde(default)]
    pub order_index: Option<usize>,
}
