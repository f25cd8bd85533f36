//! Dual-view timeline records.

use serde::{Deserialize, Serialize};

/// Stable code of a timeline conflict.
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
pub enum ConflictCode {
    /// Chronological order contradicts narrative order without a causal marker
    #[display("chronology_inversion")]
    ChronologyInversion,
    /// One event carries two different explicit times
    #[display("conflicting_time_anchors")]
    ConflictingTimeAnchors,
}

impl ConflictCode {
    /// String form used in records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictCode::ChronologyInversion => "chronology_inversion",
            ConflictCode::ConflictingTimeAnchors => "conflicting_time_anchors",
        }
    }
}

/// Disagreement between the two timeline views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConflict {
    /// Stable identifier
    pub conflict_id: String,
    /// Conflict code
    pub code: ConflictCode,
    /// Events involved, in chronological order
    pub event_ids: Vec<String>,
    /// Human-readable explanation
    pub description: String,
}

/// Narrative and chronological orderings of the same event set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelineView {
    /// Event IDs in story order
    pub narrative_order: Vec<String>,
    /// Event IDs by actual time, untimed events last
    pub actual_time: Vec<String>,
    /// Detected conflicts
    pub conflicts: Vec<TimelineConflict>,
    /// Consistency score in `[0, 1]`
    pub consistency: f64,
}
