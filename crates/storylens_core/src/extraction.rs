//! Events, entities, and the per-segment facts extraction providers report.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Entity category.
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
pub enum EntityKind {
    /// A named actor
    #[display("character")]
    Character,
    /// A named place
    #[display("location")]
    Location,
    /// A notable thing
    #[display("object")]
    Object,
}

/// One entity mention reported by an extraction provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Surface form of the name
    pub name: String,
    /// Category
    pub kind: EntityKind,
}

/// Raw facts an extraction provider reads from one segment.
///
/// The extraction stage turns these into [`Event`] and [`Entity`] records,
/// assigning identifiers and merging entities across segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentFacts {
    /// One-sentence description of what happens
    pub description: String,
    /// Entity mentions in order of first appearance
    pub mentions: Vec<EntityMention>,
    /// Explicit time anchors stated in the segment
    pub time_anchors: Vec<NaiveDateTime>,
    /// Causal or flashback marker word, if any
    pub causal_marker: Option<String>,
    /// Provider confidence in `[0, 1]`
    pub confidence: f64,
}

/// Something that happens in the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable identifier
    pub event_id: String,
    /// Segments the event was read from; never empty
    pub segment_ids: Vec<String>,
    /// Short description
    pub description: String,
    /// Names of participating characters
    pub participants: Vec<String>,
    /// One-based position in story order
    pub narrative_order: usize,
    /// Chronological anchor, when the text states one
    #[serde(default)]
    pub actual_time: Option<NaiveDateTime>,
    /// Every explicit anchor found in the source segment
    #[serde(default)]
    pub time_anchors: Vec<NaiveDateTime>,
    /// Marker linking the event causally to another, e.g. `because`
    #[serde(default)]
    pub causal_marker: Option<String>,
    /// Extraction confidence in `(0, 1]`
    pub confidence: f64,
}

/// A character, location, or object referenced in the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier
    pub entity_id: String,
    /// Canonical name
    pub name: String,
    /// Category
    pub kind: EntityKind,
    /// Segment of first mention
    pub first_segment_id: String,
    /// Number of mentions across the story
    pub mention_count: usize,
    /// Segments mentioning the entity, in story order
    pub segment_ids: Vec<String>,
}
