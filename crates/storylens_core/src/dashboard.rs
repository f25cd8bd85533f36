//! Dashboard read-model and graph export records.
//!
//! Every value here is a pure projection of an [`crate::AnalysisRun`].

use crate::{Granularity, StoryStage};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headline counts for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    /// Story identifier
    pub story_id: String,
    /// Run identifier
    pub run_id: String,
    /// Source language
    pub source_language: String,
    /// Target language
    pub target_language: String,
    /// Number of segments
    pub segment_count: usize,
    /// Number of events
    pub event_count: usize,
    /// Number of beats
    pub beat_count: usize,
    /// Number of distinct themes
    pub theme_count: usize,
    /// Number of published insights
    pub insight_count: usize,
    /// Number of timeline conflicts
    pub conflict_count: usize,
    /// Whether the run degraded
    pub degraded: bool,
    /// Gate decision
    pub quality_passed: bool,
    /// Gate reasons as codes
    pub quality_reasons: Vec<String>,
}

/// One event placed on a timeline lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineLaneItem {
    /// Event identifier
    pub event_id: String,
    /// Event description
    pub label: String,
    /// One-based position within the lane
    pub position: usize,
    /// Narrative position of the event
    pub narrative_order: usize,
    /// Chronological anchor
    pub actual_time: Option<NaiveDateTime>,
    /// Conflict codes the event participates in
    pub discrepancy_flags: Vec<String>,
}

/// A named ordering of timeline items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineLane {
    /// `narrative_order`, `actual_time`, or `timeline_diagnostics`
    pub lane: String,
    /// Items in lane order
    pub items: Vec<TimelineLaneItem>,
}

/// Strength of one theme in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    /// Theme name
    pub theme: String,
    /// Stage
    pub stage: StoryStage,
    /// Strength in `[0, 1]`; zero when the theme is absent
    pub intensity: f64,
}

/// Arc point as charted by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardArcPoint {
    /// Lane name
    pub lane: String,
    /// Stage
    pub stage: StoryStage,
    /// Value in `[0, 1]`
    pub value: f64,
    /// State label
    pub label: String,
}

/// Evidence excerpt shown when drilling into an insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    /// Segment identifier
    pub segment_id: String,
    /// Leading text of the segment
    pub excerpt: String,
}

/// Drilldown panel for one insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrilldownItem {
    /// Insight identifier
    pub insight_id: String,
    /// Scope
    pub granularity: Granularity,
    /// Title
    pub title: String,
    /// Text
    pub text: String,
    /// Cited evidence
    pub evidence: Vec<EvidenceSnippet>,
}

/// Graph node with deterministic layout coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node identifier
    pub id: String,
    /// Display label
    pub label: String,
    /// `theme`, `beat`, or `character`
    pub group: String,
    /// Stage column, when the node belongs to one
    pub stage: Option<StoryStage>,
    /// Horizontal position
    pub x: i64,
    /// Vertical position
    pub y: i64,
}

/// Evidence-driven relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge identifier
    pub id: String,
    /// Source node
    pub source: String,
    /// Target node
    pub target: String,
    /// `expressed_in` or `participates_in`
    pub relation: String,
    /// Segments that justify the edge
    pub evidence_segment_ids: Vec<String>,
}

/// Theme/beat/character graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphExport {
    /// Nodes sorted by identifier
    pub nodes: Vec<GraphNode>,
    /// Edges sorted by identifier
    pub edges: Vec<GraphEdge>,
}

/// Dashboard projection of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReadModel {
    /// Headline counts
    pub overview: DashboardOverview,
    /// Timeline lanes
    pub timeline_lanes: Vec<TimelineLane>,
    /// Theme-by-stage cells
    pub theme_heatmap: Vec<HeatmapCell>,
    /// Charted arc points
    pub arc_points: Vec<DashboardArcPoint>,
    /// Insight drilldowns keyed by insight identifier
    pub drilldown: BTreeMap<String, DrilldownItem>,
    /// Graph export
    pub graph: GraphExport,
}
