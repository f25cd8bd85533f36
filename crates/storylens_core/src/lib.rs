//! Core data model for the Storylens story analysis pipeline.
//!
//! This crate defines the records every stage exchanges, from ingested
//! [`Segment`]s to the [`AnalysisRun`] aggregate, plus the dashboard
//! projection types. It carries no behavior beyond identifiers, stage
//! arithmetic, and deterministic serialization.
//!
//! # Examples
//!
//! ```
//! use storylens_core::{stable_id, StoryStage, SCHEMA_VERSION};
//!
//! assert_eq!(SCHEMA_VERSION, "story_analysis.v1");
//! assert_eq!(StoryStage::ALL.len(), 4);
//! assert!(stable_id("evt", "seg_000000000000").starts_with("evt_"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dashboard;
mod diagnostics;
mod dialogue;
mod extraction;
mod ids;
mod insight;
mod quality;
mod run;
mod segment;
mod signals;
mod source;
mod timeline;

pub use dashboard::{
    DashboardArcPoint, DashboardOverview, DashboardReadModel, DrilldownItem, EvidenceSnippet,
    GraphEdge, GraphExport, GraphNode, HeatmapCell, TimelineLane, TimelineLaneItem,
};
pub use diagnostics::{IngestWarning, PipelineStage, ProviderDiagnostic};
pub use dialogue::{
    AttributionMethod, DialogueAnalysis, DialogueTurn, MonologueSignal, NarrativeBalance,
    NarrativeMode, SegmentMode,
};
pub use extraction::{Entity, EntityKind, EntityMention, Event, SegmentFacts};
pub use ids::{sha256_hex, stable_id};
pub use insight::{Granularity, Insight};
pub use quality::{GateReason, QualityGateResult};
pub use run::{AnalysisRun, RunSummary, SCHEMA_VERSION};
pub use segment::{AlignmentMethod, LanguageDetection, Segment, SegmentAlignment, Translation};
pub use signals::{
    ArcPoint, Beat, ConflictShift, EmotionSignal, StoryStage, ThemeDirection, ThemeSignal,
};
pub use source::{SourceType, StoryInput, StoryInputBuilder, StoryInputBuilderError};
pub use timeline::{ConflictCode, TimelineConflict, TimelineView};
