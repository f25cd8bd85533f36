//! Story analysis stages for Storylens.
//!
//! This crate turns a [`StoryInput`](storylens_core::StoryInput) into an
//! [`AnalysisRun`](storylens_core::AnalysisRun):
//!
//! 1. **Ingestion**: normalization, segmentation, language detection
//! 2. **Translation**: resilient provider calls with pass-through fallback
//! 3. **Extraction**: events, entities, dialogue and monologue
//! 4. **Signals**: beats, themes, character/conflict/emotion arcs
//! 5. **Timeline**: narrative and chronological views with conflict codes
//! 6. **Insights**: macro, meso and micro insights with evidence checks
//! 7. **Quality gate**: threshold aggregation with stable reason codes
//!
//! It also projects runs into the dashboard read model and graph export,
//! and persists them through [`InMemoryAnalysisRepository`] or
//! [`FileSystemAnalysisRepository`].
//!
//! Every stage except translation is pure and deterministic. Provider
//! failures degrade a run instead of failing it; see [`StageOutcome`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storylens_analysis::{StoryPipeline, build_dashboard};
//! use storylens_core::{SourceType, StoryInputBuilder};
//! use storylens_resilience::{CircuitBreakerRegistry, CircuitSettings, StorylensConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorylensConfig::default();
//! let circuits = Arc::new(CircuitBreakerRegistry::new(CircuitSettings::from_config(
//!     &config.translation,
//! )));
//! let pipeline = StoryPipeline::from_config(config, circuits)?;
//!
//! let input = StoryInputBuilder::default()
//!     .story_id("story-1")
//!     .owner_id("owner-1")
//!     .source_type(SourceType::Text)
//!     .source_text(Some("In 1999, Mara hid the ledger.\n\nYears later she returned.".to_string()))
//!     .build()?;
//!
//! let run = pipeline.analyze(&input).await?;
//! let dashboard = build_dashboard(&run);
//! println!("{} beats, gate passed: {}", dashboard.overview.beat_count, run.quality_gate.passed);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod arcs;
mod beats;
mod dashboard;
mod dialogue;
mod extraction;
mod ingestion;
mod insights;
mod language;
mod lexicon;
mod outcome;
mod pipeline;
mod providers;
mod quality;
mod repository;
mod stages;
mod themes;
mod timeline;
mod translation;
mod validation;

pub use arcs::{ArcTracks, tone, track_arcs, valence};
pub use beats::{BEAT_CONFIDENCE, detect_beats, event_fidelity};
pub use dashboard::{SVG_HEIGHT, SVG_WIDTH, build_dashboard, build_graph, export_graph_svg};
pub use dialogue::{UNKNOWN_SPEAKER, analyze_dialogue};
pub use extraction::{
    ExtractedStory, RULE_CONFIDENCE, RuleExtractionProvider, UnavailableExtractionProvider,
    extract_story, find_causal_marker, find_time_anchors,
};
pub use ingestion::{IngestedStory, ingest, normalize_text};
pub use insights::{InsightReport, check_evidence, generate_insights, is_evidence_consistent};
pub use language::{HeuristicLanguageDetector, majority_language};
pub use outcome::StageOutcome;
pub use pipeline::{AnalysisFailure, StoryPipeline};
pub use providers::{
    IdentityTranslationProvider, LexiconTranslationProvider, ProviderSet,
    UnavailableTranslationProvider, extraction_provider_from_config,
    language_detector_from_config, lexicon_for, translation_provider_from_config,
};
pub use quality::{evaluate_gate, hallucination_risk};
pub use repository::{FileSystemAnalysisRepository, InMemoryAnalysisRepository};
pub use themes::{FALLBACK_THEME, THEME_CONFIDENCE, track_themes};
pub use timeline::{compose_timeline, timeline_consistency};
pub use translation::{FALLBACK_QUALITY, TranslatedStory, alignment_quality, translate_segments};
pub use validation::{
    validate_beats, validate_events, validate_insights, validate_run, validate_signals,
    validate_timeline,
};
