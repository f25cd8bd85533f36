//! Storylens - deterministic story analysis
//!
//! Storylens turns narrative source text into a structured, versioned model
//! of the story: events and entities, beats, themes, character/conflict/emotion
//! arcs, a dual-view timeline with chronology diagnostics, and tiered insights
//! that only publish when their evidence holds up.
//!
//! # Features
//!
//! - **Ingestion**: text, document and transcript sources normalized into
//!   ordered segments with stable ids
//! - **Resilient translation**: retry with backoff, per-attempt timeouts, a
//!   circuit breaker per provider and a degraded pass-through fallback
//! - **Extraction and tracking**: rule-based events, entities, time anchors,
//!   beats, themes and arcs, all citing their source segments
//! - **Quality gate**: confidence, hallucination risk, translation quality
//!   and timeline consistency decide whether a run is publishable
//! - **Bundles**: one checksummed `.sgb` file per exported run
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storylens::{
//!     CircuitBreakerRegistry, CircuitSettings, StoryInputBuilder, StoryPipeline, StorylensConfig,
//!     build_dashboard, pack_bundle,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     storylens::init_observability()?;
//!
//!     let config = StorylensConfig::load()?;
//!     let circuits = Arc::new(CircuitBreakerRegistry::new(CircuitSettings::from_config(
//!         &config.translation,
//!     )));
//!     let pipeline = StoryPipeline::from_config(config, circuits)?;
//!
//!     let input = StoryInputBuilder::default()
//!         .story_id("story-1")
//!         .owner_id("owner-1")
//!         .source_text(Some("In 2001, Mara left the harbor.".to_string()))
//!         .build()?;
//!
//!     let run = pipeline.analyze(&input).await.map_err(|f| f.error)?;
//!     let dashboard = build_dashboard(&run);
//!     println!("{} events", dashboard.overview.event_count);
//!
//!     let bytes = pack_bundle(&run)?;
//!     std::fs::write("story-1.sgb", bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `observability` - export spans through OpenTelemetry's stdout exporter
//!
//! # Architecture
//!
//! - `storylens_error` - error kinds with source locations
//! - `storylens_core` - data model shared by every stage
//! - `storylens_interface` - detector, provider and repository traits
//! - `storylens_resilience` - layered configuration, circuit breakers, retrying translator
//! - `storylens_analysis` - the analysis stages, pipeline, dashboard and repositories
//! - `storylens_bundle` - the `.sgb` codec
//!
//! This crate (`storylens`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observability;

pub use observability::{
    ObservabilityConfig, init_observability, init_observability_with_config,
    shutdown_observability,
};

pub use storylens_analysis::*;
pub use storylens_bundle::*;
pub use storylens_core::*;
pub use storylens_error::*;
pub use storylens_interface::*;
pub use storylens_resilience::*;
