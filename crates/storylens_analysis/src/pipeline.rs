//! Pipeline orchestration.
//!
//! Stages run strictly in dependency order for one story:
//! ingestion, translation, extraction and dialogue, beats, themes and arcs,
//! timeline, insights, quality gate. Provider failures degrade the run and
//! are recorded as diagnostics; invariant violations stop it.

use crate::arcs::track_arcs;
use crate::beats::detect_beats;
use crate::dialogue::analyze_dialogue;
use crate::extraction::extract_story;
use crate::ingestion::ingest;
use crate::insights::{check_evidence, generate_insights};
use crate::providers::ProviderSet;
use crate::quality::evaluate_gate;
use crate::themes::track_themes;
use crate::timeline::compose_timeline;
use crate::translation::translate_segments;
use crate::validation::{
    validate_beats, validate_events, validate_insights, validate_run, validate_signals,
    validate_timeline,
};
use chrono::Utc;
use std::sync::Arc;
use storylens_core::{
    AnalysisRun, EntityKind, IngestWarning, PipelineStage, ProviderDiagnostic, SCHEMA_VERSION,
    StoryInput, sha256_hex, stable_id,
};
use storylens_error::{JsonError, StorylensError, StorylensResult};
use storylens_resilience::{CircuitBreakerRegistry, ResilientTranslator, StorylensConfig};
use tracing::{info, instrument, warn};

/// A run that could not complete.
///
/// Carries whatever warnings and diagnostics were collected before the
/// failing stage. A failed run is never persisted.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Analysis failed at stage {}: {}", stage, error)]
pub struct AnalysisFailure {
    /// Stage that failed
    pub stage: PipelineStage,
    /// Underlying error
    #[error(source)]
    pub error: StorylensError,
    /// Normalization warnings collected so far
    pub warnings: Vec<IngestWarning>,
    /// Provider diagnostics collected so far
    pub diagnostics: Vec<ProviderDiagnostic>,
}

/// Warnings and diagnostics gathered while a run progresses.
#[derive(Debug, Default)]
struct RunLog {
    warnings: Vec<IngestWarning>,
    diagnostics: Vec<ProviderDiagnostic>,
}

impl RunLog {
    fn fail(&mut self, stage: PipelineStage, error: impl Into<StorylensError>) -> AnalysisFailure {
        let error = error.into();
        warn!(%stage, error = %error, "Run aborted");
        AnalysisFailure {
            stage,
            error,
            warnings: std::mem::take(&mut self.warnings),
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }
}

/// Runs the full analysis for one story at a time.
///
/// The circuit registry is shared: pipelines built over the same registry
/// see each other's provider failures.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use storylens_analysis::StoryPipeline;
/// use storylens_core::StoryInputBuilder;
/// use storylens_resilience::{CircuitBreakerRegistry, CircuitSettings, StorylensConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StorylensConfig::load()?;
/// let circuits = Arc::new(CircuitBreakerRegistry::new(CircuitSettings::from_config(
///     &config.translation,
/// )));
/// let pipeline = StoryPipeline::from_config(config, circuits)?;
///
/// let input = StoryInputBuilder::default()
///     .story_id("story-1")
///     .owner_id("owner-1")
///     .source_text(Some("Mara found the archive.".to_string()))
///     .build()?;
/// let run = pipeline.analyze(&input).await?;
/// println!("passed: {}", run.quality_gate.passed);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StoryPipeline {
    config: StorylensConfig,
    providers: ProviderSet,
    translator: ResilientTranslator,
}

impl std::fmt::Debug for StoryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryPipeline")
            .field("config", &self.config)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl StoryPipeline {
    /// Build a pipeline over explicit providers.
    pub fn new(
        config: StorylensConfig,
        providers: ProviderSet,
        circuits: Arc<CircuitBreakerRegistry>,
    ) -> Self {
        let translator = ResilientTranslator::from_config(
            providers.translator.clone(),
            circuits,
            &config.translation,
        );
        Self {
            config,
            providers,
            translator,
        }
    }

    /// Build a pipeline with the providers named in `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown provider names or
    /// out-of-range values.
    pub fn from_config(
        config: StorylensConfig,
        circuits: Arc<CircuitBreakerRegistry>,
    ) -> StorylensResult<Self> {
        config.validate()?;
        let providers = ProviderSet::from_config(&config.translation, &config.extraction)?;
        Ok(Self::new(config, providers, circuits))
    }

    /// Active configuration.
    pub fn config(&self) -> &StorylensConfig {
        &self.config
    }

    /// Active providers.
    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    fn config_fingerprint(&self) -> Result<String, JsonError> {
        let bytes = serde_json::to_vec(&self.config).map_err(|e| JsonError::new(e.to_string()))?;
        Ok(sha256_hex(bytes))
    }

    /// Analyze one story.
    ///
    /// Provider failures never surface here: they lower scores and add
    /// diagnostics. Input errors and invariant violations return an
    /// [`AnalysisFailure`] naming the stage.
    #[instrument(skip(self, input), fields(story_id = %input.story_id(), source_type = %input.source_type()))]
    pub async fn analyze(&self, input: &StoryInput) -> Result<AnalysisRun, AnalysisFailure> {
        let mut log = RunLog::default();

        let ingested = ingest(input, &self.config.ingestion, self.providers.detector.as_ref())
            .map_err(|e| log.fail(PipelineStage::Ingestion, e))?;
        log.warnings.extend(ingested.warnings);
        let fingerprint = self
            .config_fingerprint()
            .map_err(|e| log.fail(PipelineStage::Ingestion, e))?;
        info!(
            segments = ingested.segments.len(),
            warnings = log.warnings.len(),
            "Ingestion complete"
        );

        let target_language = input.target_language().trim().to_lowercase();
        let (translated, diagnostics) =
            translate_segments(ingested.segments, &target_language, &self.translator)
                .await
                .into_parts();
        log.diagnostics.extend(diagnostics);
        let segments = translated.segments;

        let (extracted, diagnostics) = extract_story(
            &segments,
            self.providers.extractor.as_ref(),
            &self.config.extraction,
        )
        .into_parts();
        log.diagnostics.extend(diagnostics);
        validate_events(&extracted.events, &segments)
            .map_err(|e| log.fail(PipelineStage::Extraction, e))?;

        let characters: Vec<String> = extracted
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Character)
            .map(|e| e.name.clone())
            .collect();
        let dialogue = analyze_dialogue(&segments, &characters);

        let beats = detect_beats(&extracted.events, &segments);
        validate_beats(&beats, &extracted.events, &segments)
            .map_err(|e| log.fail(PipelineStage::Signals, e))?;
        let themes = track_themes(&beats, &segments);
        let arcs = track_arcs(&beats, &extracted.events, &extracted.entities, &segments);
        validate_signals(&themes, &arcs.arcs, &arcs.conflicts, &arcs.emotions, &segments)
            .map_err(|e| log.fail(PipelineStage::Signals, e))?;

        let timeline = compose_timeline(&extracted.events, &self.config.timeline);
        validate_timeline(&timeline, &extracted.events)
            .map_err(|e| log.fail(PipelineStage::Timeline, e))?;

        let report = check_evidence(generate_insights(&beats, &themes, &segments), &segments);
        validate_insights(&report.published, &segments)
            .map_err(|e| log.fail(PipelineStage::Insights, e))?;

        let quality_gate = evaluate_gate(
            &report,
            &segments,
            translated.translation_quality,
            timeline.consistency,
            &self.config.gate,
        );

        let run = AnalysisRun {
            run_id: stable_id("run", &format!("{}:{}", ingested.dedupe_key, fingerprint)),
            story_id: input.story_id().trim().to_string(),
            owner_id: input.owner_id().trim().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
            source_type: *input.source_type(),
            source_hash: ingested.source_hash,
            dedupe_key: ingested.dedupe_key,
            source_language: translated.source_language,
            target_language,
            degraded: !log.diagnostics.is_empty(),
            segments,
            alignments: translated.alignments,
            events: extracted.events,
            entities: extracted.entities,
            dialogue,
            beats,
            themes,
            arcs: arcs.arcs,
            conflicts: arcs.conflicts,
            emotions: arcs.emotions,
            timeline,
            insights: report.published,
            excluded_insight_ids: report.excluded_insight_ids,
            quality_gate,
            warnings: log.warnings.clone(),
            diagnostics: log.diagnostics.clone(),
        };
        validate_run(&run).map_err(|e| log.fail(PipelineStage::QualityGate, e))?;

        info!(
            run_id = %run.run_id,
            degraded = run.degraded,
            passed = run.quality_gate.passed,
            "Analysis run complete"
        );
        Ok(run)
    }
}
