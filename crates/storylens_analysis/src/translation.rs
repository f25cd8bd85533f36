//! Translation stage.
//!
//! Segments already in the target language, or of undetermined language,
//! pass through untouched. Everything else goes through the
//! [`ResilientTranslator`]. A segment the provider cannot take, or that it
//! fails on after retries, passes through untranslated with a diagnostic
//! and a floor quality score.

use crate::StageOutcome;
use crate::language::majority_language;
use crate::lexicon::{round3, tokenize};
use crate::providers::lexicon_for;
use futures::future::join_all;
use storylens_core::{
    AlignmentMethod, PipelineStage, ProviderDiagnostic, Segment, SegmentAlignment,
};
use storylens_resilience::ResilientTranslator;
use tracing::{info, instrument, warn};

/// Quality assigned to a segment that fell back to its source text.
pub const FALLBACK_QUALITY: f64 = 0.32;

/// Translated segments and their alignment records.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedStory {
    /// Segments in canonical order, `translated_text` set where translated
    pub segments: Vec<Segment>,
    /// One alignment per segment, same order
    pub alignments: Vec<SegmentAlignment>,
    /// Majority detected language
    pub source_language: String,
    /// Mean quality over segments that required translation
    pub translation_quality: f64,
}

/// Score a translation against its source.
///
/// Unchanged output scores low, lexicon coverage scores high, and text with
/// nothing translatable scores in between.
pub fn alignment_quality(source_text: &str, translated_text: &str, source_language: &str) -> f64 {
    if matches!(source_language, "en" | "und") {
        return if translated_text == source_text { 1.0 } else { 0.92 };
    }
    if translated_text == source_text {
        return 0.35;
    }
    let Some(lexicon) = lexicon_for(source_language) else {
        return 0.76;
    };
    let source_tokens = tokenize(source_text);
    if source_tokens.is_empty() {
        return 0.42;
    }
    let covered = source_tokens
        .iter()
        .filter(|token| lexicon.iter().any(|(word, _)| word == token))
        .count();
    let coverage = covered as f64 / source_tokens.len() as f64;
    if coverage <= 0.0 {
        return 0.42;
    }
    let edit_ratio = token_edit_ratio(&source_tokens, &tokenize(translated_text));
    let quality = 0.7 + coverage * 0.2 + (edit_ratio * 0.1).min(0.08);
    round3(quality.clamp(0.78, 0.98))
}

/// Share of token positions that differ.
fn token_edit_ratio(source: &[String], translated: &[String]) -> f64 {
    let total = source.len().max(translated.len());
    if source.is_empty() || total == 0 {
        return 0.0;
    }
    let changes = (0..total)
        .filter(|index| source.get(*index) != translated.get(*index))
        .count();
    changes as f64 / total as f64
}

/// Per-segment result before aggregation.
struct SegmentTranslation {
    segment: Segment,
    alignment: SegmentAlignment,
    required: bool,
    diagnostic: Option<ProviderDiagnostic>,
}

/// Translate every segment that is not already in `target_language`.
///
/// Calls are issued concurrently up to the translator's worker limit;
/// results come back in segment order.
#[instrument(skip(segments, translator), fields(segments = segments.len(), provider = %translator.provider_name()))]
pub async fn translate_segments(
    segments: Vec<Segment>,
    target_language: &str,
    translator: &ResilientTranslator,
) -> StageOutcome<TranslatedStory> {
    let source_language =
        majority_language(segments.iter().map(|s| s.detected_language.as_str()));

    let results = join_all(
        segments
            .into_iter()
            .map(|segment| translate_one(segment, target_language, translator)),
    )
    .await;

    let mut translated = Vec::with_capacity(results.len());
    let mut alignments = Vec::with_capacity(results.len());
    let mut diagnostics = Vec::new();
    let mut required_scores = Vec::new();
    for result in results {
        if result.required {
            required_scores.push(result.alignment.quality_score);
        }
        diagnostics.extend(result.diagnostic);
        alignments.push(result.alignment);
        translated.push(result.segment);
    }

    let translation_quality = if required_scores.is_empty() {
        1.0
    } else {
        round3(required_scores.iter().sum::<f64>() / required_scores.len() as f64)
    };

    info!(
        translation_quality,
        required = required_scores.len(),
        fallbacks = diagnostics.len(),
        "Translation stage complete"
    );

    StageOutcome::from_parts(
        TranslatedStory {
            segments: translated,
            alignments,
            source_language,
            translation_quality,
        },
        diagnostics,
    )
}

async fn translate_one(
    mut segment: Segment,
    target_language: &str,
    translator: &ResilientTranslator,
) -> SegmentTranslation {
    let provider = translator.provider_name().to_string();
    let source_len = segment.source_text.chars().count();
    let language = segment.detected_language.clone();

    if language == target_language || language == "und" {
        let alignment = SegmentAlignment {
            segment_id: segment.segment_id.clone(),
            source_offsets: (0, source_len),
            target_offsets: (0, source_len),
            provider,
            method: AlignmentMethod::PassthroughSameLanguage,
            quality_score: 1.0,
        };
        return SegmentTranslation {
            segment,
            alignment,
            required: false,
            diagnostic: None,
        };
    }

    if !translator.supports(&language, target_language) {
        warn!(
            segment_id = %segment.segment_id,
            language = %language,
            target_language,
            "Language pair unsupported, passing segment through"
        );
        let detail = format!("{} cannot translate {} -> {}", provider, language, target_language);
        return fallback(segment, provider, "unsupported_language_pair", detail);
    }

    let attempt = translator
        .translate(&segment.source_text, &language, target_language)
        .await;

    match attempt.result {
        Ok(translation) => {
            let heuristic = alignment_quality(&segment.source_text, &translation.text, &language);
            let quality = round3(translation.quality_score.min(heuristic).clamp(0.0, 1.0));
            let alignment = SegmentAlignment {
                segment_id: segment.segment_id.clone(),
                source_offsets: (0, source_len),
                target_offsets: (0, translation.text.chars().count()),
                provider,
                method: AlignmentMethod::Provider,
                quality_score: quality,
            };
            segment.translated_text = Some(translation.text);
            SegmentTranslation {
                segment,
                alignment,
                required: true,
                diagnostic: None,
            }
        }
        Err(e) => {
            warn!(
                segment_id = %segment.segment_id,
                reason = e.kind.reason_code(),
                attempts = attempt.failures.len(),
                "Translation degraded to pass-through"
            );
            let detail = format!("{} after {} failed attempt(s)", e.kind, attempt.failures.len());
            fallback(segment, provider, e.kind.reason_code(), detail)
        }
    }
}

/// Keep the source text, scored at [`FALLBACK_QUALITY`], with a diagnostic.
fn fallback(segment: Segment, provider: String, reason: &str, detail: String) -> SegmentTranslation {
    let source_len = segment.source_text.chars().count();
    let diagnostic = ProviderDiagnostic {
        stage: PipelineStage::Translation,
        provider: provider.clone(),
        reason: reason.to_string(),
        segment_id: Some(segment.segment_id.clone()),
        detail,
    };
    let alignment = SegmentAlignment {
        segment_id: segment.segment_id.clone(),
        source_offsets: (0, source_len),
        target_offsets: (0, source_len),
        provider,
        method: AlignmentMethod::FallbackPassthrough,
        quality_score: FALLBACK_QUALITY,
    };
    SegmentTranslation {
        segment,
        alignment,
        required: true,
        diagnostic: Some(diagnostic),
    }
}
