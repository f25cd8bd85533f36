//! Theme tracking across story stages.

use crate::lexicon::{THEME_KEYWORDS, round3};
use crate::beats::BEAT_CONFIDENCE;
use crate::stages::{group_by_stage, signal_confidence};
use storylens_core::{Beat, Segment, StoryStage, ThemeDirection, ThemeSignal, stable_id};
use tracing::{debug, instrument};

/// Confidence of a keyword-backed theme signal at full fidelity.
pub const THEME_CONFIDENCE: f64 = 0.66;

/// Label of the placeholder theme emitted when no keyword matches.
pub const FALLBACK_THEME: &str = "story";

const FALLBACK_CONFIDENCE: f64 = 0.33;
const FALLBACK_VALUE: f64 = 0.5;

fn direction(previous: Option<f64>, current: f64) -> ThemeDirection {
    match previous {
        None => ThemeDirection::Emerging,
        Some(prev) if current > prev => ThemeDirection::Strengthening,
        Some(prev) if current < prev => ThemeDirection::Fading,
        Some(_) => ThemeDirection::Steady,
    }
}

/// Per-stage keyword hits for one theme.
struct StageHits {
    stage: StoryStage,
    hits: usize,
    keywords: Vec<String>,
    evidence: Vec<String>,
    provenance: Vec<String>,
    fidelity: f64,
}

/// Track named themes through the populated stages.
///
/// A theme's value in a stage is its share of that theme's keyword hits
/// across the story; its direction compares with the previous stage in
/// which it appeared. Evidence is the segments that contain a keyword;
/// provenance is every segment behind the stage's beats.
#[instrument(skip_all, fields(beats = beats.len()))]
pub fn track_themes(beats: &[Beat], segments: &[Segment]) -> Vec<ThemeSignal> {
    let groups = group_by_stage(beats, segments);
    let mut signals = Vec::new();

    for (label, keywords) in THEME_KEYWORDS {
        let mut per_stage: Vec<StageHits> = Vec::new();
        for group in &groups {
            let mut hits = 0;
            let mut matched: Vec<String> = Vec::new();
            let mut evidence = Vec::new();
            for (segment_id, tokens) in group.segment_ids.iter().zip(&group.segment_tokens) {
                let mut found = false;
                for token in tokens {
                    if keywords.contains(&token.as_str()) {
                        hits += 1;
                        found = true;
                        if !matched.contains(token) {
                            matched.push(token.clone());
                        }
                    }
                }
                if found {
                    evidence.push(segment_id.clone());
                }
            }
            if hits > 0 {
                per_stage.push(StageHits {
                    stage: group.stage,
                    hits,
                    keywords: matched,
                    evidence,
                    provenance: group.segment_ids.clone(),
                    fidelity: group.fidelity(),
                });
            }
        }

        let total: usize = per_stage.iter().map(|s| s.hits).sum();
        let mut previous = None;
        for stage_hits in per_stage {
            let value = round3(stage_hits.hits as f64 / total as f64);
            let signal = ThemeSignal {
                signal_id: stable_id("theme", &format!("{}:{}", label, stage_hits.stage)),
                label: label.to_string(),
                stage: stage_hits.stage,
                value,
                direction: direction(previous, value),
                keywords: stage_hits.keywords,
                confidence: signal_confidence(THEME_CONFIDENCE, stage_hits.fidelity),
                evidence_segment_ids: stage_hits.evidence,
                provenance_segment_ids: stage_hits.provenance,
            };
            debug!(label, stage = %signal.stage, value, direction = %signal.direction, "Theme signal");
            previous = Some(value);
            signals.push(signal);
        }
    }

    if let Some(first) = beats.first().filter(|_| signals.is_empty()) {
        signals.push(ThemeSignal {
            signal_id: stable_id("theme", &format!("{}:{}", FALLBACK_THEME, first.stage)),
            label: FALLBACK_THEME.to_string(),
            stage: first.stage,
            value: FALLBACK_VALUE,
            direction: ThemeDirection::Emerging,
            keywords: Vec::new(),
            confidence: signal_confidence(
                FALLBACK_CONFIDENCE,
                (first.confidence / BEAT_CONFIDENCE).min(1.0),
            ),
            evidence_segment_ids: first.evidence_segment_ids.clone(),
            provenance_segment_ids: first.evidence_segment_ids.clone(),
        });
    }

    signals.sort_by(|a, b| a.stage.cmp(&b.stage).then_with(|| a.label.cmp(&b.label)));
    signals
}
