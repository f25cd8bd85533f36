//! Insight generation and the evidence-consistency check.
//!
//! Candidates are produced at three granularities:
//! - macro: one thesis spanning the first and last beat
//! - meso: one summary per populated stage
//! - micro: one observation per beat and per theme signal
//!
//! Each candidate records the terms it claims are present in its evidence.
//! [`check_evidence`] drops candidates whose cited segments do not contain
//! at least half of those terms.

use crate::beats::BEAT_CONFIDENCE;
use crate::lexicon::{content_terms, round3, token_set};
use crate::stages::{group_by_stage, signal_confidence};
use crate::themes::FALLBACK_THEME;
use std::collections::{BTreeMap, BTreeSet};
use storylens_core::{Beat, Granularity, Insight, Segment, StoryStage, ThemeSignal, stable_id};
use tracing::{debug, info, instrument, warn};

const MACRO_CONFIDENCE: f64 = 0.72;
const MESO_CONFIDENCE: f64 = 0.7;
const MICRO_CONFIDENCE: f64 = 0.68;

/// Largest confidence boost from theme strength.
const MAX_THEME_BOOST: f64 = 0.15;

/// Share of referenced terms that must appear in the evidence.
const MIN_TERM_COVERAGE: f64 = 0.5;

/// Insights after the evidence-consistency check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsightReport {
    /// Every generated insight, before the check
    pub candidates: Vec<Insight>,
    /// Insights that passed the check
    pub published: Vec<Insight>,
    /// Candidates dropped by the check
    pub excluded_insight_ids: Vec<String>,
}

fn merge_ids<'a>(lists: impl IntoIterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for id in lists.into_iter().flatten() {
        if !merged.contains(id) {
            merged.push(id.clone());
        }
    }
    merged
}

fn merge_terms<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for text in texts {
        for term in content_terms(text) {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
    }
    terms
}

struct Draft {
    granularity: Granularity,
    stage: Option<StoryStage>,
    title: String,
    text: String,
    referenced_terms: Vec<String>,
    evidence_segment_ids: Vec<String>,
    base: f64,
}

/// Generate candidate insights from beats and theme signals.
#[instrument(skip_all, fields(beats = beats.len(), themes = themes.len()))]
pub fn generate_insights(
    beats: &[Beat],
    themes: &[ThemeSignal],
    segments: &[Segment],
) -> Vec<Insight> {
    let (Some(first), Some(last)) = (beats.first(), beats.last()) else {
        return Vec::new();
    };

    let fidelity = beats
        .iter()
        .map(|beat| (beat.confidence / BEAT_CONFIDENCE).min(1.0))
        .sum::<f64>()
        / beats.len() as f64;
    let boost = if themes.is_empty() {
        0.0
    } else {
        let mean = themes.iter().map(|t| t.value).sum::<f64>() / themes.len() as f64;
        (mean * 0.2).min(MAX_THEME_BOOST)
    };

    let mut drafts = Vec::new();

    drafts.push(Draft {
        granularity: Granularity::Macro,
        stage: None,
        title: "Story thesis".to_string(),
        text: if beats.len() == 1 {
            format!("The story rests on a single {} beat: {}", first.stage, first.summary)
        } else {
            format!(
                "The story moves from {} to {}: it opens with \"{}\" and closes with \"{}\"",
                first.stage, last.stage, first.summary, last.summary
            )
        },
        referenced_terms: merge_terms([first.summary.as_str(), last.summary.as_str()]),
        evidence_segment_ids: merge_ids([&first.evidence_segment_ids, &last.evidence_segment_ids]),
        base: MACRO_CONFIDENCE,
    });

    for group in group_by_stage(beats, segments) {
        let summaries: Vec<&str> = group.beats.iter().map(|b| b.summary.as_str()).collect();
        drafts.push(Draft {
            granularity: Granularity::Meso,
            stage: Some(group.stage),
            title: format!("{} stage", group.stage),
            text: format!(
                "The {} stage spans {} beat(s): {}",
                group.stage,
                group.beats.len(),
                summaries.join("; ")
            ),
            referenced_terms: merge_terms(summaries.iter().copied()),
            evidence_segment_ids: group.segment_ids.clone(),
            base: MESO_CONFIDENCE,
        });
    }

    for (position, beat) in beats.iter().enumerate() {
        drafts.push(Draft {
            granularity: Granularity::Micro,
            stage: Some(beat.stage),
            title: format!("Beat {}", position + 1),
            text: format!("{} beat: {}", beat.stage, beat.summary),
            referenced_terms: content_terms(&beat.summary),
            evidence_segment_ids: beat.evidence_segment_ids.clone(),
            base: MICRO_CONFIDENCE,
        });
    }

    for theme in themes {
        let referenced_terms = if theme.label == FALLBACK_THEME {
            content_terms(&first.summary)
        } else {
            theme.keywords.clone()
        };
        drafts.push(Draft {
            granularity: Granularity::Micro,
            stage: Some(theme.stage),
            title: format!("Theme: {}", theme.label),
            text: format!(
                "The {} theme is {} in the {} stage (strength {:.3})",
                theme.label, theme.direction, theme.stage, theme.value
            ),
            referenced_terms,
            evidence_segment_ids: theme.evidence_segment_ids.clone(),
            base: MICRO_CONFIDENCE,
        });
    }

    let insights: Vec<Insight> = drafts
        .into_iter()
        .map(|draft| Insight {
            insight_id: stable_id(
                "ins",
                &format!("{}:{}:{}", draft.granularity, draft.title, draft.text),
            ),
            granularity: draft.granularity,
            stage: draft.stage,
            title: draft.title,
            text: draft.text,
            referenced_terms: draft.referenced_terms,
            evidence_segment_ids: draft.evidence_segment_ids,
            confidence: signal_confidence(draft.base + boost, fidelity),
        })
        .collect();

    info!(
        candidates = insights.len(),
        boost = round3(boost),
        "Generated insight candidates"
    );
    insights
}

/// Whether an insight's cited segments support its referenced terms.
///
/// At least one cited segment must exist, and at least half of the
/// referenced terms must occur in the cited segments' text.
pub fn is_evidence_consistent(insight: &Insight, tokens_by_segment: &BTreeMap<&str, BTreeSet<String>>) -> bool {
    let cited: Vec<&BTreeSet<String>> = insight
        .evidence_segment_ids
        .iter()
        .filter_map(|id| tokens_by_segment.get(id.as_str()))
        .collect();
    if cited.is_empty() {
        return false;
    }
    if insight.referenced_terms.is_empty() {
        return true;
    }
    let found = insight
        .referenced_terms
        .iter()
        .filter(|term| {
            let lower = term.to_lowercase();
            cited.iter().any(|tokens| tokens.contains(&lower))
        })
        .count();
    found as f64 / insight.referenced_terms.len() as f64 >= MIN_TERM_COVERAGE
}

/// Run the evidence-consistency check over candidate insights.
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub fn check_evidence(candidates: Vec<Insight>, segments: &[Segment]) -> InsightReport {
    let tokens_by_segment: BTreeMap<&str, BTreeSet<String>> = segments
        .iter()
        .map(|s| (s.segment_id.as_str(), token_set(s.analysis_text())))
        .collect();

    let mut report = InsightReport::default();
    for insight in &candidates {
        if is_evidence_consistent(insight, &tokens_by_segment) {
            report.published.push(insight.clone());
        } else {
            warn!(insight_id = %insight.insight_id, title = %insight.title, "Insight excluded: evidence does not support it");
            report.excluded_insight_ids.push(insight.insight_id.clone());
        }
    }
    debug!(
        published = report.published.len(),
        excluded = report.excluded_insight_ids.len(),
        "Evidence check complete"
    );
    report.candidates = candidates;
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insight(terms: &[&str], evidence: &[&str]) -> Insight {
        Insight {
            insight_id: "ins_test".to_string(),
            granularity: Granularity::Micro,
            stage: None,
            title: "t".to_string(),
            text: "t".to_string(),
            referenced_terms: terms.iter().map(|t| t.to_string()).collect(),
            evidence_segment_ids: evidence.iter().map(|e| e.to_string()).collect(),
            confidence: 0.7,
        }
    }

    #[test]
    fn test_half_of_terms_is_enough() {
        let mut tokens = BTreeMap::new();
        tokens.insert("seg_a", token_set("The archive burned at night"));
        assert!(is_evidence_consistent(&insight(&["archive", "ledger"], &["seg_a"]), &tokens));
        assert!(!is_evidence_consistent(
            &insight(&["ledger", "harbor", "archive"], &["seg_a"]),
            &tokens
        ));
    }

    #[test]
    fn test_unknown_evidence_is_inconsistent() {
        let tokens = BTreeMap::new();
        assert!(!is_evidence_consistent(&insight(&[], &["seg_missing"]), &tokens));
    }
}
