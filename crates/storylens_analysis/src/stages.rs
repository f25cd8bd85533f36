//! Beats grouped by story stage, shared by the signal trackers.

use crate::beats::BEAT_CONFIDENCE;
use crate::lexicon::{round3, tokenize};
use std::collections::BTreeMap;
use storylens_core::{Beat, Segment, StoryStage};

/// Beats of one populated stage with their evidence text.
#[derive(Debug, Clone)]
pub(crate) struct StageGroup<'a> {
    pub stage: StoryStage,
    pub beats: Vec<&'a Beat>,
    /// Evidence segment ids of the stage's beats, first-seen order
    pub segment_ids: Vec<String>,
    /// Tokens of each evidence segment, same order as `segment_ids`
    pub segment_tokens: Vec<Vec<String>>,
}

impl StageGroup<'_> {
    /// Every token in the stage's evidence.
    pub fn tokens(&self) -> impl Iterator<Item = &String> {
        self.segment_tokens.iter().flatten()
    }

    /// Mean extraction fidelity of the stage's beats.
    pub fn fidelity(&self) -> f64 {
        if self.beats.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .beats
            .iter()
            .map(|beat| (beat.confidence / BEAT_CONFIDENCE).min(1.0))
            .sum();
        sum / self.beats.len() as f64
    }
}

/// Scale a base confidence by fidelity, never reaching zero.
pub(crate) fn signal_confidence(base: f64, fidelity: f64) -> f64 {
    round3(base * fidelity.clamp(0.0, 1.0)).max(0.001)
}

/// Group beats by stage, in stage order, skipping empty stages.
pub(crate) fn group_by_stage<'a>(beats: &'a [Beat], segments: &[Segment]) -> Vec<StageGroup<'a>> {
    let texts: BTreeMap<&str, &str> = segments
        .iter()
        .map(|s| (s.segment_id.as_str(), s.analysis_text()))
        .collect();

    StoryStage::ALL
        .iter()
        .filter_map(|stage| {
            let stage_beats: Vec<&Beat> = beats.iter().filter(|b| b.stage == *stage).collect();
            if stage_beats.is_empty() {
                return None;
            }
            let mut segment_ids: Vec<String> = Vec::new();
            for beat in &stage_beats {
                for id in &beat.evidence_segment_ids {
                    if !segment_ids.contains(id) {
                        segment_ids.push(id.clone());
                    }
                }
            }
            let segment_tokens = segment_ids
                .iter()
                .map(|id| texts.get(id.as_str()).map(|t| tokenize(t)).unwrap_or_default())
                .collect();
            Some(StageGroup {
                stage: *stage,
                beats: stage_beats,
                segment_ids,
                segment_tokens,
            })
        })
        .collect()
}
