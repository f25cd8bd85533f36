//! Character, conflict, and emotion arcs.
//!
//! Lanes:
//! - `character:<name>`: share of a stage's beats the character takes part in
//! - `conflict`: negative-lexicon intensity per stage
//! - `emotion`: valence score per stage
//!
//! Only populated stages produce points, so every point has evidence.

use crate::lexicon::{NEGATIVE_WORDS, POSITIVE_WORDS, round3};
use crate::stages::{StageGroup, group_by_stage, signal_confidence};
use std::collections::BTreeMap;
use storylens_core::{
    ArcPoint, Beat, ConflictShift, EmotionSignal, Entity, EntityKind, Event, Segment,
};
use tracing::{info, instrument};

const CHARACTER_CONFIDENCE: f64 = 0.68;
const CONFLICT_CONFIDENCE: f64 = 0.6;
const EMOTION_CONFIDENCE: f64 = 0.62;

/// Valence at or above this reads as positive.
const POSITIVE_TONE: f64 = 0.55;
/// Valence at or below this reads as negative.
const NEGATIVE_TONE: f64 = 0.45;

/// Output of the arc tracker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArcTracks {
    /// Points for every lane, lane-major then stage order
    pub arcs: Vec<ArcPoint>,
    /// Conflict intensity changes between consecutive populated stages
    pub conflicts: Vec<ConflictShift>,
    /// Emotional valence per populated stage
    pub emotions: Vec<EmotionSignal>,
}

/// Valence in `[0, 1]`: 0.5 is neutral.
pub fn valence(positive: usize, negative: usize) -> f64 {
    if positive + negative == 0 {
        return 0.5;
    }
    round3((positive as f64 + 1.0) / (positive as f64 + negative as f64 + 2.0))
}

/// Tone label for a valence score.
pub fn tone(score: f64) -> &'static str {
    if score >= POSITIVE_TONE {
        "positive"
    } else if score <= NEGATIVE_TONE {
        "negative"
    } else {
        "neutral"
    }
}

fn conflict_intensity(group: &StageGroup<'_>) -> f64 {
    let hits = group
        .tokens()
        .filter(|token| NEGATIVE_WORDS.contains(&token.as_str()))
        .count();
    round3((hits as f64 / group.beats.len().max(1) as f64).min(1.0))
}

fn shift_label(delta: f64) -> &'static str {
    if delta > 0.0 {
        "rising"
    } else if delta < 0.0 {
        "falling"
    } else {
        "flat"
    }
}

/// Track arcs over beats, events, and character entities.
#[instrument(skip_all, fields(beats = beats.len(), entities = entities.len()))]
pub fn track_arcs(
    beats: &[Beat],
    events: &[Event],
    entities: &[Entity],
    segments: &[Segment],
) -> ArcTracks {
    let groups = group_by_stage(beats, segments);
    let participants: BTreeMap<&str, &Event> =
        events.iter().map(|e| (e.event_id.as_str(), e)).collect();

    let mut tracks = ArcTracks::default();

    let mut characters: Vec<&Entity> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Character)
        .collect();
    characters.sort_by_key(|e| e.name.to_lowercase());

    for character in characters {
        let key = character.name.to_lowercase();
        let lane = format!("character:{}", key);
        for group in &groups {
            let present: Vec<&Beat> = group
                .beats
                .iter()
                .copied()
                .filter(|beat| {
                    beat.event_ids.iter().any(|id| {
                        participants
                            .get(id.as_str())
                            .is_some_and(|e| e.participants.iter().any(|p| p.to_lowercase() == key))
                    })
                })
                .collect();
            if present.is_empty() {
                continue;
            }
            let evidence: Vec<String> = present
                .iter()
                .flat_map(|beat| beat.evidence_segment_ids.iter().cloned())
                .fold(Vec::new(), |mut acc, id| {
                    if !acc.contains(&id) {
                        acc.push(id);
                    }
                    acc
                });
            tracks.arcs.push(ArcPoint {
                lane: lane.clone(),
                label: character.name.clone(),
                stage: group.stage,
                value: round3(present.len() as f64 / group.beats.len() as f64),
                confidence: signal_confidence(CHARACTER_CONFIDENCE, group.fidelity()),
                evidence_segment_ids: evidence.clone(),
                provenance_segment_ids: evidence,
            });
        }
    }

    let mut previous: Option<(&StageGroup<'_>, f64)> = None;
    for group in &groups {
        let intensity = conflict_intensity(group);
        tracks.arcs.push(ArcPoint {
            lane: "conflict".to_string(),
            label: "conflict".to_string(),
            stage: group.stage,
            value: intensity,
            confidence: signal_confidence(CONFLICT_CONFIDENCE, group.fidelity()),
            evidence_segment_ids: group.segment_ids.clone(),
            provenance_segment_ids: group.segment_ids.clone(),
        });
        if let Some((prior, prior_intensity)) = previous {
            let delta = round3(intensity - prior_intensity);
            let mut provenance = prior.segment_ids.clone();
            provenance.extend(group.segment_ids.iter().cloned());
            tracks.conflicts.push(ConflictShift {
                label: shift_label(delta).to_string(),
                stage: group.stage,
                from_stage: prior.stage,
                intensity,
                delta,
                confidence: signal_confidence(CONFLICT_CONFIDENCE, group.fidelity()),
                evidence_segment_ids: group.segment_ids.clone(),
                provenance_segment_ids: provenance,
            });
        }
        previous = Some((group, intensity));
    }

    for group in &groups {
        let positive = group
            .tokens()
            .filter(|token| POSITIVE_WORDS.contains(&token.as_str()))
            .count();
        let negative = group
            .tokens()
            .filter(|token| NEGATIVE_WORDS.contains(&token.as_str()))
            .count();
        let score = valence(positive, negative);
        let label = tone(score).to_string();
        let confidence = signal_confidence(EMOTION_CONFIDENCE, group.fidelity());
        tracks.arcs.push(ArcPoint {
            lane: "emotion".to_string(),
            label: label.clone(),
            stage: group.stage,
            value: score,
            confidence,
            evidence_segment_ids: group.segment_ids.clone(),
            provenance_segment_ids: group.segment_ids.clone(),
        });
        tracks.emotions.push(EmotionSignal {
            label,
            stage: group.stage,
            value: score,
            confidence,
            evidence_segment_ids: group.segment_ids.clone(),
            provenance_segment_ids: group.segment_ids.clone(),
        });
    }

    info!(
        arcs = tracks.arcs.len(),
        conflicts = tracks.conflicts.len(),
        emotions = tracks.emotions.len(),
        "Arc tracking complete"
    );
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valence_and_tone() {
        assert_eq!(valence(0, 0), 0.5);
        assert_eq!(valence(3, 0), 0.8);
        assert_eq!(tone(valence(0, 2)), "negative");
        assert_eq!(tone(0.5), "neutral");
    }
}
