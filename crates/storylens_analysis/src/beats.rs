//! Beat detection.
//!
//! Each event becomes one beat. The base stage comes from the event's
//! relative narrative position; escalation and resolution cue words may move
//! it forward by one stage, and a running maximum keeps first occurrences in
//! stage order.

use crate::extraction::RULE_CONFIDENCE;
use crate::lexicon::{ESCALATION_CUES, RESOLUTION_CUES, count_matches, tokenize};
use crate::stages::signal_confidence;
use std::collections::BTreeMap;
use storylens_core::{Beat, Event, Segment, StoryStage, stable_id};
use tracing::{debug, instrument};

/// Confidence of a beat backed by full-fidelity extraction.
pub const BEAT_CONFIDENCE: f64 = 0.71;

/// Share of full extraction fidelity behind an event, in `(0, 1]`.
pub fn event_fidelity(event: &Event) -> f64 {
    (event.confidence / RULE_CONFIDENCE).clamp(0.0, 1.0)
}

fn cue_adjusted(base: StoryStage, tokens: &[String]) -> StoryStage {
    let escalation = count_matches(tokens, ESCALATION_CUES);
    let resolution = count_matches(tokens, RESOLUTION_CUES);
    match base {
        StoryStage::Setup if escalation > resolution => StoryStage::Escalation,
        StoryStage::Climax if resolution > escalation => StoryStage::Resolution,
        other => other,
    }
}

/// Detect one beat per event.
///
/// # Examples
///
/// ```
/// use storylens_analysis::detect_beats;
///
/// assert!(detect_beats(&[], &[]).is_empty());
/// ```
#[instrument(skip_all, fields(events = events.len()))]
pub fn detect_beats(events: &[Event], segments: &[Segment]) -> Vec<Beat> {
    let texts: BTreeMap<&str, &str> = segments
        .iter()
        .map(|s| (s.segment_id.as_str(), s.analysis_text()))
        .collect();

    let total = events.len();
    let mut floor = StoryStage::Setup;
    let mut beats = Vec::with_capacity(total);

    for (index, event) in events.iter().enumerate() {
        let tokens: Vec<String> = event
            .segment_ids
            .iter()
            .filter_map(|id| texts.get(id.as_str()))
            .flat_map(|text| tokenize(text))
            .collect();

        let base = StoryStage::for_position(index + 1, total);
        let stage = cue_adjusted(base, &tokens).max(floor);
        floor = stage;

        let beat = Beat {
            beat_id: stable_id("beat", &format!("{}:{}", event.event_id, stage)),
            stage,
            narrative_order: event.narrative_order,
            event_ids: vec![event.event_id.clone()],
            summary: event.description.clone(),
            evidence_segment_ids: event.segment_ids.clone(),
            confidence: signal_confidence(BEAT_CONFIDENCE, event_fidelity(event)),
        };
        debug!(beat_id = %beat.beat_id, stage = %beat.stage, base = %base, "Detected beat");
        beats.push(beat);
    }
    beats
}
