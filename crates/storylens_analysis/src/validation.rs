//! Data-model invariant checks.
//!
//! Each check names the stage that produced the record and the record that
//! broke the invariant. A violation is fatal for the run.

use std::collections::BTreeSet;
use storylens_core::{
    AnalysisRun, ArcPoint, Beat, ConflictShift, EmotionSignal, Event, Insight, PipelineStage,
    Segment, ThemeSignal, TimelineView,
};
use storylens_error::InvariantError;
use tracing::error;

type Check = Result<(), InvariantError>;

#[track_caller]
fn violation(stage: PipelineStage, record: &str, message: impl Into<String>) -> InvariantError {
    let err = InvariantError::new(stage.to_string(), record, message);
    error!(stage = %err.stage, record = %err.record, message = %err.message, "Invariant violated");
    err
}

fn known_ids(segments: &[Segment]) -> BTreeSet<&str> {
    segments.iter().map(|s| s.segment_id.as_str()).collect()
}

fn check_evidence(
    stage: PipelineStage,
    record: &str,
    evidence: &[String],
    known: &BTreeSet<&str>,
) -> Check {
    if evidence.is_empty() {
        return Err(violation(stage, record, "cites no evidence segments"));
    }
    if let Some(missing) = evidence.iter().find(|id| !known.contains(id.as_str())) {
        return Err(violation(
            stage,
            record,
            format!("cites unknown segment {}", missing),
        ));
    }
    Ok(())
}

fn check_confidence(stage: PipelineStage, record: &str, confidence: f64) -> Check {
    if confidence > 0.0 && confidence <= 1.0 {
        Ok(())
    } else {
        Err(violation(
            stage,
            record,
            format!("confidence {} outside (0, 1]", confidence),
        ))
    }
}

fn check_provenance(
    stage: PipelineStage,
    record: &str,
    evidence: &[String],
    provenance: &[String],
) -> Check {
    if provenance.iter().any(|id| evidence.contains(id)) {
        Ok(())
    } else {
        Err(violation(
            stage,
            record,
            "evidence and provenance are disjoint",
        ))
    }
}

/// Every event cites at least one known segment.
pub fn validate_events(events: &[Event], segments: &[Segment]) -> Result<(), InvariantError> {
    let known = known_ids(segments);
    for event in events {
        check_evidence(
            PipelineStage::Extraction,
            &event.event_id,
            &event.segment_ids,
            &known,
        )?;
        check_confidence(PipelineStage::Extraction, &event.event_id, event.confidence)?;
    }
    Ok(())
}

/// Beats exist when events do, cite known segments, and never move backwards.
pub fn validate_beats(
    beats: &[Beat],
    events: &[Event],
    segments: &[Segment],
) -> Result<(), InvariantError> {
    if beats.is_empty() && !events.is_empty() {
        return Err(violation(
            PipelineStage::Signals,
            "beats",
            "story has events but no beats",
        ));
    }
    let known = known_ids(segments);
    let mut ordered: Vec<&Beat> = beats.iter().collect();
    ordered.sort_by_key(|b| b.narrative_order);

    let mut highest = None;
    for beat in ordered {
        check_evidence(
            PipelineStage::Signals,
            &beat.beat_id,
            &beat.evidence_segment_ids,
            &known,
        )?;
        check_confidence(PipelineStage::Signals, &beat.beat_id, beat.confidence)?;
        if highest.is_some_and(|stage| beat.stage < stage) {
            return Err(violation(
                PipelineStage::Signals,
                &beat.beat_id,
                format!("stage {} follows a later stage", beat.stage),
            ));
        }
        highest = highest.max(Some(beat.stage));
    }
    Ok(())
}

/// Theme, arc, conflict, and emotion signals carry overlapping evidence and provenance.
pub fn validate_signals(
    themes: &[ThemeSignal],
    arcs: &[ArcPoint],
    conflicts: &[ConflictShift],
    emotions: &[EmotionSignal],
    segments: &[Segment],
) -> Result<(), InvariantError> {
    let known = known_ids(segments);
    let stage = PipelineStage::Signals;

    for theme in themes {
        check_evidence(stage, &theme.signal_id, &theme.evidence_segment_ids, &known)?;
        check_provenance(
            stage,
            &theme.signal_id,
            &theme.evidence_segment_ids,
            &theme.provenance_segment_ids,
        )?;
        check_confidence(stage, &theme.signal_id, theme.confidence)?;
    }
    for point in arcs {
        let record = format!("{}@{}", point.lane, point.stage);
        check_evidence(stage, &record, &point.evidence_segment_ids, &known)?;
        check_provenance(
            stage,
            &record,
            &point.evidence_segment_ids,
            &point.provenance_segment_ids,
        )?;
        check_confidence(stage, &record, point.confidence)?;
    }
    for shift in conflicts {
        let record = format!("conflict:{}->{}", shift.from_stage, shift.stage);
        check_evidence(stage, &record, &shift.evidence_segment_ids, &known)?;
        check_provenance(
            stage,
            &record,
            &shift.evidence_segment_ids,
            &shift.provenance_segment_ids,
        )?;
    }
    for emotion in emotions {
        let record = format!("emotion@{}", emotion.stage);
        check_evidence(stage, &record, &emotion.evidence_segment_ids, &known)?;
        check_provenance(
            stage,
            &record,
            &emotion.evidence_segment_ids,
            &emotion.provenance_segment_ids,
        )?;
    }
    Ok(())
}

/// Both views are permutations of the event set and the score is in range.
pub fn validate_timeline(view: &TimelineView, events: &[Event]) -> Result<(), InvariantError> {
    let stage = PipelineStage::Timeline;
    let expected: BTreeSet<&str> = events.iter().map(|e| e.event_id.as_str()).collect();

    for (name, order) in [
        ("narrative_order", &view.narrative_order),
        ("actual_time", &view.actual_time),
    ] {
        let seen: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        if order.len() != events.len() || seen != expected {
            return Err(violation(
                stage,
                name,
                "view is not a permutation of the extracted events",
            ));
        }
    }
    for conflict in &view.conflicts {
        if let Some(missing) = conflict
            .event_ids
            .iter()
            .find(|id| !expected.contains(id.as_str()))
        {
            return Err(violation(
                stage,
                &conflict.conflict_id,
                format!("references unknown event {}", missing),
            ));
        }
    }
    if !(0.0..=1.0).contains(&view.consistency) {
        return Err(violation(
            stage,
            "consistency",
            format!("score {} outside [0, 1]", view.consistency),
        ));
    }
    Ok(())
}

/// Published insights cite known segments.
pub fn validate_insights(
    insights: &[Insight],
    segments: &[Segment],
) -> Result<(), InvariantError> {
    let known = known_ids(segments);
    for insight in insights {
        check_evidence(
            PipelineStage::Insights,
            &insight.insight_id,
            &insight.evidence_segment_ids,
            &known,
        )?;
        check_confidence(
            PipelineStage::Insights,
            &insight.insight_id,
            insight.confidence,
        )?;
    }
    Ok(())
}

/// Run every check over a complete run.
pub fn validate_run(run: &AnalysisRun) -> Result<(), InvariantError> {
    validate_events(&run.events, &run.segments)?;
    validate_beats(&run.beats, &run.events, &run.segments)?;
    validate_signals(
        &run.themes,
        &run.arcs,
        &run.conflicts,
        &run.emotions,
        &run.segments,
    )?;
    validate_timeline(&run.timeline, &run.events)?;
    validate_insights(&run.insights, &run.segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storylens_core::StoryStage;

    fn beat(id: &str, order: usize, stage: StoryStage) -> Beat {
        Beat {
            beat_id: id.to_string(),
            stage,
            narrative_order: order,
            event_ids: Vec::new(),
            summary: String::new(),
            evidence_segment_ids: Vec::new(),
            confidence: 0.71,
        }
    }

    #[test]
    fn test_beat_without_evidence_is_rejected() {
        let err = validate_beats(&[beat("beat_a", 1, StoryStage::Setup)], &[], &[]).unwrap_err();
        assert_eq!(err.stage, "signals");
        assert_eq!(err.record, "beat_a");
    }

    #[test]
    fn test_disjoint_provenance_is_rejected() {
        let err = check_provenance(
            PipelineStage::Signals,
            "theme_a",
            &["seg_a".to_string()],
            &["seg_b".to_string()],
        )
        .unwrap_err();
        assert!(err.message.contains("disjoint"));
    }
}
