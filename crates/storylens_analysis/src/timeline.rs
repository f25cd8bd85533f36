//! Dual-view timeline composition and conflict detection.
//!
//! The narrative view keeps events in extraction order. The chronological
//! view sorts by `actual_time`, untimed events last, with narrative order
//! as the stable secondary key.
//!
//! An adjacent pair in the chronological view is a `chronology_inversion`
//! when the later-in-time event comes earlier in the story by more than the
//! configured tolerance and neither event carries a causal marker. A
//! flashback introduced by "because" or "after" is therefore not a conflict.

use crate::lexicon::round3;
use storylens_core::{ConflictCode, Event, TimelineConflict, TimelineView, stable_id};
use storylens_resilience::TimelineConfig;
use tracing::{debug, info, instrument};

fn conflict(code: ConflictCode, event_ids: Vec<String>, description: String) -> TimelineConflict {
    TimelineConflict {
        conflict_id: stable_id("conf", &format!("{}:{}", code, event_ids.join(","))),
        code,
        event_ids,
        description,
    }
}

/// Consistency score for `conflicts` among `events` events.
///
/// # Examples
///
/// ```
/// use storylens_analysis::timeline_consistency;
///
/// assert_eq!(timeline_consistency(1, 3), 0.5);
/// assert_eq!(timeline_consistency(0, 0), 1.0);
/// assert_eq!(timeline_consistency(5, 2), 0.0);
/// ```
pub fn timeline_consistency(conflicts: usize, events: usize) -> f64 {
    let pairs = events.saturating_sub(1).max(1) as f64;
    round3((1.0 - conflicts as f64 / pairs).clamp(0.0, 1.0))
}

/// Compose the narrative and chronological views of `events`.
#[instrument(skip_all, fields(events = events.len(), tolerance = *config.inversion_tolerance()))]
pub fn compose_timeline(events: &[Event], config: &TimelineConfig) -> TimelineView {
    let tolerance = *config.inversion_tolerance();
    let narrative_order: Vec<String> = events.iter().map(|e| e.event_id.clone()).collect();

    let mut chronological: Vec<&Event> = events.iter().collect();
    chronological.sort_by(|a, b| {
        a.actual_time
            .is_none()
            .cmp(&b.actual_time.is_none())
            .then_with(|| a.actual_time.cmp(&b.actual_time))
            .then_with(|| a.narrative_order.cmp(&b.narrative_order))
    });

    let mut conflicts = Vec::new();

    for pair in chronological.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        let (Some(earlier_time), Some(later_time)) = (earlier.actual_time, later.actual_time)
        else {
            continue;
        };
        if earlier.narrative_order <= later.narrative_order {
            continue;
        }
        let displacement = earlier.narrative_order - later.narrative_order;
        if displacement <= tolerance {
            continue;
        }
        if earlier.causal_marker.is_some() || later.causal_marker.is_some() {
            debug!(
                earlier = %earlier.event_id,
                later = %later.event_id,
                "Inversion explained by causal marker"
            );
            continue;
        }
        conflicts.push(conflict(
            ConflictCode::ChronologyInversion,
            vec![earlier.event_id.clone(), later.event_id.clone()],
            format!(
                "Event at {} is told after event at {} without a causal link",
                earlier_time, later_time
            ),
        ));
    }

    for event in events.iter().filter(|e| e.time_anchors.len() > 1) {
        let anchors: Vec<String> = event.time_anchors.iter().map(|t| t.to_string()).collect();
        conflicts.push(conflict(
            ConflictCode::ConflictingTimeAnchors,
            vec![event.event_id.clone()],
            format!("Event states several explicit times: {}", anchors.join(", ")),
        ));
    }

    let consistency = timeline_consistency(conflicts.len(), events.len());
    info!(
        conflicts = conflicts.len(),
        consistency, "Timeline composed"
    );

    TimelineView {
        narrative_order,
        actual_time: chronological.iter().map(|e| e.event_id.clone()).collect(),
        conflicts,
        consistency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(id: &str, order: usize, year: Option<i32>, marker: Option<&str>) -> Event {
        let time = year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)?.and_hms_opt(0, 0, 0));
        Event {
            event_id: id.to_string(),
            segment_ids: vec![format!("seg_{}", id)],
            description: id.to_string(),
            participants: Vec::new(),
            narrative_order: order,
            actual_time: time,
            time_anchors: time.into_iter().collect(),
            causal_marker: marker.map(str::to_string),
            confidence: 0.72,
        }
    }

    #[test]
    fn test_untimed_events_sort_last() {
        let events = vec![
            event("a", 0, None, None),
            event("b", 1, Some(1990), None),
        ];
        let view = compose_timeline(&events, &TimelineConfig::default());
        assert_eq!(view.actual_time, vec!["b", "a"]);
        assert!(view.conflicts.is_empty());
    }

    #[test]
    fn test_tolerance_absorbs_small_displacement() {
        let events = vec![
            event("a", 0, Some(2001), None),
            event("b", 1, Some(1999), None),
        ];
        let strict = compose_timeline(&events, &TimelineConfig::default());
        assert_eq!(strict.conflicts.len(), 1);

        let lenient = compose_timeline(&events, &TimelineConfig::default().with_inversion_tolerance(1));
        assert!(lenient.conflicts.is_empty());
        assert_eq!(lenient.consistency, 1.0);
    }

    #[test]
    fn test_causal_marker_suppresses_inversion() {
        let events = vec![
            event("a", 0, Some(2001), None),
            event("b", 1, Some(1999), Some("because")),
        ];
        let view = compose_timeline(&events, &TimelineConfig::default());
        assert!(view.conflicts.is_empty());
    }
}
