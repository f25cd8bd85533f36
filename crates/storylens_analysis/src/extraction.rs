//! Event and entity extraction.
//!
//! The rule provider reads one segment at a time: the first sentence becomes
//! the event description, capitalized words become characters or locations,
//! known nouns become objects, and explicit dates become time anchors.
//! When the configured provider fails, the stage falls back to a coarse
//! characters-only pass with reduced confidence.

use crate::StageOutcome;
use crate::lexicon::{
    CAUSAL_MARKERS, COMMON_OPENERS, ESCALATION_CUES, LOCATIVE_PREPOSITIONS, OBJECT_NOUNS,
    RESOLUTION_CUES, is_stopword, round3, split_sentences, tokenize,
};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use storylens_core::{
    Entity, EntityKind, EntityMention, Event, PipelineStage, ProviderDiagnostic, Segment,
    SegmentFacts, stable_id,
};
use storylens_error::{ExtractionError, ExtractionErrorKind};
use storylens_interface::ExtractionProvider;
use storylens_resilience::ExtractionConfig;
use tracing::{debug, info, instrument, warn};

/// Confidence of a rule-extracted event.
pub const RULE_CONFIDENCE: f64 = 0.72;

const MAX_DESCRIPTION_CHARS: usize = 240;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2}))?)?\b")
        .expect("valid date regex")
});

static IN_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin\s+(\d{4})\b").expect("valid year regex"));

fn capture_u32(captures: &regex::Captures<'_>, index: usize) -> Option<u32> {
    captures.get(index).and_then(|m| m.as_str().parse().ok())
}

/// Explicit time anchors in order of appearance, without duplicates.
///
/// Recognizes ISO dates (`2020-05-01`), ISO date-times
/// (`2020-05-01T08:30`), and years introduced by `in` (`in 1999`).
pub fn find_time_anchors(text: &str) -> Vec<NaiveDateTime> {
    let mut found: Vec<(usize, NaiveDateTime)> = Vec::new();
    let mut date_spans = Vec::new();

    for captures in ISO_DATE.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        date_spans.push(whole.range());
        let parsed = (|| {
            let year = captures.get(1)?.as_str().parse::<i32>().ok()?;
            let date = NaiveDate::from_ymd_opt(year, capture_u32(&captures, 2)?, capture_u32(&captures, 3)?)?;
            date.and_hms_opt(
                capture_u32(&captures, 4).unwrap_or(0),
                capture_u32(&captures, 5).unwrap_or(0),
                capture_u32(&captures, 6).unwrap_or(0),
            )
        })();
        if let Some(anchor) = parsed {
            found.push((whole.start(), anchor));
        }
    }

    for captures in IN_YEAR.captures_iter(text) {
        let Some(year) = captures.get(1) else {
            continue;
        };
        if date_spans.iter().any(|span| span.contains(&year.start())) {
            continue;
        }
        let anchor = year
            .as_str()
            .parse::<i32>()
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
            .and_then(|d| d.and_hms_opt(0, 0, 0));
        if let Some(anchor) = anchor {
            found.push((year.start(), anchor));
        }
    }

    found.sort_by_key(|(position, _)| *position);
    let mut anchors: Vec<NaiveDateTime> = Vec::new();
    for (_, anchor) in found {
        if !anchors.contains(&anchor) {
            anchors.push(anchor);
        }
    }
    anchors
}

/// First causal or flashback marker in `text`.
pub fn find_causal_marker(text: &str) -> Option<String> {
    tokenize(text)
        .into_iter()
        .find(|token| CAUSAL_MARKERS.contains(&token.as_str()))
}

/// Strip surrounding punctuation and a possessive suffix.
fn clean_word(raw: &str) -> &str {
    let trimmed = raw.trim_matches(|c: char| !c.is_alphanumeric());
    trimmed
        .strip_suffix("'s")
        .or_else(|| trimmed.strip_suffix("\u{2019}s"))
        .unwrap_or(trimmed)
}

fn ends_cleanly(raw: &str) -> bool {
    raw.chars().last().is_some_and(|c| c.is_alphanumeric())
}

fn is_name_candidate(word: &str, sentence_initial: bool) -> bool {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_uppercase() || word.chars().count() < 2 {
        return false;
    }
    if word.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let lower = word.to_lowercase();
    if is_stopword(&lower) {
        return false;
    }
    if sentence_initial {
        let common = COMMON_OPENERS
            .iter()
            .chain(CAUSAL_MARKERS)
            .chain(ESCALATION_CUES)
            .chain(RESOLUTION_CUES)
            .any(|w| *w == lower);
        if common || lower.ends_with("ly") {
            return false;
        }
    }
    true
}

/// Detect entity mentions in one segment.
///
/// Coarse mode reports characters only.
fn detect_mentions(text: &str, coarse: bool) -> Vec<EntityMention> {
    let mut mentions: Vec<EntityMention> = Vec::new();
    let mut push = |mention: EntityMention| {
        let duplicate = mentions
            .iter()
            .any(|m| m.kind == mention.kind && m.name.eq_ignore_ascii_case(&mention.name));
        if !duplicate {
            mentions.push(mention);
        }
    };

    for sentence in split_sentences(text) {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let mut index = 0;
        while index < words.len() {
            let word = clean_word(words[index]);
            if !is_name_candidate(word, index == 0) {
                let lower = word.to_lowercase();
                if !coarse && OBJECT_NOUNS.contains(&lower.as_str()) {
                    push(EntityMention {
                        name: lower,
                        kind: EntityKind::Object,
                    });
                }
                index += 1;
                continue;
            }

            let mut parts = vec![word];
            let mut end = index;
            while end + 1 < words.len()
                && ends_cleanly(words[end])
                && is_name_candidate(clean_word(words[end + 1]), false)
            {
                end += 1;
                parts.push(clean_word(words[end]));
            }

            let after_locative = index > 0
                && LOCATIVE_PREPOSITIONS.contains(&words[index - 1].to_lowercase().as_str());
            let kind = if !coarse && after_locative {
                EntityKind::Location
            } else {
                EntityKind::Character
            };
            push(EntityMention {
                name: parts.join(" "),
                kind,
            });
            index = end + 1;
        }
    }
    mentions
}

fn describe(text: &str) -> String {
    let first = split_sentences(text)
        .into_iter()
        .next()
        .unwrap_or_else(|| text.trim().to_string());
    if first.chars().count() > MAX_DESCRIPTION_CHARS {
        first.chars().take(MAX_DESCRIPTION_CHARS).collect()
    } else {
        first
    }
}

/// Deterministic rule-based extraction.
///
/// # Examples
///
/// ```
/// use storylens_analysis::RuleExtractionProvider;
/// use storylens_interface::ExtractionProvider;
///
/// let facts = RuleExtractionProvider
///     .extract("seg_1", "In 1999, Mara hid the ledger in Harbor.")
///     .unwrap();
/// assert_eq!(facts.time_anchors.len(), 1);
/// assert!(facts.mentions.iter().any(|m| m.name == "Mara"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExtractionProvider;

impl ExtractionProvider for RuleExtractionProvider {
    fn name(&self) -> &str {
        "rules.v1"
    }

    fn extract(&self, _segment_id: &str, text: &str) -> Result<SegmentFacts, ExtractionError> {
        Ok(SegmentFacts {
            description: describe(text),
            mentions: detect_mentions(text, false),
            time_anchors: find_time_anchors(text),
            causal_marker: find_causal_marker(text),
            confidence: RULE_CONFIDENCE,
        })
    }
}

/// Rejects every segment, forcing the degraded path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableExtractionProvider;

impl ExtractionProvider for UnavailableExtractionProvider {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn extract(&self, _segment_id: &str, _text: &str) -> Result<SegmentFacts, ExtractionError> {
        Err(ExtractionError::new(ExtractionErrorKind::ProviderUnavailable(
            self.name().to_string(),
        )))
    }
}

/// Coarse facts used when the provider fails.
fn coarse_facts(text: &str, factor: f64) -> SegmentFacts {
    SegmentFacts {
        description: describe(text),
        mentions: detect_mentions(text, true),
        time_anchors: Vec::new(),
        causal_marker: None,
        confidence: RULE_CONFIDENCE * factor,
    }
}

/// Events and entities extracted from a story.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedStory {
    /// One event per segment, in narrative order
    pub events: Vec<Event>,
    /// Entities sorted by kind then name
    pub entities: Vec<Entity>,
}

/// Extract events and entities from translated segments.
#[instrument(skip(segments, provider, config), fields(segments = segments.len(), provider = %provider.name()))]
pub fn extract_story(
    segments: &[Segment],
    provider: &dyn ExtractionProvider,
    config: &ExtractionConfig,
) -> StageOutcome<ExtractedStory> {
    let mut events = Vec::with_capacity(segments.len());
    let mut diagnostics = Vec::new();
    let mut entities: BTreeMap<(EntityKind, String), Entity> = BTreeMap::new();

    for (index, segment) in segments.iter().enumerate() {
        let text = segment.analysis_text();
        let facts = match provider.extract(&segment.segment_id, text) {
            Ok(facts) => facts,
            Err(e) => {
                warn!(segment_id = %segment.segment_id, error = %e, "Extraction degraded");
                diagnostics.push(ProviderDiagnostic {
                    stage: PipelineStage::Extraction,
                    provider: provider.name().to_string(),
                    reason: e.kind.reason_code().to_string(),
                    segment_id: Some(segment.segment_id.clone()),
                    detail: e.kind.to_string(),
                });
                coarse_facts(text, *config.degraded_confidence_factor())
            }
        };

        let description = if facts.description.trim().is_empty() {
            describe(text)
        } else {
            facts.description.clone()
        };

        for mention in &facts.mentions {
            let key = (mention.kind, mention.name.to_lowercase());
            let entity = entities.entry(key.clone()).or_insert_with(|| Entity {
                entity_id: stable_id("ent", &format!("{}:{}", key.0, key.1)),
                name: mention.name.clone(),
                kind: mention.kind,
                first_segment_id: segment.segment_id.clone(),
                mention_count: 0,
                segment_ids: Vec::new(),
            });
            entity.mention_count += 1;
            if !entity.segment_ids.contains(&segment.segment_id) {
                entity.segment_ids.push(segment.segment_id.clone());
            }
        }

        let participants = facts
            .mentions
            .iter()
            .filter(|m| m.kind == EntityKind::Character)
            .map(|m| m.name.clone())
            .collect();

        let event = Event {
            event_id: stable_id("evt", &format!("{}:{}", segment.segment_id, description)),
            segment_ids: vec![segment.segment_id.clone()],
            description,
            participants,
            narrative_order: index + 1,
            actual_time: facts.time_anchors.first().copied(),
            time_anchors: facts.time_anchors.clone(),
            causal_marker: facts.causal_marker.clone(),
            confidence: round3(facts.confidence.clamp(0.0, 1.0)),
        };
        debug!(event_id = %event.event_id, anchors = event.time_anchors.len(), "Extracted event");
        events.push(event);
    }

    let entities: Vec<Entity> = entities.into_values().collect();
    info!(
        events = events.len(),
        entities = entities.len(),
        degraded = !diagnostics.is_empty(),
        "Extraction stage complete"
    );
    StageOutcome::from_parts(ExtractedStory { events, entities }, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_anchor_forms() {
        let anchors = find_time_anchors("On 2020-05-01T08:30 they met; in 1999 it began. 2020-05-01T08:30 again.");
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].to_string(), "2020-05-01 08:30:00");
        assert_eq!(anchors[1].to_string(), "1999-01-01 00:00:00");
    }

    #[test]
    fn test_year_inside_date_is_not_double_counted() {
        assert_eq!(find_time_anchors("It happened in 2020-05-01.").len(), 1);
    }

    #[test]
    fn test_locations_follow_prepositions() {
        let mentions = detect_mentions("Mara sailed to Red Harbor with the map.", false);
        assert!(mentions.contains(&EntityMention {
            name: "Mara".to_string(),
            kind: EntityKind::Character
        }));
        assert!(mentions.contains(&EntityMention {
            name: "Red Harbor".to_string(),
            kind: EntityKind::Location
        }));
        assert!(mentions.contains(&EntityMention {
            name: "map".to_string(),
            kind: EntityKind::Object
        }));
    }

    #[test]
    fn test_sentence_openers_are_not_names() {
        let mentions = detect_mentions("Suddenly the storm broke. Years passed.", false);
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_coarse_mode_reports_characters_only() {
        let mentions = detect_mentions("Mara sailed to Harbor with the map.", true);
        assert!(mentions.iter().all(|m| m.kind == EntityKind::Character));
    }
}
