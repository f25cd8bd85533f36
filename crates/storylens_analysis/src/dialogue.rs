//! Dialogue attribution, internal monologue, and narrative mode balance.

use crate::lexicon::{round3, tokenize};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use storylens_core::{
    AttributionMethod, DialogueAnalysis, DialogueTurn, MonologueSignal, NarrativeBalance,
    NarrativeMode, Segment, SegmentMode, SourceType,
};
use tracing::{debug, instrument};

/// Speaker used when no attribution is found.
pub const UNKNOWN_SPEAKER: &str = "unknown";

const SPEECH_VERBS: &str =
    "said|asked|whispered|replied|murmured|shouted|cried|yelled|told|answered";

static TRANSCRIPT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<speaker>[A-Z][A-Za-z0-9_. -]{0,40}):\s*(?P<utterance>.+)$")
        .expect("valid transcript regex")
});

static QUOTED_UTTERANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[\"\u{201c}](?P<utterance>[^\"\u{201d}\n]{1,800})[\"\u{201d}]")
        .expect("valid quote regex")
});

static SPEAKER_BEFORE_QUOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?P<speaker>[A-Z][\w'-]{{1,40}})\s+(?:\w+\s+)?(?:{verbs})[\s,:]*$",
        verbs = SPEECH_VERBS
    ))
    .expect("valid speaker-before regex")
});

static SPEAKER_AFTER_QUOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*[,;-]?\s*(?:(?:{verbs})\s+(?P<after>[A-Z][\w'-]{{1,40}})|(?P<before>[A-Z][\w'-]{{1,40}})\s+(?:{verbs})\b)",
        verbs = SPEECH_VERBS
    ))
    .expect("valid speaker-after regex")
});

const FIRST_PERSON: &[&str] = &["i", "me", "my", "mine", "myself"];

const THOUGHT_VERBS: &[&str] = &[
    "think", "thought", "wonder", "wondered", "remember", "remembered", "realize", "realized",
    "wish", "wished", "fear", "feared", "hope", "hoped", "decide", "decided",
];

const ACTION_WORDS: &[&str] = &[
    "run", "ran", "rush", "rushed", "fight", "fought", "grab", "grabbed", "strike", "struck",
    "attack", "attacked", "chase", "chased", "jump", "jumped", "climb", "climbed", "confront",
    "confronts", "confronted", "escape", "escaped", "sprint", "sprinted",
];

const EXPOSITION_WORDS: &[&str] = &[
    "because", "therefore", "history", "tradition", "explains", "explained", "describes",
    "described", "had", "was", "were", "known", "believed", "context", "background",
];

const MAX_EXCERPT_CHARS: usize = 140;

/// Resolve a raw speaker against the known character names.
fn normalize_speaker(raw: &str, known: &BTreeSet<String>) -> Option<String> {
    let speaker = raw.trim();
    let lower = speaker.to_lowercase();
    if speaker.is_empty() || crate::lexicon::is_stopword(&lower) {
        return None;
    }
    if !known.is_empty() && !known.contains(&lower) {
        return None;
    }
    Some(speaker.to_string())
}

fn resolve_speaker(
    prefix: &str,
    suffix: &str,
    known: &BTreeSet<String>,
) -> (String, AttributionMethod) {
    if let Some(speaker) = SPEAKER_BEFORE_QUOTE
        .captures(prefix)
        .and_then(|c| c.name("speaker"))
        .and_then(|m| normalize_speaker(m.as_str(), known))
    {
        return (speaker, AttributionMethod::SpeakerBeforeQuote);
    }
    if let Some(speaker) = SPEAKER_AFTER_QUOTE
        .captures(suffix)
        .and_then(|c| c.name("after").or_else(|| c.name("before")))
        .and_then(|m| normalize_speaker(m.as_str(), known))
    {
        return (speaker, AttributionMethod::SpeakerAfterQuote);
    }
    (UNKNOWN_SPEAKER.to_string(), AttributionMethod::Unknown)
}

fn extract_turns(segment: &Segment, text: &str, known: &BTreeSet<String>) -> Vec<DialogueTurn> {
    let transcript = segment.source_type == SourceType::Transcript;
    if let Some(captures) = TRANSCRIPT_LINE.captures(text).filter(|_| transcript) {
        let speaker = segment
            .speaker
            .clone()
            .or_else(|| captures.name("speaker").map(|m| m.as_str().trim().to_string()));
        let utterance = captures
            .name("utterance")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if let (Some(speaker), false) = (speaker, utterance.is_empty()) {
            return vec![DialogueTurn {
                segment_id: segment.segment_id.clone(),
                speaker,
                utterance,
                attribution_method: AttributionMethod::TranscriptPrefix,
            }];
        }
    }

    QUOTED_UTTERANCE
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let utterance = captures.name("utterance")?.as_str().trim();
            if utterance.is_empty() {
                return None;
            }
            let (speaker, method) =
                resolve_speaker(&text[..whole.start()], &text[whole.end()..], known);
            Some(DialogueTurn {
                segment_id: segment.segment_id.clone(),
                speaker,
                utterance: utterance.to_string(),
                attribution_method: method,
            })
        })
        .collect()
}

fn detect_monologue(segment_id: &str, text: &str, tokens: &[String]) -> Option<MonologueSignal> {
    let mut cues: Vec<String> = Vec::new();
    let mut first_person = false;
    let mut thought = false;
    for token in tokens {
        let is_first_person = FIRST_PERSON.contains(&token.as_str());
        let is_thought = THOUGHT_VERBS.contains(&token.as_str());
        first_person |= is_first_person;
        thought |= is_thought;
        if (is_first_person || is_thought) && !cues.contains(token) {
            cues.push(token.clone());
        }
    }
    if !first_person && !thought {
        return None;
    }

    let mut confidence: f64 = 0.45;
    if first_person {
        confidence += 0.25;
    }
    if thought {
        confidence += 0.25;
    }
    if text.contains('?') {
        confidence += 0.05;
    }

    let trimmed = text.trim();
    let excerpt = if trimmed.chars().count() > MAX_EXCERPT_CHARS {
        let head: String = trimmed.chars().take(MAX_EXCERPT_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    };

    Some(MonologueSignal {
        segment_id: segment_id.to_string(),
        excerpt,
        cues,
        confidence: round3(confidence.min(0.95)),
    })
}

fn dominant_mode(tokens: &[String], turns: usize, has_monologue: bool) -> NarrativeMode {
    let total = tokens.len().max(1) as f64;
    let hits = |words: &[&str]| {
        tokens
            .iter()
            .filter(|token| words.contains(&token.as_str()))
            .count() as f64
    };

    let dialogue = if turns > 0 {
        1.0 + (turns as f64 * 0.2).min(0.6)
    } else {
        0.0
    };
    let monologue = if has_monologue { 1.05 } else { 0.0 };
    let action = hits(ACTION_WORDS) / total;
    let exposition = 0.1 + hits(EXPOSITION_WORDS) / total;

    // Earlier entries win ties.
    let ranked = [
        (NarrativeMode::Monologue, monologue),
        (NarrativeMode::Dialogue, dialogue),
        (NarrativeMode::Action, action),
        (NarrativeMode::Exposition, exposition),
    ];
    let mut best = ranked[0];
    for candidate in &ranked[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    best.0
}

/// Extract dialogue turns, monologue signals, and the narrative balance.
///
/// Narrative attributions are accepted only for `known_characters` when the
/// list is non-empty; anything unresolved is attributed to `unknown`.
#[instrument(skip_all, fields(segments = segments.len()))]
pub fn analyze_dialogue(segments: &[Segment], known_characters: &[String]) -> DialogueAnalysis {
    let known: BTreeSet<String> = known_characters
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut analysis = DialogueAnalysis::default();
    let mut counts: BTreeMap<NarrativeMode, usize> = BTreeMap::new();

    for segment in segments {
        let text = segment.analysis_text().trim();
        if text.is_empty() {
            continue;
        }
        let tokens = tokenize(text);
        let turns = extract_turns(segment, text, &known);
        let monologue = detect_monologue(&segment.segment_id, text, &tokens);
        let mode = dominant_mode(&tokens, turns.len(), monologue.is_some());

        debug!(segment_id = %segment.segment_id, %mode, turns = turns.len(), "Classified segment");
        *counts.entry(mode).or_default() += 1;
        analysis.turns.extend(turns);
        analysis.monologues.extend(monologue);
        analysis.segment_modes.push(SegmentMode {
            segment_id: segment.segment_id.clone(),
            mode,
        });
    }

    let classified = analysis.segment_modes.len();
    if classified > 0 {
        let total = classified as f64;
        let ratio = |mode: NarrativeMode| {
            round3(counts.get(&mode).copied().unwrap_or_default() as f64 / total)
        };
        let dialogue_ratio = ratio(NarrativeMode::Dialogue);
        analysis.balance = NarrativeBalance {
            dialogue_ratio,
            narration_ratio: round3(1.0 - dialogue_ratio),
            mode_ratios: [
                NarrativeMode::Dialogue,
                NarrativeMode::Action,
                NarrativeMode::Exposition,
                NarrativeMode::Monologue,
            ]
            .into_iter()
            .map(|mode| (mode.to_string(), ratio(mode)))
            .collect(),
        };
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_before_quote() {
        let known = BTreeSet::new();
        let (speaker, method) = resolve_speaker("Mara said, ", "", &known);
        assert_eq!(speaker, "Mara");
        assert_eq!(method, AttributionMethod::SpeakerBeforeQuote);
    }

    #[test]
    fn test_speaker_after_quote_both_orders() {
        let known = BTreeSet::new();
        assert_eq!(resolve_speaker("", " said Vale.", &known).0, "Vale");
        assert_eq!(resolve_speaker("", " Vale asked.", &known).0, "Vale");
    }

    #[test]
    fn test_pronoun_speaker_is_unknown() {
        let known = BTreeSet::new();
        let (speaker, method) = resolve_speaker("", " she whispered.", &known);
        assert_eq!(speaker, UNKNOWN_SPEAKER);
        assert_eq!(method, AttributionMethod::Unknown);
    }

    #[test]
    fn test_monologue_mode_wins_ties() {
        let tokens = tokenize("I wondered why");
        assert_eq!(dominant_mode(&tokens, 0, true), NarrativeMode::Monologue);
        assert_eq!(dominant_mode(&tokens, 0, false), NarrativeMode::Exposition);
    }
}
