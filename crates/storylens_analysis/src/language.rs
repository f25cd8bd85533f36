//! Marker-word language detection.

use crate::lexicon::round3;
use storylens_core::LanguageDetection;
use storylens_interface::LanguageDetector;

const SPANISH_MARKERS: &[&str] = &[
    "el", "la", "los", "las", "que", "una", "pero", "porque", "historia", "cuando", "familia",
    "memoria",
];

const FRENCH_MARKERS: &[&str] = &[
    "le", "la", "les", "une", "des", "dans", "avec", "histoire", "quand", "pourquoi", "famille",
    "memoire",
];

const ENGLISH_MARKERS: &[&str] = &["the", "and", "story", "memory", "council", "archive"];

/// Language used when no marker word matches.
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_CONFIDENCE: f64 = 0.62;

fn is_japanese_script(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30ff}' | '\u{4e00}'..='\u{9fff}')
}

/// ASCII word tokens, lowercased.
fn latin_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphabetic() || c == '\''))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .collect()
}

fn marker_score(tokens: &[String], markers: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens
        .iter()
        .filter(|token| markers.contains(&token.as_str()))
        .count();
    hits as f64 / tokens.len() as f64
}

/// Detects `ja`, `es`, `fr` and `en` from script and marker words.
///
/// Text without any word tokens is reported as `und` with zero confidence.
/// Text with tokens but no markers defaults to `en`.
///
/// # Examples
///
/// ```
/// use storylens_analysis::HeuristicLanguageDetector;
/// use storylens_interface::LanguageDetector;
///
/// let detector = HeuristicLanguageDetector;
/// assert_eq!(detector.detect("La historia de la familia").language, "es");
/// assert_eq!(detector.detect("...").language, "und");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicLanguageDetector;

impl LanguageDetector for HeuristicLanguageDetector {
    fn name(&self) -> &str {
        "heuristic.v2"
    }

    fn detect(&self, text: &str) -> LanguageDetection {
        let japanese = text.chars().filter(|c| is_japanese_script(*c)).count();
        let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
        if japanese >= 4 && japanese >= latin {
            let total = text.chars().count().max(1) as f64;
            let confidence = (0.82 + japanese as f64 / total * 0.18).min(1.0);
            return LanguageDetection {
                language: "ja".to_string(),
                confidence: round3(confidence),
            };
        }

        let tokens = latin_tokens(text);
        if tokens.is_empty() {
            return LanguageDetection {
                language: "und".to_string(),
                confidence: 0.0,
            };
        }

        // Alphabetical order breaks score ties.
        let mut scores = [
            ("en", marker_score(&tokens, ENGLISH_MARKERS)),
            ("es", marker_score(&tokens, SPANISH_MARKERS)),
            ("fr", marker_score(&tokens, FRENCH_MARKERS)),
        ];
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let (language, top) = scores[0];
        if top <= 0.0 {
            return LanguageDetection {
                language: DEFAULT_LANGUAGE.to_string(),
                confidence: DEFAULT_CONFIDENCE,
            };
        }
        let margin = (top - scores[1].1).max(0.0);
        let confidence = (0.58 + top * 0.22 + margin * 0.25).min(0.98);
        LanguageDetection {
            language: language.to_string(),
            confidence: round3(confidence),
        }
    }
}

/// Most frequent language, ties broken alphabetically; `und` when empty.
pub fn majority_language<'a>(languages: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts = std::collections::BTreeMap::<&str, usize>::new();
    for language in languages {
        *counts.entry(language).or_default() += 1;
    }
    // BTreeMap iterates alphabetically; keep the first maximum.
    let mut best: Option<(&str, usize)> = None;
    for (language, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((language, count));
        }
    }
    best.map(|(language, _)| language.to_string())
        .unwrap_or_else(|| "und".to_string())
}
