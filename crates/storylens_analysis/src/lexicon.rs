//! Word lists and lexical helpers shared by the rule-based stages.

use std::collections::BTreeSet;

/// Theme names and the keywords that signal them.
pub const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    ("conflict", &["fight", "conflict", "war", "battle", "struggle"]),
    ("freedom", &["freedom", "free", "escape", "liberty", "chains"]),
    ("identity", &["identity", "name", "self", "origin"]),
    ("loss", &["loss", "lost", "grief", "mourn", "gone"]),
    ("love", &["love", "beloved", "affection", "tender"]),
    ("memory", &["memory", "remember", "archive", "history"]),
    ("power", &["power", "throne", "control", "rule", "command"]),
    ("trust", &["trust", "betray", "truth", "loyal"]),
];

/// Words that lift emotional valence.
pub const POSITIVE_WORDS: &[&str] = &[
    "hope", "trust", "healed", "resolved", "love", "calm", "joy", "peace", "smiled",
];

/// Words that lower emotional valence and raise conflict intensity.
pub const NEGATIVE_WORDS: &[&str] = &[
    "fear", "betray", "war", "loss", "anger", "conflict", "fight", "battle", "burned", "died",
];

/// Words that mark an explicit causal or flashback relation.
pub const CAUSAL_MARKERS: &[&str] = &[
    "because",
    "after",
    "since",
    "earlier",
    "previously",
    "ago",
    "flashback",
    "remembered",
    "before",
];

/// Words that escalate the stage assigned to an event.
pub const ESCALATION_CUES: &[&str] = &[
    "suddenly", "attack", "threat", "danger", "confront", "storm", "betray", "war",
];

/// Words that pull an event toward resolution.
pub const RESOLUTION_CUES: &[&str] = &[
    "finally", "resolved", "healed", "peace", "forgave", "ended", "home", "calm",
];

/// Common nouns tracked as object entities.
pub const OBJECT_NOUNS: &[&str] = &[
    "archive", "ledger", "letter", "map", "key", "sword", "ring", "book", "journal", "crown",
];

/// Capitalized sentence openers that are never names.
pub const COMMON_OPENERS: &[&str] = &[
    "years", "later", "meanwhile", "today", "tonight", "yesterday", "tomorrow", "someone",
    "everyone", "nobody", "nothing", "everything", "yes", "please", "perhaps", "instead",
];

/// Prepositions that make the next capitalized word a location.
pub const LOCATIVE_PREPOSITIONS: &[&str] = &["in", "at", "to", "from", "near", "into", "toward"];

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "but", "by", "can", "could", "did", "do", "does", "for",
    "from", "had", "has", "have", "he", "her", "here", "him", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "me", "my", "no", "not", "now", "of", "on", "once", "one",
    "or", "our", "she", "so", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "why", "will",
    "with", "would", "you", "your",
];

/// Check whether a lowercase word is a stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Lowercase word tokens: runs of letters, digits and apostrophes.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|token| !token.is_empty())
        .map(|token| token.trim_matches('\'').to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Distinct lowercase tokens of `text`.
pub fn token_set(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

/// Content terms of `text`: distinct, non-stopword tokens of four or more characters.
pub fn content_terms(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tokenize(text)
        .into_iter()
        .filter(|token| token.chars().count() >= 4 && !is_stopword(token))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Split text into sentences at `.`, `!` or `?` followed by whitespace.
///
/// Trailing quotes stay with their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            while let Some(&next) = chars.peek() {
                if matches!(next, '"' | '\u{201d}' | '\'' | ')') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek().is_none_or(|next| next.is_whitespace()) {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
            }
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Count tokens that appear in `words`.
pub fn count_matches(tokens: &[String], words: &[&str]) -> usize {
    tokens
        .iter()
        .filter(|token| words.contains(&token.as_str()))
        .count()
}

/// Round to three decimals.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_strips_quotes() {
        assert_eq!(
            tokenize("Mara's 'archive' burned, in 1999!"),
            vec!["mara's", "archive", "burned", "in", "1999"]
        );
    }

    #[test]
    fn test_split_sentences_keeps_closing_quotes() {
        let sentences = split_sentences("\"Run!\" she said. Dr. Vale waited.");
        assert_eq!(sentences[0], "\"Run!\"");
        assert_eq!(sentences.len(), 4);
    }

    #[test]
    fn test_content_terms_skip_stopwords_and_short_words() {
        assert_eq!(
            content_terms("The archive and the old ledger of the archive"),
            vec!["archive", "ledger"]
        );
    }
}
