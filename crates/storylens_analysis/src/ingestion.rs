//! Ingestion and normalization.
//!
//! Turns raw text, document excerpts, transcripts, or pre-split segments into
//! ordered [`Segment`]s with content-derived identifiers. Ingestion is a pure
//! function of its input: identical input always yields identical segments.

use crate::lexicon::split_sentences;
use regex::Regex;
use std::sync::LazyLock;
use storylens_core::{IngestWarning, Segment, SourceType, StoryInput, sha256_hex, stable_id};
use storylens_error::{IngestError, IngestErrorKind};
use storylens_interface::LanguageDetector;
use storylens_resilience::IngestionConfig;
use tracing::{debug, info, instrument, warn};
use unicode_normalization::UnicodeNormalization;

static TIMESTAMP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]*)\]\s*(.*)$").expect("valid timestamp regex"));

static SPEAKER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][\w.'\- ]{0,40}?):\s+(.+)$").expect("valid speaker regex")
});

static PAGE_FURNITURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:page\s+\d+(?:\s+of\s+\d+)?|-\s*\d+\s*-|\d{1,4})$")
        .expect("valid page furniture regex")
});

static HYPHEN_WRAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{L})-\n(\p{Ll})").expect("valid hyphenation regex"));

static PARAGRAPH_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid paragraph regex"));

/// Output of the ingestion stage.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedStory {
    /// Segments in source order, with detected languages
    pub segments: Vec<Segment>,
    /// Normalized text the segments were cut from
    pub normalized_text: String,
    /// SHA-256 of `normalized_text`
    pub source_hash: String,
    /// SHA-256 of `{idempotency_key}|{source_hash}`
    pub dedupe_key: String,
    /// Non-fatal normalization issues
    pub warnings: Vec<IngestWarning>,
}

/// Normalize text while preserving paragraph boundaries.
///
/// Applies, in order: line-ending unification, Unicode NFKC, control
/// character removal, whitespace collapsing and line trimming, and
/// collapsing three or more newlines into a paragraph break.
///
/// # Examples
///
/// ```
/// use storylens_analysis::normalize_text;
///
/// assert_eq!(normalize_text("  One\r\n\r\n\r\n\r\nTwo\t\tthree  "), "One\n\nTwo three");
/// ```
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let composed: String = unified
        .nfkc()
        .filter(|c| *c == '\n' || !c.is_control())
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect();
    let lines: Vec<String> = composed
        .split('\n')
        .map(|line| line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
        .collect();
    let joined = lines.join("\n");
    PARAGRAPH_BREAKS
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Repair hyphenated line wraps and drop page furniture lines.
fn clean_document(text: &str) -> String {
    let dehyphenated = HYPHEN_WRAP.replace_all(text, "$1$2");
    let kept: Vec<&str> = dehyphenated
        .split('\n')
        .filter(|line| !PAGE_FURNITURE.is_match(line))
        .collect();
    PARAGRAPH_BREAKS
        .replace_all(&kept.join("\n"), "\n\n")
        .trim()
        .to_string()
}

/// A segment cut from the normalized text, before identifiers are assigned.
#[derive(Debug, Clone, PartialEq)]
struct Piece {
    text: String,
    char_start: usize,
    char_end: usize,
    speaker: Option<String>,
    timestamp_seconds: Option<u32>,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split paragraphs on blank lines, then long paragraphs at sentence boundaries.
fn split_paragraphs(text: &str, max_chars: usize) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut offset = 0;
    for paragraph in text.split("\n\n") {
        let flattened = paragraph.replace('\n', " ");
        let flattened = flattened.trim();
        if !flattened.is_empty() {
            for (start, end) in chunk_spans(flattened, max_chars) {
                let chunk = &flattened[start..end];
                let char_start = offset + char_len(&flattened[..start]);
                pieces.push(Piece {
                    text: chunk.to_string(),
                    char_start,
                    char_end: char_start + char_len(chunk),
                    speaker: None,
                    timestamp_seconds: None,
                });
            }
        }
        offset += char_len(paragraph) + 2;
    }
    pieces
}

/// Byte spans of sentence-aligned chunks no longer than `max_chars`.
///
/// A single sentence longer than the limit becomes its own chunk.
fn chunk_spans(paragraph: &str, max_chars: usize) -> Vec<(usize, usize)> {
    if char_len(paragraph) <= max_chars {
        return vec![(0, paragraph.len())];
    }
    let mut spans = Vec::new();
    let mut chunk_start: Option<usize> = None;
    let mut chunk_end = 0;
    let mut search_from = 0;
    for sentence in split_sentences(paragraph) {
        let start = paragraph[search_from..]
            .find(sentence.as_str())
            .map(|i| i + search_from)
            .unwrap_or(search_from);
        let end = (start + sentence.len()).min(paragraph.len());
        search_from = end;
        match chunk_start {
            None => chunk_start = Some(start),
            Some(open) if char_len(&paragraph[open..end]) > max_chars => {
                spans.push((open, chunk_end));
                chunk_start = Some(start);
            }
            Some(_) => {}
        }
        chunk_end = end;
    }
    if let Some(open) = chunk_start {
        spans.push((open, chunk_end));
    }
    spans
}

/// Parse `hh:mm:ss` or `mm:ss` into seconds.
fn parse_timestamp(raw: &str) -> Option<u32> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let numbers: Option<Vec<u32>> = parts
        .iter()
        .map(|part| {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                part.parse().ok()
            }
        })
        .collect();
    match numbers?.as_slice() {
        [minutes, seconds] if *seconds < 60 => Some(minutes * 60 + seconds),
        [hours, minutes, seconds] if *minutes < 60 && *seconds < 60 => {
            Some(hours * 3600 + minutes * 60 + seconds)
        }
        _ => None,
    }
}

/// Parsed prefix of one transcript line.
struct TranscriptLine {
    timestamp_seconds: Option<u32>,
    speaker: Option<String>,
    text: String,
    starts_turn: bool,
}

fn parse_transcript_line(
    line: &str,
    order_index: usize,
    warnings: &mut Vec<IngestWarning>,
) -> TranscriptLine {
    let mut timestamp_seconds = None;
    let mut rest = line.to_string();
    let mut starts_turn = false;

    if let Some(captures) = TIMESTAMP_PREFIX.captures(line) {
        let raw = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        match parse_timestamp(raw) {
            Some(seconds) => {
                timestamp_seconds = Some(seconds);
                rest = captures
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                starts_turn = true;
            }
            None => {
                warn!(raw, "Unparseable transcript timestamp");
                warnings.push(IngestWarning {
                    code: "transcript_timestamp_unparseable".to_string(),
                    message: format!("Could not parse timestamp '[{}]'", raw),
                    order_index: Some(order_index),
                });
            }
        }
    }

    let mut speaker = None;
    if let Some(captures) = SPEAKER_PREFIX.captures(&rest) {
        speaker = captures.get(1).map(|m| m.as_str().trim().to_string());
        starts_turn = true;
    }

    TranscriptLine {
        timestamp_seconds,
        speaker,
        text: rest,
        starts_turn,
    }
}

/// One segment per speaker turn; prefix-less lines continue the current turn.
fn split_transcript(text: &str, warnings: &mut Vec<IngestWarning>) -> Vec<Piece> {
    let mut pieces: Vec<Piece> = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        let line_start = offset;
        offset += char_len(line) + 1;
        if line.is_empty() {
            continue;
        }
        let parsed = parse_transcript_line(line, pieces.len(), warnings);
        if parsed.text.trim().is_empty() && parsed.speaker.is_none() {
            continue;
        }
        let line_end = line_start + char_len(line);
        match pieces.last_mut() {
            Some(current) if !parsed.starts_turn => {
                current.text.push(' ');
                current.text.push_str(parsed.text.trim());
                current.char_end = line_end;
            }
            _ => pieces.push(Piece {
                text: parsed.text.trim().to_string(),
                char_start: line_start,
                char_end: line_end,
                speaker: parsed.speaker,
                timestamp_seconds: parsed.timestamp_seconds,
            }),
        }
    }
    pieces
}

fn validate_language_code(code: &str) -> Result<(), IngestError> {
    let mut parts = code.split('-');
    let primary = parts.next().unwrap_or_default();
    let primary_ok = (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_lowercase());
    let rest_ok = parts.all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if primary_ok && rest_ok {
        Ok(())
    } else {
        Err(IngestError::new(IngestErrorKind::InvalidLanguage(code.to_string())))
    }
}

fn validate_input(input: &StoryInput) -> Result<(), IngestError> {
    if input.story_id().trim().is_empty() {
        return Err(IngestError::new(IngestErrorKind::MissingField(
            "story_id".to_string(),
        )));
    }
    if input.owner_id().trim().is_empty() {
        return Err(IngestError::new(IngestErrorKind::MissingField(
            "owner_id".to_string(),
        )));
    }
    validate_language_code(input.target_language())?;
    match (input.source_text(), input.segments()) {
        (Some(_), Some(_)) => Err(IngestError::new(IngestErrorKind::AmbiguousContent)),
        (None, None) => Err(IngestError::new(IngestErrorKind::MissingContent)),
        _ => Ok(()),
    }
}

/// Ingest one story.
///
/// # Errors
///
/// Returns an [`IngestError`] for blank identifiers, an invalid target
/// language, missing or doubly-supplied content, or content that is empty
/// after normalization. Malformed details inside otherwise valid content,
/// such as unparseable transcript timestamps, become warnings instead.
#[instrument(skip(input, config, detector), fields(story_id = %input.story_id(), source_type = %input.source_type()))]
pub fn ingest(
    input: &StoryInput,
    config: &IngestionConfig,
    detector: &dyn LanguageDetector,
) -> Result<IngestedStory, IngestError> {
    validate_input(input)?;

    let mut warnings = Vec::new();
    let source_type = *input.source_type();

    let (normalized_text, pieces) = match (input.source_text(), input.segments()) {
        (Some(raw), _) => {
            let mut normalized = normalize_text(raw);
            if source_type == SourceType::Document {
                normalized = clean_document(&normalized);
            }
            let pieces = match source_type {
                SourceType::Transcript => split_transcript(&normalized, &mut warnings),
                SourceType::Text | SourceType::Document => {
                    split_paragraphs(&normalized, *config.max_segment_chars())
                }
            };
            (normalized, pieces)
        }
        (None, Some(items)) => pre_split(items, source_type, &mut warnings),
        (None, None) => return Err(IngestError::new(IngestErrorKind::MissingContent)),
    };

    if normalized_text.is_empty() || pieces.is_empty() {
        return Err(IngestError::new(IngestErrorKind::EmptyInput));
    }

    let source_hash = sha256_hex(&normalized_text);
    let idempotency_key = input
        .idempotency_key()
        .as_deref()
        .unwrap_or(input.story_id().as_str());
    let dedupe_key = sha256_hex(format!("{}|{}", idempotency_key, source_hash));

    let segments: Vec<Segment> = pieces
        .into_iter()
        .enumerate()
        .map(|(order_index, piece)| {
            let detection = detector.detect(&piece.text);
            let segment_id = stable_id("seg", &format!("{}:{}", source_hash, order_index));
            debug!(
                segment_id = %segment_id,
                language = %detection.language,
                chars = piece.char_end - piece.char_start,
                "Created segment"
            );
            Segment {
                segment_id,
                order_index,
                source_type,
                source_text: piece.text,
                translated_text: None,
                detected_language: detection.language,
                language_confidence: detection.confidence,
                char_start: piece.char_start,
                char_end: piece.char_end,
                speaker: piece.speaker,
                timestamp_seconds: piece.timestamp_seconds,
            }
        })
        .collect();

    info!(
        segments = segments.len(),
        warnings = warnings.len(),
        "Ingested story"
    );

    Ok(IngestedStory {
        segments,
        normalized_text,
        source_hash,
        dedupe_key,
        warnings,
    })
}

/// Normalize caller-supplied segments, dropping empty ones.
fn pre_split(
    items: &[String],
    source_type: SourceType,
    warnings: &mut Vec<IngestWarning>,
) -> (String, Vec<Piece>) {
    let mut kept = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let normalized = normalize_text(item).replace("\n\n", "\n");
        if normalized.is_empty() {
            warnings.push(IngestWarning {
                code: "empty_segment_dropped".to_string(),
                message: format!("Segment {} is empty after normalization", index),
                order_index: Some(index),
            });
            continue;
        }
        kept.push(normalized);
    }

    let mut pieces = Vec::new();
    let mut offset = 0;
    for item in &kept {
        let (speaker, timestamp_seconds, text) = if source_type == SourceType::Transcript {
            let parsed = parse_transcript_line(item, pieces.len(), warnings);
            (parsed.speaker, parsed.timestamp_seconds, parsed.text.replace('\n', " "))
        } else {
            (None, None, item.replace('\n', " "))
        };
        pieces.push(Piece {
            text,
            char_start: offset,
            char_end: offset + char_len(item),
            speaker,
            timestamp_seconds,
        });
        offset += char_len(item) + 2;
    }
    (kept.join("\n\n"), pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp("01:30"), Some(90));
        assert_eq!(parse_timestamp("1:00:05"), Some(3605));
        assert_eq!(parse_timestamp("1:75"), None);
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn test_chunk_spans_respect_sentence_boundaries() {
        let paragraph = "One two three. Four five six. Seven eight nine.";
        let spans = chunk_spans(paragraph, 20);
        let chunks: Vec<&str> = spans.iter().map(|(s, e)| &paragraph[*s..*e]).collect();
        assert_eq!(chunks, vec!["One two three.", "Four five six.", "Seven eight nine."]);
    }

    #[test]
    fn test_clean_document_repairs_wraps_and_drops_page_numbers() {
        let cleaned = clean_document("The coun-\ncil met.\n12\nPage 3 of 9\nThey voted.");
        assert_eq!(cleaned, "The council met.\nThey voted.");
    }
}
