//! Tests for ingestion: segmentation, warnings and input errors.

use storylens_analysis::{HeuristicLanguageDetector, ingest};
use storylens_core::{SourceType, StoryInput, StoryInputBuilder};
use storylens_error::IngestErrorKind;
use storylens_resilience::IngestionConfig;

fn text_input(text: &str) -> StoryInput {
    StoryInputBuilder::default()
        .story_id("story-ingest")
        .owner_id("owner-1")
        .source_type(SourceType::Text)
        .source_text(Some(text.to_string()))
        .build()
        .expect("valid input")
}

#[test]
fn test_paragraphs_become_ordered_segments() {
    let input = text_input("The council met at dawn.\r\n\r\n\r\nThe archive burned.");
    let story = ingest(&input, &IngestionConfig::default(), &HeuristicLanguageDetector)
        .expect("ingest");

    assert_eq!(story.normalized_text, "The council met at dawn.\n\nThe archive burned.");
    assert_eq!(story.segments.len(), 2);
    assert_eq!(story.segments[0].order_index, 0);
    assert_eq!(story.segments[1].order_index, 1);
    assert_eq!(story.segments[0].detected_language, "en");
    assert!(story.segments[0].char_end <= story.segments[1].char_start);
    assert!(story.warnings.is_empty());
}

#[test]
fn test_ingestion_is_deterministic() {
    let input = text_input("Mara found the archive.\n\nIvo kept the key.");
    let config = IngestionConfig::default();
    let first = ingest(&input, &config, &HeuristicLanguageDetector).expect("ingest");
    let second = ingest(&input, &config, &HeuristicLanguageDetector).expect("ingest");

    assert_eq!(first, second);
    assert!(first.segments[0].segment_id.starts_with("seg_"));
    assert_ne!(first.segments[0].segment_id, first.segments[1].segment_id);
}

#[test]
fn test_idempotency_key_changes_dedupe_key() {
    let config = IngestionConfig::default();
    let plain = ingest(&text_input("Mara ran."), &config, &HeuristicLanguageDetector)
        .expect("ingest");

    let keyed_input = StoryInputBuilder::default()
        .story_id("story-ingest")
        .owner_id("owner-1")
        .source_text(Some("Mara ran.".to_string()))
        .idempotency_key(Some("request-7".to_string()))
        .build()
        .expect("valid input");
    let keyed = ingest(&keyed_input, &config, &HeuristicLanguageDetector).expect("ingest");

    assert_eq!(plain.source_hash, keyed.source_hash);
    assert_ne!(plain.dedupe_key, keyed.dedupe_key);
}

#[test]
fn test_whitespace_only_input_is_rejected() {
    let err = ingest(
        &text_input(" \n\t \r\n "),
        &IngestionConfig::default(),
        &HeuristicLanguageDetector,
    )
    .unwrap_err();
    assert!(matches!(err.kind, IngestErrorKind::EmptyInput));
}

#[test]
fn test_text_and_segments_together_are_rejected() {
    let input = StoryInputBuilder::default()
        .story_id("story-ingest")
        .owner_id("owner-1")
        .source_text(Some("One.".to_string()))
        .segments(Some(vec!["Two.".to_string()]))
        .build()
        .expect("valid input");

    let err = ingest(&input, &IngestionConfig::default(), &HeuristicLanguageDetector).unwrap_err();
    assert!(matches!(err.kind, IngestErrorKind::AmbiguousContent));
}

#[test]
fn test_blank_owner_is_rejected() {
    let input = StoryInputBuilder::default()
        .story_id("story-ingest")
        .owner_id("  ")
        .source_text(Some("One.".to_string()))
        .build()
        .expect("valid input");

    let err = ingest(&input, &IngestionConfig::default(), &HeuristicLanguageDetector).unwrap_err();
    assert!(matches!(err.kind, IngestErrorKind::MissingField(_)));
}

#[test]
fn test_empty_pre_split_segment_is_dropped_with_warning() {
    let input = StoryInputBuilder::default()
        .story_id("story-ingest")
        .owner_id("owner-1")
        .segments(Some(vec![
            "The story begins.".to_string(),
            "   ".to_string(),
            "The story ends.".to_string(),
        ]))
        .build()
        .expect("valid input");

    let story = ingest(&input, &IngestionConfig::default(), &HeuristicLanguageDetector)
        .expect("ingest");

    assert_eq!(story.segments.len(), 2);
    assert_eq!(story.warnings.len(), 1);
    assert_eq!(story.warnings[0].code, "empty_segment_dropped");
    assert_eq!(story.warnings[0].order_index, Some(1));
}

#[test]
fn test_transcript_turns_and_bad_timestamp_warning() {
    let input = StoryInputBuilder::default()
        .story_id("story-ingest")
        .owner_id("owner-1")
        .source_type(SourceType::Transcript)
        .source_text(Some(
            "[00:05] Mara: We leave at dawn.\n[soon] and nobody follows.".to_string(),
        ))
        .build()
        .expect("valid input");

    let story = ingest(&input, &IngestionConfig::default(), &HeuristicLanguageDetector)
        .expect("ingest");

    assert_eq!(story.segments.len(), 1);
    assert_eq!(story.segments[0].timestamp_seconds, Some(5));
    assert_eq!(story.segments[0].speaker.as_deref(), Some("Mara"));
    assert_eq!(story.warnings.len(), 1);
    assert_eq!(story.warnings[0].code, "transcript_timestamp_unparseable");
}

#[test]
fn test_long_paragraph_splits_at_sentences() {
    let config = IngestionConfig::default().with_max_segment_chars(20);
    let input = text_input("Mara ran home. Ivo hid the key. The door closed.");

    let story = ingest(&input, &config, &HeuristicLanguageDetector).expect("ingest");

    assert!(story.segments.len() > 1);
    for segment in &story.segments {
        assert!(segment.source_text.ends_with('.'));
    }
}
