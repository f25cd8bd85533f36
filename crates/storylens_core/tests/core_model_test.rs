//! Tests for identifiers, stage arithmetic, and source parsing.

use storylens_core::{
    GateReason, SourceType, StoryInputBuilder, StoryStage, sha256_hex, stable_id,
};
use storylens_error::IngestErrorKind;

#[test]
fn test_stable_id_is_content_derived() {
    let a = stable_id("seg", "hash:0");
    let b = stable_id("seg", "hash:0");
    let c = stable_id("seg", "hash:1");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a, format!("seg_{}", &sha256_hex("hash:0")[..12]));
}

#[test]
fn test_sha256_hex_known_vector() {
    assert_eq!(
        sha256_hex("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_stage_for_short_story() {
    assert_eq!(StoryStage::for_position(1, 1), StoryStage::Setup);
    assert_eq!(StoryStage::for_position(1, 2), StoryStage::Setup);
    assert_eq!(StoryStage::for_position(2, 2), StoryStage::Resolution);
}

#[test]
fn test_stage_for_long_story_is_monotonic() {
    for total in 4..40 {
        let stages: Vec<_> = (1..=total)
            .map(|position| StoryStage::for_position(position, total))
            .collect();
        assert!(stages.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(stages[0], StoryStage::Setup);
        assert_eq!(stages[total - 1], StoryStage::Resolution);
    }
}

#[test]
fn test_stage_rank_round_trip() {
    for stage in StoryStage::ALL {
        assert_eq!(StoryStage::from_rank(stage.rank()), stage);
    }
    assert_eq!(StoryStage::from_rank(9), StoryStage::Resolution);
}

#[test]
fn test_source_type_parsing() {
    assert_eq!("Transcript".parse::<SourceType>().unwrap(), SourceType::Transcript);
    assert_eq!(" document ".parse::<SourceType>().unwrap(), SourceType::Document);

    let err = "audio".parse::<SourceType>().unwrap_err();
    assert_eq!(
        err.kind,
        IngestErrorKind::UnsupportedSourceType("audio".to_string())
    );
}

#[test]
fn test_gate_reason_serializes_as_code() {
    let json = serde_json::to_string(&GateReason::InsightEvidenceInconsistent).unwrap();
    assert_eq!(json, "\"insight_evidence_inconsistent\"");
    assert_eq!(
        GateReason::TimelineConsistencyLow.to_string(),
        GateReason::TimelineConsistencyLow.as_str()
    );
}

#[test]
fn test_story_input_defaults() {
    let input = StoryInputBuilder::default()
        .story_id("s1")
        .owner_id("o1")
        .build()
        .unwrap();

    assert_eq!(input.source_type(), &SourceType::Text);
    assert_eq!(input.target_language(), "en");
    assert!(input.source_text().is_none());
    assert!(input.segments().is_none());
}
