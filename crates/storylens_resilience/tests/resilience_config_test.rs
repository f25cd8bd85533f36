//! Tests for the layered configuration system.

use std::io::Write;
use storylens_error::StorylensErrorKind;
use storylens_resilience::{GateConfig, StorylensConfig};

#[test]
fn test_load_bundled_defaults() {
    let config = StorylensConfig::load().unwrap();

    assert_eq!(config.translation.provider(), "lexicon");
    assert_eq!(*config.translation.retry_count(), 2);
    assert_eq!(*config.translation.timeout_ms(), 1200);
    assert_eq!(*config.translation.circuit_failure_threshold(), 3);
    assert_eq!(*config.translation.circuit_reset_secs(), 30);
    assert_eq!(*config.gate.min_confidence(), 0.55);
    assert_eq!(*config.gate.max_hallucination_risk(), 0.45);
    assert_eq!(*config.gate.min_translation_quality(), 0.5);
    assert_eq!(*config.gate.max_inconsistent_insights(), 0);
    assert_eq!(*config.timeline.inversion_tolerance(), 0);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = StorylensConfig::from_toml_str(
        r#"
        [gate]
        min_confidence = 0.8

        [translation]
        provider = "unavailable"
        "#,
    )
    .unwrap();

    assert_eq!(*config.gate.min_confidence(), 0.8);
    assert_eq!(*config.gate.max_hallucination_risk(), 0.45);
    assert_eq!(config.translation.provider(), "unavailable");
    assert_eq!(*config.translation.retry_count(), 2);
    assert_eq!(config.extraction.provider(), "rules");
}

#[test]
fn test_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("storylens.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[timeline]\ninversion_tolerance = 2").unwrap();

    let config = StorylensConfig::from_file(&path).unwrap();
    assert_eq!(*config.timeline.inversion_tolerance(), 2);
}

#[test]
fn test_missing_file_is_config_error() {
    let err = StorylensConfig::from_file("/definitely/not/here/storylens.toml").unwrap_err();
    assert!(matches!(err.kind(), StorylensErrorKind::Config(_)));
}

#[test]
fn test_validate_rejects_out_of_range_threshold() {
    let err = StorylensConfig::from_toml_str("[gate]\nmax_hallucination_risk = 1.5").unwrap_err();
    match err.kind() {
        StorylensErrorKind::Config(e) => assert!(e.message.contains("max_hallucination_risk")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_validate_rejects_zero_circuit_threshold() {
    let err =
        StorylensConfig::from_toml_str("[translation]\ncircuit_failure_threshold = 0").unwrap_err();
    assert!(matches!(err.kind(), StorylensErrorKind::Config(_)));
}

#[test]
fn test_setters_build_custom_gate() {
    let gate = GateConfig::default()
        .with_min_confidence(0.9)
        .with_max_inconsistent_insights(2);

    assert_eq!(*gate.min_confidence(), 0.9);
    assert_eq!(*gate.max_inconsistent_insights(), 2);

    let config = StorylensConfig {
        gate,
        ..StorylensConfig::default()
    };
    assert!(config.validate().is_ok());
}
