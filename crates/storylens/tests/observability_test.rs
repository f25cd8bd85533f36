//! Tests for subscriber initialization.

use storylens::{ObservabilityConfig, init_observability_with_config};

#[test]
fn test_config_builder() {
    let config = ObservabilityConfig::new("story-service")
        .with_version("9.9.9")
        .with_log_level("storylens_analysis=debug")
        .with_json_logs(true);

    assert_eq!(config.service_name, "story-service");
    assert_eq!(config.service_version, "9.9.9");
    assert_eq!(config.log_level, "storylens_analysis=debug");
    assert!(config.json_logs);

    let default = ObservabilityConfig::default();
    assert_eq!(default.service_name, "storylens");
    assert_eq!(default.log_level, "info");
    assert!(!default.json_logs);
}

#[test]
fn test_second_initialization_is_an_error() {
    let config = ObservabilityConfig::default().with_log_level("warn");
    init_observability_with_config(config.clone()).expect("first initialization");
    assert!(init_observability_with_config(config).is_err());
}
