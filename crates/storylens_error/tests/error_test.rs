//! Tests for error construction, location capture and retry classification.

use storylens_error::{
    BundleError, BundleErrorKind, IngestError, IngestErrorKind, InvariantError, RetryableError,
    StorylensError, StorylensErrorKind, TranslationError, TranslationErrorKind,
};

#[test]
fn test_errors_capture_caller_location() {
    let err = IngestError::new(IngestErrorKind::EmptyInput);
    assert_eq!(err.line, line!() - 1);
    assert!(err.file.ends_with("error_test.rs"));
    assert!(err.to_string().contains("Input is empty after normalization"));
}

#[test]
fn test_conversion_preserves_kind() {
    let err: StorylensError = InvariantError::new("timeline", "event_1", "unknown segment").into();
    match err.kind() {
        StorylensErrorKind::Invariant(inner) => {
            assert_eq!(inner.stage, "timeline");
            assert_eq!(inner.record, "event_1");
        }
        other => panic!("unexpected kind: {other}"),
    }

    let err: StorylensError = BundleError::new(BundleErrorKind::ManifestChecksumMismatch).into();
    assert!(err.to_string().starts_with("Storylens Error: "));
}

#[test]
fn test_retry_classification() {
    let timeout = TranslationError::new(TranslationErrorKind::Timeout {
        provider: "lexicon".to_string(),
        timeout_ms: 50,
    });
    assert!(timeout.is_retryable());
    assert_eq!(timeout.kind.reason_code(), "provider_timeout");
    assert_eq!(timeout.kind.provider(), Some("lexicon"));

    let failure = TranslationError::new(TranslationErrorKind::ProviderFailure {
        provider: "lexicon".to_string(),
        message: "boom".to_string(),
    });
    assert!(failure.is_retryable());

    let unsupported = TranslationError::new(TranslationErrorKind::UnsupportedLanguagePair {
        provider: "lexicon".to_string(),
        source: "ja".to_string(),
        target: "en".to_string(),
    });
    assert!(!unsupported.is_retryable());

    let open = TranslationError::new(TranslationErrorKind::CircuitOpen("lexicon".to_string()));
    assert!(!open.is_retryable());
    assert_eq!(TranslationErrorKind::PoolClosed.provider(), None);
}
