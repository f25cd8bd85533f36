//! Tests for retry, timeout and circuit breaking around translation providers.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storylens_core::Translation;
use storylens_error::{TranslationError, TranslationErrorKind};
use storylens_interface::TranslationProvider;
use storylens_resilience::{
    CircuitBreakerRegistry, CircuitSettings, CircuitState, ResilientTranslator, RetryPolicy,
};

/// Fails the first `failures` calls, then echoes the input upper-cased.
struct FlakyProvider {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyProvider {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TranslationProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Translation, TranslationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(TranslationError::new(TranslationErrorKind::ProviderFailure {
                provider: "flaky".to_string(),
                message: format!("call {call} failed"),
            }));
        }
        Ok(Translation {
            text: text.to_uppercase(),
            quality_score: 0.9,
        })
    }
}

/// Never answers within any reasonable timeout.
struct SlowProvider;

#[async_trait]
impl TranslationProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Translation, TranslationError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Translation {
            text: text.to_string(),
            quality_score: 1.0,
        })
    }
}

/// Sleeps before answering and records the peak number of concurrent calls.
struct DelayedProvider {
    delay: Duration,
    fail: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl DelayedProvider {
    fn new(delay: Duration, fail: bool) -> Self {
        Self {
            delay,
            fail,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TranslationProvider for DelayedProvider {
    fn name(&self) -> &str {
        "delayed"
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Translation, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranslationError::new(TranslationErrorKind::ProviderFailure {
                provider: "delayed".to_string(),
                message: "still down".to_string(),
            }));
        }
        Ok(Translation {
            text: text.to_uppercase(),
            quality_score: 0.9,
        })
    }
}

/// Answers instantly but refuses every language pair.
struct PickyProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl TranslationProvider for PickyProvider {
    fn name(&self) -> &str {
        "picky"
    }

    async fn translate(
        &self,
        _text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Translation, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TranslationError::new(
            TranslationErrorKind::UnsupportedLanguagePair {
                provider: "picky".to_string(),
                source: source_language.to_string(),
                target: target_language.to_string(),
            },
        ))
    }
}

fn policy(retry_count: usize) -> RetryPolicy {
    RetryPolicy {
        retry_count,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        timeout: Duration::from_millis(100),
    }
}

fn registry(threshold: u32, reset: Duration) -> Arc<CircuitBreakerRegistry> {
    Arc::new(CircuitBreakerRegistry::new(CircuitSettings {
        failure_threshold: threshold,
        reset_after: reset,
    }))
}

#[tokio::test]
async fn test_retry_recovers_from_transient_failure() {
    let provider = Arc::new(FlakyProvider::new(2));
    let translator = ResilientTranslator::new(
        provider.clone(),
        registry(10, Duration::from_secs(30)),
        policy(2),
        2,
        None,
    );

    let attempt = translator.translate("hola", "es", "en").await;

    assert_eq!(attempt.result.unwrap().text, "HOLA");
    assert_eq!(attempt.failures.len(), 2);
    assert_eq!(attempt.failures[0].attempt, 1);
    assert_eq!(attempt.failures[1].reason, "provider_failure");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_budget_is_bounded() {
    let provider = Arc::new(FlakyProvider::new(usize::MAX));
    let translator = ResilientTranslator::new(
        provider.clone(),
        registry(100, Duration::from_secs(30)),
        policy(2),
        1,
        None,
    );

    let attempt = translator.translate("hola", "es", "en").await;

    assert!(attempt.result.is_err());
    assert_eq!(attempt.failures.len(), 3);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported_per_attempt() {
    let translator = ResilientTranslator::new(
        Arc::new(SlowProvider),
        registry(100, Duration::from_secs(30)),
        policy(1),
        1,
        None,
    );

    let attempt = translator.translate("hola", "es", "en").await;

    let err = attempt.result.unwrap_err();
    assert!(matches!(err.kind, TranslationErrorKind::Timeout { .. }));
    assert_eq!(attempt.failures.len(), 2);
    assert!(attempt.failures.iter().all(|f| f.reason == "provider_timeout"));
}

#[tokio::test]
async fn test_circuit_opens_and_short_circuits() {
    let provider = Arc::new(FlakyProvider::new(usize::MAX));
    let circuits = registry(3, Duration::from_secs(30));
    let translator =
        ResilientTranslator::new(provider.clone(), circuits.clone(), policy(2), 1, None);

    let first = translator.translate("uno", "es", "en").await;
    assert!(first.result.is_err());
    assert_eq!(circuits.state("flaky"), CircuitState::Open);

    let second = translator.translate("dos", "es", "en").await;
    let err = second.result.unwrap_err();
    assert_eq!(err.kind, TranslationErrorKind::CircuitOpen("flaky".to_string()));
    assert_eq!(second.failures.len(), 1);
    assert_eq!(second.failures[0].reason, "circuit_open");

    // Only the first call reached the provider.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_circuit_state_is_shared_across_translators() {
    let circuits = registry(1, Duration::from_secs(30));
    let failing = ResilientTranslator::new(
        Arc::new(FlakyProvider::new(usize::MAX)),
        circuits.clone(),
        policy(0),
        1,
        None,
    );
    let other_run = ResilientTranslator::new(
        Arc::new(FlakyProvider::new(0)),
        circuits.clone(),
        policy(0),
        1,
        None,
    );

    assert!(failing.translate("a", "es", "en").await.result.is_err());
    let attempt = other_run.translate("b", "es", "en").await;
    assert!(matches!(
        attempt.result.unwrap_err().kind,
        TranslationErrorKind::CircuitOpen(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_circuit_half_opens_after_reset_window() {
    let circuits = registry(1, Duration::from_secs(30));
    circuits.record_failure("flaky");
    assert_eq!(circuits.state("flaky"), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(circuits.state("flaky"), CircuitState::HalfOpen);

    let translator =
        ResilientTranslator::new(Arc::new(FlakyProvider::new(0)), circuits.clone(), policy(0), 1, None);
    let attempt = translator.translate("c", "es", "en").await;

    assert!(attempt.result.is_ok());
    assert_eq!(circuits.state("flaky"), CircuitState::Closed);
    assert_eq!(circuits.consecutive_failures("flaky"), 0);
}

#[test]
fn test_success_resets_failure_count() {
    let circuits = registry(3, Duration::from_secs(30));
    circuits.record_failure("p");
    circuits.record_failure("p");
    circuits.record_success("p");
    circuits.record_failure("p");

    assert_eq!(circuits.consecutive_failures("p"), 1);
    assert_eq!(circuits.state("p"), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_worker_pool_caps_concurrent_calls() {
    let provider = Arc::new(DelayedProvider::new(Duration::from_millis(20), false));
    let translator = ResilientTranslator::new(
        provider.clone(),
        registry(10, Duration::from_secs(30)),
        policy(0),
        2,
        None,
    );

    let texts = ["uno", "dos", "tres", "cuatro", "cinco", "seis"];
    let attempts = futures::future::join_all(
        texts.iter().map(|text| translator.translate(text, "es", "en")),
    )
    .await;

    assert!(attempts.iter().all(|a| a.result.is_ok()));
    assert_eq!(provider.calls.load(Ordering::SeqCst), texts.len());
    assert_eq!(provider.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_circuit_admits_a_single_trial() {
    let circuits = registry(1, Duration::from_secs(30));
    circuits.record_failure("delayed");
    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(circuits.state("delayed"), CircuitState::HalfOpen);

    let provider = Arc::new(DelayedProvider::new(Duration::from_millis(20), true));
    let translator =
        ResilientTranslator::new(provider.clone(), circuits.clone(), policy(0), 4, None);

    let attempts = futures::future::join_all(
        ["a", "b", "c", "d"]
            .iter()
            .map(|text| translator.translate(text, "es", "en")),
    )
    .await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    let refused = attempts
        .iter()
        .filter(|a| {
            matches!(
                a.result.as_ref().map_err(|e| &e.kind),
                Err(TranslationErrorKind::CircuitOpen(_))
            )
        })
        .count();
    assert_eq!(refused, 3);
    // The failed trial re-opens the circuit for a full window.
    assert_eq!(circuits.state("delayed"), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_trial_slot_is_exclusive_until_reported() {
    let circuits = registry(1, Duration::from_secs(30));
    circuits.record_failure("p");
    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(circuits.state("p"), CircuitState::HalfOpen);

    assert!(circuits.check("p").is_ok());
    assert!(circuits.check("p").is_err());

    circuits.release_trial("p");
    assert!(circuits.check("p").is_ok());
    assert!(circuits.check("p").is_err());

    circuits.record_success("p");
    assert_eq!(circuits.state("p"), CircuitState::Closed);
    assert!(circuits.check("p").is_ok());
    assert!(circuits.check("p").is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_trial_expires_after_reset_window() {
    let circuits = registry(1, Duration::from_secs(30));
    circuits.record_failure("p");
    tokio::time::advance(Duration::from_secs(31)).await;

    assert!(circuits.check("p").is_ok());
    assert!(circuits.check("p").is_err());
    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(circuits.check("p").is_ok());
}

#[tokio::test]
async fn test_refused_language_pair_does_not_trip_circuit() {
    let provider = Arc::new(PickyProvider {
        calls: AtomicUsize::new(0),
    });
    let circuits = registry(1, Duration::from_secs(30));
    let translator =
        ResilientTranslator::new(provider.clone(), circuits.clone(), policy(2), 1, None);

    for text in ["uno", "dos", "tres"] {
        let attempt = translator.translate(text, "ja", "en").await;
        assert!(matches!(
            attempt.result.unwrap_err().kind,
            TranslationErrorKind::UnsupportedLanguagePair { .. }
        ));
        assert_eq!(attempt.failures.len(), 1);
    }

    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert_eq!(circuits.state("picky"), CircuitState::Closed);
    assert_eq!(circuits.consecutive_failures("picky"), 0);
}
