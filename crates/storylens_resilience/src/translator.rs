//! Translation calls wrapped in retry, timeout, rate limiting and circuit breaking.
//!
//! Each attempt is:
//! 1. refused immediately if the provider's circuit is open
//! 2. paced by the optional governor limiter
//! 3. bounded by a per-attempt timeout
//!
//! Failed attempts are retried with jittered exponential backoff until the
//! retry budget is spent. Only timeouts and provider failures count toward
//! the circuit. Concurrency across a run is bounded by a semaphore.

use crate::{CircuitBreakerRegistry, TranslationConfig};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storylens_core::Translation;
use storylens_error::{RetryableError, TranslationError, TranslationErrorKind};
use storylens_interface::TranslationProvider;
use tokio::sync::Semaphore;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, instrument, warn};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Retry and timeout policy for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_count: usize,
    /// First backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Largest single backoff delay in milliseconds
    pub max_backoff_ms: u64,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Policy described by a translation config section.
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            retry_count: *config.retry_count(),
            initial_backoff_ms: *config.initial_backoff_ms(),
            max_backoff_ms: *config.max_backoff_ms(),
            timeout: config.timeout(),
        }
    }
}

/// Outcome of one failed attempt, reported for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// One-based attempt number
    pub attempt: usize,
    /// Stable reason code
    pub reason: String,
    /// Error text
    pub detail: String,
}

/// Result of a resilient translation call.
#[derive(Debug, Clone)]
pub struct TranslationAttempt {
    /// Final result after retries
    pub result: Result<Translation, TranslationError>,
    /// Every failed attempt, in order
    pub failures: Vec<AttemptFailure>,
}

/// Translation provider guarded by retry, timeout, rate limit and circuit breaker.
///
/// Cloning is cheap; clones share the provider, limiter, worker pool and
/// circuit registry.
///
/// # Example
///
/// ```rust,ignore
/// let translator = ResilientTranslator::new(provider, registry, policy, 4, None);
/// let attempt = translator.translate("la historia", "es", "en").await;
/// ```
#[derive(Clone)]
pub struct ResilientTranslator {
    provider: Arc<dyn TranslationProvider>,
    circuits: Arc<CircuitBreakerRegistry>,
    policy: RetryPolicy,
    limiter: Option<Arc<DirectRateLimiter>>,
    workers: Arc<Semaphore>,
}

impl ResilientTranslator {
    /// Wrap a provider.
    ///
    /// `max_concurrent` bounds in-flight calls; `requests_per_minute`
    /// enables rate limiting when set.
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        circuits: Arc<CircuitBreakerRegistry>,
        policy: RetryPolicy,
        max_concurrent: usize,
        requests_per_minute: Option<u32>,
    ) -> Self {
        let limiter = requests_per_minute.and_then(NonZeroU32::new).map(|rpm| {
            let quota = Quota::per_minute(rpm);
            Arc::new(GovernorRateLimiter::direct(quota))
        });

        Self {
            provider,
            circuits,
            policy,
            limiter,
            workers: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Wrap a provider using a translation config section.
    pub fn from_config(
        provider: Arc<dyn TranslationProvider>,
        circuits: Arc<CircuitBreakerRegistry>,
        config: &TranslationConfig,
    ) -> Self {
        Self::new(
            provider,
            circuits,
            RetryPolicy::from_config(config),
            *config.max_concurrent(),
            *config.requests_per_minute(),
        )
    }

    /// Name of the wrapped provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether the wrapped provider handles this language pair.
    pub fn supports(&self, source_language: &str, target_language: &str) -> bool {
        self.provider.supports(source_language, target_language)
    }

    /// Shared circuit registry.
    pub fn circuits(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.circuits
    }

    /// Translate with retries, recording every failed attempt.
    ///
    /// Never panics; the final error is returned in the attempt record.
    #[instrument(skip(self, text), fields(provider = %self.provider.name(), chars = text.len()))]
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> TranslationAttempt {
        let permit = match self.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                return TranslationAttempt {
                    result: Err(TranslationError::new(TranslationErrorKind::PoolClosed)),
                    failures: Vec::new(),
                };
            }
        };

        let retry_strategy = ExponentialBackoff::from_millis(self.policy.initial_backoff_ms.max(1))
            .factor(2)
            .max_delay(Duration::from_millis(self.policy.max_backoff_ms.max(1)))
            .map(jitter)
            .take(self.policy.retry_count);

        let attempts = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(std::sync::Mutex::new(Vec::new()));

        let result = Retry::spawn(retry_strategy, || {
            let provider = self.provider.clone();
            let circuits = self.circuits.clone();
            let limiter = self.limiter.clone();
            let attempts = attempts.clone();
            let failures = failures.clone();
            let timeout = self.policy.timeout;
            let text = text.to_string();
            let source = source_language.to_string();
            let target = target_language.to_string();
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let name = provider.name().to_string();

                if let Err(e) = circuits.check(&name) {
                    record(&failures, attempt, &e);
                    return Err(RetryError::Permanent(e));
                }

                if let Some(limiter) = &limiter {
                    limiter.until_ready().await;
                }

                let outcome =
                    match tokio::time::timeout(timeout, provider.translate(&text, &source, &target))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(TranslationError::new(TranslationErrorKind::Timeout {
                            provider: name.clone(),
                            timeout_ms: timeout.as_millis() as u64,
                        })),
                    };

                match outcome {
                    Ok(translation) => {
                        circuits.record_success(&name);
                        debug!(attempt, "Translation succeeded");
                        Ok(translation)
                    }
                    Err(e) => {
                        record(&failures, attempt, &e);
                        // Only health failures count toward the circuit; a
                        // refused request means the provider is answering.
                        if e.is_retryable() {
                            circuits.record_failure(&name);
                            warn!(attempt, error = %e, "Translation attempt failed, will retry");
                            Err(RetryError::Transient {
                                err: e,
                                retry_after: None,
                            })
                        } else {
                            circuits.release_trial(&name);
                            warn!(attempt, error = %e, "Permanent translation error");
                            Err(RetryError::Permanent(e))
                        }
                    }
                }
            }
        })
        .await;

        drop(permit);

        let failures = failures
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

        TranslationAttempt { result, failures }
    }
}

fn record(
    failures: &std::sync::Mutex<Vec<AttemptFailure>>,
    attempt: usize,
    error: &TranslationError,
) {
    let failure = AttemptFailure {
        attempt,
        reason: error.kind.reason_code().to_string(),
        detail: error.kind.to_string(),
    };
    match failures.lock() {
        Ok(mut guard) => guard.push(failure),
        Err(poisoned) => poisoned.into_inner().push(failure),
    }
}
