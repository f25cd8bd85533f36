//! Per-provider circuit breaker shared across runs.
//!
//! One registry is created by the caller and passed by reference into every
//! run that should share breaker state. Tests create a fresh registry each.

use crate::TranslationConfig;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use storylens_error::{TranslationError, TranslationErrorKind};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Observable state of one provider's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum CircuitState {
    /// Calls flow normally
    #[display("closed")]
    Closed,
    /// Calls are refused until the reset window elapses
    #[display("open")]
    Open,
    /// Reset window elapsed; one trial call at a time is admitted
    #[display("half_open")]
    HalfOpen,
}

#[derive(Debug, Default)]
struct ProviderCircuit {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_started: Option<Instant>,
}

/// Thresholds for every circuit in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSettings {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time an open circuit waits before admitting a trial
    pub reset_after: Duration,
}

impl CircuitSettings {
    /// Settings described by a translation config section.
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            failure_threshold: *config.circuit_failure_threshold(),
            reset_after: config.circuit_reset(),
        }
    }
}

/// Registry of circuit breakers keyed by provider name.
///
/// State is guarded by a single mutex. The lock is held only for the
/// check or update itself, never across a provider call.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use storylens_resilience::{CircuitBreakerRegistry, CircuitSettings, CircuitState};
///
/// let registry = CircuitBreakerRegistry::new(CircuitSettings {
///     failure_threshold: 2,
///     reset_after: Duration::from_secs(30),
/// });
///
/// registry.record_failure("lexicon");
/// assert_eq!(registry.state("lexicon"), CircuitState::Closed);
/// registry.record_failure("lexicon");
/// assert_eq!(registry.state("lexicon"), CircuitState::Open);
/// assert!(registry.check("lexicon").is_err());
/// ```
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    settings: CircuitSettings,
    circuits: Mutex<HashMap<String, ProviderCircuit>>,
}

impl CircuitBreakerRegistry {
    /// Create an empty registry.
    pub fn new(settings: CircuitSettings) -> Self {
        Self {
            settings,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Settings shared by every circuit in the registry.
    pub fn settings(&self) -> CircuitSettings {
        self.settings
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ProviderCircuit>> {
        // A panic while holding the lock leaves counters that are still valid.
        self.circuits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_of(&self, circuit: &ProviderCircuit) -> CircuitState {
        match circuit.opened_at {
            None => CircuitState::Closed,
            Some(opened_at) if opened_at.elapsed() >= self.settings.reset_after => {
                CircuitState::HalfOpen
            }
            Some(_) => CircuitState::Open,
        }
    }

    /// Current state of a provider's circuit.
    pub fn state(&self, provider: &str) -> CircuitState {
        let circuits = self.lock();
        circuits
            .get(provider)
            .map(|circuit| self.state_of(circuit))
            .unwrap_or(CircuitState::Closed)
    }

    /// Consecutive failures recorded for a provider.
    pub fn consecutive_failures(&self, provider: &str) -> u32 {
        self.lock()
            .get(provider)
            .map(|circuit| circuit.consecutive_failures)
            .unwrap_or(0)
    }

    /// Check whether a call may proceed.
    ///
    /// Once the reset window has elapsed the first caller is admitted as a
    /// trial. Other callers are refused until the trial reports back, or
    /// until another reset window passes without a report.
    ///
    /// # Errors
    ///
    /// Returns `CircuitOpen` while the provider's circuit is open or a trial
    /// is in flight.
    pub fn check(&self, provider: &str) -> Result<(), TranslationError> {
        let mut circuits = self.lock();
        let Some(circuit) = circuits.get_mut(provider) else {
            return Ok(());
        };
        let refused = || -> Result<(), TranslationError> {
            Err(TranslationError::new(TranslationErrorKind::CircuitOpen(
                provider.to_string(),
            )))
        };
        match self.state_of(circuit) {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                debug!(provider, "Circuit open, refusing call");
                refused()
            }
            CircuitState::HalfOpen => {
                let trial_pending = circuit
                    .trial_started
                    .is_some_and(|started| started.elapsed() < self.settings.reset_after);
                if trial_pending {
                    debug!(provider, "Trial in flight, refusing call");
                    refused()
                } else {
                    debug!(provider, "Circuit half-open, admitting trial");
                    circuit.trial_started = Some(Instant::now());
                    Ok(())
                }
            }
        }
    }

    /// Record a successful call, closing the circuit.
    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.lock();
        if let Some(circuit) = circuits.get_mut(provider) {
            if circuit.opened_at.is_some() {
                debug!(provider, "Trial succeeded, closing circuit");
            }
            circuit.consecutive_failures = 0;
            circuit.opened_at = None;
            circuit.trial_started = None;
        }
    }

    /// Record a failed call, opening the circuit at the threshold.
    ///
    /// A failed trial re-opens the circuit for a full reset window.
    pub fn record_failure(&self, provider: &str) {
        let mut circuits = self.lock();
        let circuit = circuits.entry(provider.to_string()).or_default();
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
        if circuit.consecutive_failures >= self.settings.failure_threshold {
            if circuit.opened_at.is_none() {
                warn!(
                    provider,
                    failures = circuit.consecutive_failures,
                    "Opening circuit"
                );
            }
            circuit.opened_at = Some(Instant::now());
        }
        circuit.trial_started = None;
    }

    /// Release an admitted trial without changing the circuit's health.
    ///
    /// Used when the provider answered but refused the request itself, which
    /// says nothing about whether it has recovered.
    pub fn release_trial(&self, provider: &str) {
        if let Some(circuit) = self.lock().get_mut(provider) {
            circuit.trial_started = None;
        }
    }

    /// Forget all state for a provider.
    pub fn reset(&self, provider: &str) {
        self.lock().remove(provider);
    }
}
