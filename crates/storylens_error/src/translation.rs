//! Translation provider error types and retry classification.

/// Translation provider failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum TranslationErrorKind {
    /// Provider returned an error
    #[display("Provider '{}' failed: {}", provider, message)]
    ProviderFailure {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
    /// Provider did not answer within the per-call timeout
    #[display("Provider '{}' timed out after {}ms", provider, timeout_ms)]
    Timeout {
        /// Provider name
        provider: String,
        /// Timeout that elapsed
        timeout_ms: u64,
    },
    /// Circuit breaker refused the call
    #[display("Circuit open for provider '{}'", _0)]
    CircuitOpen(String),
    /// Provider cannot translate between these languages
    #[display("Provider '{}' does not support {} -> {}", provider, source, target)]
    UnsupportedLanguagePair {
        /// Provider name
        provider: String,
        /// Source language code
        source: String,
        /// Target language code
        target: String,
    },
    /// Worker pool was shut down while waiting for a slot
    #[display("Translation worker pool closed")]
    PoolClosed,
}

/// Retry classification for provider errors.
pub trait RetryableError {
    /// Check if this error should be retried.
    fn is_retryable(&self) -> bool;
}

impl TranslationErrorKind {
    /// Name of the provider the failure belongs to, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            TranslationErrorKind::ProviderFailure { provider, .. }
            | TranslationErrorKind::Timeout { provider, .. }
            | TranslationErrorKind::UnsupportedLanguagePair { provider, .. } => Some(provider),
            TranslationErrorKind::CircuitOpen(provider) => Some(provider),
            TranslationErrorKind::PoolClosed => None,
        }
    }

    /// Stable diagnostic reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            TranslationErrorKind::ProviderFailure { .. } => "provider_failure",
            TranslationErrorKind::Timeout { .. } => "provider_timeout",
            TranslationErrorKind::CircuitOpen(_) => "circuit_open",
            TranslationErrorKind::UnsupportedLanguagePair { .. } => "unsupported_language_pair",
            TranslationErrorKind::PoolClosed => "pool_closed",
        }
    }
}

/// Translation error with source location tracking.
///
/// # Examples
///
/// ```
/// use storylens_error::{RetryableError, TranslationError, TranslationErrorKind};
///
/// let err = TranslationError::new(TranslationErrorKind::CircuitOpen("lexicon".into()));
/// assert!(!err.is_retryable());
/// assert!(format!("{}", err).contains("Circuit open"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Translation Error: {} at line {} in {}", kind, line, file)]
pub struct TranslationError {
    /// The kind of error that occurred
    pub kind: TranslationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl TranslationError {
    /// Create a new TranslationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: TranslationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl RetryableError for TranslationError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TranslationErrorKind::ProviderFailure { .. } | TranslationErrorKind::Timeout { .. }
        )
    }
}
