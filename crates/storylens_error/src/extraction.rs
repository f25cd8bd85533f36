//! Extraction provider error types.

/// Extraction provider failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ExtractionErrorKind {
    /// Provider is not reachable or disabled
    #[display("Extraction provider '{}' unavailable", _0)]
    ProviderUnavailable(String),
    /// Provider rejected a segment
    #[display("Extraction provider '{}' failed on {}: {}", provider, segment_id, message)]
    SegmentRejected {
        /// Provider name
        provider: String,
        /// Segment that could not be processed
        segment_id: String,
        /// Error message
        message: String,
    },
}

impl ExtractionErrorKind {
    /// Stable diagnostic reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ExtractionErrorKind::ProviderUnavailable(_) => "provider_unavailable",
            ExtractionErrorKind::SegmentRejected { .. } => "segment_rejected",
        }
    }
}

/// Extraction error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Extraction Error: {} at line {} in {}", kind, line, file)]
pub struct ExtractionError {
    /// The kind of error that occurred
    pub kind: ExtractionErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ExtractionError {
    /// Create a new extraction error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ExtractionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
