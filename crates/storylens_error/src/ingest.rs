//! Input error types.

/// Reasons an input is rejected before any stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum IngestErrorKind {
    /// Nothing left after normalization
    #[display("Input is empty after normalization")]
    EmptyInput,
    /// Source type is not text, document or transcript
    #[display("Unsupported source type: {}", _0)]
    UnsupportedSourceType(String),
    /// Neither raw content nor pre-split segments were supplied
    #[display("Input has no source text or segments")]
    MissingContent,
    /// Both raw content and pre-split segments were supplied
    #[display("Input supplies both source text and segments")]
    AmbiguousContent,
    /// A required identifier is blank
    #[display("Missing required field: {}", _0)]
    MissingField(String),
    /// Language code is not a plain ISO-639 style tag
    #[display("Invalid language code: {}", _0)]
    InvalidLanguage(String),
}

/// Input error with location tracking.
///
/// # Examples
///
/// ```
/// use storylens_error::{IngestError, IngestErrorKind};
///
/// let err = IngestError::new(IngestErrorKind::UnsupportedSourceType("audio".into()));
/// assert!(format!("{}", err).contains("audio"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Ingest Error: {} at line {} in {}", kind, line, file)]
pub struct IngestError {
    /// The kind of error that occurred
    pub kind: IngestErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl IngestError {
    /// Create a new ingest error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: IngestErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
