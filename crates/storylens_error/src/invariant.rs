//! Invariant violation errors.

/// A stage produced data that breaks the analysis data model.
///
/// Invariant violations are fatal for the run: the run is never persisted.
///
/// # Examples
///
/// ```
/// use storylens_error::InvariantError;
///
/// let err = InvariantError::new("extraction", "evt_0123", "event cites no segments");
/// assert_eq!(err.stage, "extraction");
/// assert!(format!("{}", err).contains("evt_0123"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display(
    "Invariant Error: stage {} record {}: {} at line {} in {}",
    stage,
    record,
    message,
    line,
    file
)]
pub struct InvariantError {
    /// Stage that produced the violating record
    pub stage: String,
    /// Identifier of the violating record
    pub record: String,
    /// What was violated
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl InvariantError {
    /// Create a new InvariantError at the current location.
    #[track_caller]
    pub fn new(
        stage: impl Into<String>,
        record: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let location = std::panic::Location::caller();
        Self {
            stage: stage.into(),
            record: record.into(),
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
