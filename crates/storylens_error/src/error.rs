//! Top-level error wrapper types.

use crate::{
    BundleError, ConfigError, ExtractionError, IngestError, InvariantError, JsonError,
    StorageError, TranslationError,
};

/// Every error condition a Storylens crate can surface.
///
/// # Examples
///
/// ```
/// use storylens_error::{ConfigError, StorylensError};
///
/// let err: StorylensError = ConfigError::new("retry_count out of range").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum StorylensErrorKind {
    /// Malformed or unsupported input
    #[from(IngestError)]
    Ingest(IngestError),
    /// Translation provider failure
    #[from(TranslationError)]
    Translation(TranslationError),
    /// Extraction provider failure
    #[from(ExtractionError)]
    Extraction(ExtractionError),
    /// Data-model invariant violated by a stage
    #[from(InvariantError)]
    Invariant(InvariantError),
    /// Bundle encode/decode failure
    #[from(BundleError)]
    Bundle(BundleError),
    /// Persistence failure
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
}

/// Storylens error with kind discrimination.
///
/// # Examples
///
/// ```
/// use storylens_error::{StorylensErrorKind, StorylensResult, IngestError, IngestErrorKind};
///
/// fn reject() -> StorylensResult<()> {
///     Err(IngestError::new(IngestErrorKind::UnsupportedSourceType("audio".into())))?
/// }
///
/// let err = reject().unwrap_err();
/// assert!(matches!(err.kind(), StorylensErrorKind::Ingest(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Storylens Error: {}", _0)]
pub struct StorylensError(Box<StorylensErrorKind>);

impl StorylensError {
    /// Create a new error from a kind.
    pub fn new(kind: StorylensErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StorylensErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to StorylensErrorKind
impl<T> From<T> for StorylensError
where
    T: Into<StorylensErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Storylens operations.
pub type StorylensResult<T> = std::result::Result<T, StorylensError>;
