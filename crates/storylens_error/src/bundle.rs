//! Bundle codec error types.

/// One variant per integrity check performed while encoding or decoding a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum BundleErrorKind {
    /// Fewer bytes than a header plus trailer
    #[display("Bundle too short: {} bytes", _0)]
    TooShort(usize),
    /// Header does not start with the bundle magic
    #[display("Bad bundle magic: {:?}", _0)]
    BadMagic([u8; 4]),
    /// Format version in the header is not supported
    #[display("Unsupported bundle format version: {}", _0)]
    UnsupportedFormatVersion(u8),
    /// Declared section lengths do not add up to the file length
    #[display("Bundle length mismatch: expected {} bytes, found {}", expected, actual)]
    LengthMismatch {
        /// Length implied by the header
        expected: u64,
        /// Actual length of the input
        actual: u64,
    },
    /// Manifest bytes do not match the trailer checksum
    #[display("Manifest checksum mismatch")]
    ManifestChecksumMismatch,
    /// Compressed payload does not match the trailer checksum
    #[display("Payload checksum mismatch")]
    PayloadChecksumMismatch,
    /// Manifest is not valid UTF-8 JSON of the expected shape
    #[display("Invalid manifest: {}", _0)]
    InvalidManifest(String),
    /// Manifest declares a bundle schema this codec does not read
    #[display("Unsupported bundle schema: {}", _0)]
    UnsupportedSchema(String),
    /// Manifest format version disagrees with the header
    #[display("Manifest format version {} disagrees with header version {}", manifest, header)]
    FormatVersionDisagreement {
        /// Version in the manifest
        manifest: u8,
        /// Version in the header
        header: u8,
    },
    /// Manifest names a compression other than zlib
    #[display("Unsupported compression: {}", _0)]
    UnsupportedCompression(String),
    /// Payload failed to compress or decompress
    #[display("Compression failure: {}", _0)]
    Compression(String),
    /// Payload inflates to a size other than the record table declares
    #[display("Decompressed payload size mismatch: expected {} bytes, found {}", expected, actual)]
    DecompressedSizeMismatch {
        /// Sum of the declared record lengths
        expected: u64,
        /// Bytes inflated, capped one past `expected`
        actual: u64,
    },
    /// Decompressed payload does not match the manifest checksum
    #[display("Decompressed payload checksum mismatch")]
    DecompressedChecksumMismatch,
    /// Record table entry is not contiguous or overruns the payload
    #[display("Record '{}' out of bounds: {}", name, reason)]
    RecordOutOfBounds {
        /// Record name
        name: String,
        /// What was wrong with its span
        reason: String,
    },
    /// Record bytes do not match the recorded checksum
    #[display("Record '{}' checksum mismatch", _0)]
    RecordChecksumMismatch(String),
    /// A required record is absent from the manifest
    #[display("Missing record: {}", _0)]
    MissingRecord(String),
    /// A record failed to serialize or deserialize
    #[display("Record '{}' could not be decoded: {}", name, message)]
    RecordDecode {
        /// Record name
        name: String,
        /// Error message
        message: String,
    },
}

impl BundleErrorKind {
    /// True when the failure is a checksum comparison.
    pub fn is_checksum_failure(&self) -> bool {
        matches!(
            self,
            BundleErrorKind::ManifestChecksumMismatch
                | BundleErrorKind::PayloadChecksumMismatch
                | BundleErrorKind::DecompressedChecksumMismatch
                | BundleErrorKind::RecordChecksumMismatch(_)
        )
    }
}

/// Bundle error with location tracking.
///
/// # Examples
///
/// ```
/// use storylens_error::{BundleError, BundleErrorKind};
///
/// let err = BundleError::new(BundleErrorKind::PayloadChecksumMismatch);
/// assert!(err.kind.is_checksum_failure());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Bundle Error: {} at line {} in {}", kind, line, file)]
pub struct BundleError {
    /// The kind of error that occurred
    pub kind: BundleErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl BundleError {
    /// Create a new bundle error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: BundleErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
