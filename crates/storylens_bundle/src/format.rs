//! Binary framing: fixed header, manifest, payload, checksum trailer.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "SGBN"
//! 4       1     format version
//! 5       8     manifest length (u64, big-endian)
//! 13      8     compressed payload length (u64, big-endian)
//! 21      m     manifest (UTF-8 JSON)
//! 21+m    p     compressed payload (zlib)
//! 21+m+p  32    SHA-256 of manifest bytes
//! 53+m+p  32    SHA-256 of compressed payload
//! ```

use sha2::{Digest, Sha256};
use storylens_error::{BundleError, BundleErrorKind};
use tracing::{debug, warn};

/// File magic.
pub const BUNDLE_MAGIC: [u8; 4] = *b"SGBN";

/// Binary format version written into the header.
pub const BUNDLE_FORMAT_VERSION: u8 = 1;

/// Conventional file extension.
pub const BUNDLE_EXTENSION: &str = "sgb";

pub(crate) const HEADER_LEN: usize = 4 + 1 + 8 + 8;
pub(crate) const DIGEST_LEN: usize = 32;
pub(crate) const TRAILER_LEN: usize = DIGEST_LEN * 2;

pub(crate) type Digest32 = [u8; DIGEST_LEN];

pub(crate) fn sha256(data: &[u8]) -> Digest32 {
    Sha256::digest(data).into()
}

#[track_caller]
pub(crate) fn reject(kind: BundleErrorKind) -> BundleError {
    let err = BundleError::new(kind);
    warn!(error = %err.kind, "Bundle rejected");
    err
}

/// Manifest and compressed payload slices of a verified frame.
#[derive(Debug)]
pub(crate) struct Frame<'a> {
    pub format_version: u8,
    pub manifest: &'a [u8],
    pub payload: &'a [u8],
}

/// Assemble header, sections and trailer.
pub(crate) fn write_frame(manifest: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + manifest.len() + payload.len() + TRAILER_LEN);
    out.extend_from_slice(&BUNDLE_MAGIC);
    out.push(BUNDLE_FORMAT_VERSION);
    out.extend_from_slice(&(manifest.len() as u64).to_be_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    out.extend_from_slice(manifest);
    out.extend_from_slice(payload);
    out.extend_from_slice(&sha256(manifest));
    out.extend_from_slice(&sha256(payload));
    out
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_be_bytes(buf)
}

/// Check header and trailer, returning the sections they describe.
///
/// Both trailer checksums are verified here, before any caller parses the
/// manifest or inflates the payload.
pub(crate) fn read_frame(bytes: &[u8]) -> Result<Frame<'_>, BundleError> {
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(reject(BundleErrorKind::TooShort(bytes.len())));
    }

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    if magic != BUNDLE_MAGIC {
        return Err(reject(BundleErrorKind::BadMagic(magic)));
    }

    let format_version = bytes[4];
    if format_version != BUNDLE_FORMAT_VERSION {
        return Err(reject(BundleErrorKind::UnsupportedFormatVersion(
            format_version,
        )));
    }

    let manifest_len = read_u64(bytes, 5);
    let payload_len = read_u64(bytes, 13);
    let actual = bytes.len() as u64;
    let expected = manifest_len
        .checked_add(payload_len)
        .and_then(|n| n.checked_add((HEADER_LEN + TRAILER_LEN) as u64));
    let Some(expected) = expected.filter(|expected| *expected == actual) else {
        return Err(reject(BundleErrorKind::LengthMismatch {
            expected: expected.unwrap_or(u64::MAX),
            actual,
        }));
    };
    debug!(expected, manifest_len, payload_len, "Bundle header accepted");

    // Lengths now fit in the slice, so the casts cannot truncate.
    let manifest_end = HEADER_LEN + manifest_len as usize;
    let payload_end = manifest_end + payload_len as usize;
    let manifest = &bytes[HEADER_LEN..manifest_end];
    let payload = &bytes[manifest_end..payload_end];
    let manifest_digest = &bytes[payload_end..payload_end + DIGEST_LEN];
    let payload_digest = &bytes[payload_end + DIGEST_LEN..];

    if sha256(manifest).as_slice() != manifest_digest {
        return Err(reject(BundleErrorKind::ManifestChecksumMismatch));
    }
    if sha256(payload).as_slice() != payload_digest {
        return Err(reject(BundleErrorKind::PayloadChecksumMismatch));
    }

    Ok(Frame {
        format_version,
        manifest,
        payload,
    })
}
