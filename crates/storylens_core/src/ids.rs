//! Content-derived identifiers.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    format!("{:x}", hasher.finalize())
}

/// Derive a stable identifier from content.
///
/// The identifier is `{prefix}_` followed by the first twelve hex characters
/// of the SHA-256 of `text`, so identical input always yields the same ID.
///
/// # Examples
///
/// ```
/// use storylens_core::stable_id;
///
/// let a = stable_id("seg", "abc:0");
/// assert_eq!(a, stable_id("seg", "abc:0"));
/// assert!(a.starts_with("seg_"));
/// assert_eq!(a.len(), "seg_".len() + 12);
/// ```
pub fn stable_id(prefix: &str, text: &str) -> String {
    let digest = sha256_hex(text);
    format!("{}_{}", prefix, &digest[..12])
}
