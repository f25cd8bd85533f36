//! Bundle manifest and record table.

use crate::format::{BUNDLE_FORMAT_VERSION, reject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storylens_error::{BundleError, BundleErrorKind};

/// Manifest schema key written into every bundle.
pub const BUNDLE_SCHEMA_VERSION: &str = "story_bundle.v1";

/// Only compression method this codec writes or reads.
pub const BUNDLE_COMPRESSION: &str = "zlib";

/// One record's span inside the uncompressed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordEntry {
    /// Record file name
    pub name: String,
    /// MIME type of the record bytes
    pub media_type: String,
    /// Byte offset in the uncompressed payload
    pub offset: u64,
    /// Byte length
    pub length: u64,
    /// Hex SHA-256 of the record bytes
    pub sha256: String,
}

/// Manifest carried between the header and the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleManifest {
    /// Always [`BUNDLE_SCHEMA_VERSION`]
    pub bundle_schema_version: String,
    /// Must equal the header's format version
    pub format_version: u8,
    /// Story the run belongs to
    pub story_id: String,
    /// Schema version of the packed run
    pub story_schema_version: String,
    /// When the bundle was written
    pub created_at: DateTime<Utc>,
    /// Payload compression, always [`BUNDLE_COMPRESSION`]
    pub compression: String,
    /// Hex SHA-256 of the uncompressed payload
    pub payload_sha256: String,
    /// Records in payload order
    pub records: Vec<RecordEntry>,
}

impl BundleManifest {
    /// Record table entry named `name`.
    pub fn record(&self, name: &str) -> Option<&RecordEntry> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Parse manifest bytes and check the fields that gate decoding.
    pub(crate) fn parse(bytes: &[u8], header_version: u8) -> Result<Self, BundleError> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| reject(BundleErrorKind::InvalidManifest(e.to_string())))?;

        if manifest.bundle_schema_version != BUNDLE_SCHEMA_VERSION {
            return Err(reject(BundleErrorKind::UnsupportedSchema(
                manifest.bundle_schema_version,
            )));
        }
        if manifest.format_version != header_version {
            return Err(reject(BundleErrorKind::FormatVersionDisagreement {
                manifest: manifest.format_version,
                header: header_version,
            }));
        }
        if manifest.compression != BUNDLE_COMPRESSION {
            return Err(reject(BundleErrorKind::UnsupportedCompression(
                manifest.compression,
            )));
        }
        Ok(manifest)
    }

    /// Total payload size implied by the record table.
    pub(crate) fn declared_payload_len(&self) -> Result<u64, BundleError> {
        self.records
            .iter()
            .try_fold(0u64, |total, entry| total.checked_add(entry.length))
            .ok_or_else(|| {
                reject(BundleErrorKind::InvalidManifest(
                    "record lengths overflow".to_string(),
                ))
            })
    }

    /// Byte ranges of each record, checked to tile `payload_len` exactly.
    pub(crate) fn record_spans(
        &self,
        payload_len: usize,
    ) -> Result<Vec<(&RecordEntry, std::ops::Range<usize>)>, BundleError> {
        let mut spans = Vec::with_capacity(self.records.len());
        let mut cursor: u64 = 0;
        for entry in &self.records {
            if entry.offset != cursor {
                return Err(reject(BundleErrorKind::RecordOutOfBounds {
                    name: entry.name.clone(),
                    reason: format!("starts at {}, expected {}", entry.offset, cursor),
                }));
            }
            let end = entry
                .offset
                .checked_add(entry.length)
                .filter(|end| *end <= payload_len as u64)
                .ok_or_else(|| {
                    reject(BundleErrorKind::RecordOutOfBounds {
                        name: entry.name.clone(),
                        reason: format!(
                            "{} bytes at {} overrun a {}-byte payload",
                            entry.length, entry.offset, payload_len
                        ),
                    })
                })?;
            spans.push((entry, entry.offset as usize..end as usize));
            cursor = end;
        }
        if cursor != payload_len as u64 {
            let name = self
                .records
                .last()
                .map(|r| r.name.clone())
                .unwrap_or_default();
            return Err(reject(BundleErrorKind::RecordOutOfBounds {
                name,
                reason: format!("{} trailing payload bytes", payload_len as u64 - cursor),
            }));
        }
        Ok(spans)
    }
}

/// Build a manifest for records laid out back to back.
pub(crate) fn layout(
    story_id: &str,
    story_schema_version: &str,
    created_at: DateTime<Utc>,
    records: impl IntoIterator<Item = (String, &'static str, Vec<u8>)>,
) -> (BundleManifest, Vec<u8>) {
    let mut payload = Vec::new();
    let mut entries = Vec::new();
    for (name, media_type, bytes) in records {
        entries.push(RecordEntry {
            name,
            media_type: media_type.to_string(),
            offset: payload.len() as u64,
            length: bytes.len() as u64,
            sha256: storylens_core::sha256_hex(&bytes),
        });
        payload.extend_from_slice(&bytes);
    }
    let manifest = BundleManifest {
        bundle_schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
        format_version: BUNDLE_FORMAT_VERSION,
        story_id: story_id.to_string(),
        story_schema_version: story_schema_version.to_string(),
        created_at,
        compression: BUNDLE_COMPRESSION.to_string(),
        payload_sha256: storylens_core::sha256_hex(&payload),
        records: entries,
    };
    (manifest, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(records: Vec<RecordEntry>) -> BundleManifest {
        BundleManifest {
            bundle_schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
            format_version: BUNDLE_FORMAT_VERSION,
            story_id: "story-1".to_string(),
            story_schema_version: "story_analysis.v1".to_string(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            compression: BUNDLE_COMPRESSION.to_string(),
            payload_sha256: String::new(),
            records,
        }
    }

    fn entry(name: &str, offset: u64, length: u64) -> RecordEntry {
        RecordEntry {
            name: name.to_string(),
            media_type: "application/json".to_string(),
            offset,
            length,
            sha256: String::new(),
        }
    }

    #[test]
    fn test_gap_between_records_is_rejected() {
        let m = manifest(vec![entry("a.json", 0, 4), entry("b.json", 5, 4)]);
        let err = m.record_spans(9).unwrap_err();
        assert!(matches!(
            err.kind,
            BundleErrorKind::RecordOutOfBounds { ref name, .. } if name == "b.json"
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let m = manifest(vec![entry("a.json", 0, 4)]);
        assert!(m.record_spans(6).is_err());
        assert_eq!(m.record_spans(4).expect("exact fit")[0].1, 0..4);
    }

    #[test]
    fn test_unknown_manifest_fields_are_invalid() {
        let err = BundleManifest::parse(br#"{"surprise": true}"#, 1).unwrap_err();
        assert!(matches!(err.kind, BundleErrorKind::InvalidManifest(_)));
    }
}
