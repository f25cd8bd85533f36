//! Analysis run persistence.
//!
//! Two [`AnalysisRepository`](storylens_interface::AnalysisRepository)
//! implementations share one record codec:
//! - [`InMemoryAnalysisRepository`] keeps serialized runs in memory
//! - [`FileSystemAnalysisRepository`] writes `{base}/{story_id}/{run_id}.json`
//!
//! Both refuse records whose `schema_version` is not
//! [`SCHEMA_VERSION`](storylens_core::SCHEMA_VERSION).

mod filesystem;
mod memory;

pub use filesystem::FileSystemAnalysisRepository;
pub use memory::InMemoryAnalysisRepository;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use storylens_core::{AnalysisRun, RunSummary, SCHEMA_VERSION};
use storylens_error::{StorageError, StorageErrorKind, StorylensResult};

/// Fields read from a stored record before decoding the rest.
#[derive(Debug, Deserialize)]
struct StoredHeader {
    schema_version: String,
    run_id: String,
    story_id: String,
    dedupe_key: String,
    created_at: DateTime<Utc>,
    quality_gate: StoredGate,
}

#[derive(Debug, Deserialize)]
struct StoredGate {
    passed: bool,
}

impl StoredHeader {
    fn summary(self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            story_id: self.story_id,
            dedupe_key: self.dedupe_key,
            created_at: self.created_at,
            passed: self.quality_gate.passed,
        }
    }
}

fn check_schema(found: &str) -> Result<(), StorageError> {
    if found == SCHEMA_VERSION {
        Ok(())
    } else {
        Err(StorageError::new(StorageErrorKind::SchemaVersionMismatch {
            expected: SCHEMA_VERSION.to_string(),
            found: found.to_string(),
        }))
    }
}

/// Reject identifiers that cannot serve as a single path component.
fn check_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('.')
        || key.chars().any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());
    if invalid {
        Err(StorageError::new(StorageErrorKind::InvalidKey(key.to_string())))
    } else {
        Ok(())
    }
}

fn encode_run(run: &AnalysisRun) -> StorylensResult<Vec<u8>> {
    check_key(&run.story_id)?;
    check_key(&run.run_id)?;
    check_schema(&run.schema_version)?;
    serde_json::to_vec_pretty(run)
        .map_err(|e| StorageError::new(StorageErrorKind::Serialization(e.to_string())).into())
}

fn decode_header(bytes: &[u8]) -> StorylensResult<StoredHeader> {
    let header: StoredHeader = serde_json::from_slice(bytes)
        .map_err(|e| StorageError::new(StorageErrorKind::Serialization(e.to_string())))?;
    check_schema(&header.schema_version)?;
    Ok(header)
}

fn decode_run(bytes: &[u8]) -> StorylensResult<AnalysisRun> {
    decode_header(bytes)?;
    serde_json::from_slice(bytes)
        .map_err(|e| StorageError::new(StorageErrorKind::Serialization(e.to_string())).into())
}

/// Newest first, run ID as the tie-break, then the filter's limit.
fn finish_listing(mut summaries: Vec<RunSummary>, limit: Option<usize>) -> Vec<RunSummary> {
    summaries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
    if let Some(limit) = limit {
        summaries.truncate(limit);
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_must_be_single_path_components() {
        assert!(check_key("story-1").is_ok());
        assert!(check_key("../escape").is_err());
        assert!(check_key("a/b").is_err());
        assert!(check_key("").is_err());
    }

    #[test]
    fn test_other_schema_is_rejected() {
        let err = check_schema("story_analysis.v0").unwrap_err();
        assert!(matches!(
            err.kind,
            StorageErrorKind::SchemaVersionMismatch { .. }
        ));
    }
}
