//! In-memory run repository.

use super::{decode_header, decode_run, encode_run, finish_listing};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use storylens_core::{AnalysisRun, RunSummary};
use storylens_error::{StorageError, StorageErrorKind, StorylensResult};
use storylens_interface::{AnalysisRepository, RunFilter};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// In-memory repository for analysis runs.
///
/// Runs are kept in their serialized form, so loading exercises the same
/// schema check as the filesystem backend. All data is lost when the
/// repository is dropped.
///
/// # Example
///
/// ```no_run
/// use storylens_analysis::InMemoryAnalysisRepository;
/// use storylens_interface::{AnalysisRepository, RunFilter};
///
/// # async fn demo() -> storylens_error::StorylensResult<()> {
/// let repo = InMemoryAnalysisRepository::new();
/// let runs = repo.list_runs(&RunFilter::for_story("story-1")).await?;
/// assert!(runs.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnalysisRepository {
    /// Serialized runs keyed by (story_id, run_id)
    runs: Arc<RwLock<BTreeMap<(String, String), Vec<u8>>>>,
}

impl InMemoryAnalysisRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs.
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Whether no runs are stored.
    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }

    /// Store raw record bytes without validation.
    ///
    /// Used to seed records written by other builds.
    pub async fn insert_raw(&self, story_id: &str, run_id: &str, bytes: Vec<u8>) {
        self.runs
            .write()
            .await
            .insert((story_id.to_string(), run_id.to_string()), bytes);
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    #[instrument(skip(self, run), fields(story_id = %run.story_id, run_id = %run.run_id))]
    async fn save_run(&self, run: &AnalysisRun) -> StorylensResult<String> {
        let bytes = encode_run(run)?;
        let mut runs = self.runs.write().await;

        for ((story_id, run_id), stored) in runs.iter() {
            if story_id != &run.story_id {
                continue;
            }
            let header = decode_header(stored)?;
            if header.dedupe_key == run.dedupe_key || run_id == &run.run_id {
                debug!(existing = %run_id, "Run already stored");
                return Ok(run_id.clone());
            }
        }

        runs.insert((run.story_id.clone(), run.run_id.clone()), bytes);
        debug!("Stored run in memory");
        Ok(run.run_id.clone())
    }

    #[instrument(skip(self))]
    async fn load_run(&self, story_id: &str, run_id: &str) -> StorylensResult<AnalysisRun> {
        let runs = self.runs.read().await;
        let bytes = runs
            .get(&(story_id.to_string(), run_id.to_string()))
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(run_id.to_string())))?;
        decode_run(bytes)
    }

    #[instrument(skip(self), fields(story_id = %filter.story_id))]
    async fn list_runs(&self, filter: &RunFilter) -> StorylensResult<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let mut summaries = Vec::new();
        for ((story_id, _), bytes) in runs.iter() {
            if story_id != &filter.story_id {
                continue;
            }
            let summary = decode_header(bytes)?.summary();
            if filter.matches(&summary) {
                summaries.push(summary);
            }
        }
        Ok(finish_listing(summaries, filter.limit))
    }

    #[instrument(skip(self))]
    async fn delete_run(&self, story_id: &str, run_id: &str) -> StorylensResult<()> {
        self.runs
            .write()
            .await
            .remove(&(story_id.to_string(), run_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(run_id.to_string())).into())
    }
}
