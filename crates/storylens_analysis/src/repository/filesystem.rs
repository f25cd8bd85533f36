//! Filesystem run repository.

use super::{check_key, decode_header, decode_run, encode_run, finish_listing};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use storylens_core::{AnalysisRun, RunSummary};
use storylens_error::{StorageError, StorageErrorKind, StorylensResult};
use storylens_interface::{AnalysisRepository, RunFilter};
use tracing::{debug, info, instrument};

const RECORD_EXTENSION: &str = "json";

/// Filesystem repository for analysis runs.
///
/// Stores one JSON document per run:
///
/// ```text
/// {base_path}/
/// └── {story_id}/
///     ├── {run_id}.json
///     └── {run_id}.json
/// ```
///
/// Writes go to a temporary file that is renamed into place, so a reader
/// never sees a partial record.
#[derive(Debug, Clone)]
pub struct FileSystemAnalysisRepository {
    base_path: PathBuf,
}

impl FileSystemAnalysisRepository {
    /// Create a repository rooted at `base_path`.
    ///
    /// Creates the base directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> StorylensResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        info!(path = %base_path.display(), "Created filesystem run repository");
        Ok(Self { base_path })
    }

    /// Root directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn story_dir(&self, story_id: &str) -> PathBuf {
        self.base_path.join(story_id)
    }

    /// Path of a run record: `{base}/{story_id}/{run_id}.json`.
    pub fn run_path(&self, story_id: &str, run_id: &str) -> PathBuf {
        self.story_dir(story_id)
            .join(format!("{}.{}", run_id, RECORD_EXTENSION))
    }

    async fn read_file(path: &Path, run_id: &str) -> StorylensResult<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(run_id.to_string())).into()
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into()
            }
        })
    }

    /// Record files of a story, sorted by file name.
    async fn record_files(&self, story_id: &str) -> StorylensResult<Vec<PathBuf>> {
        let dir = self.story_dir(story_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl AnalysisRepository for FileSystemAnalysisRepository {
    #[instrument(skip(self, run), fields(story_id = %run.story_id, run_id = %run.run_id))]
    async fn save_run(&self, run: &AnalysisRun) -> StorylensResult<String> {
        let bytes = encode_run(run)?;

        for path in self.record_files(&run.story_id).await? {
            let stored = Self::read_file(&path, &run.run_id).await?;
            let header = decode_header(&stored)?;
            if header.dedupe_key == run.dedupe_key || header.run_id == run.run_id {
                debug!(existing = %header.run_id, "Run already stored");
                return Ok(header.run_id);
            }
        }

        let dir = self.story_dir(&run.story_id);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;

        let path = self.run_path(&run.story_id, &run.run_id);
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        info!(path = %path.display(), size = bytes.len(), "Stored analysis run");
        Ok(run.run_id.clone())
    }

    #[instrument(skip(self))]
    async fn load_run(&self, story_id: &str, run_id: &str) -> StorylensResult<AnalysisRun> {
        check_key(story_id)?;
        check_key(run_id)?;
        let path = self.run_path(story_id, run_id);
        let bytes = Self::read_file(&path, run_id).await?;
        let run = decode_run(&bytes)?;
        debug!(path = %path.display(), "Loaded analysis run");
        Ok(run)
    }

    #[instrument(skip(self), fields(story_id = %filter.story_id))]
    async fn list_runs(&self, filter: &RunFilter) -> StorylensResult<Vec<RunSummary>> {
        check_key(&filter.story_id)?;
        let mut summaries = Vec::new();
        for path in self.record_files(&filter.story_id).await? {
            let bytes = Self::read_file(&path, &filter.story_id).await?;
            let summary = decode_header(&bytes)?.summary();
            if filter.matches(&summary) {
                summaries.push(summary);
            }
        }
        Ok(finish_listing(summaries, filter.limit))
    }

    #[instrument(skip(self))]
    async fn delete_run(&self, story_id: &str, run_id: &str) -> StorylensResult<()> {
        check_key(story_id)?;
        check_key(run_id)?;
        let path = self.run_path(story_id, run_id);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(run_id.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "remove {}: {}",
                    path.display(),
                    e
                )))
            }
        })?;
        info!(path = %path.display(), "Deleted analysis run");
        Ok(())
    }
}
