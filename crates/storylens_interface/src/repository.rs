//! Repository trait for analysis run persistence.
//!
//! Implementations can use databases, filesystems, or in-memory structures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storylens_core::{AnalysisRun, RunSummary};
use storylens_error::StorylensResult;

/// Repository for storing and retrieving analysis runs.
///
/// A run is written as one unit: either the whole record is stored or
/// nothing is. Records written under a different schema version must be
/// rejected on load rather than coerced.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// Persist a run atomically.
    ///
    /// Saving a run whose `dedupe_key` is already stored for the same story
    /// returns the existing run ID without writing.
    async fn save_run(&self, run: &AnalysisRun) -> StorylensResult<String>;

    /// Load a run by story and run ID.
    async fn load_run(&self, story_id: &str, run_id: &str) -> StorylensResult<AnalysisRun>;

    /// List runs matching the filter, newest first.
    async fn list_runs(&self, filter: &RunFilter) -> StorylensResult<Vec<RunSummary>>;

    /// Delete a run.
    async fn delete_run(&self, story_id: &str, run_id: &str) -> StorylensResult<()>;
}

/// Filter criteria for listing runs.
///
/// Combining criteria creates an AND condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFilter {
    /// Story to list runs for
    pub story_id: String,
    /// Only runs that passed (`Some(true)`) or failed (`Some(false)`) the gate
    pub passed: Option<bool>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl RunFilter {
    /// Filter for every run of a story.
    pub fn for_story(story_id: impl Into<String>) -> Self {
        Self {
            story_id: story_id.into(),
            ..Self::default()
        }
    }

    /// Check whether a summary matches the gate criterion.
    pub fn matches(&self, summary: &RunSummary) -> bool {
        summary.story_id == self.story_id
            && self.passed.is_none_or(|passed| passed == summary.passed)
    }
}
