//! Tests for the in-memory and filesystem run repositories.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use storylens_analysis::{FileSystemAnalysisRepository, InMemoryAnalysisRepository, StoryPipeline};
use storylens_core::{AnalysisRun, StoryInputBuilder};
use storylens_error::{StorageErrorKind, StorylensError, StorylensErrorKind};
use storylens_interface::{AnalysisRepository, RunFilter};
use storylens_resilience::{CircuitBreakerRegistry, CircuitSettings, StorylensConfig};

const STORY: &str = "Mara found the archive.\n\nThe council argued.\n\nPeace returned home.";

async fn analyzed(idempotency_key: &str) -> AnalysisRun {
    let config = StorylensConfig::default();
    let circuits = Arc::new(CircuitBreakerRegistry::new(CircuitSettings::from_config(
        &config.translation,
    )));
    let pipeline = StoryPipeline::from_config(config, circuits).expect("valid config");
    let input = StoryInputBuilder::default()
        .story_id("story-repo")
        .owner_id("owner-1")
        .source_text(Some(STORY.to_string()))
        .idempotency_key(Some(idempotency_key.to_string()))
        .build()
        .expect("valid input");
    pipeline.analyze(&input).await.expect("run completes")
}

/// Two distinct runs of one story, the second created a minute later.
async fn two_runs() -> (AnalysisRun, AnalysisRun) {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
    let mut first = analyzed("request-1").await;
    first.created_at = base;
    let mut second = analyzed("request-2").await;
    second.created_at = base + Duration::minutes(1);
    assert_ne!(first.run_id, second.run_id);
    (first, second)
}

fn storage_kind(err: &StorylensError) -> &StorageErrorKind {
    match err.kind() {
        StorylensErrorKind::Storage(e) => &e.kind,
        other => panic!("expected storage error, got {}", other),
    }
}

async fn exercise_round_trip(repo: &dyn AnalysisRepository) {
    let (first, second) = two_runs().await;

    assert_eq!(repo.save_run(&first).await.expect("save"), first.run_id);
    assert_eq!(repo.save_run(&second).await.expect("save"), second.run_id);

    let loaded = repo.load_run("story-repo", &first.run_id).await.expect("load");
    assert_eq!(loaded, first);

    let listed = repo
        .list_runs(&RunFilter::for_story("story-repo"))
        .await
        .expect("list");
    let ids: Vec<&str> = listed.iter().map(|s| s.run_id.as_str()).collect();
    assert_eq!(ids, vec![second.run_id.as_str(), first.run_id.as_str()]);

    let limited = repo
        .list_runs(&RunFilter {
            limit: Some(1),
            ..RunFilter::for_story("story-repo")
        })
        .await
        .expect("list");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].run_id, second.run_id);

    let opposite = RunFilter {
        passed: Some(!first.quality_gate.passed),
        ..RunFilter::for_story("story-repo")
    };
    assert!(repo.list_runs(&opposite).await.expect("list").is_empty());

    repo.delete_run("story-repo", &first.run_id).await.expect("delete");
    let err = repo
        .load_run("story-repo", &first.run_id)
        .await
        .unwrap_err();
    assert!(matches!(storage_kind(&err), StorageErrorKind::NotFound(_)));
}

async fn exercise_idempotent_save(repo: &dyn AnalysisRepository) {
    let run = analyzed("request-1").await;
    let stored = repo.save_run(&run).await.expect("save");

    let mut replay = run.clone();
    replay.run_id = "run_replayed".to_string();
    let again = repo.save_run(&replay).await.expect("save replay");

    assert_eq!(again, stored);
    let listed = repo
        .list_runs(&RunFilter::for_story("story-repo"))
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_memory_round_trip() {
    exercise_round_trip(&InMemoryAnalysisRepository::new()).await;
}

#[tokio::test]
async fn test_filesystem_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = FileSystemAnalysisRepository::new(dir.path()).expect("repository");
    exercise_round_trip(&repo).await;
}

#[tokio::test]
async fn test_memory_save_is_idempotent() {
    let repo = InMemoryAnalysisRepository::new();
    exercise_idempotent_save(&repo).await;
    assert_eq!(repo.len().await, 1);
}

#[tokio::test]
async fn test_filesystem_save_is_idempotent() {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = FileSystemAnalysisRepository::new(dir.path()).expect("repository");
    exercise_idempotent_save(&repo).await;
}

#[tokio::test]
async fn test_filesystem_layout() {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = FileSystemAnalysisRepository::new(dir.path()).expect("repository");
    let run = analyzed("request-1").await;

    repo.save_run(&run).await.expect("save");

    let path = repo.run_path("story-repo", &run.run_id);
    assert_eq!(path, dir.path().join("story-repo").join(format!("{}.json", run.run_id)));
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[tokio::test]
async fn test_memory_rejects_other_schema_on_load() {
    let repo = InMemoryAnalysisRepository::new();
    let mut run = analyzed("request-1").await;
    run.schema_version = "story_analysis.v0".to_string();
    let bytes = serde_json::to_vec(&run).expect("json");
    repo.insert_raw("story-repo", &run.run_id, bytes).await;

    let err = repo.load_run("story-repo", &run.run_id).await.unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        StorageErrorKind::SchemaVersionMismatch { .. }
    ));

    let err = repo
        .list_runs(&RunFilter::for_story("story-repo"))
        .await
        .unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        StorageErrorKind::SchemaVersionMismatch { .. }
    ));
}

#[tokio::test]
async fn test_filesystem_rejects_other_schema_on_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = FileSystemAnalysisRepository::new(dir.path()).expect("repository");
    let mut run = analyzed("request-1").await;
    run.schema_version = "story_analysis.v2".to_string();

    let path = repo.run_path("story-repo", &run.run_id);
    std::fs::create_dir_all(path.parent().expect("story dir")).expect("mkdir");
    std::fs::write(&path, serde_json::to_vec(&run).expect("json")).expect("write");

    let err = repo.load_run("story-repo", &run.run_id).await.unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        StorageErrorKind::SchemaVersionMismatch { .. }
    ));
}

#[tokio::test]
async fn test_save_refuses_other_schema() {
    let repo = InMemoryAnalysisRepository::new();
    let mut run = analyzed("request-1").await;
    run.schema_version = "story_analysis.v0".to_string();

    let err = repo.save_run(&run).await.unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        StorageErrorKind::SchemaVersionMismatch { .. }
    ));
    assert!(repo.is_empty().await);
}

#[tokio::test]
async fn test_missing_run_is_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = FileSystemAnalysisRepository::new(dir.path()).expect("repository");

    let err = repo.load_run("story-repo", "run_missing").await.unwrap_err();
    assert!(matches!(storage_kind(&err), StorageErrorKind::NotFound(_)));

    let err = repo.delete_run("story-repo", "run_missing").await.unwrap_err();
    assert!(matches!(storage_kind(&err), StorageErrorKind::NotFound(_)));

    assert!(
        repo.list_runs(&RunFilter::for_story("story-unknown"))
            .await
            .expect("list")
            .is_empty()
    );
}

#[tokio::test]
async fn test_path_like_keys_are_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = FileSystemAnalysisRepository::new(dir.path()).expect("repository");

    let err = repo.load_run("../outside", "run_a").await.unwrap_err();
    assert!(matches!(storage_kind(&err), StorageErrorKind::InvalidKey(_)));
}
