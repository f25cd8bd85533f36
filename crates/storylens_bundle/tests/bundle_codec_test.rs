//! Tests for packing, unpacking and every bundle integrity check.

use chrono::{TimeZone, Utc};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::sync::Arc;
use storylens_analysis::{StoryPipeline, build_graph, export_graph_svg};
use storylens_bundle::{
    BUNDLE_FORMAT_VERSION, BUNDLE_SCHEMA_VERSION, load_bundle, pack_bundle_at, read_manifest,
    save_bundle, unpack_bundle,
};
use storylens_core::{AnalysisRun, StoryInputBuilder};
use storylens_error::{BundleErrorKind, StorageErrorKind, StorylensErrorKind};
use storylens_resilience::{CircuitBreakerRegistry, CircuitSettings, StorylensConfig};

const HEADER_LEN: usize = 21;
const TRAILER_LEN: usize = 64;

async fn analyzed() -> AnalysisRun {
    let config = StorylensConfig::default();
    let circuits = Arc::new(CircuitBreakerRegistry::new(CircuitSettings::from_config(
        &config.translation,
    )));
    let pipeline = StoryPipeline::from_config(config, circuits).expect("valid config");
    let input = StoryInputBuilder::default()
        .story_id("story-bundle")
        .owner_id("owner-1")
        .source_text(Some(
            "In 2001, Mara left the harbor.\n\nIn 1999, Mara hid the ledger.\n\nShe waited."
                .to_string(),
        ))
        .build()
        .expect("valid input");
    pipeline.analyze(&input).await.expect("run completes")
}

async fn packed() -> (AnalysisRun, Vec<u8>) {
    let run = analyzed().await;
    let created_at = Utc
        .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("valid time");
    let bytes = pack_bundle_at(&run, created_at).expect("pack");
    (run, bytes)
}

/// Manifest JSON and compressed payload of a well-formed bundle.
fn split(bytes: &[u8]) -> (Value, Vec<u8>) {
    let manifest_len = u64::from_be_bytes(bytes[5..13].try_into().expect("8 bytes")) as usize;
    let manifest_end = HEADER_LEN + manifest_len;
    let payload_end = bytes.len() - TRAILER_LEN;
    let manifest = serde_json::from_slice(&bytes[HEADER_LEN..manifest_end]).expect("manifest");
    (manifest, bytes[manifest_end..payload_end].to_vec())
}

/// Frame sections with a correct header and trailer.
fn reframe(manifest: &Value, payload: &[u8]) -> Vec<u8> {
    let manifest = serde_json::to_vec(manifest).expect("json");
    let mut out = Vec::new();
    out.extend_from_slice(b"SGBN");
    out.push(BUNDLE_FORMAT_VERSION);
    out.extend_from_slice(&(manifest.len() as u64).to_be_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    out.extend_from_slice(&manifest);
    out.extend_from_slice(payload);
    out.extend_from_slice(&Sha256::digest(&manifest));
    out.extend_from_slice(&Sha256::digest(payload));
    out
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("compress");
    encoder.finish().expect("compress")
}

fn kind_of(bytes: &[u8]) -> BundleErrorKind {
    unpack_bundle(bytes).expect_err("bundle must be rejected").kind
}

#[tokio::test]
async fn test_round_trip_restores_every_record() {
    let (run, bytes) = packed().await;
    let bundle = unpack_bundle(&bytes).expect("unpack");

    assert_eq!(bundle.run, run);
    assert_eq!(bundle.manifest.bundle_schema_version, BUNDLE_SCHEMA_VERSION);
    assert_eq!(bundle.manifest.story_id, "story-bundle");
    assert_eq!(bundle.manifest.story_schema_version, run.schema_version);
    assert_eq!(bundle.manifest.records.len(), 8);
    assert_eq!(bundle.alignments, run.alignments);
    assert_eq!(bundle.arcs, run.arcs);
    assert_eq!(bundle.graph, build_graph(&run));
    assert_eq!(bundle.graph_svg, export_graph_svg(&bundle.graph));
    assert_eq!(bundle.timeline_narrative.lane, "narrative_order");
    assert_eq!(bundle.timeline_actual.lane, "actual_time");
    assert_eq!(bundle.timeline_actual.items.len(), run.events.len());
    assert_eq!(bundle.dashboard.overview.run_id, run.run_id);
}

#[tokio::test]
async fn test_packing_is_deterministic() {
    let (run, bytes) = packed().await;
    let again = pack_bundle_at(&run, read_manifest(&bytes).expect("manifest").created_at)
        .expect("pack");
    assert_eq!(bytes, again);
}

#[tokio::test]
async fn test_header_failures() {
    let (_, bytes) = packed().await;

    assert_eq!(kind_of(&bytes[..10]), BundleErrorKind::TooShort(10));

    let mut bad_magic = bytes.clone();
    bad_magic[..4].copy_from_slice(b"ZIPX");
    assert_eq!(kind_of(&bad_magic), BundleErrorKind::BadMagic(*b"ZIPX"));

    let mut future = bytes.clone();
    future[4] = 9;
    assert_eq!(kind_of(&future), BundleErrorKind::UnsupportedFormatVersion(9));

    let truncated = &bytes[..bytes.len() - 1];
    assert!(matches!(
        kind_of(truncated),
        BundleErrorKind::LengthMismatch { actual, .. } if actual == truncated.len() as u64
    ));
}

#[tokio::test]
async fn test_tampered_manifest_fails_checksum() {
    let (_, bytes) = packed().await;
    let mut tampered = bytes.clone();
    tampered[HEADER_LEN + 3] ^= 0x20;

    let kind = kind_of(&tampered);
    assert_eq!(kind, BundleErrorKind::ManifestChecksumMismatch);
    assert!(kind.is_checksum_failure());
}

#[tokio::test]
async fn test_corrupted_payload_byte_fails_checksum() {
    let (_, bytes) = packed().await;
    let mut corrupted = bytes.clone();
    let middle = bytes.len() - TRAILER_LEN - 5;
    corrupted[middle] ^= 0xff;

    let kind = kind_of(&corrupted);
    assert_eq!(kind, BundleErrorKind::PayloadChecksumMismatch);
    assert!(kind.is_checksum_failure());
}

#[tokio::test]
async fn test_manifest_field_checks() {
    let (_, bytes) = packed().await;
    let (manifest, payload) = split(&bytes);

    let mut schema = manifest.clone();
    schema["bundle_schema_version"] = Value::from("story_bundle.v9");
    assert_eq!(
        kind_of(&reframe(&schema, &payload)),
        BundleErrorKind::UnsupportedSchema("story_bundle.v9".to_string())
    );

    let mut version = manifest.clone();
    version["format_version"] = Value::from(2);
    assert_eq!(
        kind_of(&reframe(&version, &payload)),
        BundleErrorKind::FormatVersionDisagreement {
            manifest: 2,
            header: BUNDLE_FORMAT_VERSION,
        }
    );

    let mut compression = manifest.clone();
    compression["compression"] = Value::from("gzip");
    assert_eq!(
        kind_of(&reframe(&compression, &payload)),
        BundleErrorKind::UnsupportedCompression("gzip".to_string())
    );

    let framed = reframe(&Value::from("not a manifest"), &payload);
    assert!(matches!(kind_of(&framed), BundleErrorKind::InvalidManifest(_)));
}

#[tokio::test]
async fn test_payload_content_checks() {
    let (_, bytes) = packed().await;
    let (manifest, _) = split(&bytes);

    let garbage = reframe(&manifest, b"definitely not zlib");
    assert!(matches!(kind_of(&garbage), BundleErrorKind::Compression(_)));

    // Same length as the real payload, different bytes.
    let payload = unpack_payload(&bytes);
    let flipped: Vec<u8> = payload.iter().map(|b| b ^ 0x20).collect();
    let other = reframe(&manifest, &zlib(&flipped));
    assert_eq!(kind_of(&other), BundleErrorKind::DecompressedChecksumMismatch);
}

#[tokio::test]
async fn test_payload_larger_than_record_table_is_rejected() {
    let (_, bytes) = packed().await;
    let (manifest, _) = split(&bytes);
    let declared: u64 = manifest["records"]
        .as_array()
        .expect("records")
        .iter()
        .map(|r| r["length"].as_u64().expect("length"))
        .sum();

    // Highly compressible filler that inflates far past the declared size.
    let bomb = zlib(&vec![0u8; 8 * 1024 * 1024]);
    assert!(bomb.len() < 64 * 1024);
    assert_eq!(
        kind_of(&reframe(&manifest, &bomb)),
        BundleErrorKind::DecompressedSizeMismatch {
            expected: declared,
            actual: declared + 1,
        }
    );

    let short = reframe(&manifest, &zlib(b"tiny"));
    assert_eq!(
        kind_of(&short),
        BundleErrorKind::DecompressedSizeMismatch {
            expected: declared,
            actual: 4,
        }
    );
}

#[tokio::test]
async fn test_record_table_checks() {
    let (_, bytes) = packed().await;
    let (manifest, payload) = split(&bytes);

    let mut shifted = manifest.clone();
    let offset = shifted["records"][1]["offset"].as_u64().expect("offset");
    shifted["records"][1]["offset"] = Value::from(offset + 1);
    assert!(matches!(
        kind_of(&reframe(&shifted, &payload)),
        BundleErrorKind::RecordOutOfBounds { ref name, .. } if name == "dashboard.json"
    ));

    let mut wrong_hash = manifest.clone();
    wrong_hash["records"][1]["sha256"] = Value::from("0".repeat(64));
    assert_eq!(
        kind_of(&reframe(&wrong_hash, &payload)),
        BundleErrorKind::RecordChecksumMismatch("dashboard.json".to_string())
    );
}

#[tokio::test]
async fn test_missing_record_is_reported() {
    let (_, bytes) = packed().await;
    let (mut manifest, _) = split(&bytes);
    let payload = unpack_payload(&bytes);

    // Drop graph.svg from both the record table and the payload.
    let records = manifest["records"].as_array_mut().expect("records");
    let last = records.pop().expect("last record");
    assert_eq!(last["name"], "graph.svg");
    let kept = &payload[..last["offset"].as_u64().expect("offset") as usize];
    manifest["payload_sha256"] = Value::from(format!("{:x}", Sha256::digest(kept)));

    assert_eq!(
        kind_of(&reframe(&manifest, &zlib(kept))),
        BundleErrorKind::MissingRecord("graph.svg".to_string())
    );
}

/// Inflate the payload of a well-formed bundle.
fn unpack_payload(bytes: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let (_, compressed) = split(bytes);
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut out)
        .expect("inflate");
    out
}

#[tokio::test]
async fn test_undecodable_record_is_reported() {
    let (_, bytes) = packed().await;
    let (mut manifest, _) = split(&bytes);
    let mut payload = unpack_payload(&bytes);

    // Replace the arc points record with same-length invalid JSON.
    let index = 5;
    assert_eq!(manifest["records"][index]["name"], "arc_points.json");
    let offset = manifest["records"][index]["offset"].as_u64().expect("offset") as usize;
    let length = manifest["records"][index]["length"].as_u64().expect("length") as usize;
    payload[offset..offset + length].fill(b'#');
    let record_hash = format!("{:x}", Sha256::digest(&payload[offset..offset + length]));
    manifest["records"][index]["sha256"] = Value::from(record_hash);
    manifest["payload_sha256"] = Value::from(format!("{:x}", Sha256::digest(&payload)));

    assert!(matches!(
        kind_of(&reframe(&manifest, &zlib(&payload))),
        BundleErrorKind::RecordDecode { ref name, .. } if name == "arc_points.json"
    ));
}

#[tokio::test]
async fn test_save_and_load_file() {
    let run = analyzed().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("story.sgb");

    save_bundle(&path, &run).expect("save");
    let bundle = load_bundle(&path).expect("load");
    assert_eq!(bundle.run, run);

    let err = load_bundle(dir.path().join("missing.sgb")).unwrap_err();
    assert!(matches!(
        err.kind(),
        StorylensErrorKind::Storage(e) if matches!(e.kind, StorageErrorKind::NotFound(_))
    ));

    std::fs::write(&path, b"SGBN").expect("write");
    let err = load_bundle(&path).unwrap_err();
    assert!(matches!(err.kind(), StorylensErrorKind::Bundle(_)));
}
