//! Pack and unpack `.sgb` bundles.

use crate::format::{read_frame, reject, write_frame};
use crate::manifest::{BundleManifest, layout};
use crate::records::{BundleRecord, RecordSet, UnpackedBundle, encode_records};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use storylens_core::{AnalysisRun, sha256_hex};
use storylens_error::{BundleError, BundleErrorKind, StorageError, StorageErrorKind, StorylensResult};
use tracing::{debug, info, instrument};

fn compress(payload: &[u8]) -> Result<Vec<u8>, BundleError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(payload)
        .map_err(|e| reject(BundleErrorKind::Compression(e.to_string())))?;
    encoder
        .finish()
        .map_err(|e| reject(BundleErrorKind::Compression(e.to_string())))
}

/// Inflate at most one byte past `expected`, rejecting any other size.
fn decompress(compressed: &[u8], expected: u64) -> Result<Vec<u8>, BundleError> {
    let mut payload = Vec::new();
    ZlibDecoder::new(compressed)
        .take(expected.saturating_add(1))
        .read_to_end(&mut payload)
        .map_err(|e| reject(BundleErrorKind::Compression(e.to_string())))?;
    let actual = payload.len() as u64;
    if actual != expected {
        return Err(reject(BundleErrorKind::DecompressedSizeMismatch {
            expected,
            actual,
        }));
    }
    Ok(payload)
}

/// Pack a run, stamping the manifest with the current time.
///
/// # Errors
///
/// Returns a [`BundleError`] if a record cannot be serialized or the
/// payload cannot be compressed.
pub fn pack_bundle(run: &AnalysisRun) -> Result<Vec<u8>, BundleError> {
    pack_bundle_at(run, Utc::now())
}

/// Pack a run with an explicit manifest timestamp.
///
/// Output is a pure function of `run` and `created_at`.
///
/// # Examples
///
/// ```no_run
/// use storylens_bundle::{pack_bundle_at, unpack_bundle};
/// # fn demo(run: &storylens_core::AnalysisRun) -> Result<(), storylens_error::BundleError> {
/// let bytes = pack_bundle_at(run, run.created_at)?;
/// let restored = unpack_bundle(&bytes)?;
/// assert_eq!(&restored.run, run);
/// # Ok(())
/// # }
/// ```
#[instrument(skip(run), fields(run_id = %run.run_id, story_id = %run.story_id))]
pub fn pack_bundle_at(run: &AnalysisRun, created_at: DateTime<Utc>) -> Result<Vec<u8>, BundleError> {
    let records = encode_records(run)?
        .into_iter()
        .map(|(record, bytes)| (record.to_string(), record.media_type(), bytes));
    let (manifest, payload) = layout(&run.story_id, &run.schema_version, created_at, records);

    let manifest_bytes = serde_json::to_vec(&manifest)
        .map_err(|e| reject(BundleErrorKind::InvalidManifest(e.to_string())))?;
    let compressed = compress(&payload)?;
    let bytes = write_frame(&manifest_bytes, &compressed);

    info!(
        records = manifest.records.len(),
        payload = payload.len(),
        compressed = compressed.len(),
        size = bytes.len(),
        "Packed bundle"
    );
    Ok(bytes)
}

/// Verify framing and return the manifest without inflating the payload.
///
/// # Errors
///
/// Returns the [`BundleError`] for the first failed header, trailer or
/// manifest check.
pub fn read_manifest(bytes: &[u8]) -> Result<BundleManifest, BundleError> {
    let frame = read_frame(bytes)?;
    BundleManifest::parse(frame.manifest, frame.format_version)
}

/// Decode and verify a bundle.
///
/// Checks run outermost first: header, trailer checksums, manifest,
/// decompressed payload size and checksum, record table, per-record
/// checksums, then record contents. Any failure rejects the whole bundle.
///
/// # Errors
///
/// Returns a [`BundleError`] whose kind names the failed check.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn unpack_bundle(bytes: &[u8]) -> Result<UnpackedBundle, BundleError> {
    let frame = read_frame(bytes)?;
    let manifest = BundleManifest::parse(frame.manifest, frame.format_version)?;

    let payload = decompress(frame.payload, manifest.declared_payload_len()?)?;
    if sha256_hex(&payload) != manifest.payload_sha256 {
        return Err(reject(BundleErrorKind::DecompressedChecksumMismatch));
    }

    let mut verified = BTreeMap::new();
    for (entry, span) in manifest.record_spans(payload.len())? {
        let record = &payload[span];
        if sha256_hex(record) != entry.sha256 {
            return Err(reject(BundleErrorKind::RecordChecksumMismatch(
                entry.name.clone(),
            )));
        }
        debug!(record = %entry.name, length = entry.length, "Record verified");
        verified.insert(entry.name.as_str(), record);
    }

    let records = RecordSet::new(verified);
    records.require_all()?;

    let unpacked = UnpackedBundle {
        run: records.json(BundleRecord::AnalysisRun)?,
        dashboard: records.json(BundleRecord::Dashboard)?,
        timeline_narrative: records.json(BundleRecord::TimelineNarrative)?,
        timeline_actual: records.json(BundleRecord::TimelineActual)?,
        alignments: records.json(BundleRecord::SegmentAlignments)?,
        arcs: records.json(BundleRecord::ArcPoints)?,
        graph: records.json(BundleRecord::Graph)?,
        graph_svg: records.text(BundleRecord::GraphSvg)?,
        manifest: manifest.clone(),
    };
    info!(story_id = %manifest.story_id, records = manifest.records.len(), "Unpacked bundle");
    Ok(unpacked)
}

/// Pack `run` and write it to `path`.
///
/// # Errors
///
/// Returns a bundle error from packing or a storage error from the write.
pub fn save_bundle(path: impl AsRef<Path>, run: &AnalysisRun) -> StorylensResult<()> {
    let path = path.as_ref();
    let bytes = pack_bundle(run)?;
    std::fs::write(path, &bytes).map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;
    info!(path = %path.display(), size = bytes.len(), "Wrote bundle");
    Ok(())
}

/// Read and unpack the bundle at `path`.
///
/// # Errors
///
/// Returns a storage error if the file cannot be read, otherwise any
/// [`unpack_bundle`] error.
pub fn load_bundle(path: impl AsRef<Path>) -> StorylensResult<UnpackedBundle> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::new(StorageErrorKind::NotFound(path.display().to_string()))
        } else {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
        }
    })?;
    Ok(unpack_bundle(&bytes)?)
}
