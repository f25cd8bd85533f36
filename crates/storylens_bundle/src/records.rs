//! Records packed into a bundle.

use crate::format::reject;
use crate::manifest::BundleManifest;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use storylens_analysis::{build_dashboard, export_graph_svg};
use storylens_core::{
    AnalysisRun, ArcPoint, DashboardReadModel, GraphExport, SegmentAlignment, TimelineLane,
};
use storylens_error::{BundleError, BundleErrorKind};

/// Named records in payload order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter, derive_more::Display,
)]
pub enum BundleRecord {
    /// Complete analysis run
    #[display("analysis_run.json")]
    AnalysisRun,
    /// Dashboard read model
    #[display("dashboard.json")]
    Dashboard,
    /// Timeline lane in story order
    #[display("timeline_narrative.json")]
    TimelineNarrative,
    /// Timeline lane in chronological order
    #[display("timeline_actual.json")]
    TimelineActual,
    /// Segment alignments
    #[display("segment_alignments.json")]
    SegmentAlignments,
    /// Character, conflict and emotion arc points
    #[display("arc_points.json")]
    ArcPoints,
    /// Graph nodes and edges
    #[display("graph.json")]
    Graph,
    /// Rendered graph
    #[display("graph.svg")]
    GraphSvg,
}

impl BundleRecord {
    /// MIME type recorded in the manifest.
    pub fn media_type(&self) -> &'static str {
        match self {
            BundleRecord::GraphSvg => "image/svg+xml",
            _ => "application/json",
        }
    }
}

/// Everything restored from a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpackedBundle {
    /// Verified manifest
    pub manifest: BundleManifest,
    /// Analysis run as packed
    pub run: AnalysisRun,
    /// Dashboard projection of the run
    pub dashboard: DashboardReadModel,
    /// Narrative-order timeline lane
    pub timeline_narrative: TimelineLane,
    /// Chronological timeline lane
    pub timeline_actual: TimelineLane,
    /// Segment alignments
    pub alignments: Vec<SegmentAlignment>,
    /// Arc points
    pub arcs: Vec<ArcPoint>,
    /// Graph export
    pub graph: GraphExport,
    /// SVG rendering of the graph
    pub graph_svg: String,
}

fn lane(dashboard: &DashboardReadModel, name: &str) -> TimelineLane {
    dashboard
        .timeline_lanes
        .iter()
        .find(|l| l.lane == name)
        .cloned()
        .unwrap_or_else(|| TimelineLane {
            lane: name.to_string(),
            items: Vec::new(),
        })
}

fn to_json<T: Serialize>(record: BundleRecord, value: &T) -> Result<Vec<u8>, BundleError> {
    serde_json::to_vec(value).map_err(|e| {
        reject(BundleErrorKind::RecordDecode {
            name: record.to_string(),
            message: e.to_string(),
        })
    })
}

/// Serialize every record of `run`, in payload order.
pub(crate) fn encode_records(
    run: &AnalysisRun,
) -> Result<Vec<(BundleRecord, Vec<u8>)>, BundleError> {
    let dashboard = build_dashboard(run);
    let svg = export_graph_svg(&dashboard.graph);
    Ok(vec![
        (BundleRecord::AnalysisRun, to_json(BundleRecord::AnalysisRun, run)?),
        (BundleRecord::Dashboard, to_json(BundleRecord::Dashboard, &dashboard)?),
        (
            BundleRecord::TimelineNarrative,
            to_json(
                BundleRecord::TimelineNarrative,
                &lane(&dashboard, "narrative_order"),
            )?,
        ),
        (
            BundleRecord::TimelineActual,
            to_json(BundleRecord::TimelineActual, &lane(&dashboard, "actual_time"))?,
        ),
        (
            BundleRecord::SegmentAlignments,
            to_json(BundleRecord::SegmentAlignments, &run.alignments)?,
        ),
        (BundleRecord::ArcPoints, to_json(BundleRecord::ArcPoints, &run.arcs)?),
        (BundleRecord::Graph, to_json(BundleRecord::Graph, &dashboard.graph)?),
        (BundleRecord::GraphSvg, svg.into_bytes()),
    ])
}

/// Verified record bytes keyed by name.
pub(crate) struct RecordSet<'a> {
    records: BTreeMap<&'a str, &'a [u8]>,
}

impl<'a> RecordSet<'a> {
    pub(crate) fn new(records: BTreeMap<&'a str, &'a [u8]>) -> Self {
        Self { records }
    }

    /// Fail with the first required record the set lacks.
    pub(crate) fn require_all(&self) -> Result<(), BundleError> {
        use strum::IntoEnumIterator;
        match BundleRecord::iter().find(|r| !self.records.contains_key(r.to_string().as_str())) {
            Some(missing) => Err(reject(BundleErrorKind::MissingRecord(missing.to_string()))),
            None => Ok(()),
        }
    }

    fn bytes(&self, record: BundleRecord) -> Result<&'a [u8], BundleError> {
        let name = record.to_string();
        self.records
            .get(name.as_str())
            .copied()
            .ok_or_else(|| reject(BundleErrorKind::MissingRecord(name)))
    }

    pub(crate) fn json<T: DeserializeOwned>(&self, record: BundleRecord) -> Result<T, BundleError> {
        serde_json::from_slice(self.bytes(record)?).map_err(|e| {
            reject(BundleErrorKind::RecordDecode {
                name: record.to_string(),
                message: e.to_string(),
            })
        })
    }

    pub(crate) fn text(&self, record: BundleRecord) -> Result<String, BundleError> {
        String::from_utf8(self.bytes(record)?.to_vec()).map_err(|e| {
            reject(BundleErrorKind::RecordDecode {
                name: record.to_string(),
                message: e.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_record_names_and_order() {
        let names: Vec<String> = BundleRecord::iter().map(|r| r.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "analysis_run.json",
                "dashboard.json",
                "timeline_narrative.json",
                "timeline_actual.json",
                "segment_alignments.json",
                "arc_points.json",
                "graph.json",
                "graph.svg",
            ]
        );
        assert_eq!(BundleRecord::GraphSvg.media_type(), "image/svg+xml");
    }

    #[test]
    fn test_missing_record_is_named() {
        let set = RecordSet::new(BTreeMap::from([("analysis_run.json", &b"{}"[..])]));
        let err = set.require_all().unwrap_err();
        assert_eq!(
            err.kind,
            BundleErrorKind::MissingRecord("dashboard.json".to_string())
        );
    }
}
