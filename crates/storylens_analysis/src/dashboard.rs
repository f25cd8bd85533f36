//! Dashboard read model and graph export.
//!
//! Every projection here is a pure function of an [`AnalysisRun`]: the same
//! run always yields the same read model, the same graph, and the same SVG
//! bytes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use storylens_core::{
    AnalysisRun, DashboardArcPoint, DashboardOverview, DashboardReadModel, DrilldownItem,
    EntityKind, EvidenceSnippet, Event, GraphEdge, GraphExport, GraphNode, HeatmapCell,
    StoryStage, TimelineLane, TimelineLaneItem, stable_id,
};
use tracing::{debug, instrument};

/// Width of the exported SVG canvas.
pub const SVG_WIDTH: i64 = 900;
/// Height of the exported SVG canvas.
pub const SVG_HEIGHT: i64 = 520;

const LABEL_CHARS: usize = 80;
const EXCERPT_CHARS: usize = 160;

const COLUMN_ORIGIN: i64 = 110;
const COLUMN_WIDTH: i64 = 180;
const SLOT_OFFSET: i64 = 34;
const ROW_HEIGHT: i64 = 26;

/// Column for nodes without a stage, right of the four stage columns.
const UNSTAGED_COLUMN: i64 = 4;

fn truncate(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}

fn row_base(group: &str) -> i64 {
    match group {
        "theme" => 80,
        "beat" => 220,
        "character" => 360,
        _ => 430,
    }
}

/// Grid position for the `slot`-th node of a group in a stage column.
fn layout(group: &str, stage: Option<StoryStage>, slot: usize) -> (i64, i64) {
    let column = stage.map_or(UNSTAGED_COLUMN, |s| s.rank() as i64);
    let slot = slot as i64;
    let x = COLUMN_ORIGIN + column * COLUMN_WIDTH + ((slot % 3) - 1) * SLOT_OFFSET;
    let y = row_base(group) + (slot / 3) * ROW_HEIGHT;
    (x, y)
}

fn overview(run: &AnalysisRun) -> DashboardOverview {
    DashboardOverview {
        story_id: run.story_id.clone(),
        run_id: run.run_id.clone(),
        source_language: run.source_language.clone(),
        target_language: run.target_language.clone(),
        segment_count: run.segments.len(),
        event_count: run.events.len(),
        beat_count: run.beats.len(),
        theme_count: run
            .themes
            .iter()
            .map(|t| t.label.as_str())
            .collect::<BTreeSet<_>>()
            .len(),
        insight_count: run.insights.len(),
        conflict_count: run.timeline.conflicts.len(),
        degraded: run.degraded,
        quality_passed: run.quality_gate.passed,
        quality_reasons: run
            .quality_gate
            .reasons
            .iter()
            .map(|r| r.as_str().to_string())
            .collect(),
    }
}

fn timeline_lanes(run: &AnalysisRun) -> Vec<TimelineLane> {
    let events: BTreeMap<&str, &Event> = run
        .events
        .iter()
        .map(|e| (e.event_id.as_str(), e))
        .collect();
    let mut flags: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for conflict in &run.timeline.conflicts {
        for id in &conflict.event_ids {
            flags
                .entry(id.as_str())
                .or_default()
                .insert(conflict.code.as_str());
        }
    }

    let lane = |name: &str, order: &[String], only_flagged: bool| TimelineLane {
        lane: name.to_string(),
        items: order
            .iter()
            .filter_map(|id| events.get(id.as_str()))
            .filter(|event| !only_flagged || flags.contains_key(event.event_id.as_str()))
            .enumerate()
            .map(|(position, event)| TimelineLaneItem {
                event_id: event.event_id.clone(),
                label: truncate(&event.description, LABEL_CHARS),
                position,
                narrative_order: event.narrative_order,
                actual_time: event.actual_time,
                discrepancy_flags: flags
                    .get(event.event_id.as_str())
                    .map(|codes| codes.iter().map(|c| c.to_string()).collect())
                    .unwrap_or_default(),
            })
            .collect(),
    };

    let mut lanes = vec![
        lane("narrative_order", &run.timeline.narrative_order, false),
        lane("actual_time", &run.timeline.actual_time, false),
    ];
    if !run.timeline.conflicts.is_empty() {
        lanes.push(lane("timeline_diagnostics", &run.timeline.actual_time, true));
    }
    lanes
}

fn theme_heatmap(run: &AnalysisRun) -> Vec<HeatmapCell> {
    let values: BTreeMap<(&str, StoryStage), f64> = run
        .themes
        .iter()
        .map(|t| ((t.label.as_str(), t.stage), t.value))
        .collect();
    let labels: BTreeSet<&str> = run.themes.iter().map(|t| t.label.as_str()).collect();

    labels
        .into_iter()
        .flat_map(|label| {
            let values = &values;
            StoryStage::ALL.into_iter().map(move |stage| HeatmapCell {
                theme: label.to_string(),
                stage,
                intensity: values.get(&(label, stage)).copied().unwrap_or(0.0),
            })
        })
        .collect()
}

fn drilldown(run: &AnalysisRun) -> BTreeMap<String, DrilldownItem> {
    let texts: BTreeMap<&str, &str> = run
        .segments
        .iter()
        .map(|s| (s.segment_id.as_str(), s.analysis_text()))
        .collect();

    run.insights
        .iter()
        .map(|insight| {
            let evidence = insight
                .evidence_segment_ids
                .iter()
                .filter_map(|id| {
                    texts.get(id.as_str()).map(|text| EvidenceSnippet {
                        segment_id: id.clone(),
                        excerpt: truncate(text, EXCERPT_CHARS),
                    })
                })
                .collect();
            (
                insight.insight_id.clone(),
                DrilldownItem {
                    insight_id: insight.insight_id.clone(),
                    granularity: insight.granularity,
                    title: insight.title.clone(),
                    text: insight.text.clone(),
                    evidence,
                },
            )
        })
        .collect()
}

/// Project a run into the dashboard read model.
#[instrument(skip_all, fields(run_id = %run.run_id))]
pub fn build_dashboard(run: &AnalysisRun) -> DashboardReadModel {
    let model = DashboardReadModel {
        overview: overview(run),
        timeline_lanes: timeline_lanes(run),
        theme_heatmap: theme_heatmap(run),
        arc_points: run
            .arcs
            .iter()
            .map(|point| DashboardArcPoint {
                lane: point.lane.clone(),
                stage: point.stage,
                value: point.value,
                label: point.label.clone(),
            })
            .collect(),
        drilldown: drilldown(run),
        graph: build_graph(run),
    };
    debug!(
        lanes = model.timeline_lanes.len(),
        cells = model.theme_heatmap.len(),
        "Dashboard projected"
    );
    model
}

/// Allocates grid slots per group and stage column.
#[derive(Default)]
struct Layout {
    slots: BTreeMap<(String, Option<StoryStage>), usize>,
}

impl Layout {
    fn node(
        &mut self,
        id: String,
        label: String,
        group: &str,
        stage: Option<StoryStage>,
    ) -> GraphNode {
        let slot = self.slots.entry((group.to_string(), stage)).or_default();
        let (x, y) = layout(group, stage, *slot);
        *slot += 1;
        GraphNode {
            id,
            label,
            group: group.to_string(),
            stage,
            x,
            y,
        }
    }
}

/// Build the theme, beat, and character graph of a run.
///
/// Edges are evidence-driven: a theme is `expressed_in` a beat when they
/// share evidence segments, and a character `participates_in` a beat when
/// it is a participant of one of the beat's events.
#[instrument(skip_all, fields(run_id = %run.run_id))]
pub fn build_graph(run: &AnalysisRun) -> GraphExport {
    let mut layout = Layout::default();
    let mut nodes = Vec::new();

    let mut theme_stage: BTreeMap<&str, StoryStage> = BTreeMap::new();
    for theme in &run.themes {
        theme_stage
            .entry(theme.label.as_str())
            .and_modify(|stage| *stage = (*stage).min(theme.stage))
            .or_insert(theme.stage);
    }
    for (label, stage) in &theme_stage {
        nodes.push(layout.node(
            format!("theme:{}", label),
            label.to_string(),
            "theme",
            Some(*stage),
        ));
    }

    let mut beats = run.beats.iter().collect::<Vec<_>>();
    beats.sort_by_key(|b| b.narrative_order);
    for beat in &beats {
        nodes.push(layout.node(
            beat.beat_id.clone(),
            truncate(&beat.summary, LABEL_CHARS),
            "beat",
            Some(beat.stage),
        ));
    }

    let events: BTreeMap<&str, &Event> = run
        .events
        .iter()
        .map(|e| (e.event_id.as_str(), e))
        .collect();
    let participates = |name: &str, event_ids: &[String]| {
        event_ids.iter().any(|id| {
            events
                .get(id.as_str())
                .is_some_and(|e| e.participants.iter().any(|p| p == name))
        })
    };

    let mut characters = run
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Character)
        .collect::<Vec<_>>();
    characters.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.entity_id.cmp(&b.entity_id)));
    for character in &characters {
        let stage = beats
            .iter()
            .find(|beat| participates(&character.name, &beat.event_ids))
            .map(|beat| beat.stage);
        nodes.push(layout.node(
            character.entity_id.clone(),
            character.name.clone(),
            "character",
            stage,
        ));
    }

    let mut edges: BTreeMap<(String, String, String), BTreeSet<String>> = BTreeMap::new();
    for theme in &run.themes {
        for beat in &beats {
            let shared: BTreeSet<String> = theme
                .evidence_segment_ids
                .iter()
                .filter(|id| beat.evidence_segment_ids.contains(id))
                .cloned()
                .collect();
            if !shared.is_empty() {
                edges
                    .entry((
                        "expressed_in".to_string(),
                        format!("theme:{}", theme.label),
                        beat.beat_id.clone(),
                    ))
                    .or_default()
                    .extend(shared);
            }
        }
    }
    for character in &characters {
        for beat in beats
            .iter()
            .filter(|beat| participates(&character.name, &beat.event_ids))
        {
            edges
                .entry((
                    "participates_in".to_string(),
                    character.entity_id.clone(),
                    beat.beat_id.clone(),
                ))
                .or_default()
                .extend(beat.evidence_segment_ids.iter().cloned());
        }
    }

    let edges = edges
        .into_iter()
        .map(|((relation, source, target), evidence)| GraphEdge {
            id: stable_id("edge", &format!("{}:{}:{}", relation, source, target)),
            source,
            target,
            relation,
            evidence_segment_ids: evidence.into_iter().collect(),
        })
        .collect::<Vec<_>>();

    debug!(nodes = nodes.len(), edges = edges.len(), "Graph built");
    GraphExport { nodes, edges }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn group_color(group: &str) -> &'static str {
    match group {
        "theme" => "#d97706",
        "beat" => "#2563eb",
        "character" => "#059669",
        _ => "#6b7280",
    }
}

/// Render a graph as a standalone SVG document.
///
/// # Examples
///
/// ```
/// use storylens_analysis::export_graph_svg;
/// use storylens_core::GraphExport;
///
/// let svg = export_graph_svg(&GraphExport::default());
/// assert!(svg.starts_with("<svg"));
/// assert!(svg.ends_with("</svg>\n"));
/// ```
pub fn export_graph_svg(graph: &GraphExport) -> String {
    let positions: BTreeMap<&str, (i64, i64)> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), (n.x, n.y)))
        .collect();

    let mut svg = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = SVG_WIDTH,
        h = SVG_HEIGHT
    );
    let _ = writeln!(
        svg,
        r##"<rect width="{}" height="{}" fill="#ffffff"/>"##,
        SVG_WIDTH, SVG_HEIGHT
    );
    for (column, stage) in StoryStage::ALL.iter().enumerate() {
        let _ = writeln!(
            svg,
            r##"<text x="{}" y="32" font-size="13" text-anchor="middle" fill="#374151">{}</text>"##,
            COLUMN_ORIGIN + column as i64 * COLUMN_WIDTH,
            stage
        );
    }
    for edge in &graph.edges {
        let (Some(&(x1, y1)), Some(&(x2, y2))) = (
            positions.get(edge.source.as_str()),
            positions.get(edge.target.as_str()),
        ) else {
            continue;
        };
        let _ = writeln!(
            svg,
            r##"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="#9ca3af" stroke-width="1" data-relation="{}"/>"##,
            x1,
            y1,
            x2,
            y2,
            escape_xml(&edge.relation)
        );
    }
    for node in &graph.nodes {
        let _ = writeln!(
            svg,
            r#"<circle cx="{}" cy="{}" r="9" fill="{}" data-id="{}"/>"#,
            node.x,
            node.y,
            group_color(&node.group),
            escape_xml(&node.id)
        );
        let _ = writeln!(
            svg,
            r##"<text x="{}" y="{}" font-size="10" text-anchor="middle" fill="#111827">{}</text>"##,
            node.x,
            node.y + 20,
            escape_xml(&truncate(&node.label, 24))
        );
    }
    svg.push_str("</svg>\n");
    svg
}
