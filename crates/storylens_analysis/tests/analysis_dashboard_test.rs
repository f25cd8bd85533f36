//! Tests for the dashboard read model, graph export and SVG rendering.

use std::sync::Arc;
use storylens_analysis::{StoryPipeline, build_dashboard, build_graph, export_graph_svg};
use storylens_core::{AnalysisRun, StoryInputBuilder, StoryStage};
use storylens_resilience::{CircuitBreakerRegistry, CircuitSettings, StorylensConfig};

async fn analyzed(text: &str) -> AnalysisRun {
    let config = StorylensConfig::default();
    let circuits = Arc::new(CircuitBreakerRegistry::new(CircuitSettings::from_config(
        &config.translation,
    )));
    let pipeline = StoryPipeline::from_config(config, circuits).expect("valid config");
    let input = StoryInputBuilder::default()
        .story_id("story-dashboard")
        .owner_id("owner-1")
        .source_text(Some(text.to_string()))
        .build()
        .expect("valid input");
    pipeline.analyze(&input).await.expect("run completes")
}

const STORY: &str = "In 2001, Mara left the harbor.\n\nIn 1999, Mara hid the ledger.\n\nShe waited.";

#[tokio::test]
async fn test_overview_counts_match_run() {
    let run = analyzed(STORY).await;
    let dashboard = build_dashboard(&run);

    let overview = &dashboard.overview;
    assert_eq!(overview.run_id, run.run_id);
    assert_eq!(overview.segment_count, run.segments.len());
    assert_eq!(overview.event_count, run.events.len());
    assert_eq!(overview.beat_count, run.beats.len());
    assert_eq!(overview.insight_count, run.insights.len());
    assert_eq!(overview.conflict_count, 1);
    assert_eq!(overview.quality_passed, run.quality_gate.passed);
}

#[tokio::test]
async fn test_timeline_lanes_flag_inverted_events() {
    let run = analyzed(STORY).await;
    let dashboard = build_dashboard(&run);

    let names: Vec<&str> = dashboard
        .timeline_lanes
        .iter()
        .map(|l| l.lane.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["narrative_order", "actual_time", "timeline_diagnostics"]
    );

    let diagnostics = &dashboard.timeline_lanes[2];
    assert_eq!(diagnostics.items.len(), 2);
    assert!(
        diagnostics
            .items
            .iter()
            .all(|item| item.discrepancy_flags == vec!["chronology_inversion".to_string()])
    );

    let actual = &dashboard.timeline_lanes[1];
    let positions: Vec<usize> = actual.items.iter().map(|i| i.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert!(actual.items[2].actual_time.is_none());
}

#[tokio::test]
async fn test_heatmap_is_dense_over_stages() {
    let run = analyzed(STORY).await;
    let dashboard = build_dashboard(&run);

    let labels: std::collections::BTreeSet<&str> =
        run.themes.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(
        dashboard.theme_heatmap.len(),
        labels.len() * StoryStage::ALL.len()
    );
    assert!(
        dashboard
            .theme_heatmap
            .iter()
            .all(|cell| (0.0..=1.0).contains(&cell.intensity))
    );
}

#[tokio::test]
async fn test_drilldown_covers_every_published_insight() {
    let run = analyzed(STORY).await;
    let dashboard = build_dashboard(&run);

    assert_eq!(dashboard.drilldown.len(), run.insights.len());
    for insight in &run.insights {
        let item = &dashboard.drilldown[&insight.insight_id];
        assert_eq!(item.evidence.len(), insight.evidence_segment_ids.len());
        assert!(item.evidence.iter().all(|e| e.excerpt.chars().count() <= 160));
    }
}

#[tokio::test]
async fn test_graph_edges_reference_existing_nodes() {
    let run = analyzed(STORY).await;
    let graph = build_graph(&run);

    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert!(graph.nodes.iter().any(|n| n.group == "character" && n.label == "Mara"));
    assert!(graph.edges.iter().any(|e| e.relation == "participates_in"));
    for edge in &graph.edges {
        assert!(ids.contains(&edge.source.as_str()));
        assert!(ids.contains(&edge.target.as_str()));
        assert!(!edge.evidence_segment_ids.is_empty());
    }
}

#[tokio::test]
async fn test_graph_and_svg_are_stable_across_runs() {
    let first = analyzed(STORY).await;
    let second = analyzed(STORY).await;

    let graph = build_graph(&first);
    assert_eq!(graph, build_graph(&second));

    let svg = export_graph_svg(&graph);
    assert_eq!(svg, export_graph_svg(&build_graph(&second)));
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<circle").count(), graph.nodes.len());
    assert!(svg.contains("data-relation=\"participates_in\""));
}
