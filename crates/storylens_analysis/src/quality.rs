//! The quality gate.
//!
//! A pure aggregation over scores computed by earlier stages. It never
//! fails; a run that does not meet the thresholds is reported with
//! `passed = false` and every failing check in `reasons`.

use crate::insights::InsightReport;
use crate::lexicon::round3;
use std::collections::BTreeSet;
use storylens_core::{GateReason, Insight, QualityGateResult, Segment};
use storylens_resilience::GateConfig;
use tracing::{info, instrument, warn};

/// Share of candidate evidence links that cite unknown segments.
///
/// Returns 1.0 when the candidates cite nothing at all.
pub fn hallucination_risk(candidates: &[Insight], segments: &[Segment]) -> f64 {
    let known: BTreeSet<&str> = segments.iter().map(|s| s.segment_id.as_str()).collect();
    let links: Vec<&String> = candidates
        .iter()
        .flat_map(|i| i.evidence_segment_ids.iter())
        .collect();
    if links.is_empty() {
        return 1.0;
    }
    let unknown = links.iter().filter(|id| !known.contains(id.as_str())).count();
    round3(unknown as f64 / links.len() as f64)
}

/// Decide whether a run is publishable.
///
/// # Examples
///
/// ```
/// use storylens_analysis::{evaluate_gate, InsightReport};
/// use storylens_core::GateReason;
/// use storylens_resilience::GateConfig;
///
/// let result = evaluate_gate(&InsightReport::default(), &[], 1.0, 1.0, &GateConfig::default());
/// assert!(!result.passed);
/// assert!(result.reasons.contains(&GateReason::ConfidenceBelowThreshold));
/// assert!(result.reasons.contains(&GateReason::HallucinationRiskHigh));
/// ```
#[instrument(skip_all, fields(published = report.published.len()))]
pub fn evaluate_gate(
    report: &InsightReport,
    segments: &[Segment],
    translation_quality: f64,
    timeline_consistency: f64,
    config: &GateConfig,
) -> QualityGateResult {
    let confidence_floor = round3(
        report
            .published
            .iter()
            .map(|i| i.confidence)
            .reduce(f64::min)
            .unwrap_or(0.0),
    );
    let risk = hallucination_risk(&report.candidates, segments);
    let translation_quality = round3(translation_quality);
    let timeline_consistency = round3(timeline_consistency);
    let inconsistent = report.excluded_insight_ids.len();

    let checks = [
        (
            confidence_floor < *config.min_confidence(),
            GateReason::ConfidenceBelowThreshold,
        ),
        (
            risk > *config.max_hallucination_risk(),
            GateReason::HallucinationRiskHigh,
        ),
        (
            translation_quality < *config.min_translation_quality(),
            GateReason::TranslationQualityLow,
        ),
        (
            timeline_consistency < *config.min_consistency(),
            GateReason::TimelineConsistencyLow,
        ),
        (
            inconsistent > *config.max_inconsistent_insights(),
            GateReason::InsightEvidenceInconsistent,
        ),
    ];
    let reasons: Vec<GateReason> = checks
        .into_iter()
        .filter_map(|(failed, reason)| failed.then_some(reason))
        .collect();

    let result = QualityGateResult {
        passed: reasons.is_empty(),
        confidence_floor,
        hallucination_risk: risk,
        translation_quality,
        timeline_consistency,
        inconsistent_insight_count: inconsistent,
        reasons,
    };

    if result.passed {
        info!(confidence_floor, "Quality gate passed");
    } else {
        let codes: Vec<&str> = result.reasons.iter().map(|r| r.as_str()).collect();
        warn!(reasons = ?codes, "Quality gate failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use storylens_core::Granularity;

    fn insight(confidence: f64, evidence: &str) -> Insight {
        Insight {
            insight_id: format!("ins_{}", evidence),
            granularity: Granularity::Macro,
            stage: None,
            title: "thesis".to_string(),
            text: "thesis".to_string(),
            referenced_terms: Vec::new(),
            evidence_segment_ids: vec![evidence.to_string()],
            confidence,
        }
    }

    #[test]
    fn test_no_links_means_full_risk() {
        assert_eq!(hallucination_risk(&[], &[]), 1.0);
    }

    #[test]
    fn test_reasons_follow_fixed_order() {
        let report = InsightReport {
            candidates: vec![insight(0.4, "seg_missing")],
            published: vec![insight(0.4, "seg_missing")],
            excluded_insight_ids: vec!["ins_x".to_string()],
        };
        let result = evaluate_gate(&report, &[], 0.2, 0.1, &GateConfig::default());
        assert_eq!(
            result.reasons,
            vec![
                GateReason::ConfidenceBelowThreshold,
                GateReason::HallucinationRiskHigh,
                GateReason::TranslationQualityLow,
                GateReason::TimelineConsistencyLow,
                GateReason::InsightEvidenceInconsistent,
            ]
        );
        assert_eq!(result.confidence_floor, 0.4);
    }
}
