//! Correlate mode: one target metric against everything else, with day lags

use super::{align_with_lag, sort_findings, AnalysisEngine, CorrelationFinding};
use crate::discovery::DiscoveryEngine;
use crate::error::InsightError;
use crate::stats;
use crate::store::ScanWarning;
use crate::types::DateRange;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CorrelateReport {
    pub period: DateRange,
    pub target: String,
    pub lags: Vec<i64>,
    /// Sorted by |r| descending. Candidates with fewer than the configured
    /// minimum of aligned days are omitted entirely.
    pub correlations: Vec<CorrelationFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

pub(super) fn run(
    engine: &AnalysisEngine<'_>,
    range: DateRange,
    target: &str,
    lags: &[i64],
) -> Result<CorrelateReport, InsightError> {
    let config = engine.config();

    // Target must exist somewhere in the store, not merely in this range.
    let inventory = DiscoveryEngine::scan(engine.store());
    inventory.ensure_metric(target)?;

    let normalizer = engine.normalizer();
    let target_daily = normalizer.daily(target, &range);
    if target_daily.len() < config.min_overlap_days {
        return Err(InsightError::InsufficientData {
            metric: target.to_string(),
            needed: config.min_overlap_days,
            got: target_daily.len(),
        });
    }

    let mut warnings = target_daily.warnings.clone();
    let mut correlations = Vec::new();

    for candidate in engine.store().metric_names(&range) {
        if candidate == target {
            continue;
        }
        let other_daily = normalizer.daily(&candidate, &range);
        warnings.extend(other_daily.warnings.iter().cloned());
        if other_daily.len() < config.min_overlap_days {
            continue;
        }

        for &lag in lags {
            let (xs, ys) = align_with_lag(&target_daily.points, &other_daily.points, lag);
            if xs.len() < config.min_overlap_days {
                continue;
            }
            correlations.push(CorrelationFinding {
                metric_a: target.to_string(),
                metric_b: candidate.clone(),
                lag,
                correlation: stats::pearson(&xs, &ys),
            });
        }
    }

    sort_findings(&mut correlations);

    Ok(CorrelateReport {
        period: range,
        target: target.to_string(),
        lags: lags.to_vec(),
        correlations,
        warnings,
    })
}
