//! Compare mode: two calendar months side by side
//!
//! Averages are per-day means, so periods of different lengths (or with
//! different coverage) compare on equal footing. Metrics present in only
//! one period still get a row, with the missing side reported as null.

use super::AnalysisEngine;
use crate::config::month_range;
use crate::error::InsightError;
use crate::stats;
use crate::store::ScanWarning;
use crate::types::DateRange;
use serde::Serialize;
use std::collections::BTreeSet;

/// One metric across the two periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub name: String,
    pub p1_avg: Option<f64>,
    pub p2_avg: Option<f64>,
    pub delta: Option<f64>,
    pub delta_pct: Option<f64>,
    pub p1_days: usize,
    pub p2_days: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub p1: String,
    pub p2: String,
    pub p1_range: DateRange,
    pub p2_range: DateRange,
    pub metrics: Vec<MetricComparison>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

pub(super) fn run(
    engine: &AnalysisEngine<'_>,
    p1: &str,
    p2: &str,
) -> Result<CompareReport, InsightError> {
    let p1_range = month_range(p1)?;
    let p2_range = month_range(p2)?;
    let normalizer = engine.normalizer();

    // Union of both periods' metrics, so single-sided metrics surface as
    // explicit no-data rows instead of vanishing.
    let names: BTreeSet<String> = engine
        .store()
        .metric_names(&p1_range)
        .into_iter()
        .chain(engine.store().metric_names(&p2_range))
        .collect();

    let mut warnings: Vec<ScanWarning> = Vec::new();
    let mut metrics = Vec::new();

    for name in names {
        let d1 = normalizer.daily(&name, &p1_range);
        let d2 = normalizer.daily(&name, &p2_range);
        warnings.extend(d1.warnings.iter().cloned());
        warnings.extend(d2.warnings.iter().cloned());

        let p1_avg = stats::mean(&d1.values());
        let p2_avg = stats::mean(&d2.values());
        let delta = match (p1_avg, p2_avg) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        };
        let delta_pct = match (p1_avg, delta) {
            (Some(a), Some(d)) if a != 0.0 => Some(stats::round1(d / a.abs() * 100.0)),
            _ => None,
        };

        metrics.push(MetricComparison {
            name,
            p1_avg: p1_avg.map(stats::round2),
            p2_avg: p2_avg.map(stats::round2),
            delta: delta.map(stats::round2),
            delta_pct,
            p1_days: d1.len(),
            p2_days: d2.len(),
        });
    }

    Ok(CompareReport {
        p1: p1.to_string(),
        p2: p2.to_string(),
        p1_range,
        p2_range,
        metrics,
        warnings,
    })
}
