//! Analysis modes over normalized series
//!
//! Each mode is a pure function from a record store plus a resolved query to
//! a serializable report. Precondition failures (`UnknownMetric`,
//! `InsufficientData`) abort only the one call and surface as typed errors;
//! per-file parse problems ride along as warnings inside the report.

pub mod activity;
pub mod compare;
pub mod correlate;
pub mod heart;
pub mod scan;
pub mod sleep;
pub mod yearly;

pub use activity::ActivityReport;
pub use compare::CompareReport;
pub use correlate::CorrelateReport;
pub use heart::HeartReport;
pub use scan::ScanReport;
pub use sleep::SleepReport;
pub use yearly::YearlyReport;

use crate::config::AnalysisConfig;
use crate::error::InsightError;
use crate::normalizer::Normalizer;
use crate::stats::Correlation;
use crate::store::RecordStore;
use crate::types::DateRange;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Metrics scan mode summarizes by default. The universe is open-ended;
/// these are just the ones worth flagging without being asked.
pub(crate) const KEY_METRICS: &[&str] = &[
    "step-count",
    "resting-heart-rate",
    "heart-rate-variability-sdnn",
    "active-energy-burned",
    "apple-exercise-time",
];

/// Metric file stem holding sleep stage samples.
pub(crate) const SLEEP_METRIC: &str = "sleep-analysis";

/// Key for the derived nightly-sleep-hours series in scan output.
pub(crate) const SLEEP_HOURS_KEY: &str = "sleep-hours";

/// One cross-metric correlation finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationFinding {
    pub metric_a: String,
    pub metric_b: String,
    /// Day offset applied to `metric_b` before aligning.
    pub lag: i64,
    #[serde(flatten)]
    pub correlation: Correlation,
}

/// Pair up `a[d]` with `b[d + lag]` for every date both sides cover.
pub(crate) fn align_with_lag(
    a: &BTreeMap<NaiveDate, f64>,
    b: &BTreeMap<NaiveDate, f64>,
    lag: i64,
) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (date, x) in a {
        let shifted = *date + Duration::days(lag);
        if let Some(y) = b.get(&shifted) {
            xs.push(*x);
            ys.push(*y);
        }
    }
    (xs, ys)
}

/// Sort findings by |r| descending with a deterministic tie-break.
pub(crate) fn sort_findings(findings: &mut [CorrelationFinding]) {
    findings.sort_by(|a, b| {
        b.correlation
            .r
            .abs()
            .total_cmp(&a.correlation.r.abs())
            .then_with(|| a.metric_a.cmp(&b.metric_a))
            .then_with(|| a.metric_b.cmp(&b.metric_b))
            .then_with(|| a.lag.cmp(&b.lag))
    });
}

/// Entry point for all analysis modes over one store snapshot.
#[derive(Debug)]
pub struct AnalysisEngine<'a> {
    store: &'a RecordStore,
    config: AnalysisConfig,
}

impl<'a> AnalysisEngine<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self::with_config(store, AnalysisConfig::default())
    }

    pub fn with_config(store: &'a RecordStore, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &RecordStore {
        self.store
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub(crate) fn normalizer(&self) -> Normalizer<'a> {
        Normalizer::new(self.store)
    }

    /// Quick overview: trends, anomalies, correlations, consistency.
    pub fn scan(&self, range: DateRange) -> ScanReport {
        scan::run(self, range)
    }

    /// Sleep deep-dive: nightly totals, stages, bedtime variance.
    pub fn sleep(&self, range: DateRange) -> SleepReport {
        sleep::run(self, range)
    }

    /// Steps, active energy, exercise, distance.
    pub fn activity(&self, range: DateRange) -> ActivityReport {
        activity::run(self, range)
    }

    /// Resting HR, HRV, walking HR.
    pub fn heart(&self, range: DateRange) -> HeartReport {
        heart::run(self, range)
    }

    /// Cross-metric correlation against a target, with day lags.
    pub fn correlate(
        &self,
        range: DateRange,
        target: &str,
        lags: &[i64],
    ) -> Result<CorrelateReport, InsightError> {
        correlate::run(self, range, target, lags)
    }

    /// Two-period side-by-side comparison of `YYYY-MM` months.
    pub fn compare(&self, p1: &str, p2: &str) -> Result<CompareReport, InsightError> {
        compare::run(self, p1, p2)
    }

    /// Month-by-month annual summary.
    pub fn yearly(&self, year: i32) -> Result<YearlyReport, InsightError> {
        yearly::run(self, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn alignment_applies_lag_to_candidate() {
        let a: BTreeMap<NaiveDate, f64> =
            [(date("2026-01-01"), 1.0), (date("2026-01-02"), 2.0)].into();
        let b: BTreeMap<NaiveDate, f64> =
            [(date("2026-01-02"), 10.0), (date("2026-01-03"), 20.0)].into();

        let (xs, ys) = align_with_lag(&a, &b, 1);
        assert_eq!(xs, vec![1.0, 2.0]);
        assert_eq!(ys, vec![10.0, 20.0]);

        let (xs, ys) = align_with_lag(&a, &b, 0);
        assert_eq!(xs, vec![2.0]);
        assert_eq!(ys, vec![10.0]);
    }

    #[test]
    fn findings_sort_by_abs_r() {
        let finding = |b: &str, r: f64| CorrelationFinding {
            metric_a: "a".to_string(),
            metric_b: b.to_string(),
            lag: 0,
            correlation: Correlation { r, p: 0.5, n: 10 },
        };
        let mut findings = vec![finding("x", 0.3), finding("y", -0.9), finding("z", 0.5)];
        sort_findings(&mut findings);
        let order: Vec<&str> = findings.iter().map(|f| f.metric_b.as_str()).collect();
        assert_eq!(order, vec!["y", "z", "x"]);
    }
}
