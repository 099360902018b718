//! Scan mode: trend alerts, anomalies, correlations, consistency

use super::{
    align_with_lag, sort_findings, AnalysisEngine, CorrelationFinding, KEY_METRICS,
    SLEEP_HOURS_KEY,
};
use crate::analysis::sleep;
use crate::stats::{self, MetricStats, TrendDirection};
use crate::store::ScanWarning;
use crate::types::DateRange;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Lags (days) tried between metric pairs in scan mode.
const SCAN_LAGS: [i64; 3] = [0, 1, 2];

/// A half-over-half change beyond the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAlert {
    pub metric: String,
    pub direction: TrendDirection,
    pub change_pct: f64,
    pub first_half_avg: f64,
    pub second_half_avg: f64,
}

/// A daily value beyond the configured z-score threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub metric: String,
    pub date: NaiveDate,
    pub value: f64,
    pub z_score: f64,
}

/// Behavioral consistency signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Consistency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedtime_stdev_min: Option<f64>,
    /// Fraction of days in the period with any exercise minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_cv: Option<f64>,
}

/// Full stat block for one metric, including explicit `n = 0` entries for
/// key metrics with no data in the period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: String,
    #[serde(flatten)]
    pub stats: MetricStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub period: DateRange,
    pub metrics: Vec<MetricSummary>,
    pub trend_alerts: Vec<TrendAlert>,
    pub anomalies: Vec<Anomaly>,
    pub correlations: Vec<CorrelationFinding>,
    pub consistency: Consistency,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

pub(super) fn run(engine: &AnalysisEngine<'_>, range: DateRange) -> ScanReport {
    let config = engine.config();
    let normalizer = engine.normalizer();
    let midpoint = range.from + Duration::days((range.to - range.from).num_days() / 2);

    let mut summaries = Vec::new();
    let mut trend_alerts = Vec::new();
    let mut anomalies = Vec::new();
    let mut warnings = Vec::new();
    // Insertion-ordered so correlation output is stable across runs.
    let mut all_daily: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();

    for metric in KEY_METRICS {
        let daily = normalizer.daily(metric, &range);
        warnings.extend(daily.warnings.iter().cloned());
        summaries.push(MetricSummary {
            metric: metric.to_string(),
            stats: stats::metric_stats(&daily.points),
        });
        if daily.is_empty() {
            continue;
        }

        if let Some(alert) = half_over_half_alert(metric, &daily.points, midpoint, config) {
            trend_alerts.push(alert);
        }
        anomalies.extend(z_score_anomalies(metric, &daily.points, config.anomaly_sigma));
        all_daily.push((metric.to_string(), daily.points));
    }

    // Derived nightly sleep hours join the correlation pool.
    let (nightly, sleep_warnings) = sleep::nights(engine, &range);
    warnings.extend(sleep_warnings);
    let sleep_daily: BTreeMap<NaiveDate, f64> = nightly
        .iter()
        .map(|night| (night.date, night.total_hrs))
        .collect();
    summaries.push(MetricSummary {
        metric: SLEEP_HOURS_KEY.to_string(),
        stats: stats::metric_stats(&sleep_daily),
    });
    if !sleep_daily.is_empty() {
        all_daily.push((SLEEP_HOURS_KEY.to_string(), sleep_daily));
    }

    // Pairwise correlations across co-available metrics.
    let mut correlations = Vec::new();
    for i in 0..all_daily.len() {
        for j in i + 1..all_daily.len() {
            let (name_a, daily_a) = &all_daily[i];
            let (name_b, daily_b) = &all_daily[j];
            for lag in SCAN_LAGS {
                let (xs, ys) = align_with_lag(daily_a, daily_b, lag);
                if xs.len() < config.min_overlap_days {
                    continue;
                }
                let correlation = stats::pearson(&xs, &ys);
                if correlation.r.abs() > config.correlation_floor {
                    correlations.push(CorrelationFinding {
                        metric_a: name_a.clone(),
                        metric_b: name_b.clone(),
                        lag,
                        correlation,
                    });
                }
            }
        }
    }
    sort_findings(&mut correlations);
    correlations.truncate(config.max_scan_correlations);

    // Consistency block.
    let bedtimes: Vec<f64> = nightly
        .iter()
        .filter_map(|night| night.bedtime_local)
        .map(sleep::bedtime_minutes)
        .collect();
    let exercise = normalizer.daily("apple-exercise-time", &range);
    let exercise_frequency = if exercise.is_empty() {
        None
    } else {
        let active_days = exercise.points.values().filter(|v| **v > 0.0).count();
        Some(stats::round2(active_days as f64 / range.len_days() as f64))
    };
    let step_cv = all_daily
        .iter()
        .find(|(name, _)| name == "step-count")
        .and_then(|(_, points)| {
            let values: Vec<f64> = points.values().copied().collect();
            stats::cv(&values).map(|v| stats::round_to(v, 3))
        });

    ScanReport {
        period: range,
        metrics: summaries,
        trend_alerts,
        anomalies,
        correlations,
        consistency: Consistency {
            bedtime_stdev_min: stats::stdev(&bedtimes).map(stats::round1),
            exercise_frequency,
            step_cv,
        },
        warnings,
    }
}

fn half_over_half_alert(
    metric: &str,
    points: &BTreeMap<NaiveDate, f64>,
    midpoint: NaiveDate,
    config: &crate::config::AnalysisConfig,
) -> Option<TrendAlert> {
    let first: Vec<f64> = points
        .iter()
        .filter(|(d, _)| **d <= midpoint)
        .map(|(_, v)| *v)
        .collect();
    let second: Vec<f64> = points
        .iter()
        .filter(|(d, _)| **d > midpoint)
        .map(|(_, v)| *v)
        .collect();
    let first_avg = stats::mean(&first)?;
    let second_avg = stats::mean(&second)?;
    if first_avg == 0.0 {
        return None;
    }
    let change_pct = (second_avg - first_avg) / first_avg.abs() * 100.0;
    if change_pct.abs() <= config.significant_change_pct {
        return None;
    }
    Some(TrendAlert {
        metric: metric.to_string(),
        direction: if change_pct > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        },
        change_pct: stats::round1(change_pct),
        first_half_avg: stats::round2(first_avg),
        second_half_avg: stats::round2(second_avg),
    })
}

fn z_score_anomalies(
    metric: &str,
    points: &BTreeMap<NaiveDate, f64>,
    sigma: f64,
) -> Vec<Anomaly> {
    let values: Vec<f64> = points.values().copied().collect();
    let (Some(m), Some(s)) = (stats::mean(&values), stats::stdev(&values)) else {
        return Vec::new();
    };
    if s <= 0.0 {
        return Vec::new();
    }
    points
        .iter()
        .filter_map(|(date, value)| {
            let z = (value - m) / s;
            if z.abs() > sigma {
                Some(Anomaly {
                    metric: metric.to_string(),
                    date: *date,
                    value: stats::round2(*value),
                    z_score: stats::round2(z),
                })
            } else {
                None
            }
        })
        .collect()
}
