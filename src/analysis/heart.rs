//! Heart mode: resting HR, HRV, walking HR

use super::{align_with_lag, AnalysisEngine};
use crate::stats::{self, Correlation, Trend};
use crate::store::ScanWarning;
use crate::types::DateRange;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Mean over one ISO week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAverage {
    /// `YYYY-Wnn` ISO week key.
    pub week: String,
    pub avg: f64,
    pub n: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartReport {
    pub period: DateRange,
    pub weekly_resting_hr: Vec<WeeklyAverage>,
    pub weekly_hrv: Vec<WeeklyAverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_resting_hr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_hrv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_walking_hr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_hr_trend: Option<Trend>,
    /// Same-day correlation between daily resting HR and HRV, omitted below
    /// the configured overlap minimum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhr_hrv_correlation: Option<Correlation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

pub(super) fn run(engine: &AnalysisEngine<'_>, range: DateRange) -> HeartReport {
    let normalizer = engine.normalizer();
    let rhr = normalizer.daily("resting-heart-rate", &range);
    let hrv = normalizer.daily("heart-rate-variability-sdnn", &range);
    let walking = normalizer.daily("walking-heart-rate-average", &range);

    let mut warnings: Vec<ScanWarning> = Vec::new();
    for series in [&rhr, &hrv, &walking] {
        warnings.extend(series.warnings.iter().cloned());
    }

    let rhr_hrv_correlation = {
        let (xs, ys) = align_with_lag(&rhr.points, &hrv.points, 0);
        if xs.len() >= engine.config().min_overlap_days {
            Some(stats::pearson(&xs, &ys))
        } else {
            None
        }
    };

    HeartReport {
        period: range,
        weekly_resting_hr: weekly_averages(&rhr.points),
        weekly_hrv: weekly_averages(&hrv.points),
        avg_resting_hr: stats::mean(&rhr.values()).map(stats::round2),
        avg_hrv: stats::mean(&hrv.values()).map(stats::round2),
        avg_walking_hr: stats::mean(&walking.values()).map(stats::round2),
        resting_hr_trend: stats::trend_of(&rhr.values()),
        rhr_hrv_correlation,
        warnings,
    }
}

/// Group daily values into ISO weeks and average each.
fn weekly_averages(points: &BTreeMap<NaiveDate, f64>) -> Vec<WeeklyAverage> {
    let mut weeks: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (date, value) in points {
        let iso = date.iso_week();
        let key = format!("{}-W{:02}", iso.year(), iso.week());
        weeks.entry(key).or_default().push(*value);
    }
    weeks
        .into_iter()
        .filter_map(|(week, values)| {
            stats::mean(&values).map(|avg| WeeklyAverage {
                week,
                avg: stats::round2(avg),
                n: values.len(),
            })
        })
        .collect()
}
