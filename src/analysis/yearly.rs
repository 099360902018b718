//! Yearly mode: month-by-month aggregates plus bests and worsts

use super::AnalysisEngine;
use crate::analysis::sleep;
use crate::config::{month_range, year_range};
use crate::error::InsightError;
use crate::stats::{self, DatedValue};
use crate::store::ScanWarning;
use crate::types::DateRange;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One month's aggregates. Nulls mean no data that month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    /// `YYYY-MM`.
    pub month: String,
    pub steps_avg: Option<f64>,
    pub sleep_avg_hrs: Option<f64>,
    pub resting_hr_avg: Option<f64>,
    pub hrv_avg: Option<f64>,
    pub exercise_total_min: Option<f64>,
    pub active_kcal_total: Option<f64>,
    pub days_with_data: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bests {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_step_day: Option<DatedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_sleep: Option<DatedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_resting_hr: Option<DatedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_hrv: Option<DatedValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Worsts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_step_day: Option<DatedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortest_sleep: Option<DatedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_resting_hr: Option<DatedValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearlyReport {
    pub year: i32,
    pub monthly: Vec<MonthSummary>,
    pub bests: Bests,
    pub worsts: Worsts,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

pub(super) fn run(engine: &AnalysisEngine<'_>, year: i32) -> Result<YearlyReport, InsightError> {
    let full_year = year_range(year)?;
    let normalizer = engine.normalizer();

    let steps = normalizer.daily("step-count", &full_year);
    let active_kcal = normalizer.daily("active-energy-burned", &full_year);
    let exercise = normalizer.daily("apple-exercise-time", &full_year);
    let rhr = normalizer.daily("resting-heart-rate", &full_year);
    let hrv = normalizer.daily("heart-rate-variability-sdnn", &full_year);

    let mut warnings: Vec<ScanWarning> = Vec::new();
    for series in [&steps, &active_kcal, &exercise, &rhr, &hrv] {
        warnings.extend(series.warnings.iter().cloned());
    }

    let (nightly, sleep_warnings) = sleep::nights(engine, &full_year);
    warnings.extend(sleep_warnings);
    let sleep_daily: BTreeMap<NaiveDate, f64> = nightly
        .iter()
        .map(|night| (night.date, night.total_hrs))
        .collect();

    let mut monthly = Vec::with_capacity(12);
    for month in 1..=12u32 {
        let key = format!("{year}-{month:02}");
        let range = month_range(&key)?;

        let s_vals = month_values(&steps.points, &range);
        let ak_vals = month_values(&active_kcal.points, &range);
        let ex_vals = month_values(&exercise.points, &range);
        let rhr_vals = month_values(&rhr.points, &range);
        let hrv_vals = month_values(&hrv.points, &range);
        let sl_vals = month_values(&sleep_daily, &range);

        monthly.push(MonthSummary {
            month: key,
            steps_avg: stats::mean(&s_vals).map(|v| stats::round_to(v, 0)),
            sleep_avg_hrs: stats::mean(&sl_vals).map(stats::round2),
            resting_hr_avg: stats::mean(&rhr_vals).map(stats::round2),
            hrv_avg: stats::mean(&hrv_vals).map(stats::round2),
            exercise_total_min: if ex_vals.is_empty() {
                None
            } else {
                Some(stats::round_to(ex_vals.iter().sum(), 0))
            },
            active_kcal_total: if ak_vals.is_empty() {
                None
            } else {
                Some(stats::round_to(ak_vals.iter().sum(), 0))
            },
            days_with_data: s_vals.len(),
        });
    }

    let bests = Bests {
        highest_step_day: stats::max_with_date(&steps.points),
        longest_sleep: stats::max_with_date(&sleep_daily),
        lowest_resting_hr: stats::min_with_date(&rhr.points),
        highest_hrv: stats::max_with_date(&hrv.points),
    };
    let worsts = Worsts {
        lowest_step_day: stats::min_with_date(&steps.points),
        shortest_sleep: stats::min_with_date(&sleep_daily),
        highest_resting_hr: stats::max_with_date(&rhr.points),
    };

    Ok(YearlyReport {
        year,
        monthly,
        bests,
        worsts,
        warnings,
    })
}

fn month_values(points: &BTreeMap<NaiveDate, f64>, range: &DateRange) -> Vec<f64> {
    points
        .range(range.from..=range.to)
        .map(|(_, v)| *v)
        .collect()
}
