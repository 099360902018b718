//! Sleep mode: nightly totals, stage distribution, bedtime variance

use super::{AnalysisEngine, SLEEP_METRIC};
use crate::stats::{self, Trend};
use crate::store::ScanWarning;
use crate::types::{DateRange, MetricDay, SleepStage};
use crate::tz;
use chrono::{NaiveDate, NaiveDateTime, SubsecRound, Timelike};
use serde::Serialize;

/// One analyzed night.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightRecord {
    pub date: NaiveDate,
    pub total_hrs: f64,
    pub deep_pct: f64,
    pub core_pct: f64,
    pub rem_pct: f64,
    pub awake_min: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedtime_local: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waketime_local: Option<NaiveDateTime>,
}

/// Period averages over the analyzed nights.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SleepAverages {
    pub total_hrs: Option<f64>,
    pub deep_pct: Option<f64>,
    pub core_pct: Option<f64>,
    pub rem_pct: Option<f64>,
    pub awake_min: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SleepReport {
    pub period: DateRange,
    pub nightly: Vec<NightRecord>,
    pub averages: SleepAverages,
    /// Standard deviation of sleep onset, in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedtime_stdev_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_trend: Option<Trend>,
    pub nights_analyzed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

pub(super) fn run(engine: &AnalysisEngine<'_>, range: DateRange) -> SleepReport {
    let (nightly, warnings) = nights(engine, &range);

    let averages = SleepAverages {
        total_hrs: field_mean(&nightly, |n| n.total_hrs),
        deep_pct: field_mean(&nightly, |n| n.deep_pct),
        core_pct: field_mean(&nightly, |n| n.core_pct),
        rem_pct: field_mean(&nightly, |n| n.rem_pct),
        awake_min: field_mean(&nightly, |n| n.awake_min),
    };

    let bedtimes: Vec<f64> = nightly
        .iter()
        .filter_map(|n| n.bedtime_local)
        .map(bedtime_minutes)
        .collect();
    let bedtime_stdev_min = stats::stdev(&bedtimes).map(stats::round1);

    let durations: Vec<f64> = nightly.iter().map(|n| n.total_hrs).collect();
    let duration_trend = stats::trend_of(&durations);

    SleepReport {
        period: range,
        nights_analyzed: nightly.len(),
        nightly,
        averages,
        bedtime_stdev_min,
        duration_trend,
        warnings,
    }
}

/// Analyzed nights for the range, in date order. Shared with scan and yearly.
pub(crate) fn nights(
    engine: &AnalysisEngine<'_>,
    range: &DateRange,
) -> (Vec<NightRecord>, Vec<ScanWarning>) {
    let scan = engine.store().metric_days(SLEEP_METRIC, range);
    let nightly = scan
        .days
        .iter()
        .filter_map(analyze_night)
        .collect();
    (nightly, scan.warnings)
}

/// Analyze one day's sleep stage samples; `None` when no asleep time exists.
pub(crate) fn analyze_night(day: &MetricDay) -> Option<NightRecord> {
    let mut core_min = 0.0;
    let mut deep_min = 0.0;
    let mut rem_min = 0.0;
    let mut awake_min = 0.0;
    let mut onset = None;
    let mut final_wake = None;

    for sample in &day.samples {
        let Some(value) = sample.category_value() else {
            continue;
        };
        let duration_min = (sample.end() - sample.start()).num_seconds() as f64 / 60.0;
        if duration_min <= 0.0 {
            continue;
        }
        let stage = SleepStage::from_value(value);
        match stage {
            SleepStage::AsleepCore => core_min += duration_min,
            SleepStage::AsleepDeep => deep_min += duration_min,
            SleepStage::AsleepRem => rem_min += duration_min,
            SleepStage::Awake => awake_min += duration_min,
            SleepStage::InBed | SleepStage::Unknown => continue,
        }
        if stage.is_asleep() {
            onset = Some(match onset {
                Some(earliest) if earliest <= sample.start() => earliest,
                _ => sample.start(),
            });
            final_wake = Some(match final_wake {
                Some(latest) if latest >= sample.end() => latest,
                _ => sample.end(),
            });
        }
    }

    let total_sleep_min = core_min + deep_min + rem_min;
    if total_sleep_min == 0.0 {
        return None;
    }

    Some(NightRecord {
        date: day.date,
        total_hrs: stats::round2(total_sleep_min / 60.0),
        deep_pct: stats::round1(deep_min / total_sleep_min * 100.0),
        core_pct: stats::round1(core_min / total_sleep_min * 100.0),
        rem_pct: stats::round1(rem_min / total_sleep_min * 100.0),
        awake_min: stats::round1(awake_min),
        bedtime_local: onset.map(|ts| tz::to_local(ts, &day.timezone).trunc_subsecs(0)),
        waketime_local: final_wake.map(|ts| tz::to_local(ts, &day.timezone).trunc_subsecs(0)),
    })
}

/// Sleep onset as minutes from midnight, folding pre-noon onsets past 24h so
/// a 23:50 bedtime and a 00:10 bedtime are 20 minutes apart, not 1420.
pub(crate) fn bedtime_minutes(bedtime: NaiveDateTime) -> f64 {
    let mins = (bedtime.hour() * 60 + bedtime.minute()) as f64;
    if mins < 720.0 {
        mins + 1440.0
    } else {
        mins
    }
}

fn field_mean(nightly: &[NightRecord], field: impl Fn(&NightRecord) -> f64) -> Option<f64> {
    let values: Vec<f64> = nightly.iter().map(field).collect();
    stats::mean(&values).map(stats::round2)
}
