//! Activity mode: steps, active energy, exercise time, distance

use super::AnalysisEngine;
use crate::stats::{self, DayOfWeekMeans, Trend};
use crate::store::ScanWarning;
use crate::types::DateRange;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// One day across the four activity metrics. Metrics missing that day
/// report zero, matching the additive semantics of the underlying data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub steps: f64,
    pub active_kcal: f64,
    pub exercise_min: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityAverages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_kcal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub period: DateRange,
    pub daily: Vec<ActivityDay>,
    pub averages: ActivityAverages,
    pub day_of_week_steps: DayOfWeekMeans,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_trend: Option<Trend>,
    /// Longest run of consecutive days at or above the configured step floor.
    pub longest_step_streak: usize,
    pub days_analyzed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

pub(super) fn run(engine: &AnalysisEngine<'_>, range: DateRange) -> ActivityReport {
    let normalizer = engine.normalizer();
    let steps = normalizer.daily("step-count", &range);
    let active_kcal = normalizer.daily("active-energy-burned", &range);
    let exercise = normalizer.daily("apple-exercise-time", &range);
    let distance = normalizer.daily("distance-walking-running", &range);

    let mut warnings: Vec<ScanWarning> = Vec::new();
    for series in [&steps, &active_kcal, &exercise, &distance] {
        warnings.extend(series.warnings.iter().cloned());
    }

    let all_dates: BTreeSet<NaiveDate> = steps
        .points
        .keys()
        .chain(active_kcal.points.keys())
        .chain(exercise.points.keys())
        .chain(distance.points.keys())
        .copied()
        .collect();

    let daily: Vec<ActivityDay> = all_dates
        .iter()
        .map(|date| ActivityDay {
            date: *date,
            steps: stats::round_to(steps.points.get(date).copied().unwrap_or(0.0), 0),
            active_kcal: stats::round2(active_kcal.points.get(date).copied().unwrap_or(0.0)),
            exercise_min: stats::round1(exercise.points.get(date).copied().unwrap_or(0.0)),
            distance_km: stats::round2(distance.points.get(date).copied().unwrap_or(0.0)),
        })
        .collect();

    let averages = ActivityAverages {
        steps: stats::mean(&steps.values()).map(stats::round2),
        active_kcal: stats::mean(&active_kcal.values()).map(stats::round2),
        exercise_min: stats::mean(&exercise.values()).map(stats::round2),
        distance_km: stats::mean(&distance.values()).map(stats::round2),
    };

    ActivityReport {
        period: range,
        days_analyzed: daily.len(),
        daily,
        averages,
        day_of_week_steps: stats::day_of_week_means(&steps.points),
        steps_trend: stats::trend_of(&steps.values()),
        longest_step_streak: stats::longest_streak(
            &steps.points,
            engine.config().step_streak_floor,
        ),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_sum_day(root: &Path, date: &str, metric: &str, values: &[f64]) {
        let parts: Vec<&str> = date.split('-').collect();
        let dir = root.join(parts[0]).join(parts[1]).join(parts[2]);
        fs::create_dir_all(&dir).unwrap();
        let samples: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                format!(
                    r#"{{"start":"{date}T{:02}:00:00.000Z","end":"{date}T{:02}:10:00.000Z","value":{v},"unit":"count","type":"{metric}","source":"Apple Watch","device":"Apple Watch"}}"#,
                    8 + i,
                    8 + i
                )
            })
            .collect();
        fs::write(
            dir.join(format!("{metric}.json")),
            format!(
                r#"{{"date":"{date}","type":"{metric}","timezone":"UTC","unit":"count","samples":[{}]}}"#,
                samples.join(",")
            ),
        )
        .unwrap();
    }

    #[test]
    fn daily_rows_default_missing_metrics_to_zero() {
        let tmp = TempDir::new().unwrap();
        write_sum_day(tmp.path(), "2026-01-05", "step-count", &[6000.0, 2000.0]);
        write_sum_day(tmp.path(), "2026-01-06", "active-energy-burned", &[450.0]);

        let store = RecordStore::open(tmp.path()).unwrap();
        let engine = AnalysisEngine::new(&store);
        let range = DateRange::new(
            "2026-01-05".parse().unwrap(),
            "2026-01-06".parse().unwrap(),
        );
        let report = engine.activity(range);

        assert_eq!(report.days_analyzed, 2);
        assert_eq!(report.daily[0].steps, 8000.0);
        assert_eq!(report.daily[0].active_kcal, 0.0);
        assert_eq!(report.daily[1].steps, 0.0);
        assert_eq!(report.daily[1].active_kcal, 450.0);
        assert_eq!(report.averages.steps, Some(8000.0));
        assert_eq!(report.averages.active_kcal, Some(450.0));
    }

    #[test]
    fn step_streak_counts_consecutive_goal_days() {
        let tmp = TempDir::new().unwrap();
        let values = [
            ("2026-01-01", 12_000.0),
            ("2026-01-02", 11_000.0),
            ("2026-01-03", 4_000.0),
            ("2026-01-04", 10_500.0),
        ];
        for (date, steps) in values {
            write_sum_day(tmp.path(), date, "step-count", &[steps]);
        }

        let store = RecordStore::open(tmp.path()).unwrap();
        let engine = AnalysisEngine::new(&store);
        let range = DateRange::new(
            "2026-01-01".parse().unwrap(),
            "2026-01-04".parse().unwrap(),
        );
        let report = engine.activity(range);
        assert_eq!(report.longest_step_streak, 2);
    }
}
