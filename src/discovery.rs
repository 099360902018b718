//! Discovery: read-only inventory of a store
//!
//! Walks the whole tree (ignoring any query range) and reports what exists:
//! per-metric coverage, the overall date span, fully-empty calendar gaps,
//! devices seen, and workout counts. Never modifies the store.

use crate::error::InsightError;
use crate::store::{RecordStore, ScanWarning};
use crate::types::{MetricDay, Workout};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Earliest and latest date with any data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// A run of calendar days with zero samples across all metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: i64,
}

/// Coverage summary for one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCoverage {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub days_with_data: usize,
    pub sample_count: usize,
    pub devices: BTreeSet<String>,
}

/// Workout totals across the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkoutSummary {
    pub count: usize,
    pub types: BTreeMap<String, usize>,
}

/// Everything discovery knows about a store.
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub data_dir: PathBuf,
    pub date_range: DateSpan,
    pub total_days: usize,
    pub gaps: Vec<Gap>,
    pub metrics: BTreeMap<String, MetricCoverage>,
    pub workouts: WorkoutSummary,
    pub devices: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

impl Inventory {
    /// True when no valid metric or workout file was found anywhere.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.workouts.count == 0
    }

    /// `EmptyStore` for callers that require at least some data.
    pub fn ensure_populated(&self) -> Result<(), InsightError> {
        if self.is_empty() {
            Err(InsightError::EmptyStore)
        } else {
            Ok(())
        }
    }

    /// `UnknownMetric` unless `metric` appears somewhere in the store.
    pub fn ensure_metric(&self, metric: &str) -> Result<(), InsightError> {
        if self.metrics.contains_key(metric) {
            Ok(())
        } else {
            Err(InsightError::UnknownMetric(metric.to_string()))
        }
    }
}

/// Read-only inventory pass over a record store.
pub struct DiscoveryEngine;

impl DiscoveryEngine {
    pub fn scan(store: &RecordStore) -> Inventory {
        let mut all_dates: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut metrics: BTreeMap<String, MetricCoverage> = BTreeMap::new();
        let mut workouts = WorkoutSummary::default();
        let mut devices: BTreeSet<String> = BTreeSet::new();
        let mut warnings: Vec<ScanWarning> = Vec::new();

        for (date, day_path) in store.day_dirs() {
            let mut day_has_data = false;

            for name in json_files(&day_path) {
                let path = day_path.join(&name);
                let Ok(text) = fs::read_to_string(&path) else {
                    warnings.push(ScanWarning {
                        path,
                        reason: "unreadable file".to_string(),
                    });
                    continue;
                };

                if name.starts_with("workout-") {
                    match serde_json::from_str::<Workout>(&text) {
                        Ok(workout) => {
                            workouts.count += 1;
                            *workouts.types.entry(workout.activity_type).or_insert(0) += 1;
                            day_has_data = true;
                        }
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "skipping malformed workout file");
                            warnings.push(ScanWarning {
                                path,
                                reason: e.to_string(),
                            });
                        }
                    }
                    continue;
                }

                let metric_name = name.trim_end_matches(".json").to_string();
                match serde_json::from_str::<MetricDay>(&text) {
                    Ok(day) => {
                        day_has_data = true;
                        let coverage =
                            metrics
                                .entry(metric_name)
                                .or_insert_with(|| MetricCoverage {
                                    first: date,
                                    last: date,
                                    days_with_data: 0,
                                    sample_count: 0,
                                    devices: BTreeSet::new(),
                                });
                        coverage.first = coverage.first.min(date);
                        coverage.last = coverage.last.max(date);
                        coverage.days_with_data += 1;
                        coverage.sample_count += day.samples.len();
                        for sample in &day.samples {
                            if let Some(device) = sample.device() {
                                coverage.devices.insert(device.to_string());
                                devices.insert(device.to_string());
                            }
                        }
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping malformed metric file");
                        warnings.push(ScanWarning {
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            if day_has_data {
                all_dates.insert(date);
            }
        }

        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();
        let date_range = DateSpan {
            earliest: dates.first().copied(),
            latest: dates.last().copied(),
        };

        debug!(
            days = dates.len(),
            metrics = metrics.len(),
            workouts = workouts.count,
            "discovery scan complete"
        );

        Inventory {
            data_dir: store.root().to_path_buf(),
            date_range,
            total_days: dates.len(),
            gaps: find_gaps(&dates),
            metrics,
            workouts,
            devices,
            warnings,
        }
    }
}

/// Runs of fully-empty days between consecutive dates with data.
fn find_gaps(dates: &[NaiveDate]) -> Vec<Gap> {
    dates
        .windows(2)
        .filter_map(|pair| {
            let missing = (pair[1] - pair[0]).num_days() - 1;
            if missing >= 1 {
                Some(Gap {
                    from: pair[0] + Duration::days(1),
                    to: pair[1] - Duration::days(1),
                    days: missing,
                })
            } else {
                None
            }
        })
        .collect()
}

fn json_files(day_path: &std::path::Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(day_path) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".json"))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_day_file(root: &Path, date: &str, name: &str, content: &str) {
        let parts: Vec<&str> = date.split('-').collect();
        let dir = root.join(parts[0]).join(parts[1]).join(parts[2]);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    fn step_day(date: &str, device: &str) -> String {
        format!(
            r#"{{"date":"{date}","type":"step-count","timezone":"UTC","unit":"count","samples":[
                {{"start":"{date}T08:00:00.000Z","end":"{date}T08:10:00.000Z","value":100.0,"unit":"count","type":"step-count","source":"{device}","device":"{device}"}},
                {{"start":"{date}T09:00:00.000Z","end":"{date}T09:10:00.000Z","value":50.0,"unit":"count","type":"step-count","source":"{device}","device":"{device}"}}
            ]}}"#
        )
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn one_day_gap_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_day_file(tmp.path(), "2026-01-15", "step-count.json", &step_day("2026-01-15", "Apple Watch"));
        write_day_file(tmp.path(), "2026-01-17", "step-count.json", &step_day("2026-01-17", "Apple Watch"));

        let store = RecordStore::open(tmp.path()).unwrap();
        let inventory = DiscoveryEngine::scan(&store);

        assert_eq!(inventory.total_days, 2);
        assert_eq!(
            inventory.gaps,
            vec![Gap {
                from: date("2026-01-16"),
                to: date("2026-01-16"),
                days: 1,
            }]
        );
    }

    #[test]
    fn metric_coverage_counts_samples_and_devices() {
        let tmp = TempDir::new().unwrap();
        write_day_file(tmp.path(), "2026-01-15", "step-count.json", &step_day("2026-01-15", "Apple Watch"));
        write_day_file(tmp.path(), "2026-01-16", "step-count.json", &step_day("2026-01-16", "iPhone 15"));

        let store = RecordStore::open(tmp.path()).unwrap();
        let inventory = DiscoveryEngine::scan(&store);
        let coverage = &inventory.metrics["step-count"];

        assert_eq!(coverage.first, date("2026-01-15"));
        assert_eq!(coverage.last, date("2026-01-16"));
        assert_eq!(coverage.days_with_data, 2);
        assert_eq!(coverage.sample_count, 4);
        assert!(coverage.devices.contains("Apple Watch"));
        assert!(coverage.devices.contains("iPhone 15"));
        assert_eq!(inventory.devices.len(), 2);
    }

    #[test]
    fn workout_histogram() {
        let tmp = TempDir::new().unwrap();
        let workout = |uuid: &str, activity: &str| {
            format!(
                r#"{{"uuid":"{uuid}","activity_type":"{activity}","start":"2026-01-15T07:00:00.000Z","end":"2026-01-15T07:30:00.000Z","duration_s":1800.0,"source":"Apple Watch","synced_at":"2026-01-15T08:00:00.000Z","stats":{{}}}}"#
            )
        };
        write_day_file(
            tmp.path(),
            "2026-01-15",
            "workout-5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7b.json",
            &workout("5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7b", "running"),
        );
        write_day_file(
            tmp.path(),
            "2026-01-15",
            "workout-5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7c.json",
            &workout("5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7c", "running"),
        );
        write_day_file(
            tmp.path(),
            "2026-01-16",
            "workout-5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7d.json",
            &workout("5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7d", "cycling"),
        );

        let store = RecordStore::open(tmp.path()).unwrap();
        let inventory = DiscoveryEngine::scan(&store);

        assert_eq!(inventory.workouts.count, 3);
        assert_eq!(inventory.workouts.types["running"], 2);
        assert_eq!(inventory.workouts.types["cycling"], 1);
        assert!(inventory.ensure_populated().is_ok());
    }

    #[test]
    fn empty_store_reports_zero_metrics() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::open(tmp.path()).unwrap();
        let inventory = DiscoveryEngine::scan(&store);

        assert!(inventory.is_empty());
        assert_eq!(inventory.total_days, 0);
        assert_eq!(inventory.date_range.earliest, None);
        assert!(matches!(
            inventory.ensure_populated(),
            Err(InsightError::EmptyStore)
        ));
    }

    #[test]
    fn malformed_files_accumulate_warnings() {
        let tmp = TempDir::new().unwrap();
        write_day_file(tmp.path(), "2026-01-15", "step-count.json", &step_day("2026-01-15", "Apple Watch"));
        write_day_file(tmp.path(), "2026-01-15", "heart-rate.json", "{\"nope\": true}");

        let store = RecordStore::open(tmp.path()).unwrap();
        let inventory = DiscoveryEngine::scan(&store);

        assert_eq!(inventory.metrics.len(), 1);
        assert_eq!(inventory.warnings.len(), 1);
        assert!(inventory.warnings[0].path.ends_with("heart-rate.json"));
        assert!(matches!(
            inventory.ensure_metric("heart-rate"),
            Err(InsightError::UnknownMetric(_))
        ));
        assert!(inventory.ensure_metric("step-count").is_ok());
    }

    #[test]
    fn multiple_gaps() {
        let tmp = TempDir::new().unwrap();
        for d in ["2026-01-01", "2026-01-05", "2026-01-06", "2026-01-10"] {
            write_day_file(tmp.path(), d, "step-count.json", &step_day(d, "Apple Watch"));
        }
        let store = RecordStore::open(tmp.path()).unwrap();
        let inventory = DiscoveryEngine::scan(&store);
        assert_eq!(
            inventory.gaps,
            vec![
                Gap { from: date("2026-01-02"), to: date("2026-01-04"), days: 3 },
                Gap { from: date("2026-01-07"), to: date("2026-01-09"), days: 3 },
            ]
        );
    }
}
