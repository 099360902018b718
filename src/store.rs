//! Record store: read-only access to the `YYYY/MM/DD` directory tree
//!
//! The store treats the tree as an immutable snapshot for the duration of a
//! run. Per-file failures (unreadable file, schema violation) are recorded as
//! [`ScanWarning`]s and skipped; only a missing root is fatal.

use crate::error::InsightError;
use crate::types::{DateRange, MetricDay, Workout};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Days sampled when probing a range for available metric names.
const MAX_PROBE_DAYS: i64 = 10;

/// A skipped file: where and why. Accumulated, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading one metric across a date range.
#[derive(Debug, Clone)]
pub struct MetricScan {
    pub days: Vec<MetricDay>,
    pub warnings: Vec<ScanWarning>,
}

/// Result of loading workouts across a date range.
#[derive(Debug, Clone)]
pub struct WorkoutScan {
    pub workouts: Vec<Workout>,
    pub warnings: Vec<ScanWarning>,
}

/// Read-only handle on a MyLifeDB data root.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Open a store rooted at `root`. Fails only if the directory is missing.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, InsightError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(InsightError::NotFound(root.to_path_buf()));
        }
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `YYYY/MM/DD` directory for a date (which may not exist).
    pub fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(date.format("%d").to_string())
    }

    /// Load one metric file, if present. A file that exists but cannot be
    /// read or violates the schema yields `MalformedRecord`.
    pub fn metric_day(
        &self,
        metric: &str,
        date: NaiveDate,
    ) -> Result<Option<MetricDay>, InsightError> {
        let path = self.day_dir(date).join(format!("{metric}.json"));
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| InsightError::MalformedRecord {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        match serde_json::from_str::<MetricDay>(&text) {
            Ok(mut day) => {
                // The format guarantees (start, end, source) order; re-derive
                // it on load so downstream output is reproducible regardless.
                day.sort_samples();
                Ok(Some(day))
            }
            Err(e) => Err(InsightError::MalformedRecord {
                path,
                reason: e.to_string(),
            }),
        }
    }

    /// Load every day file for `metric` in `range`, skipping malformed files.
    pub fn metric_days(&self, metric: &str, range: &DateRange) -> MetricScan {
        let mut days = Vec::new();
        let mut warnings = Vec::new();
        for date in range.days() {
            match self.metric_day(metric, date) {
                Ok(Some(day)) => days.push(day),
                Ok(None) => {}
                Err(err) => {
                    let warning = scan_warning(err, || self.day_dir(date).join(format!("{metric}.json")));
                    warn!(path = %warning.path.display(), reason = %warning.reason, "skipping malformed metric file");
                    warnings.push(warning);
                }
            }
        }
        debug!(metric, days = days.len(), "loaded metric days");
        MetricScan { days, warnings }
    }

    /// Load every `workout-*.json` in `range`, skipping malformed files.
    pub fn workouts(&self, range: &DateRange) -> WorkoutScan {
        let mut workouts = Vec::new();
        let mut warnings = Vec::new();
        for date in range.days() {
            for path in workout_paths(&self.day_dir(date)) {
                match read_workout(&path) {
                    Ok(workout) => workouts.push(workout),
                    Err(err) => {
                        let warning = scan_warning(err, || path.clone());
                        warn!(path = %warning.path.display(), reason = %warning.reason, "skipping malformed workout file");
                        warnings.push(warning);
                    }
                }
            }
        }
        WorkoutScan { workouts, warnings }
    }

    /// Every day directory in the tree, in date order. Directory names that
    /// are not zero-padded numerics of the right width are ignored.
    pub fn day_dirs(&self) -> Vec<(NaiveDate, PathBuf)> {
        let mut out = Vec::new();
        for year_name in listdir_sorted(&self.root) {
            let Some(year) = numeric_component(&year_name, 4) else {
                continue;
            };
            let year_path = self.root.join(&year_name);
            if !year_path.is_dir() {
                continue;
            }
            for month_name in listdir_sorted(&year_path) {
                let Some(month) = numeric_component(&month_name, 2) else {
                    continue;
                };
                let month_path = year_path.join(&month_name);
                if !month_path.is_dir() {
                    continue;
                }
                for day_name in listdir_sorted(&month_path) {
                    let Some(day) = numeric_component(&day_name, 2) else {
                        continue;
                    };
                    let day_path = month_path.join(&day_name);
                    if !day_path.is_dir() {
                        continue;
                    }
                    if let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, day) {
                        out.push((date, day_path));
                    }
                }
            }
        }
        out
    }

    /// The newest day directory in the tree, used to anchor relative periods.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.day_dirs().last().map(|(date, _)| *date)
    }

    /// Metric file stems present in `range`, probed over at most
    /// [`MAX_PROBE_DAYS`] evenly spaced days plus the range end.
    pub fn metric_names(&self, range: &DateRange) -> Vec<String> {
        let total = range.len_days();
        let mut probe_dates: Vec<NaiveDate> = if total <= MAX_PROBE_DAYS {
            range.days().collect()
        } else {
            let step = total / MAX_PROBE_DAYS;
            let mut dates: Vec<NaiveDate> = (0..MAX_PROBE_DAYS)
                .filter_map(|i| {
                    range
                        .from
                        .checked_add_signed(chrono::Duration::days(i * step))
                })
                .collect();
            dates.push(range.to);
            dates
        };
        probe_dates.dedup();

        let mut found = std::collections::BTreeSet::new();
        for date in probe_dates {
            for name in listdir_sorted(&self.day_dir(date)) {
                if let Some(stem) = name.strip_suffix(".json") {
                    if !stem.starts_with("workout-") {
                        found.insert(stem.to_string());
                    }
                }
            }
        }
        found.into_iter().collect()
    }
}

/// Turn a per-file error into a warning, recovering the path when the error
/// variant does not carry one.
fn scan_warning(err: InsightError, fallback_path: impl FnOnce() -> PathBuf) -> ScanWarning {
    match err {
        InsightError::MalformedRecord { path, reason } => ScanWarning { path, reason },
        other => ScanWarning {
            path: fallback_path(),
            reason: other.to_string(),
        },
    }
}

fn read_workout(path: &Path) -> Result<Workout, InsightError> {
    let text = fs::read_to_string(path).map_err(|e| InsightError::MalformedRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| InsightError::MalformedRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// `workout-*.json` files in a day directory, sorted for determinism.
fn workout_paths(day_dir: &Path) -> Vec<PathBuf> {
    listdir_sorted(day_dir)
        .into_iter()
        .filter(|name| name.starts_with("workout-") && name.ends_with(".json"))
        .map(|name| day_dir.join(name))
        .collect()
}

/// Sorted UTF-8 entry names of a directory; empty if the path is missing.
fn listdir_sorted(path: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(path) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// Parse a directory component that must be exactly `width` ASCII digits.
fn numeric_component(name: &str, width: usize) -> Option<u32> {
    if name.len() == width && name.bytes().all(|b| b.is_ascii_digit()) {
        name.parse().ok()
    } else {
        None
    }
}
