//! Configuration surface for analysis runs
//!
//! All thresholds live here with documented defaults; nothing in the engine
//! reads process-wide state. The data root itself is passed to
//! [`crate::store::RecordStore::open`].

use crate::error::InsightError;
use crate::store::RecordStore;
use crate::types::DateRange;
use chrono::{Duration, NaiveDate};

/// Numeric thresholds honored by every analysis mode.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Half-over-half change (percent) that raises a trend alert. Default 15.
    pub significant_change_pct: f64,
    /// Z-score magnitude that flags a daily value as anomalous. Default 2.
    pub anomaly_sigma: f64,
    /// Minimum paired days for any correlation to be reported. Default 7.
    pub min_overlap_days: usize,
    /// Scan-mode correlations below this |r| are dropped. Default 0.2.
    pub correlation_floor: f64,
    /// Scan mode keeps at most this many correlations. Default 10.
    pub max_scan_correlations: usize,
    /// Daily step floor for the activity streak. Default 10000.
    pub step_streak_floor: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significant_change_pct: 15.0,
            anomaly_sigma: 2.0,
            min_overlap_days: 7,
            correlation_floor: 0.2,
            max_scan_correlations: 10,
            step_streak_floor: 10_000.0,
        }
    }
}

/// Default relative period when no range is given.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// A query window as supplied by the caller, before resolution.
///
/// Resolution rules mirror the exporter tooling: explicit `from`/`to` win;
/// `from` alone runs through `today`; otherwise the period is anchored on the
/// latest date with data (falling back to `today`), optionally capped by
/// an explicit `to`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub period_days: Option<i64>,
}

impl QueryWindow {
    pub fn resolve(&self, store: &RecordStore, today: NaiveDate) -> DateRange {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            return DateRange::new(from, to);
        }
        if let Some(from) = self.from {
            return DateRange::new(from, today);
        }

        let anchor = self.to.or_else(|| store.latest_date()).unwrap_or(today);
        let days = self.period_days.unwrap_or(DEFAULT_PERIOD_DAYS).max(1);
        DateRange::new(anchor - Duration::days(days - 1), anchor)
    }
}

/// Parse a relative period string like `30d` into a day count.
pub fn parse_period(raw: &str) -> Result<i64, InsightError> {
    let trimmed = raw.trim().to_lowercase();
    let digits = trimmed
        .strip_suffix('d')
        .ok_or_else(|| InsightError::InvalidPeriod(raw.to_string()))?;
    let days: i64 = digits
        .parse()
        .map_err(|_| InsightError::InvalidPeriod(raw.to_string()))?;
    if days < 1 {
        return Err(InsightError::InvalidPeriod(raw.to_string()));
    }
    Ok(days)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, InsightError> {
    raw.parse()
        .map_err(|_| InsightError::DateParseError(raw.to_string()))
}

/// Full calendar month for a `YYYY-MM` string.
pub fn month_range(raw: &str) -> Result<DateRange, InsightError> {
    let mut parts = raw.splitn(2, '-');
    let year: i32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| InsightError::DateParseError(raw.to_string()))?;
    let month: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| InsightError::DateParseError(raw.to_string()))?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| InsightError::DateParseError(raw.to_string()))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| InsightError::DateParseError(raw.to_string()))?;
    Ok(DateRange::new(first, next_month - Duration::days(1)))
}

/// Full calendar year.
pub fn year_range(year: i32) -> Result<DateRange, InsightError> {
    let from = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| InsightError::DateParseError(year.to_string()))?;
    let to = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| InsightError::DateParseError(year.to_string()))?;
    Ok(DateRange::new(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn parse_period_forms() {
        assert_eq!(parse_period("30d").unwrap(), 30);
        assert_eq!(parse_period(" 90D ").unwrap(), 90);
        assert!(parse_period("30").is_err());
        assert!(parse_period("0d").is_err());
        assert!(parse_period("soon").is_err());
    }

    #[test]
    fn month_range_handles_year_end() {
        assert_eq!(
            month_range("2026-02").unwrap(),
            DateRange::new(date("2026-02-01"), date("2026-02-28"))
        );
        assert_eq!(
            month_range("2025-12").unwrap(),
            DateRange::new(date("2025-12-01"), date("2025-12-31"))
        );
        assert!(month_range("2026-13").is_err());
        assert!(month_range("2026").is_err());
    }

    #[test]
    fn window_explicit_range_wins() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::open(tmp.path()).unwrap();
        let window = QueryWindow {
            from: Some(date("2026-01-01")),
            to: Some(date("2026-01-10")),
            period_days: Some(90),
        };
        assert_eq!(
            window.resolve(&store, date("2026-08-01")),
            DateRange::new(date("2026-01-01"), date("2026-01-10"))
        );
    }

    #[test]
    fn window_period_anchors_on_latest_data() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("2026/03/10")).unwrap();
        fs::write(
            tmp.path().join("2026/03/10/step-count.json"),
            r#"{"date":"2026-03-10","type":"step-count","timezone":"UTC","samples":[]}"#,
        )
        .unwrap();

        let store = RecordStore::open(tmp.path()).unwrap();
        let window = QueryWindow {
            period_days: Some(7),
            ..Default::default()
        };
        assert_eq!(
            window.resolve(&store, date("2026-08-01")),
            DateRange::new(date("2026-03-04"), date("2026-03-10"))
        );
    }

    #[test]
    fn window_empty_store_anchors_on_today() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::open(tmp.path()).unwrap();
        let window = QueryWindow::default();
        assert_eq!(
            window.resolve(&store, date("2026-08-01")),
            DateRange::new(date("2026-07-03"), date("2026-08-01"))
        );
    }

    #[test]
    fn defaults_documented() {
        let config = AnalysisConfig::default();
        assert_eq!(config.significant_change_pct, 15.0);
        assert_eq!(config.anomaly_sigma, 2.0);
        assert_eq!(config.min_overlap_days, 7);
        assert_eq!(config.correlation_floor, 0.2);
        assert_eq!(config.max_scan_correlations, 10);
    }
}
