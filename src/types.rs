//! Wire types for the MyLifeDB Apple Health file format
//!
//! One day directory (`YYYY/MM/DD/`) holds one `<metric-name>.json` file per
//! metric plus zero or more `workout-<uuid>.json` files. The file's `date` is
//! the sample's local calendar date in the file's declared timezone, and
//! samples inside a file are ordered by `(start, end, source)`. Everything in
//! this module is immutable once parsed; derived series are built elsewhere.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Canonical timestamp format written by the MyLifeDB exporter:
/// UTC, millisecond precision, `Z` suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Serde adapter for the canonical timestamp format.
///
/// Deserialization accepts any RFC 3339 offset form; serialization always
/// emits the canonical `%.3fZ` form so re-writing parsed data is byte-stable.
pub mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// A quantity sample: one timestamped numeric measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySample {
    #[serde(with = "timestamp")]
    pub start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    #[serde(rename = "type")]
    pub sample_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// A category sample: one timestamped enum-valued event (e.g. a sleep stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySample {
    #[serde(with = "timestamp")]
    pub start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end: DateTime<Utc>,
    pub value: String,
    #[serde(rename = "type")]
    pub sample_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

/// One sample in a metric file. The two variants are distinguished by the
/// JSON type of `value` (number vs string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    Quantity(QuantitySample),
    Category(CategorySample),
}

impl Sample {
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Sample::Quantity(s) => s.start,
            Sample::Category(s) => s.start,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        match self {
            Sample::Quantity(s) => s.end,
            Sample::Category(s) => s.end,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Sample::Quantity(s) => &s.source,
            Sample::Category(s) => &s.source,
        }
    }

    pub fn device(&self) -> Option<&str> {
        match self {
            Sample::Quantity(s) => s.device.as_deref(),
            Sample::Category(s) => s.device.as_deref(),
        }
    }

    /// Numeric value for quantity samples, `None` for category samples.
    pub fn quantity_value(&self) -> Option<f64> {
        match self {
            Sample::Quantity(s) => Some(s.value),
            Sample::Category(_) => None,
        }
    }

    /// Enum-string value for category samples, `None` for quantity samples.
    pub fn category_value(&self) -> Option<&str> {
        match self {
            Sample::Quantity(_) => None,
            Sample::Category(s) => Some(&s.value),
        }
    }
}

/// One metric file: all samples for one `(date, type)` pair.
///
/// Re-ingesting a day fully replaces the prior file, so a parsed `MetricDay`
/// is always a complete view of that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDay {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub samples: Vec<Sample>,
}

impl MetricDay {
    /// Restore the file-format sample ordering after any merge or
    /// out-of-order read: `(start, end, source)`.
    pub fn sort_samples(&mut self) {
        self.samples.sort_by(|a, b| {
            (a.start(), a.end(), a.source()).cmp(&(b.start(), b.end(), b.source()))
        });
    }
}

/// Sleep stage classification for `sleep-analysis` category values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SleepStage {
    InBed,
    Awake,
    AsleepCore,
    AsleepDeep,
    #[serde(rename = "asleepREM")]
    AsleepRem,
    Unknown,
}

impl SleepStage {
    pub fn from_value(value: &str) -> Self {
        match value {
            "inBed" => SleepStage::InBed,
            "awake" => SleepStage::Awake,
            "asleepCore" => SleepStage::AsleepCore,
            "asleepDeep" => SleepStage::AsleepDeep,
            "asleepREM" => SleepStage::AsleepRem,
            _ => SleepStage::Unknown,
        }
    }

    /// True for the stages that count toward total sleep time.
    pub fn is_asleep(&self) -> bool {
        matches!(
            self,
            SleepStage::AsleepCore | SleepStage::AsleepDeep | SleepStage::AsleepRem
        )
    }
}

/// One activity-dependent workout statistic, e.g. `{"value": 5.2, "unit": "km"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutStat {
    pub value: f64,
    pub unit: String,
}

/// One GPS point of a workout route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_accuracy: Option<f64>,
}

/// One workout file, keyed by UUID and placed in the day directory matching
/// its local start date. `route` is absent for indoor workouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub uuid: Uuid,
    pub activity_type: String,
    #[serde(with = "timestamp")]
    pub start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end: DateTime<Utc>,
    pub duration_s: f64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(with = "timestamp")]
    pub synced_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<BTreeMap<String, serde_json::Value>>,
    pub stats: BTreeMap<String, WorkoutStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Vec<RoutePoint>>,
}

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of calendar days in the range, inclusive.
    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// Iterate every date in the range in order.
    pub fn days(&self) -> DateRangeIter {
        DateRangeIter {
            next: if self.from <= self.to {
                Some(self.from)
            } else {
                None
            },
            last: self.to,
        }
    }
}

/// Iterator over the dates of a [`DateRange`].
#[derive(Debug, Clone)]
pub struct DateRangeIter {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for DateRangeIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = if current < self.last {
            current.succ_opt()
        } else {
            None
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamp_round_trips_canonical_form() {
        let json = r#"{"start":"2026-01-15T08:30:00.000Z","end":"2026-01-15T08:35:00.288Z","value":412.0,"unit":"count","type":"step-count","source":"Apple Watch"}"#;
        let sample: QuantitySample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.value, 412.0);

        let back = serde_json::to_string(&sample).unwrap();
        assert!(back.contains("\"2026-01-15T08:30:00.000Z\""));
        assert!(back.contains("\"2026-01-15T08:35:00.288Z\""));

        // Serializing twice is byte-stable.
        let reparsed: QuantitySample = serde_json::from_str(&back).unwrap();
        assert_eq!(serde_json::to_string(&reparsed).unwrap(), back);
    }

    #[test]
    fn timestamp_accepts_offset_form() {
        let sample: QuantitySample = serde_json::from_str(
            r#"{"start":"2026-01-15T08:30:00+00:00","end":"2026-01-15T09:30:00+00:00","value":1.0,"unit":"count","type":"step-count","source":"iPhone"}"#,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_string(&sample)
                .unwrap()
                .matches("2026-01-15T08:30:00.000Z")
                .count(),
            1
        );
    }

    #[test]
    fn sample_variants_disambiguate_on_value_type() {
        let quantity: Sample = serde_json::from_str(
            r#"{"start":"2026-01-15T08:00:00.000Z","end":"2026-01-15T08:05:00.000Z","value":62.0,"unit":"count/min","type":"heart-rate","source":"Apple Watch"}"#,
        )
        .unwrap();
        assert_eq!(quantity.quantity_value(), Some(62.0));
        assert_eq!(quantity.category_value(), None);

        let category: Sample = serde_json::from_str(
            r#"{"start":"2026-01-15T22:00:00.000Z","end":"2026-01-15T23:30:00.000Z","value":"asleepCore","type":"sleep-analysis","source":"Apple Watch","metadata":{"timezone":"UTC"}}"#,
        )
        .unwrap();
        assert_eq!(category.category_value(), Some("asleepCore"));
        assert_eq!(category.quantity_value(), None);
    }

    #[test]
    fn metric_day_parses_and_sorts() {
        let json = r#"{
            "date": "2026-01-15",
            "type": "step-count",
            "timezone": "Europe/London",
            "unit": "count",
            "samples": [
                {"start":"2026-01-15T10:00:00.000Z","end":"2026-01-15T10:10:00.000Z","value":80.0,"unit":"count","type":"step-count","source":"b-phone"},
                {"start":"2026-01-15T09:00:00.000Z","end":"2026-01-15T09:10:00.000Z","value":120.0,"unit":"count","type":"step-count","source":"a-watch"}
            ]
        }"#;
        let mut day: MetricDay = serde_json::from_str(json).unwrap();
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(day.metric_type, "step-count");

        day.sort_samples();
        assert_eq!(day.samples[0].source(), "a-watch");
        assert_eq!(day.samples[1].source(), "b-phone");
    }

    #[test]
    fn workout_parses_with_and_without_route() {
        let indoor = r#"{
            "uuid": "5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7b",
            "activity_type": "functionalStrengthTraining",
            "start": "2026-01-15T18:00:00.000Z",
            "end": "2026-01-15T18:45:00.000Z",
            "duration_s": 2700.0,
            "source": "Apple Watch",
            "synced_at": "2026-01-16T07:00:00.000Z",
            "stats": {"active_energy": {"value": 310.5, "unit": "kcal"}}
        }"#;
        let workout: Workout = serde_json::from_str(indoor).unwrap();
        assert!(workout.route.is_none());
        assert_eq!(workout.stats["active_energy"].unit, "kcal");

        let outdoor = r#"{
            "uuid": "5d2c5b4e-8c7a-4f3e-9b1a-2d3c4e5f6a7c",
            "activity_type": "running",
            "start": "2026-01-15T07:00:00.000Z",
            "end": "2026-01-15T07:30:00.000Z",
            "duration_s": 1800.0,
            "source": "Apple Watch",
            "synced_at": "2026-01-15T08:00:00.000Z",
            "stats": {"distance": {"value": 5.1, "unit": "km"}},
            "route": [
                {"timestamp": "2026-01-15T07:00:01.000Z", "lat": 51.5007, "lon": -0.1246, "altitude": 11.2, "speed": 2.9}
            ]
        }"#;
        let workout: Workout = serde_json::from_str(outdoor).unwrap();
        let route = workout.route.as_ref().unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route[0].lat, 51.5007);
        assert!(route[0].course.is_none());
    }

    #[test]
    fn sleep_stage_mapping() {
        assert_eq!(SleepStage::from_value("asleepREM"), SleepStage::AsleepRem);
        assert_eq!(SleepStage::from_value("inBed"), SleepStage::InBed);
        assert_eq!(SleepStage::from_value("mystery"), SleepStage::Unknown);
        assert!(SleepStage::AsleepDeep.is_asleep());
        assert!(!SleepStage::Awake.is_asleep());
        assert!(!SleepStage::InBed.is_asleep());
    }

    #[test]
    fn date_range_iteration() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 30).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
        );
        assert_eq!(range.len_days(), 4);
        let dates: Vec<_> = range.days().collect();
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[3], NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
        assert!(range.contains(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()));
    }
}
