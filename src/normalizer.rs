//! Sample normalization
//!
//! This module turns raw per-day metric files into analysis-ready series:
//! - source dedup for additive metrics (wearable coverage wins over phone)
//! - per-file timezone resolution for local day assignment
//! - a lazy sample stream and per-day aggregate maps

use crate::device::DeviceClass;
use crate::store::{RecordStore, ScanWarning};
use crate::types::{DateRange, MetricDay, Sample};
use crate::tz;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// How a metric's samples combine into one value per day.
///
/// The metric universe is open-ended; anything not recognized below
/// aggregates by daily mean, so unknown metric names still analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Daily total = sum of samples, after source dedup.
    Sum,
    /// Typically one sample per day; daily value = mean.
    Single,
    /// Multi-sample metrics; daily value = mean, no dedup.
    Mean,
}

impl Aggregation {
    pub fn for_metric(metric: &str) -> Self {
        match metric {
            "step-count"
            | "active-energy-burned"
            | "basal-energy-burned"
            | "distance-walking-running"
            | "flights-climbed"
            | "apple-exercise-time"
            | "apple-stand-time" => Aggregation::Sum,
            "resting-heart-rate" | "walking-heart-rate-average" => Aggregation::Single,
            _ => Aggregation::Mean,
        }
    }
}

/// One normalized sample as yielded by [`SampleStream`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSample {
    #[serde(with = "crate::types::timestamp")]
    pub start: DateTime<Utc>,
    #[serde(with = "crate::types::timestamp")]
    pub end: DateTime<Utc>,
    /// Calendar date in the sample's own declared timezone.
    pub local_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// A deduplicated per-day aggregate for one metric.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    pub metric: String,
    pub points: BTreeMap<NaiveDate, f64>,
    pub warnings: Vec<ScanWarning>,
}

impl DailySeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Normalizer over a record store.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    store: &'a RecordStore,
}

impl<'a> Normalizer<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Lazy, restartable stream of normalized samples for `metric` over
    /// `range`, sorted by `(start, end, source)` within each day. Days are
    /// loaded one at a time as the stream is consumed; calling `series`
    /// again yields a fresh stream over the same snapshot.
    pub fn series(&self, metric: &str, range: DateRange) -> SampleStream<'a> {
        SampleStream {
            store: self.store,
            metric: metric.to_string(),
            dedup: Aggregation::for_metric(metric) == Aggregation::Sum,
            days: range.days(),
            buffer: VecDeque::new(),
            warnings: Vec::new(),
        }
    }

    /// Per-day aggregate map for `metric` over `range`, using the metric's
    /// aggregation class. Sum metrics record a total for every loaded day
    /// (including zero); mean metrics skip days with no numeric samples.
    pub fn daily(&self, metric: &str, range: &DateRange) -> DailySeries {
        let scan = self.store.metric_days(metric, range);
        let aggregation = Aggregation::for_metric(metric);
        let mut points = BTreeMap::new();

        for day in &scan.days {
            match aggregation {
                Aggregation::Sum => {
                    let total: f64 = dedup_overlapping(&day.samples)
                        .iter()
                        .filter_map(|s| s.quantity_value())
                        .sum();
                    points.insert(day.date, total);
                }
                Aggregation::Single | Aggregation::Mean => {
                    let values: Vec<f64> = day
                        .samples
                        .iter()
                        .filter_map(Sample::quantity_value)
                        .collect();
                    if let Some(m) = crate::stats::mean(&values) {
                        points.insert(day.date, m);
                    }
                }
            }
        }

        DailySeries {
            metric: metric.to_string(),
            points,
            warnings: scan.warnings,
        }
    }
}

/// Drop non-wearable samples whose window overlaps any wearable interval.
///
/// With no wearable samples present everything is kept; wearable samples are
/// never dropped. Returns borrowed samples in wearable-first order; callers
/// needing the file ordering must re-sort.
pub fn dedup_overlapping(samples: &[Sample]) -> Vec<&Sample> {
    let (wearable, other): (Vec<&Sample>, Vec<&Sample>) = samples
        .iter()
        .partition(|s| DeviceClass::is_wearable(s.device()));

    if wearable.is_empty() {
        return samples.iter().collect();
    }

    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        wearable.iter().map(|s| (s.start(), s.end())).collect();
    intervals.sort();

    let mut kept = wearable;
    for sample in other {
        let overlaps = intervals
            .iter()
            .any(|(w_start, w_end)| sample.start() < *w_end && sample.end() > *w_start);
        if !overlaps {
            kept.push(sample);
        }
    }
    kept
}

/// Day-buffered iterator over normalized samples. See [`Normalizer::series`].
pub struct SampleStream<'a> {
    store: &'a RecordStore,
    metric: String,
    dedup: bool,
    days: crate::types::DateRangeIter,
    buffer: VecDeque<NormalizedSample>,
    warnings: Vec<ScanWarning>,
}

impl SampleStream<'_> {
    /// Warnings accumulated so far (complete once the stream is exhausted).
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    fn normalize_day(&self, day: &MetricDay) -> Vec<NormalizedSample> {
        let file_unit = day.unit.clone();
        let kept: Vec<&Sample> = if self.dedup {
            dedup_overlapping(&day.samples)
        } else {
            day.samples.iter().collect()
        };

        let mut normalized: Vec<NormalizedSample> = kept
            .into_iter()
            .map(|sample| NormalizedSample {
                start: sample.start(),
                end: sample.end(),
                local_date: tz::local_date(sample.start(), &day.timezone),
                value: sample.quantity_value(),
                category: sample.category_value().map(str::to_string),
                unit: match sample {
                    Sample::Quantity(q) => Some(q.unit.clone()),
                    Sample::Category(_) => file_unit.clone(),
                },
                source: sample.source().to_string(),
                device: sample.device().map(str::to_string),
            })
            .collect();

        // Restore the file-format ordering after dedup reshuffling.
        normalized.sort_by(|a, b| {
            (a.start, a.end, &a.source).cmp(&(b.start, b.end, &b.source))
        });
        normalized
    }
}

impl Iterator for SampleStream<'_> {
    type Item = NormalizedSample;

    fn next(&mut self) -> Option<NormalizedSample> {
        loop {
            if let Some(sample) = self.buffer.pop_front() {
                return Some(sample);
            }
            let date = self.days.next()?;
            match self.store.metric_day(&self.metric, date) {
                Ok(Some(day)) => self.buffer.extend(self.normalize_day(&day)),
                Ok(None) => {}
                Err(crate::error::InsightError::MalformedRecord { path, reason }) => {
                    self.warnings.push(ScanWarning { path, reason });
                }
                Err(_) => {}
            }
        }
    }
}
