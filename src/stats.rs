//! Statistics helpers for daily series
//!
//! All functions operate on plain `f64` slices or date-keyed maps and return
//! `Option` when the input is too small to be meaningful. Standard deviation
//! is the population form throughout.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation; `None` below 2 values.
pub fn stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Coefficient of variation (stdev / mean); `None` when mean is 0.
pub fn cv(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let s = stdev(values)?;
    if m == 0.0 {
        return None;
    }
    Some(s / m)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// Interpolated percentile summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

pub fn percentiles(values: &[f64]) -> Option<Percentiles> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let lerp = |p: f64| {
        let k = (sorted.len() - 1) as f64 * p;
        let f = k.floor() as usize;
        let c = f + 1;
        if c >= sorted.len() {
            sorted[f]
        } else {
            sorted[f] + (k - f as f64) * (sorted[c] - sorted[f])
        }
    };
    Some(Percentiles {
        p10: round2(lerp(0.10)),
        p25: round2(lerp(0.25)),
        p75: round2(lerp(0.75)),
        p90: round2(lerp(0.90)),
    })
}

/// A value paired with the date it occurred on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

pub fn min_with_date(points: &BTreeMap<NaiveDate, f64>) -> Option<DatedValue> {
    points
        .iter()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(date, value)| DatedValue {
            date: *date,
            value: *value,
        })
}

pub fn max_with_date(points: &BTreeMap<NaiveDate, f64>) -> Option<DatedValue> {
    points
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(date, value)| DatedValue {
            date: *date,
            value: *value,
        })
}

/// Rolling mean; `None` at positions with fewer than `window` values behind them.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let chunk = &values[i + 1 - window..=i];
                Some(round2(chunk.iter().sum::<f64>() / chunk.len() as f64))
            }
        })
        .collect()
}

/// Least-squares fit of `y = slope * index + intercept`; `None` below 2 values.
pub fn linear_regression(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;
    let num: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| (i as f64 - x_mean) * (y - y_mean))
        .sum();
    let den: f64 = (0..n).map(|i| (i as f64 - x_mean).powi(2)).sum();
    if den == 0.0 {
        return Some((0.0, y_mean));
    }
    let slope = num / den;
    Some((slope, y_mean - slope * x_mean))
}

/// Direction a series is heading, from its regression slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Slope plus direction. Direction is `Flat` unless the fitted change over
/// the whole series exceeds 5% of the series mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub slope: f64,
    pub direction: TrendDirection,
}

pub fn trend_of(values: &[f64]) -> Option<Trend> {
    let (slope, _) = linear_regression(values)?;
    let m = mean(values)?;
    let direction = if m == 0.0 || (slope * values.len() as f64).abs() / m.abs() <= 0.05 {
        TrendDirection::Flat
    } else if slope > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };
    Some(Trend {
        slope: round_to(slope, 4),
        direction,
    })
}

/// Mean per weekday, in Mon..Sun order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOfWeekMeans {
    #[serde(rename = "Mon")]
    pub mon: Option<f64>,
    #[serde(rename = "Tue")]
    pub tue: Option<f64>,
    #[serde(rename = "Wed")]
    pub wed: Option<f64>,
    #[serde(rename = "Thu")]
    pub thu: Option<f64>,
    #[serde(rename = "Fri")]
    pub fri: Option<f64>,
    #[serde(rename = "Sat")]
    pub sat: Option<f64>,
    #[serde(rename = "Sun")]
    pub sun: Option<f64>,
}

pub fn day_of_week_means(points: &BTreeMap<NaiveDate, f64>) -> DayOfWeekMeans {
    let mut buckets: [Vec<f64>; 7] = Default::default();
    for (date, value) in points {
        buckets[date.weekday().num_days_from_monday() as usize].push(*value);
    }
    let avg = |bucket: &Vec<f64>| mean(bucket).map(round2);
    DayOfWeekMeans {
        mon: avg(&buckets[0]),
        tue: avg(&buckets[1]),
        wed: avg(&buckets[2]),
        thu: avg(&buckets[3]),
        fri: avg(&buckets[4]),
        sat: avg(&buckets[5]),
        sun: avg(&buckets[6]),
    }
}

/// One histogram bin over a value range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub from: f64,
    pub to: f64,
    pub count: usize,
}

/// Equal-width histogram. A constant series collapses to one bin.
pub fn distribution_bins(values: &[f64], n_bins: usize) -> Option<Vec<Bin>> {
    if values.is_empty() || n_bins == 0 {
        return None;
    }
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        return Some(vec![Bin {
            from: round2(lo),
            to: round2(hi),
            count: values.len(),
        }]);
    }
    let width = (hi - lo) / n_bins as f64;
    Some(
        (0..n_bins)
            .map(|i| {
                let from = lo + i as f64 * width;
                let to = lo + (i + 1) as f64 * width;
                let last = i == n_bins - 1;
                let count = values
                    .iter()
                    .filter(|&&v| (from <= v && v < to) || (last && v == to))
                    .count();
                Bin {
                    from: round2(from),
                    to: round2(to),
                    count,
                }
            })
            .collect(),
    )
}

/// Longest run of consecutive calendar days with `value >= threshold`.
pub fn longest_streak(points: &BTreeMap<NaiveDate, f64>, threshold: f64) -> usize {
    let mut best = 0usize;
    let mut current = 0usize;
    let mut prev: Option<NaiveDate> = None;
    for (date, value) in points {
        if *value >= threshold {
            current = match prev {
                Some(p) if (*date - p).num_days() == 1 => current + 1,
                _ => 1,
            };
        } else {
            current = 0;
        }
        best = best.max(current);
        prev = Some(*date);
    }
    best
}

/// Pearson correlation with an approximate two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub r: f64,
    pub p: f64,
    pub n: usize,
}

/// Pearson r over two equal-length slices. Degenerate inputs (fewer than two
/// points, or a zero-variance side) report `r = 0, p = 1`.
pub fn pearson(x: &[f64], y: &[f64]) -> Correlation {
    let n = x.len().min(y.len());
    if n < 2 {
        return Correlation { r: 0.0, p: 1.0, n };
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    let cov = x[..n]
        .iter()
        .zip(&y[..n])
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum::<f64>()
        / n as f64;
    let std_x = (x[..n].iter().map(|xi| (xi - mean_x).powi(2)).sum::<f64>() / n as f64).sqrt();
    let std_y = (y[..n].iter().map(|yi| (yi - mean_y).powi(2)).sum::<f64>() / n as f64).sqrt();
    if std_x == 0.0 || std_y == 0.0 {
        return Correlation { r: 0.0, p: 1.0, n };
    }
    let r = (cov / (std_x * std_y)).clamp(-1.0, 1.0);
    if r.abs() >= 1.0 {
        return Correlation {
            r: round_to(r, 4),
            p: 0.0,
            n,
        };
    }
    // t-statistic mapped through a cheap exponential approximation of the
    // two-sided tail; good to ~2 decimal places for n in the tens.
    let t = r * ((n - 2) as f64 / (1.0 - r * r)).sqrt();
    let p = if t.abs() < 6.0 {
        (-0.717 * t.abs() - 0.416 * t * t).exp()
    } else {
        0.0
    };
    Correlation {
        r: round_to(r, 4),
        p: round_to(p, 4),
        n,
    }
}

/// First-half vs second-half averages of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub first_half_avg: f64,
    pub second_half_avg: f64,
    pub change_pct: f64,
}

/// Comprehensive per-metric summary over a daily series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub n: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub stdev: Option<f64>,
    pub cv: Option<f64>,
    pub percentiles: Option<Percentiles>,
    pub min: Option<DatedValue>,
    pub max: Option<DatedValue>,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub rolling_7d: Vec<Option<f64>>,
    pub rolling_30d: Vec<Option<f64>>,
    pub trend_slope: Option<f64>,
    pub trend_direction: Option<TrendDirection>,
    pub day_of_week: DayOfWeekMeans,
    pub distribution: Option<Vec<Bin>>,
    pub period_comparison: Option<PeriodComparison>,
}

pub fn metric_stats(points: &BTreeMap<NaiveDate, f64>) -> MetricStats {
    let dates: Vec<NaiveDate> = points.keys().copied().collect();
    let values: Vec<f64> = points.values().copied().collect();
    let n = values.len();

    let trend = trend_of(&values);

    // Half-over-half comparison needs at least two points per half.
    let period_comparison = if n >= 4 {
        let mid = n / 2;
        let fh = mean(&values[..mid]);
        let sh = mean(&values[mid..]);
        match (fh, sh) {
            (Some(fh), Some(sh)) => {
                let change_pct = if fh != 0.0 {
                    round_to((sh - fh) / fh.abs() * 100.0, 1)
                } else {
                    0.0
                };
                Some(PeriodComparison {
                    first_half_avg: round2(fh),
                    second_half_avg: round2(sh),
                    change_pct,
                })
            }
            _ => None,
        }
    } else {
        None
    };

    MetricStats {
        n,
        mean: mean(&values).map(round2),
        median: median(&values).map(round2),
        stdev: stdev(&values).map(round2),
        cv: cv(&values).map(round2),
        percentiles: percentiles(&values),
        min: min_with_date(points),
        max: max_with_date(points),
        dates,
        values: values.iter().map(|v| round2(*v)).collect(),
        rolling_7d: rolling_mean(&values, 7),
        rolling_30d: rolling_mean(&values, 30),
        trend_slope: trend.map(|t| t.slope),
        trend_direction: trend.map(|t| t.direction),
        day_of_week: day_of_week_means(points),
        distribution: distribution_bins(&values, 10),
        period_comparison,
    }
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
