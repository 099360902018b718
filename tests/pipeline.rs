//! End-to-end pipeline tests over an on-disk store fixture

use chrono::NaiveDate;
use mylifedb_insight::analysis::AnalysisEngine;
use mylifedb_insight::discovery::DiscoveryEngine;
use mylifedb_insight::error::InsightError;
use mylifedb_insight::normalizer::Normalizer;
use mylifedb_insight::report::ReportEmitter;
use mylifedb_insight::store::RecordStore;
use mylifedb_insight::types::{DateRange, MetricDay};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn day_dir(root: &Path, date: &str) -> std::path::PathBuf {
    let parts: Vec<&str> = date.split('-').collect();
    root.join(parts[0]).join(parts[1]).join(parts[2])
}

fn write_steps(root: &Path, date: &str, watch: f64, phone_overlap: f64) {
    let dir = day_dir(root, date);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("step-count.json"),
        format!(
            r#"{{"date":"{date}","type":"step-count","timezone":"Asia/Shanghai","unit":"count","samples":[
  {{"start":"{date}T01:00:00.000Z","end":"{date}T01:30:00.000Z","value":{watch},"unit":"count","type":"step-count","source":"Health","device":"Apple Watch Series 9"}},
  {{"start":"{date}T01:05:00.000Z","end":"{date}T01:25:00.000Z","value":{phone_overlap},"unit":"count","type":"step-count","source":"Health","device":"iPhone 15 Pro"}}
]}}"#
        ),
    )
    .unwrap();
}

fn write_rhr(root: &Path, date: &str, value: f64) {
    let dir = day_dir(root, date);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("resting-heart-rate.json"),
        format!(
            r#"{{"date":"{date}","type":"resting-heart-rate","timezone":"Asia/Shanghai","samples":[
  {{"start":"{date}T02:00:00.000Z","end":"{date}T02:00:00.000Z","value":{value},"unit":"count/min","type":"resting-heart-rate","source":"Health","device":"Apple Watch Series 9"}}
]}}"#
        ),
    )
    .unwrap();
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    for day in 1..=14u32 {
        let d = format!("2026-01-{day:02}");
        write_steps(tmp.path(), &d, 4_000.0 + 100.0 * day as f64, 3_900.0);
        write_rhr(tmp.path(), &d, 52.0 + (day % 3) as f64);
    }
    tmp
}

#[test]
fn discover_then_analyze_full_pass() {
    let tmp = fixture();
    let store = RecordStore::open(tmp.path()).unwrap();

    let inventory = DiscoveryEngine::scan(&store);
    assert_eq!(inventory.total_days, 14);
    assert_eq!(inventory.metrics.len(), 2);
    assert!(inventory.gaps.is_empty());
    assert!(inventory.devices.contains("Apple Watch Series 9"));
    assert!(inventory.ensure_metric("step-count").is_ok());

    let engine = AnalysisEngine::new(&store);
    let range = DateRange::new(date("2026-01-01"), date("2026-01-14"));

    // Dedup drops the overlapping phone sample on every day.
    let normalizer = Normalizer::new(&store);
    let daily = normalizer.daily("step-count", &range);
    assert_eq!(daily.points[&date("2026-01-01")], 4_100.0);
    assert_eq!(daily.points[&date("2026-01-14")], 5_400.0);

    let scan = engine.scan(range);
    let steps = scan
        .metrics
        .iter()
        .find(|m| m.metric == "step-count")
        .unwrap();
    assert_eq!(steps.stats.n, 14);
    // 4100 -> 5400 is a ~28% half-over-half rise: alerted.
    assert!(scan
        .trend_alerts
        .iter()
        .any(|a| a.metric == "step-count"));

    // Correlate validates targets against the inventory.
    let err = engine
        .correlate(range, "nonexistent-metric", &[0, 1])
        .unwrap_err();
    assert!(matches!(err, InsightError::UnknownMetric(_)));
    assert_eq!(
        ReportEmitter::error_json(&err),
        r#"{"error":"Unknown metric: nonexistent-metric"}"#
    );

    let correlate = engine
        .correlate(range, "step-count", &[0, 1])
        .unwrap();
    assert!(!correlate.correlations.is_empty());
    assert_eq!(correlate.correlations[0].metric_a, "step-count");
}

#[test]
fn series_stream_is_deduped_sorted_and_restartable() {
    let tmp = fixture();
    let store = RecordStore::open(tmp.path()).unwrap();
    let normalizer = Normalizer::new(&store);
    let range = DateRange::new(date("2026-01-01"), date("2026-01-14"));

    let samples: Vec<_> = normalizer.series("step-count", range).collect();
    // One watch sample per day survives; overlapping phone samples are gone.
    assert_eq!(samples.len(), 14);
    assert!(samples.iter().all(|s| s.device.as_deref() == Some("Apple Watch Series 9")));
    assert!(samples.windows(2).all(|w| w[0].start <= w[1].start));

    // 01:00Z is 09:00 in Asia/Shanghai: same local date as the file.
    assert_eq!(samples[0].local_date, date("2026-01-01"));

    let replay: Vec<_> = normalizer.series("step-count", range).collect();
    assert_eq!(samples, replay);
}

#[test]
fn reparse_and_reserialize_is_byte_stable() {
    let tmp = fixture();
    let path = day_dir(tmp.path(), "2026-01-03").join("step-count.json");
    let text = fs::read_to_string(&path).unwrap();

    let day: MetricDay = serde_json::from_str(&text).unwrap();
    let first = serde_json::to_string(&day).unwrap();
    let reparsed: MetricDay = serde_json::from_str(&first).unwrap();
    let second = serde_json::to_string(&reparsed).unwrap();

    assert_eq!(reparsed, day);
    assert_eq!(first, second);
}

#[test]
fn discovery_reports_one_day_gap() {
    let tmp = TempDir::new().unwrap();
    write_steps(tmp.path(), "2026-01-15", 8_000.0, 7_900.0);
    write_steps(tmp.path(), "2026-01-17", 9_000.0, 8_900.0);

    let store = RecordStore::open(tmp.path()).unwrap();
    let inventory = DiscoveryEngine::scan(&store);

    assert_eq!(inventory.gaps.len(), 1);
    assert_eq!(inventory.gaps[0].from, date("2026-01-16"));
    assert_eq!(inventory.gaps[0].to, date("2026-01-16"));
    assert_eq!(inventory.gaps[0].days, 1);
}

#[test]
fn discovery_report_serializes_deterministically() {
    let tmp = fixture();
    let store = RecordStore::open(tmp.path()).unwrap();
    let emitter = ReportEmitter::with_instance_id("test-run".to_string());

    let first = emitter
        .emit("discovery", DiscoveryEngine::scan(&store))
        .unwrap();
    let second = emitter
        .emit("discovery", DiscoveryEngine::scan(&store))
        .unwrap();
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(value["kind"], "discovery");
    assert_eq!(value["payload"]["total_days"], 14);
}
