//! MyLifeDB Insight - analysis core for Apple Health exports in MyLifeDB format
//!
//! Insight reads a `YYYY/MM/DD/*.json` data tree and turns it into structured
//! reports through a deterministic pipeline: record store → normalizer →
//! {discovery | analysis} → report emitter.
//!
//! ## Modules
//!
//! - **Record Store**: typed, read-only access to per-day metric and workout files
//! - **Normalizer**: source dedup, timezone resolution, daily aggregation
//! - **Discovery**: inventory of metrics, coverage, gaps, devices, workouts
//! - **Analysis**: scan, sleep, activity, heart, correlate, compare, yearly
//! - **Report**: versioned, deterministic JSON envelopes for external renderers

pub mod analysis;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod normalizer;
pub mod report;
pub mod stats;
pub mod store;
pub mod types;
pub mod tz;

pub use analysis::AnalysisEngine;
pub use config::{AnalysisConfig, QueryWindow};
pub use discovery::{DiscoveryEngine, Inventory};
pub use error::InsightError;
pub use normalizer::Normalizer;
pub use report::ReportEmitter;
pub use store::RecordStore;

/// Crate version embedded in every report envelope
pub const INSIGHT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report envelopes
pub const PRODUCER_NAME: &str = "mylifedb-insight";
