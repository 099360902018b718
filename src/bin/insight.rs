//! Insight CLI - command-line interface for MyLifeDB Insight
//!
//! Commands:
//! - discover: inventory a data tree (metrics, coverage, gaps, workouts)
//! - analyze: run one analysis mode and print its report
//! - series: dump a normalized sample stream as NDJSON
//!
//! Output is JSON on stdout, always. Fatal errors print `{"error": ...}`
//! and exit nonzero.

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use mylifedb_insight::analysis::AnalysisEngine;
use mylifedb_insight::config::{parse_date, parse_period, QueryWindow};
use mylifedb_insight::discovery::DiscoveryEngine;
use mylifedb_insight::error::InsightError;
use mylifedb_insight::normalizer::Normalizer;
use mylifedb_insight::report::ReportEmitter;
use mylifedb_insight::store::RecordStore;
use mylifedb_insight::types::DateRange;
use mylifedb_insight::INSIGHT_VERSION;

/// Insight - analysis core for MyLifeDB Apple Health exports
#[derive(Parser)]
#[command(name = "insight")]
#[command(author = "MyLifeDB")]
#[command(version = INSIGHT_VERSION)]
#[command(about = "Discover and analyze MyLifeDB health data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inventory a data tree: metrics, coverage, gaps, devices, workouts
    Discover {
        /// Path to the data directory (contains YYYY/MM/DD/*.json)
        data_dir: PathBuf,
    },

    /// Run one analysis mode and print its report
    Analyze {
        /// Path to the data directory
        data_dir: PathBuf,

        /// Analysis mode
        #[arg(long, value_enum)]
        mode: Mode,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Alternative to --from/--to: last N days, e.g. 30d
        #[arg(long, default_value = "30d")]
        period: String,

        /// For correlate mode: target metric name
        #[arg(long)]
        target: Option<String>,

        /// For correlate mode: comma-separated lag days
        #[arg(long, default_value = "0,1,2,3")]
        lag: String,

        /// For compare mode: first period (YYYY-MM)
        #[arg(long)]
        p1: Option<String>,

        /// For compare mode: second period (YYYY-MM)
        #[arg(long)]
        p2: Option<String>,

        /// For yearly mode: year (YYYY)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Dump the normalized sample stream for one metric as NDJSON
    Series {
        /// Path to the data directory
        data_dir: PathBuf,

        /// Metric file stem, e.g. step-count
        #[arg(long)]
        metric: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Alternative to --from/--to: last N days, e.g. 30d
        #[arg(long, default_value = "30d")]
        period: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Quick overview: trends, anomalies, correlations, consistency
    Scan,
    /// Sleep deep-dive: nightly totals, stages, bedtime variance
    Sleep,
    /// Steps, calories, exercise, distance
    Activity,
    /// Resting HR, HRV, walking HR
    Heart,
    /// Cross-metric correlation with time lag
    Correlate,
    /// Two-period side-by-side comparison
    Compare,
    /// 12-month annual summary
    Yearly,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Discover { data_dir } => cmd_discover(&data_dir),
        Commands::Analyze {
            data_dir,
            mode,
            from,
            to,
            period,
            target,
            lag,
            p1,
            p2,
            year,
        } => cmd_analyze(
            &data_dir,
            mode,
            from.as_deref(),
            to.as_deref(),
            &period,
            target.as_deref(),
            &lag,
            p1.as_deref(),
            p2.as_deref(),
            year,
        ),
        Commands::Series {
            data_dir,
            metric,
            from,
            to,
            period,
        } => cmd_series(&data_dir, &metric, from.as_deref(), to.as_deref(), &period),
    }
}

fn cmd_discover(data_dir: &PathBuf) -> Result<(), CliError> {
    let store = RecordStore::open(data_dir)?;
    let inventory = DiscoveryEngine::scan(&store);
    let emitter = ReportEmitter::new();
    println!("{}", emitter.emit("discovery", &inventory)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    data_dir: &PathBuf,
    mode: Mode,
    from: Option<&str>,
    to: Option<&str>,
    period: &str,
    target: Option<&str>,
    lag: &str,
    p1: Option<&str>,
    p2: Option<&str>,
    year: Option<i32>,
) -> Result<(), CliError> {
    let store = RecordStore::open(data_dir)?;
    let engine = AnalysisEngine::new(&store);
    let emitter = ReportEmitter::new();
    let today = chrono::Utc::now().date_naive();

    let resolve = || -> Result<DateRange, CliError> {
        let window = build_window(from, to, period)?;
        Ok(window.resolve(&store, today))
    };

    let json = match mode {
        Mode::Scan => emitter.emit("scan", engine.scan(resolve()?))?,
        Mode::Sleep => emitter.emit("sleep", engine.sleep(resolve()?))?,
        Mode::Activity => emitter.emit("activity", engine.activity(resolve()?))?,
        Mode::Heart => emitter.emit("heart", engine.heart(resolve()?))?,
        Mode::Correlate => {
            let target = target.ok_or(CliError::MissingArg("correlate mode requires --target"))?;
            let lags = parse_lags(lag)?;
            emitter.emit("correlate", engine.correlate(resolve()?, target, &lags)?)?
        }
        Mode::Compare => {
            let (p1, p2) = match (p1, p2) {
                (Some(p1), Some(p2)) => (p1, p2),
                _ => {
                    return Err(CliError::MissingArg(
                        "compare mode requires --p1 and --p2 (YYYY-MM)",
                    ))
                }
            };
            emitter.emit("compare", engine.compare(p1, p2)?)?
        }
        Mode::Yearly => {
            let year = year.ok_or(CliError::MissingArg("yearly mode requires --year (YYYY)"))?;
            emitter.emit("yearly", engine.yearly(year)?)?
        }
    };

    println!("{json}");
    Ok(())
}

fn cmd_series(
    data_dir: &PathBuf,
    metric: &str,
    from: Option<&str>,
    to: Option<&str>,
    period: &str,
) -> Result<(), CliError> {
    let store = RecordStore::open(data_dir)?;
    let today = chrono::Utc::now().date_naive();
    let range = build_window(from, to, period)?.resolve(&store, today);

    let normalizer = Normalizer::new(&store);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut stream = normalizer.series(metric, range);
    for sample in stream.by_ref() {
        writeln!(
            out,
            "{}",
            serde_json::to_string(&sample).map_err(InsightError::from)?
        )?;
    }
    for warning in stream.warnings() {
        tracing::warn!(path = %warning.path.display(), reason = %warning.reason, "skipped file");
    }
    Ok(())
}

fn build_window(
    from: Option<&str>,
    to: Option<&str>,
    period: &str,
) -> Result<QueryWindow, CliError> {
    Ok(QueryWindow {
        from: from.map(parse_date).transpose()?,
        to: to.map(parse_date).transpose()?,
        period_days: Some(parse_period(period)?),
    })
}

fn parse_lags(raw: &str) -> Result<Vec<i64>, CliError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| CliError::MissingArg("lag list must be comma-separated integers"))
        })
        .collect()
}

// Error types

#[derive(Debug)]
enum CliError {
    Insight(InsightError),
    Io(io::Error),
    MissingArg(&'static str),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Insight(e) => write!(f, "{e}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
            CliError::MissingArg(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<InsightError> for CliError {
    fn from(e: InsightError) -> Self {
        CliError::Insight(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
