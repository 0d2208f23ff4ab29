use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use engine::{
    Benchmarker, MemoryStore, ProgressSink, RateEvent, RunConfig, RunSummary, SeriesStore,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "seriesload",
    version,
    about = "Synthetic time-series write load generator"
)]
struct Cli {
    /// Mean simulated seconds between observations of one series.
    #[arg(long, default_value_t = 1)]
    interval: u32,
    /// Wall-clock run duration in seconds.
    #[arg(long, default_value_t = 10)]
    duration: u32,
    /// Acceleration factor mapping wall-clock time to simulated time.
    #[arg(long, default_value_t = 1)]
    acceleration: u32,
    /// Number of worker threads.
    #[arg(long, default_value_t = 1)]
    threads: u32,
    /// Total number of simulated time series.
    #[arg(long, default_value_t = 100)]
    series: u32,
    /// RNG seed for deterministic results.
    #[arg(long)]
    seed: Option<u64>,
    /// Pre-fill storage blocks with sentinel records (real-time mode).
    #[arg(long)]
    prime: bool,
    /// Block capacity advertised by the in-memory backend.
    #[arg(long, default_value_t = 1_000)]
    max_block_entries: usize,
    /// Optional output directory for summary.json.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Fail if underflow warnings fire on more than this many samples.
    #[arg(long)]
    max_underflow_seconds: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = RunConfig {
        interval_between_observations_secs: cli.interval,
        run_duration_secs: cli.duration,
        acceleration_factor: cli.acceleration,
        thread_count: cli.threads,
        series_count: cli.series,
        ..RunConfig::default()
    };
    let benchmarker = match cli.seed {
        Some(seed) => Benchmarker::with_seed(config, seed),
        None => Benchmarker::new(config),
    }
    .context("configure benchmark run")?
    .prime_blocks(cli.prime);

    let store = Arc::new(MemoryStore::new().with_max_block_entries(cli.max_block_entries));
    let mut sink = ConsoleSink::default();
    let summary = benchmarker
        .run(Arc::clone(&store) as Arc<dyn SeriesStore>, &mut sink)
        .context("benchmark run")?;

    println!(
        "Total updates : {}, Average thread run time : {} ms",
        summary.total_update_count, summary.average_thread_run_time_ms
    );

    let report = Report::new(&benchmarker, &summary, &sink);
    if let Some(out_dir) = &cli.out_dir {
        write_summary_json(out_dir, &report)?;
    }
    if let Some(budget) = cli.max_underflow_seconds {
        if sink.underflow_seconds > budget {
            anyhow::bail!(
                "underflow on {} samples exceeds budget {}",
                sink.underflow_seconds,
                budget
            );
        }
    }

    Ok(())
}

/// Renders rate events as console lines, warnings prefixed with `!!!`.
#[derive(Debug, Default)]
struct ConsoleSink {
    underflow_seconds: usize,
}

impl ProgressSink for ConsoleSink {
    fn emit(&mut self, event: &RateEvent) {
        match event {
            RateEvent::ExpectedRates {
                updates_per_second,
                updates_per_second_per_series,
            } => {
                println!("Updates per second : {updates_per_second:.3}");
                println!(
                    "Updates per second per time series : {updates_per_second_per_series:.3}"
                );
            }
            RateEvent::HotKeyRisk {
                implied_rate,
                ceiling,
            } => {
                println!(
                    "!!! Single key updates per second rate {implied_rate:.3} \
                     exceeds max recommended rate {ceiling}"
                );
            }
            RateEvent::Status {
                elapsed_secs,
                update_count,
                actual_rate,
            } => {
                println!(
                    "Run time : {elapsed_secs} seconds, Update count : {update_count}, \
                     Actual updates per second : {actual_rate:.3}"
                );
            }
            RateEvent::Underflow {
                expected_rate,
                actual_rate,
            } => {
                self.underflow_seconds += 1;
                println!(
                    "!!! Update rate should be {expected_rate:.3}, \
                     actually {actual_rate:.3} - underflow"
                );
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    interval_between_observations_secs: u32,
    run_duration_secs: u32,
    acceleration_factor: u32,
    thread_count: u32,
    series_count: u32,
    expected_updates_per_second: f64,
    total_update_count: u64,
    average_thread_run_time_ms: u64,
    wall_time_ms: u64,
    actual_updates_per_second: f64,
    underflow_seconds: usize,
}

impl Report {
    fn new(benchmarker: &Benchmarker, summary: &RunSummary, sink: &ConsoleSink) -> Self {
        let config = benchmarker.config();
        let wall_secs = (summary.wall_time_ms as f64 / 1_000.0).max(f64::EPSILON);
        Self {
            seed: benchmarker.seed(),
            interval_between_observations_secs: config.interval_between_observations_secs,
            run_duration_secs: config.run_duration_secs,
            acceleration_factor: config.acceleration_factor,
            thread_count: config.thread_count,
            series_count: config.series_count,
            expected_updates_per_second: benchmarker.expected_updates_per_second(),
            total_update_count: summary.total_update_count,
            average_thread_run_time_ms: summary.average_thread_run_time_ms,
            wall_time_ms: summary.wall_time_ms,
            actual_updates_per_second: summary.total_update_count as f64 / wall_secs,
            underflow_seconds: sink.underflow_seconds,
        }
    }
}

fn write_summary_json(out_dir: &Path, report: &Report) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir {}", out_dir.display()))?;
    let path = out_dir.join("summary.json");
    let contents = serde_json::to_string_pretty(report).context("serialize summary")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
