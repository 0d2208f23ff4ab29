//! Spawns workers, monitors the run, and aggregates results.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use rand::RngCore;

use crate::config::RunConfig;
use crate::error::{EngineError, EngineResult};
use crate::monitor::{ProgressSink, RateMonitor};
use crate::store::SeriesStore;
use crate::worker::{
    BlockPrimer, NoPriming, RandomFillPrimer, SeriesWorker, WorkerHandle, WorkerReport,
};

/// Interval between monitor samples.
const MONITOR_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Aggregated results of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Total updates written across every worker.
    pub total_update_count: u64,
    /// Mean wall-clock run time of the workers, milliseconds.
    pub average_thread_run_time_ms: u64,
    /// Update count per worker, in spawn order.
    pub per_worker_update_counts: Vec<u64>,
    /// Wall-clock time of the whole run, milliseconds.
    pub wall_time_ms: u64,
}

/// Orchestrates one benchmark run.
///
/// Splits the series population across the configured number of workers as
/// evenly as possible, runs the rate monitor on the calling thread while
/// the workers write, and fails the whole run if any worker fails; a
/// partial result would misrepresent the achieved throughput.
#[derive(Debug)]
pub struct Benchmarker {
    config: RunConfig,
    seed: u64,
    prime_blocks: bool,
}

impl Benchmarker {
    /// Creates a benchmarker with a random seed.
    pub fn new(config: RunConfig) -> EngineResult<Self> {
        Self::with_seed(config, rand::thread_rng().next_u64())
    }

    /// Creates a benchmarker with an explicit seed; two runs built with
    /// the same seed and configuration produce identical series names,
    /// values, and update counts.
    pub fn with_seed(config: RunConfig, seed: u64) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            seed,
            prime_blocks: false,
        })
    }

    /// Enables block priming (the real-time variant): storage blocks are
    /// pre-filled with sentinel records and cleaned up after the run.
    #[must_use]
    pub const fn prime_blocks(mut self, enabled: bool) -> Self {
        self.prime_blocks = enabled;
        self
    }

    /// The seed this run was built with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The configuration this run was built with.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Theoretical update rate, per wall-clock second.
    #[must_use]
    pub fn expected_updates_per_second(&self) -> f64 {
        self.config.expected_updates_per_second()
    }

    /// Runs the benchmark to completion.
    ///
    /// Blocks until every worker finishes, sampling the shared counters
    /// once per second and reporting through `sink`.
    pub fn run(
        &self,
        store: Arc<dyn SeriesStore>,
        sink: &mut dyn ProgressSink,
    ) -> EngineResult<RunSummary> {
        let partitions = partition_series(
            self.config.series_count as usize,
            self.config.thread_count as usize,
        );
        debug!(
            "starting run: {} series over {} workers, seed {}",
            self.config.series_count, self.config.thread_count, self.seed
        );

        sink.emit(&crate::monitor::RateEvent::ExpectedRates {
            updates_per_second: self.config.expected_updates_per_second(),
            updates_per_second_per_series: self.config.expected_updates_per_second_per_series(),
        });
        if let Some(warning) = RateMonitor::hot_key_check(&self.config) {
            sink.emit(&warning);
        }

        let mut handles: Vec<Arc<WorkerHandle>> = Vec::with_capacity(partitions.len());
        let mut joins: Vec<thread::JoinHandle<EngineResult<WorkerReport>>> =
            Vec::with_capacity(partitions.len());
        let started = Instant::now();
        for (index, series_count) in partitions.into_iter().enumerate() {
            let primer: Box<dyn BlockPrimer> = if self.prime_blocks {
                Box::new(RandomFillPrimer)
            } else {
                Box::new(NoPriming)
            };
            let worker = SeriesWorker::new(
                self.config.clone(),
                index,
                series_count,
                derive_worker_seed(self.seed, index as u64),
                Arc::clone(&store),
                primer,
            );
            handles.push(worker.handle());
            let join = match thread::Builder::new()
                .name(format!("series-worker-{index}"))
                .spawn(move || worker.run())
            {
                Ok(join) => join,
                Err(source) => {
                    // Wait out the workers already started before reporting.
                    for join in joins {
                        let _ = join.join();
                    }
                    return Err(EngineError::WorkerSpawn {
                        worker: index,
                        source,
                    });
                }
            };
            joins.push(join);
        }

        let mut monitor = RateMonitor::new(self.config.expected_updates_per_second());
        loop {
            let total: u64 = handles.iter().map(|handle| handle.update_count()).sum();
            for event in monitor.sample(started.elapsed(), total) {
                sink.emit(&event);
            }
            // Threads that panicked never set their handle's finished
            // flag; the join handle always observes thread exit.
            if joins.iter().all(|join| join.is_finished()) {
                break;
            }
            thread::sleep(MONITOR_SAMPLE_INTERVAL);
        }

        let mut reports = Vec::with_capacity(joins.len());
        for (index, join) in joins.into_iter().enumerate() {
            let report = join
                .join()
                .map_err(|_| EngineError::WorkerPanicked { worker: index })??;
            reports.push(report);
        }

        let total_update_count = reports.iter().map(|report| report.update_count).sum();
        let average_thread_run_time_ms = reports
            .iter()
            .map(|report| report.run_time_ms)
            .sum::<u64>()
            / reports.len() as u64;
        Ok(RunSummary {
            total_update_count,
            average_thread_run_time_ms,
            per_worker_update_counts: reports.iter().map(|report| report.update_count).collect(),
            wall_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Splits `total` series across `workers` as evenly as possible, with the
/// remainder going to the first workers.
#[must_use]
pub(crate) fn partition_series(total: usize, workers: usize) -> Vec<usize> {
    let base = total / workers;
    let remainder = total % workers;
    (0..workers)
        .map(|index| base + usize::from(index < remainder))
        .collect()
}

/// Derives a per-worker seed from the master seed (splitmix64), so one
/// caller-supplied seed reproduces the entire run.
fn derive_worker_seed(master: u64, index: u64) -> u64 {
    let mut z = master
        .wrapping_add(1)
        .wrapping_add(index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::monitor::CollectingSink;
    use crate::store::MemoryStore;

    #[test]
    fn partition_even_split() {
        assert_eq!(partition_series(100, 5), vec![20, 20, 20, 20, 20]);
    }

    #[test]
    fn partition_remainder_goes_first() {
        assert_eq!(partition_series(7, 3), vec![3, 2, 2]);
        assert_eq!(partition_series(1, 3), vec![1, 0, 0]);
    }

    #[test]
    fn partition_preserves_total() {
        for total in [1, 13, 100, 997] {
            for workers in [1, 2, 3, 7, 16] {
                let parts = partition_series(total, workers);
                assert_eq!(parts.len(), workers);
                assert_eq!(parts.iter().sum::<usize>(), total);
            }
        }
    }

    #[test]
    fn derived_seeds_differ_per_worker() {
        let a = derive_worker_seed(42, 0);
        let b = derive_worker_seed(42, 1);
        let c = derive_worker_seed(43, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn derived_seeds_stable() {
        assert_eq!(derive_worker_seed(7, 3), derive_worker_seed(7, 3));
    }

    #[test]
    fn invalid_config_rejected_before_spawn() {
        let config = RunConfig {
            thread_count: 0,
            ..RunConfig::for_testing()
        };
        match Benchmarker::with_seed(config, 1) {
            Err(EngineError::Config(ConfigError::ZeroThreadCount)) => {}
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn worker_panic_surfaces_instead_of_hanging() {
        use crate::series::DataPoint;
        use crate::store::StoreResult;
        use std::collections::BTreeSet;

        struct PanickingStore;

        impl SeriesStore for PanickingStore {
            fn put(&self, _: &str, _: &[DataPoint]) -> StoreResult<()> {
                panic!("injected panic");
            }

            fn scan_all_series_names(&self) -> StoreResult<BTreeSet<String>> {
                Ok(BTreeSet::new())
            }

            fn max_block_entry_count(&self) -> usize {
                1
            }

            fn remove_sentinel_records(&self, _: &str) -> StoreResult<()> {
                Ok(())
            }
        }

        let config = RunConfig {
            run_duration_secs: 1,
            ..RunConfig::for_testing()
        };
        let benchmarker = Benchmarker::with_seed(config, 5).unwrap();
        let mut sink = CollectingSink::default();
        let result = benchmarker.run(Arc::new(PanickingStore), &mut sink);
        assert!(matches!(
            result,
            Err(EngineError::WorkerPanicked { worker: 0 })
        ));
    }

    #[test]
    fn store_failure_fails_the_run() {
        let config = RunConfig {
            run_duration_secs: 1,
            acceleration_factor: 10,
            series_count: 5,
            ..RunConfig::for_testing()
        };
        let store = Arc::new(MemoryStore::new().with_failure_after(8));
        let benchmarker = Benchmarker::with_seed(config, 3).unwrap();
        let mut sink = CollectingSink::default();
        let result = benchmarker.run(store, &mut sink);
        assert!(matches!(result, Err(EngineError::Store { .. })));
    }

    #[test]
    fn summary_totals_match_per_worker_counts() {
        let config = RunConfig {
            run_duration_secs: 1,
            acceleration_factor: 10,
            thread_count: 2,
            series_count: 6,
            ..RunConfig::for_testing()
        };
        let store = Arc::new(MemoryStore::new());
        let benchmarker = Benchmarker::with_seed(config, 11).unwrap();
        let mut sink = CollectingSink::default();
        let summary = benchmarker.run(store, &mut sink).unwrap();
        assert_eq!(summary.per_worker_update_counts.len(), 2);
        assert_eq!(
            summary.per_worker_update_counts.iter().sum::<u64>(),
            summary.total_update_count
        );
        assert!(summary.total_update_count > 0);
    }
}
