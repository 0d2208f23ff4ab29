//! Worker owning a disjoint partition of the simulated series.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::clock::SimClock;
use crate::config::RunConfig;
use crate::error::{EngineError, EngineResult};
use crate::scheduler::ObservationScheduler;
use crate::series::{random_series_name, DataPoint, ObservationState};
use crate::store::SeriesStore;
use crate::value::SeriesValueSimulator;

/// Block priming and cleanup strategy.
///
/// The real-time variant pre-fills each series' storage block to a random
/// level before the run; if every block started empty they would all roll
/// over at the same moment, producing synchronized sawtooth I/O spikes.
/// Accelerated and deterministic runs use [`NoPriming`].
pub trait BlockPrimer: Send {
    /// Called once per series before the main loop.
    fn prime(
        &self,
        series: &str,
        store: &dyn SeriesStore,
        rng: &mut dyn RngCore,
    ) -> EngineResult<()>;

    /// Called once per series after the run completes.
    fn cleanup(&self, series: &str, store: &dyn SeriesStore) -> EngineResult<()>;
}

/// No-op priming for accelerated and deterministic runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPriming;

impl BlockPrimer for NoPriming {
    fn prime(&self, _: &str, _: &dyn SeriesStore, _: &mut dyn RngCore) -> EngineResult<()> {
        Ok(())
    }

    fn cleanup(&self, _: &str, _: &dyn SeriesStore) -> EngineResult<()> {
        Ok(())
    }
}

/// Fills each series' first block with sentinel records to a uniformly
/// random level, bounded by the backend's block capacity, and removes them
/// again in cleanup.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomFillPrimer;

impl BlockPrimer for RandomFillPrimer {
    fn prime(
        &self,
        series: &str,
        store: &dyn SeriesStore,
        rng: &mut dyn RngCore,
    ) -> EngineResult<()> {
        let fill = rng.gen_range(0..store.max_block_entry_count().max(1));
        let sentinels: Vec<DataPoint> = (0..fill).map(DataPoint::sentinel).collect();
        store
            .put(series, &sentinels)
            .map_err(|source| EngineError::Store {
                series: series.to_string(),
                source,
            })
    }

    fn cleanup(&self, series: &str, store: &dyn SeriesStore) -> EngineResult<()> {
        store
            .remove_sentinel_records(series)
            .map_err(|source| EngineError::Store {
                series: series.to_string(),
                source,
            })
    }
}

/// Cross-thread view of a running worker.
///
/// Writers only increment and readers only observe, so relaxed atomics are
/// all the visibility this needs; stale reads affect liveness polling only.
#[derive(Debug, Default)]
pub struct WorkerHandle {
    update_count: AtomicU64,
    running: AtomicBool,
    finished: AtomicBool,
}

impl WorkerHandle {
    /// Updates performed so far.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }

    /// Whether the worker is inside its run loop.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Whether the worker has stopped writing, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    fn record_update(&self) {
        self.update_count.fetch_add(1, Ordering::Relaxed);
    }

    fn mark_running(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    fn mark_finished(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.finished.store(true, Ordering::Relaxed);
    }
}

/// Result of one worker's completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// Observations written during the run (priming and first points
    /// excluded).
    pub update_count: u64,
    /// Wall-clock time the worker spent running, milliseconds.
    pub run_time_ms: u64,
}

/// State of one series, owned exclusively by its worker.
///
/// Each series consumes its own seeded RNG stream, so the sequence of
/// intervals and values it produces does not depend on how series
/// interleave inside the poll loop.
struct SeriesSlot {
    name: String,
    rng: StdRng,
    state: ObservationState,
}

/// Drives a partition of the series population through simulated time.
pub struct SeriesWorker {
    config: RunConfig,
    worker_index: usize,
    series_count: usize,
    seed: u64,
    store: Arc<dyn SeriesStore>,
    primer: Box<dyn BlockPrimer>,
    handle: Arc<WorkerHandle>,
    scheduler: ObservationScheduler,
    simulator: SeriesValueSimulator,
}

impl SeriesWorker {
    /// Creates a worker for `series_count` series.
    #[must_use]
    pub fn new(
        config: RunConfig,
        worker_index: usize,
        series_count: usize,
        seed: u64,
        store: Arc<dyn SeriesStore>,
        primer: Box<dyn BlockPrimer>,
    ) -> Self {
        let scheduler = ObservationScheduler::new(config.interval_between_observations_secs);
        Self {
            config,
            worker_index,
            series_count,
            seed,
            store,
            primer,
            handle: Arc::new(WorkerHandle::default()),
            scheduler,
            simulator: SeriesValueSimulator::new(),
        }
    }

    /// Shared view of this worker's counters and state flags.
    #[must_use]
    pub fn handle(&self) -> Arc<WorkerHandle> {
        Arc::clone(&self.handle)
    }

    /// Runs the worker to completion on the calling thread.
    ///
    /// Any storage failure is fatal: the worker stops writing, marks itself
    /// finished and returns the error to the orchestrator.
    pub fn run(self) -> EngineResult<WorkerReport> {
        debug!(
            "worker {} starting: {} series, seed {}",
            self.worker_index, self.series_count, self.seed
        );
        self.handle.mark_running();
        let clock = SimClock::start(self.config.acceleration_factor);
        let outcome = self.run_inner(&clock);
        self.handle.mark_finished();
        let series = outcome?;

        for slot in &series {
            self.primer.cleanup(&slot.name, self.store.as_ref())?;
        }

        let report = WorkerReport {
            update_count: self.handle.update_count(),
            run_time_ms: clock.wall_elapsed_ms() as u64,
        };
        debug!(
            "worker {} finished: {} updates in {}ms",
            self.worker_index, report.update_count, report.run_time_ms
        );
        Ok(report)
    }

    fn run_inner(&self, clock: &SimClock) -> EngineResult<Vec<SeriesSlot>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let start_ms = clock.base_epoch_ms();
        let mut series = Vec::with_capacity(self.series_count);

        for _ in 0..self.series_count {
            let name = random_series_name(self.config.series_name_length, &mut rng);
            let mut series_rng = StdRng::seed_from_u64(rng.gen());
            let value = self.simulator.initial_value(&mut series_rng);
            self.put_point(&name, DataPoint::new(start_ms, value))?;
            let next = self.scheduler.next_observation_ms(start_ms, &mut series_rng);
            series.push(SeriesSlot {
                name,
                rng: series_rng,
                state: ObservationState::new(start_ms, value, next),
            });
        }
        for slot in &series {
            self.primer.prime(&slot.name, self.store.as_ref(), &mut rng)?;
        }

        let duration_ms = self.config.simulated_duration_ms();
        let end_ms = start_ms + duration_ms;
        while clock.simulated_elapsed_ms() < duration_ms {
            // The duration check and this read are two separate clock
            // reads; clamp so a preemption between them, amplified by the
            // acceleration factor, cannot sweep past the simulated end.
            let now_ms = clock.simulated_now_ms().min(end_ms);
            for slot in &mut series {
                if slot.state.next_observation_ms < now_ms {
                    self.write_observation(slot)?;
                }
            }
        }

        // Drain up to the exact simulated end so the update count for a
        // given seed does not depend on poll timing.
        for slot in &mut series {
            while slot.state.next_observation_ms < end_ms {
                self.write_observation(slot)?;
            }
        }

        Ok(series)
    }

    fn write_observation(&self, slot: &mut SeriesSlot) -> EngineResult<()> {
        let increment_secs = slot.state.pending_increment_secs();
        let value = self
            .simulator
            .next_value(slot.state.last_value, increment_secs, &mut slot.rng);
        let point = DataPoint::new(slot.state.next_observation_ms, value);
        self.store
            .put(&slot.name, &[point])
            .map_err(|source| EngineError::Store {
                series: slot.name.clone(),
                source,
            })?;
        let next = self
            .scheduler
            .next_observation_ms(slot.state.next_observation_ms, &mut slot.rng);
        slot.state.advance(value, next);
        self.handle.record_update();
        Ok(())
    }

    fn put_point(&self, series: &str, point: DataPoint) -> EngineResult<()> {
        self.store
            .put(series, &[point])
            .map_err(|source| EngineError::Store {
                series: series.to_string(),
                source,
            })
    }
}
