//! Simulation and benchmark engine for concurrent time-series write load.
//!
//! This crate drives many independent time series forward through simulated
//! time, writing every due observation to a storage backend and checking
//! whether the achieved write rate matches the intended one:
//!
//! - Stochastic per-series value and inter-observation generators
//! - Accelerated clock mapping wall-clock time onto simulated time
//! - Worker threads, each exclusively owning a partition of the series
//! - Orchestrator that splits series across workers and aggregates results
//! - Rate monitor flagging hot-key risk and generator underflow
//!
//! # Design Principles
//!
//! - **Reproducible** - A run constructed with an explicit seed produces
//!   identical series names, values, and update counts.
//! - **Lock-free hot path** - Each series is mutated by exactly one worker;
//!   the only shared state is monotonically increasing atomic counters.
//! - **Narrow storage seam** - The backend is reached through the
//!   [`SeriesStore`] trait and is never interpreted beyond it.

mod clock;
mod config;
mod error;
mod monitor;
mod orchestrator;
mod scheduler;
mod series;
mod store;
pub mod util;
mod value;
mod worker;

pub use clock::SimClock;
pub use config::{RunConfig, MILLIS_PER_SEC};
pub use error::{ConfigError, EngineError, EngineResult};
pub use monitor::{
    CollectingSink, ProgressSink, RateEvent, RateMonitor, UNDERFLOW_TOLERANCE_PCT,
};
pub use orchestrator::{Benchmarker, RunSummary};
pub use scheduler::{ObservationScheduler, DEFAULT_JITTER_PCT};
pub use series::{random_series_name, DataPoint, ObservationState, DEFAULT_SERIES_NAME_LENGTH};
pub use store::{MemoryStore, SeriesStore, StoreError, StoreResult};
pub use value::SeriesValueSimulator;
pub use worker::{
    BlockPrimer, NoPriming, RandomFillPrimer, SeriesWorker, WorkerHandle, WorkerReport,
};
