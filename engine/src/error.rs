//! Error types for the benchmark engine.

use std::fmt;

use crate::store::StoreError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Invalid run parameters, detected before any worker is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Acceleration factor must be at least 1.
    ZeroAccelerationFactor,

    /// At least one worker thread is required.
    ZeroThreadCount,

    /// At least one time series is required.
    ZeroSeriesCount,

    /// The mean observation interval must be at least one second.
    ZeroObservationInterval,

    /// The run must last at least one second.
    ZeroRunDuration,

    /// Series names must be long enough to make collisions negligible.
    SeriesNameTooShort {
        /// Requested name length.
        length: usize,
        /// Minimum accepted length.
        min_length: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroAccelerationFactor => {
                write!(f, "acceleration factor must be a positive integer")
            }
            Self::ZeroThreadCount => write!(f, "thread count must be at least 1"),
            Self::ZeroSeriesCount => write!(f, "time series count must be at least 1"),
            Self::ZeroObservationInterval => {
                write!(f, "observation interval must be at least 1 second")
            }
            Self::ZeroRunDuration => write!(f, "run duration must be at least 1 second"),
            Self::SeriesNameTooShort { length, min_length } => {
                write!(
                    f,
                    "series name length {length} is below the minimum of {min_length}"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that abort a benchmark run.
///
/// Rate anomalies (hot-key risk, underflow) are reported as
/// [`RateEvent`](crate::RateEvent)s and never surface here; a run only
/// fails on bad configuration or on a storage write failure, because
/// partial results would misrepresent the achieved throughput.
#[derive(Debug)]
pub enum EngineError {
    /// The run configuration was rejected.
    Config(ConfigError),

    /// A storage write failed inside a worker. Fatal to the whole run;
    /// the engine performs no retries of its own.
    Store {
        /// Series whose write failed.
        series: String,
        /// Underlying store error.
        source: StoreError,
    },

    /// A worker thread panicked.
    WorkerPanicked {
        /// Index of the worker that panicked.
        worker: usize,
    },

    /// A worker thread could not be spawned.
    WorkerSpawn {
        /// Index of the worker that failed to start.
        worker: usize,
        /// Underlying spawn error.
        source: std::io::Error,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid run configuration: {err}"),
            Self::Store { series, source } => {
                write!(f, "write to series {series} failed: {source}")
            }
            Self::WorkerPanicked { worker } => write!(f, "worker {worker} panicked"),
            Self::WorkerSpawn { worker, source } => {
                write!(f, "failed to spawn worker {worker}: {source}")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store { source, .. } => Some(source),
            Self::WorkerPanicked { .. } => None,
            Self::WorkerSpawn { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}
