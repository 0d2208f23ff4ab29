//! Run configuration for a benchmark.

use crate::error::ConfigError;
use crate::series::{DEFAULT_SERIES_NAME_LENGTH, MIN_SERIES_NAME_LENGTH};

/// Milliseconds in one second, for the avoidance of doubt.
pub const MILLIS_PER_SEC: i64 = 1_000;

/// Maximum recommended update rate for a single storage key, per second.
///
/// Exceeding this for one series risks overloading the backend node that
/// owns the key, so the monitor warns before the run starts.
pub const DEFAULT_SAFE_KEY_UPDATES_PER_SEC: u32 = 100;

/// Parameters fixed for the lifetime of one benchmark run.
///
/// Read-only by every worker once the run starts. Constants that the
/// monitor needs (the safe per-key rate ceiling in particular) are carried
/// here rather than as globals so tests can run with arbitrary ceilings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Mean simulated interval between observations of one series, seconds.
    pub interval_between_observations_secs: u32,

    /// Wall-clock duration of the run, seconds.
    pub run_duration_secs: u32,

    /// Integer multiplier mapping wall-clock time to simulated time.
    /// Factor 1 is real time.
    pub acceleration_factor: u32,

    /// Number of worker threads to spawn.
    pub thread_count: u32,

    /// Total number of time series, partitioned across the workers.
    pub series_count: u32,

    /// Per-key update rate above which the hot-key warning fires.
    pub safe_key_updates_per_sec: u32,

    /// Length of randomly generated series names.
    pub series_name_length: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interval_between_observations_secs: 1,
            run_duration_secs: 10,
            acceleration_factor: 1,
            thread_count: 1,
            series_count: 100,
            safe_key_updates_per_sec: DEFAULT_SAFE_KEY_UPDATES_PER_SEC,
            series_name_length: DEFAULT_SERIES_NAME_LENGTH,
        }
    }
}

impl RunConfig {
    /// Creates a small, fast configuration for tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            interval_between_observations_secs: 1,
            run_duration_secs: 2,
            acceleration_factor: 5,
            thread_count: 1,
            series_count: 10,
            safe_key_updates_per_sec: DEFAULT_SAFE_KEY_UPDATES_PER_SEC,
            series_name_length: DEFAULT_SERIES_NAME_LENGTH,
        }
    }

    /// Rejects configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.acceleration_factor == 0 {
            return Err(ConfigError::ZeroAccelerationFactor);
        }
        if self.thread_count == 0 {
            return Err(ConfigError::ZeroThreadCount);
        }
        if self.series_count == 0 {
            return Err(ConfigError::ZeroSeriesCount);
        }
        if self.interval_between_observations_secs == 0 {
            return Err(ConfigError::ZeroObservationInterval);
        }
        if self.run_duration_secs == 0 {
            return Err(ConfigError::ZeroRunDuration);
        }
        if self.series_name_length < MIN_SERIES_NAME_LENGTH {
            return Err(ConfigError::SeriesNameTooShort {
                length: self.series_name_length,
                min_length: MIN_SERIES_NAME_LENGTH,
            });
        }
        Ok(())
    }

    /// Theoretical update rate across every series, per wall-clock second.
    #[must_use]
    pub fn expected_updates_per_second(&self) -> f64 {
        f64::from(self.acceleration_factor) * f64::from(self.series_count)
            / f64::from(self.interval_between_observations_secs)
    }

    /// Theoretical update rate of a single series, per wall-clock second.
    #[must_use]
    pub fn expected_updates_per_second_per_series(&self) -> f64 {
        self.expected_updates_per_second() / f64::from(self.series_count)
    }

    /// Simulated duration of the run in milliseconds.
    ///
    /// Wall-clock duration times the acceleration factor; the worker loop
    /// and the final drain are both bounded by this value.
    #[must_use]
    pub const fn simulated_duration_ms(&self) -> i64 {
        self.run_duration_secs as i64 * MILLIS_PER_SEC * self.acceleration_factor as i64
    }
}
