//! Draws the next simulated observation instant for a series.

use rand::Rng;

use crate::config::MILLIS_PER_SEC;

/// Jitter applied around the mean interval, as a percentage of the mean.
pub const DEFAULT_JITTER_PCT: u32 = 10;

/// Schedules observations around a configured mean interval.
///
/// Each draw is uniform in `mean ± jitter`, so the draw mean equals the
/// configured mean and measured inter-arrival times converge to it over
/// many observations. The scheduler is stateless; callers supply the RNG,
/// so each series can consume its own deterministic stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationScheduler {
    mean_interval_ms: i64,
    jitter_pct: u32,
}

impl ObservationScheduler {
    /// Creates a scheduler with the default jitter.
    #[must_use]
    pub const fn new(mean_interval_secs: u32) -> Self {
        Self::with_jitter(mean_interval_secs, DEFAULT_JITTER_PCT)
    }

    /// Creates a scheduler with explicit jitter. Jitter above 100% is
    /// clamped so intervals can never go non-positive.
    #[must_use]
    pub const fn with_jitter(mean_interval_secs: u32, jitter_pct: u32) -> Self {
        let jitter_pct = if jitter_pct > 99 { 99 } else { jitter_pct };
        Self {
            mean_interval_ms: mean_interval_secs as i64 * MILLIS_PER_SEC,
            jitter_pct,
        }
    }

    /// Mean inter-observation interval in milliseconds.
    #[must_use]
    pub const fn mean_interval_ms(&self) -> i64 {
        self.mean_interval_ms
    }

    /// Draws the next observation instant, strictly after `previous_ms`.
    pub fn next_observation_ms<R: Rng>(&self, previous_ms: i64, rng: &mut R) -> i64 {
        let jitter_ms = self.mean_interval_ms * i64::from(self.jitter_pct) / 100;
        let interval = rng
            .gen_range(self.mean_interval_ms - jitter_ms..=self.mean_interval_ms + jitter_ms)
            .max(1);
        previous_ms + interval
    }
}
