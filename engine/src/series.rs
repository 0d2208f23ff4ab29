//! Series identities, observation state, and data points.

use rand::Rng;

use crate::config::MILLIS_PER_SEC;

/// Default length of randomly generated series names.
///
/// With a 62-symbol alphabet this gives 62^16 possible names, so collisions
/// within a run are negligible (and verified over 10k draws in the tests).
pub const DEFAULT_SERIES_NAME_LENGTH: usize = 16;

/// Shortest name length accepted by [`RunConfig`](crate::RunConfig).
pub(crate) const MIN_SERIES_NAME_LENGTH: usize = 8;

const NAME_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Draws a random series name of the given length.
pub fn random_series_name<R: Rng>(length: usize, rng: &mut R) -> String {
    let mut name = String::with_capacity(length);
    for _ in 0..length {
        let idx = rng.gen_range(0..NAME_ALPHABET.len());
        name.push(char::from(NAME_ALPHABET[idx]));
    }
    name
}

/// A single timestamped observation, immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    /// Simulated observation instant, epoch milliseconds.
    pub timestamp_ms: i64,
    /// Observed value.
    pub value: f64,
}

impl DataPoint {
    /// Creates a data point.
    #[must_use]
    pub const fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }

    /// Creates a sentinel point used only to pre-fill storage blocks.
    ///
    /// Sentinels carry non-positive timestamps spaced one second apart and
    /// a zero value, so they are easy to identify and remove at run end.
    #[must_use]
    pub const fn sentinel(index: usize) -> Self {
        Self {
            timestamp_ms: -(index as i64) * MILLIS_PER_SEC,
            value: 0.0,
        }
    }

    /// Whether this point is a block-priming sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.timestamp_ms <= 0 && self.value == 0.0
    }
}

/// Per-series simulation state.
///
/// Owned exclusively by the worker that drives the series; never shared
/// across threads. This is the core concurrency invariant that keeps the
/// hot write path lock-free.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationState {
    /// Instant of the last written observation, epoch milliseconds.
    pub last_observation_ms: i64,
    /// Value of the last written observation.
    pub last_value: f64,
    /// Instant at which the next observation falls due.
    pub next_observation_ms: i64,
}

impl ObservationState {
    /// Initial state for a series whose first point was written at
    /// `start_ms`.
    #[must_use]
    pub const fn new(start_ms: i64, initial_value: f64, next_observation_ms: i64) -> Self {
        Self {
            last_observation_ms: start_ms,
            last_value: initial_value,
            next_observation_ms,
        }
    }

    /// Elapsed simulated seconds between the last observation and the next
    /// due one.
    #[must_use]
    pub fn pending_increment_secs(&self) -> f64 {
        (self.next_observation_ms - self.last_observation_ms) as f64 / MILLIS_PER_SEC as f64
    }

    /// Advances the state to a freshly written observation.
    pub fn advance(&mut self, value: f64, next_observation_ms: i64) {
        self.last_observation_ms = self.next_observation_ms;
        self.last_value = value;
        self.next_observation_ms = next_observation_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn name_has_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        for length in [MIN_SERIES_NAME_LENGTH, DEFAULT_SERIES_NAME_LENGTH, 32] {
            assert_eq!(random_series_name(length, &mut rng).len(), length);
        }
    }

    #[test]
    fn name_uses_alphanumeric_alphabet() {
        let mut rng = StdRng::seed_from_u64(11);
        let name = random_series_name(64, &mut rng);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn ten_thousand_names_are_pairwise_distinct() {
        let mut rng = StdRng::seed_from_u64(13);
        let sample_count = 10_000;
        let mut names = HashSet::with_capacity(sample_count);
        for _ in 0..sample_count {
            names.insert(random_series_name(DEFAULT_SERIES_NAME_LENGTH, &mut rng));
        }
        assert_eq!(names.len(), sample_count);
    }

    #[test]
    fn names_deterministic_under_seed() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            assert_eq!(
                random_series_name(DEFAULT_SERIES_NAME_LENGTH, &mut a),
                random_series_name(DEFAULT_SERIES_NAME_LENGTH, &mut b)
            );
        }
    }

    #[test]
    fn sentinel_points_identifiable() {
        assert!(DataPoint::sentinel(0).is_sentinel());
        assert!(DataPoint::sentinel(5).is_sentinel());
        assert_eq!(DataPoint::sentinel(3).timestamp_ms, -3_000);
        assert!(!DataPoint::new(1_000, 42.0).is_sentinel());
        // A legitimate zero-valued point with a real timestamp is not a sentinel.
        assert!(!DataPoint::new(1_000, 0.0).is_sentinel());
    }

    #[test]
    fn observation_state_advances() {
        let mut state = ObservationState::new(1_000, 10.0, 2_500);
        assert!((state.pending_increment_secs() - 1.5).abs() < 1e-9);
        state.advance(11.0, 3_600);
        assert_eq!(state.last_observation_ms, 2_500);
        assert!((state.last_value - 11.0).abs() < f64::EPSILON);
        assert_eq!(state.next_observation_ms, 3_600);
    }
}
