//! Stochastic per-series value process.

use rand::Rng;

/// Lower bound on initial values.
const INITIAL_VALUE_MIN: f64 = 50.0;
/// Upper bound on initial values.
const INITIAL_VALUE_MAX: f64 = 150.0;
/// Maximum relative move over one simulated second, as a percentage.
const MAX_STEP_PCT_PER_SEC: f64 = 2.0;
/// Values never decay below this floor.
const VALUE_FLOOR: f64 = 0.01;

/// Bounded geometric random walk.
///
/// The next value depends only on the previous value, the elapsed simulated
/// seconds, and the caller-supplied RNG; there is no hidden state, so two
/// walks driven by identically seeded RNGs produce identical sequences.
/// The relative shock scales with the square root of elapsed time, matching
/// the usual diffusion scaling, and the walk is floored to keep values
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeriesValueSimulator;

impl SeriesValueSimulator {
    /// Creates a simulator with the built-in process parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Draws an initial observation value.
    pub fn initial_value<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(INITIAL_VALUE_MIN..INITIAL_VALUE_MAX)
    }

    /// Advances the walk by `elapsed_secs` simulated seconds.
    pub fn next_value<R: Rng>(&self, previous: f64, elapsed_secs: f64, rng: &mut R) -> f64 {
        let scale = elapsed_secs.max(0.0).sqrt();
        let shock = (rng.gen::<f64>() * 2.0 - 1.0) * (MAX_STEP_PCT_PER_SEC / 100.0) * scale;
        (previous * (1.0 + shock)).max(VALUE_FLOOR)
    }
}
