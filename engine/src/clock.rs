//! Accelerated clock mapping wall-clock time onto simulated time.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Clock whose simulated "now" runs `acceleration_factor` times faster
/// than the wall clock.
///
/// The base instant is captured once, when the owning worker starts;
/// workers are not required to start in perfect lockstep, so each owns its
/// own clock. Factor 1 is real time. The engine busy-polls against this
/// clock rather than arming timers.
#[derive(Debug, Clone)]
pub struct SimClock {
    base_epoch_ms: i64,
    started: Instant,
    acceleration_factor: u32,
}

impl SimClock {
    /// Starts a clock at the current wall-clock epoch time.
    #[must_use]
    pub fn start(acceleration_factor: u32) -> Self {
        let base_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as i64);
        Self::start_at(base_epoch_ms, acceleration_factor)
    }

    /// Starts a clock at a caller-chosen base epoch, for tests that need
    /// stable timestamps.
    #[must_use]
    pub fn start_at(base_epoch_ms: i64, acceleration_factor: u32) -> Self {
        Self {
            base_epoch_ms,
            started: Instant::now(),
            acceleration_factor,
        }
    }

    /// The epoch millisecond at which the clock was started.
    #[must_use]
    pub const fn base_epoch_ms(&self) -> i64 {
        self.base_epoch_ms
    }

    /// Current simulated time as epoch milliseconds.
    ///
    /// `base + wall_elapsed * acceleration_factor`.
    #[must_use]
    pub fn simulated_now_ms(&self) -> i64 {
        self.base_epoch_ms + self.simulated_elapsed_ms()
    }

    /// Simulated milliseconds elapsed since the clock started.
    #[must_use]
    pub fn simulated_elapsed_ms(&self) -> i64 {
        self.wall_elapsed_ms() * i64::from(self.acceleration_factor)
    }

    /// Wall-clock milliseconds elapsed since the clock started.
    #[must_use]
    pub fn wall_elapsed_ms(&self) -> i64 {
        self.started.elapsed().as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MILLIS_PER_SEC;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_at_requested_base() {
        let clock = SimClock::start_at(1_000_000, 1);
        assert_eq!(clock.base_epoch_ms(), 1_000_000);
        assert!(clock.simulated_now_ms() >= 1_000_000);
    }

    #[test]
    fn real_time_factor_tracks_wall_clock() {
        let clock = SimClock::start_at(0, 1);
        thread::sleep(Duration::from_millis(30));
        let elapsed = clock.simulated_elapsed_ms();
        assert!((30..300).contains(&elapsed), "elapsed {elapsed}ms");
    }

    #[test]
    fn acceleration_multiplies_elapsed_time() {
        let clock = SimClock::start_at(0, 50);
        thread::sleep(Duration::from_millis(20));
        let wall = clock.wall_elapsed_ms();
        let simulated = clock.simulated_elapsed_ms();
        // The two reads are not atomic, so allow some skew between them.
        assert!(simulated >= wall * 50, "wall {wall}ms simulated {simulated}ms");
        assert!(
            simulated <= (wall + 50) * 50,
            "wall {wall}ms simulated {simulated}ms"
        );
        assert!(simulated >= 1_000, "simulated {simulated}ms");
    }

    #[test]
    fn wall_elapsed_unaffected_by_acceleration() {
        let accelerated = SimClock::start_at(0, 1_000);
        thread::sleep(Duration::from_millis(10));
        // Wall time stays at the sleep scale even under heavy acceleration.
        assert!(accelerated.wall_elapsed_ms() < 1_000);
    }

    #[test]
    fn start_uses_current_epoch() {
        let clock = SimClock::start(1);
        // Sanity bound: after 2020-01-01, before 2100.
        assert!(clock.base_epoch_ms() > 1_577_836_800_000);
        assert!(clock.base_epoch_ms() < 4_102_444_800_000);
    }

    #[test]
    fn millis_per_sec_constant() {
        assert_eq!(MILLIS_PER_SEC, 1_000);
    }
}
