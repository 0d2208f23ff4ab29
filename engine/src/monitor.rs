//! Rate monitoring: hot-key risk before the run, underflow during it.

use std::time::Duration;

use crate::config::RunConfig;

/// Actual rates this far below the expected rate are flagged as underflow.
///
/// A policy constant rather than a hard zero threshold, because small
/// series populations produce visible per-second variance.
pub const UNDERFLOW_TOLERANCE_PCT: u32 = 10;

/// Events produced by the monitor and the orchestrator.
///
/// The engine never formats these; rendering belongs to whichever
/// presentation layer consumes the [`ProgressSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum RateEvent {
    /// Emitted once before the workers start.
    ExpectedRates {
        /// Theoretical updates per second across all series.
        updates_per_second: f64,
        /// Theoretical updates per second for one series.
        updates_per_second_per_series: f64,
    },

    /// The configuration implies a per-series rate above the safe per-key
    /// ceiling. Emitted once, before the run, because this is a
    /// configuration problem rather than a runtime one.
    HotKeyRisk {
        /// Implied updates per second for a single series.
        implied_rate: f64,
        /// Configured safe ceiling.
        ceiling: u32,
    },

    /// Per-second progress sample.
    Status {
        /// Wall-clock seconds since the run started.
        elapsed_secs: u64,
        /// Total updates so far across all workers.
        update_count: u64,
        /// Updates per second since the previous sample.
        actual_rate: f64,
    },

    /// The generators are materially behind the expected rate.
    Underflow {
        /// Theoretical updates per second.
        expected_rate: f64,
        /// Achieved updates per second since the previous sample.
        actual_rate: f64,
    },
}

/// Receives rate events as the run progresses.
pub trait ProgressSink {
    /// Handles one event.
    fn emit(&mut self, event: &RateEvent);
}

/// Sink that retains every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Vec<RateEvent>,
}

impl CollectingSink {
    /// All events emitted so far.
    #[must_use]
    pub fn events(&self) -> &[RateEvent] {
        &self.events
    }

    /// Number of retained underflow warnings.
    #[must_use]
    pub fn underflow_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, RateEvent::Underflow { .. }))
            .count()
    }

    /// Number of retained status samples.
    #[must_use]
    pub fn status_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, RateEvent::Status { .. }))
            .count()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&mut self, event: &RateEvent) {
        self.events.push(event.clone());
    }
}

/// Samples the shared update counter once per wall-clock second and
/// compares the achieved rate against the theoretical one.
///
/// The monitor is pure over `(elapsed, total_count)` inputs so it can be
/// tested without sleeping; the orchestrator supplies real time.
#[derive(Debug, Clone)]
pub struct RateMonitor {
    expected_rate: f64,
    underflow_tolerance_pct: u32,
    last_elapsed: Duration,
    last_count: u64,
    samples: u32,
}

impl RateMonitor {
    /// Creates a monitor for the given theoretical rate.
    #[must_use]
    pub const fn new(expected_rate: f64) -> Self {
        Self {
            expected_rate,
            underflow_tolerance_pct: UNDERFLOW_TOLERANCE_PCT,
            last_elapsed: Duration::ZERO,
            last_count: 0,
            samples: 0,
        }
    }

    /// Overrides the underflow tolerance, for tests.
    #[must_use]
    pub const fn with_underflow_tolerance_pct(mut self, pct: u32) -> Self {
        self.underflow_tolerance_pct = pct;
        self
    }

    /// One-time pre-run check for hot-key risk.
    #[must_use]
    pub fn hot_key_check(config: &RunConfig) -> Option<RateEvent> {
        let implied_rate = config.expected_updates_per_second_per_series();
        if implied_rate > f64::from(config.safe_key_updates_per_sec) {
            Some(RateEvent::HotKeyRisk {
                implied_rate,
                ceiling: config.safe_key_updates_per_sec,
            })
        } else {
            None
        }
    }

    /// Takes one sample and returns the events it produced.
    ///
    /// Always yields a [`RateEvent::Status`]; additionally yields a
    /// [`RateEvent::Underflow`] when the delta rate since the previous
    /// sample falls below the tolerated fraction of the expected rate. The
    /// very first sample never counts as underflow, so start-up transients
    /// do not alarm.
    pub fn sample(&mut self, elapsed: Duration, total_count: u64) -> Vec<RateEvent> {
        let delta_secs = (elapsed - self.last_elapsed).as_secs_f64();
        let delta_count = total_count.saturating_sub(self.last_count);
        let actual_rate = if delta_secs > 0.0 {
            delta_count as f64 / delta_secs
        } else {
            0.0
        };

        let mut events = vec![RateEvent::Status {
            elapsed_secs: elapsed.as_secs(),
            update_count: total_count,
            actual_rate,
        }];

        let tolerated =
            self.expected_rate * (1.0 - f64::from(self.underflow_tolerance_pct) / 100.0);
        if self.samples > 0 && actual_rate < tolerated {
            events.push(RateEvent::Underflow {
                expected_rate: self.expected_rate,
                actual_rate,
            });
        }

        self.last_elapsed = elapsed;
        self.last_count = total_count;
        self.samples += 1;
        events
    }
}
