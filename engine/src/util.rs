//! Small helpers shared by the engine and its test suites.

/// Whether `actual` lies within `tolerance_pct` percent of `expected`.
#[must_use]
pub fn value_in_tolerance(expected: f64, actual: f64, tolerance_pct: f64) -> bool {
    ((actual - expected) / expected).abs() < tolerance_pct / 100.0
}
