//! CLI harness and benchmarks for the seriesload engine.
//!
//! This crate provides:
//!
//! - The `seriesload` binary: runs a configured benchmark against the
//!   in-memory backend and renders the engine's rate events
//! - JSON summary output suitable for CI regression tracking
//! - Criterion microbenchmarks for the generator hot path

#[cfg(test)]
mod tests {
    #[test]
    fn placeholder_test() {
        // Keep a smoke test to ensure the crate builds in CI.
        let _ = 1 + 1;
    }
}
