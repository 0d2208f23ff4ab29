//! Narrow seam to the time-series storage backend.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::series::DataPoint;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a storage backend.
///
/// The engine treats any of these as fatal to the calling worker; retry and
/// backoff policy, if any, belongs behind the trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend rejected a write.
    WriteRejected {
        /// Series the write was addressed to.
        series: String,
        /// Backend-reported reason.
        reason: String,
    },

    /// The backend could not be reached.
    Unavailable {
        /// Backend-reported reason.
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteRejected { series, reason } => {
                write!(f, "write to {series} rejected: {reason}")
            }
            Self::Unavailable { reason } => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Append-oriented time-series storage.
///
/// The engine only generates and times writes; it never interprets the
/// backend beyond this surface. Writes of distinct `(series, timestamp)`
/// pairs are treated as independent and idempotent.
pub trait SeriesStore: Send + Sync {
    /// Appends points to a series.
    fn put(&self, series: &str, points: &[DataPoint]) -> StoreResult<()>;

    /// Enumerates every series name ever written, merging the indexed set
    /// with entries not yet indexed.
    fn scan_all_series_names(&self) -> StoreResult<BTreeSet<String>>;

    /// Backend-specific block capacity, used to bound sentinel-record
    /// counts when priming.
    fn max_block_entry_count(&self) -> usize;

    /// Removes the block-priming sentinels from a series.
    fn remove_sentinel_records(&self, series: &str) -> StoreResult<()>;
}

/// Default block capacity of the in-memory backend.
const MEMORY_STORE_BLOCK_ENTRIES: usize = 1_000;

/// Reference in-memory backend.
///
/// Used by the test suites and the CLI's `memory` backend. Series names
/// enter the index only when a series rolls over its first block, so
/// [`scan_all_series_names`](SeriesStore::scan_all_series_names) genuinely
/// exercises the indexed-plus-raw merge. Two hooks exist for tests: a
/// fixed per-put latency (to force underflow) and a fail-after-N-puts
/// trigger (to exercise fatal write failures).
pub struct MemoryStore {
    blocks: Mutex<HashMap<String, Vec<DataPoint>>>,
    index: Mutex<BTreeSet<String>>,
    max_block_entries: usize,
    put_latency: Option<Duration>,
    fail_after_puts: Option<usize>,
    put_count: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with the default block capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
            index: Mutex::new(BTreeSet::new()),
            max_block_entries: MEMORY_STORE_BLOCK_ENTRIES,
            put_latency: None,
            fail_after_puts: None,
            put_count: AtomicUsize::new(0),
        }
    }

    /// Overrides the advertised block capacity.
    #[must_use]
    pub fn with_max_block_entries(mut self, entries: usize) -> Self {
        self.max_block_entries = entries.max(1);
        self
    }

    /// Adds a fixed latency to every put, to simulate a slow backend.
    #[must_use]
    pub const fn with_put_latency(mut self, latency: Duration) -> Self {
        self.put_latency = Some(latency);
        self
    }

    /// Makes every put after the first `puts` fail, to simulate a backend
    /// outage mid-run.
    #[must_use]
    pub const fn with_failure_after(mut self, puts: usize) -> Self {
        self.fail_after_puts = Some(puts);
        self
    }

    /// Points currently stored for a series, in insertion order.
    #[must_use]
    pub fn points(&self, series: &str) -> Option<Vec<DataPoint>> {
        self.blocks
            .lock()
            .expect("memory store poisoned")
            .get(series)
            .cloned()
    }

    /// Total number of stored points across all series.
    #[must_use]
    pub fn total_point_count(&self) -> usize {
        self.blocks
            .lock()
            .expect("memory store poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }
}

impl SeriesStore for MemoryStore {
    fn put(&self, series: &str, points: &[DataPoint]) -> StoreResult<()> {
        if let Some(latency) = self.put_latency {
            thread::sleep(latency);
        }
        let count = self.put_count.fetch_add(1, Ordering::Relaxed);
        if let Some(limit) = self.fail_after_puts {
            if count >= limit {
                return Err(StoreError::WriteRejected {
                    series: series.to_string(),
                    reason: format!("injected failure after {limit} puts"),
                });
            }
        }
        let mut blocks = self.blocks.lock().expect("memory store poisoned");
        let block = blocks.entry(series.to_string()).or_default();
        block.extend_from_slice(points);
        if block.len() >= self.max_block_entries {
            self.index
                .lock()
                .expect("memory store index poisoned")
                .insert(series.to_string());
        }
        Ok(())
    }

    fn scan_all_series_names(&self) -> StoreResult<BTreeSet<String>> {
        let mut names: BTreeSet<String> = self
            .index
            .lock()
            .expect("memory store index poisoned")
            .iter()
            .cloned()
            .collect();
        // Series which haven't rolled a block yet are not indexed.
        let blocks = self.blocks.lock().expect("memory store poisoned");
        names.extend(blocks.keys().cloned());
        Ok(names)
    }

    fn max_block_entry_count(&self) -> usize {
        self.max_block_entries
    }

    fn remove_sentinel_records(&self, series: &str) -> StoreResult<()> {
        let mut blocks = self.blocks.lock().expect("memory store poisoned");
        if let Some(block) = blocks.get_mut(series) {
            block.retain(|point| !point.is_sentinel());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_appends_points() {
        let store = MemoryStore::new();
        store.put("S1", &[DataPoint::new(1, 10.0)]).unwrap();
        store
            .put("S1", &[DataPoint::new(2, 11.0), DataPoint::new(3, 12.0)])
            .unwrap();
        let points = store.points("S1").unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2].timestamp_ms, 3);
    }

    #[test]
    fn scan_merges_indexed_and_unindexed() {
        let store = MemoryStore::new().with_max_block_entries(2);
        // "big" rolls a block and becomes indexed; "small" stays raw-only.
        store
            .put("big", &[DataPoint::new(1, 1.0), DataPoint::new(2, 2.0)])
            .unwrap();
        store.put("small", &[DataPoint::new(1, 1.0)]).unwrap();
        let names = store.scan_all_series_names().unwrap();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["big".to_string(), "small".to_string()]
        );
    }

    #[test]
    fn sentinel_removal_keeps_real_points() {
        let store = MemoryStore::new();
        store
            .put(
                "S1",
                &[
                    DataPoint::sentinel(0),
                    DataPoint::sentinel(1),
                    DataPoint::new(1_000, 5.0),
                ],
            )
            .unwrap();
        store.remove_sentinel_records("S1").unwrap();
        let points = store.points("S1").unwrap();
        assert_eq!(points, vec![DataPoint::new(1_000, 5.0)]);
    }

    #[test]
    fn sentinel_removal_of_unknown_series_is_noop() {
        let store = MemoryStore::new();
        assert!(store.remove_sentinel_records("missing").is_ok());
    }

    #[test]
    fn injected_failure_fires_after_limit() {
        let store = MemoryStore::new().with_failure_after(2);
        assert!(store.put("S1", &[DataPoint::new(1, 1.0)]).is_ok());
        assert!(store.put("S1", &[DataPoint::new(2, 2.0)]).is_ok());
        let err = store.put("S1", &[DataPoint::new(3, 3.0)]).unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected { .. }));
    }

    #[test]
    fn block_capacity_floor() {
        let store = MemoryStore::new().with_max_block_entries(0);
        assert_eq!(store.max_block_entry_count(), 1);
    }

    #[test]
    fn total_point_count_sums_series() {
        let store = MemoryStore::new();
        store.put("a", &[DataPoint::new(1, 1.0)]).unwrap();
        store
            .put("b", &[DataPoint::new(1, 1.0), DataPoint::new(2, 2.0)])
            .unwrap();
        assert_eq!(store.total_point_count(), 3);
    }
}
