//! Mining worker implementations
//!
//! Provides the search loops that drive the proof-of-work algorithms: the
//! midstate-reusing double-SHA-256 worker and the scrypt worker.

use crate::{BlockHeader, BlockTime, Nonce, Result, Target};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Span;

pub mod scrypt;
pub mod sha256d;

pub use scrypt::ScryptWorker;
pub use sha256d::Sha256dWorker;

/// Mining statistics for a worker
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Total hashes computed
    pub total_hashes: u64,
    /// Number of solutions found
    pub solutions_found: u64,
    /// Time spent mining (seconds)
    pub mining_time_secs: u64,
    /// Current hash rate (hashes per second)
    pub current_hash_rate: f64,
    /// Average hash rate (hashes per second)
    pub average_hash_rate: f64,
}

/// A header assignment that satisfied the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// Winning nonce
    pub nonce: Nonce,
    /// Time value the winning header carried
    pub time: BlockTime,
    /// Wire-order proof-of-work digest of the winning header
    pub digest: [u8; 32],
}

impl Solution {
    /// Digest in reversed display order
    pub fn digest_display(&self) -> String {
        crate::utils::hash_to_display_hex(&self.digest)
    }
}

/// Result of a completed search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A header satisfying the target was found
    Found(Solution),
    /// Every permitted (nonce, time) assignment was tried without success
    Exhausted,
}

impl SearchOutcome {
    /// The solution, if one was found
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Found(solution) => Some(solution),
            Self::Exhausted => None,
        }
    }
}

/// Bounds on how far a search may roam from the initial header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// How many times the time field may be advanced after the initial
    /// nonce space is exhausted. Each advance reopens the full nonce space.
    pub max_time_increments: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_time_increments: u32::MAX,
        }
    }
}

/// Mining worker trait
///
/// All mining workers implement this trait to provide a unified interface
/// for the different proof-of-work algorithms.
#[async_trait]
pub trait MiningWorker: Send + Sync {
    /// Get the worker type name for logging
    fn worker_type(&self) -> &'static str;

    /// Search for a (nonce, time) assignment of `header` whose proof-of-work
    /// digest satisfies `target`.
    ///
    /// The header's own nonce is where the search starts. Workers respect the
    /// cancellation token and stop mining when cancelled.
    async fn mine(
        &mut self,
        header: BlockHeader,
        target: Target,
        limits: SearchLimits,
        cancellation: CancellationToken,
        stats_tx: Option<mpsc::UnboundedSender<MiningStats>>,
    ) -> Result<SearchOutcome>;

    /// Get current mining statistics
    fn stats(&self) -> MiningStats {
        MiningStats::default()
    }
}

/// Worker factory for creating the different mining worker types
pub struct WorkerFactory;

impl WorkerFactory {
    /// Create a double-SHA-256 worker
    pub fn create_sha256d_worker(thread_count: usize) -> Box<dyn MiningWorker> {
        Box::new(Sha256dWorker::new(thread_count))
    }

    /// Create a scrypt worker
    pub fn create_scrypt_worker(
        params: crate::crypto::ScryptParams,
        thread_count: usize,
    ) -> Box<dyn MiningWorker> {
        Box::new(ScryptWorker::new(params, thread_count))
    }
}

/// Thread-safe counters shared by a worker's search tasks
#[derive(Debug)]
pub(crate) struct SharedStats {
    total_hashes: AtomicU64,
    solutions_found: AtomicU64,
    start_time: Instant,
    is_mining: AtomicBool,
}

impl SharedStats {
    pub(crate) fn new() -> Self {
        Self {
            total_hashes: AtomicU64::new(0),
            solutions_found: AtomicU64::new(0),
            start_time: Instant::now(),
            is_mining: AtomicBool::new(false),
        }
    }

    pub(crate) fn begin(&self) {
        self.total_hashes.store(0, Ordering::Relaxed);
        self.solutions_found.store(0, Ordering::Relaxed);
        self.is_mining.store(true, Ordering::Relaxed);
    }

    pub(crate) fn end(&self) {
        self.is_mining.store(false, Ordering::Relaxed);
    }

    pub(crate) fn record_hashes(&self, count: u64) {
        self.total_hashes.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_solution(&self) {
        self.solutions_found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn to_mining_stats(&self) -> MiningStats {
        let total_hashes = self.total_hashes.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();
        let rate = compute_hash_rate(total_hashes, elapsed);

        MiningStats {
            total_hashes,
            solutions_found: self.solutions_found.load(Ordering::Relaxed),
            mining_time_secs: elapsed.as_secs(),
            current_hash_rate: rate,
            average_hash_rate: rate,
        }
    }
}

/// A contiguous span of nonce values, wrapping through the 32-bit ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    /// First nonce of the span
    pub start: Nonce,
    /// Number of nonces in the span
    pub count: u64,
}

/// Split the full 32-bit nonce ring into per-thread spans.
///
/// Starting at `start`, the ring is divided into `thread_count` contiguous
/// non-overlapping spans that together cover every nonce exactly once, so
/// threads never duplicate each other's attempts. The first spans absorb the
/// remainder when the ring does not divide evenly.
pub fn partition_nonce_space(start: Nonce, thread_count: usize) -> Vec<NonceRange> {
    let total = 1u64 << 32;
    let threads = thread_count.max(1) as u64;
    let base = total / threads;
    let remainder = total % threads;

    let mut ranges = Vec::with_capacity(threads as usize);
    let mut offset = 0u64;
    for i in 0..threads {
        let count = base + u64::from(i < remainder);
        ranges.push(NonceRange {
            start: Nonce::new(start.value().wrapping_add(offset as u32)),
            count,
        });
        offset += count;
    }
    ranges
}

/// Utility function to compute hash rate over a time period
pub fn compute_hash_rate(hashes: u64, elapsed: Duration) -> f64 {
    if elapsed.as_secs_f64() > 0.0 {
        hashes as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    }
}

/// Create a tracing span for mining operations
pub fn mining_span(worker_type: &str, target: &Target) -> Span {
    tracing::info_span!(
        "mining",
        worker_type = worker_type,
        difficulty_level = target.difficulty_level(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_stats_snapshot() {
        let stats = SharedStats::new();
        stats.begin();
        stats.record_hashes(1000);
        stats.record_solution();

        let snapshot = stats.to_mining_stats();
        assert_eq!(snapshot.total_hashes, 1000);
        assert_eq!(snapshot.solutions_found, 1);

        stats.end();
        assert!(!stats.is_mining.load(Ordering::Relaxed));
    }

    #[test]
    fn test_partition_covers_ring_exactly() {
        for threads in [1, 2, 3, 7, 16] {
            let ranges = partition_nonce_space(Nonce::new(0xdead_0000), threads);
            assert_eq!(ranges.len(), threads);
            assert_eq!(ranges.iter().map(|r| r.count).sum::<u64>(), 1u64 << 32);

            // Spans are contiguous: each starts where the previous ends
            for pair in ranges.windows(2) {
                let end = pair[0].start.value().wrapping_add(pair[0].count as u32);
                assert_eq!(pair[1].start.value(), end);
            }
        }
    }

    #[test]
    fn test_partition_single_thread() {
        let ranges = partition_nonce_space(Nonce::new(42), 1);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start, Nonce::new(42));
        assert_eq!(ranges[0].count, 1u64 << 32);
    }

    #[test]
    fn test_partition_zero_threads_clamped() {
        assert_eq!(partition_nonce_space(Nonce::new(0), 0).len(), 1);
    }

    #[test]
    fn test_compute_hash_rate() {
        assert_eq!(compute_hash_rate(1000, Duration::from_secs(10)), 100.0);
        assert_eq!(compute_hash_rate(0, Duration::from_secs(10)), 0.0);
        assert_eq!(compute_hash_rate(1000, Duration::from_secs(0)), 0.0);
    }

    #[test]
    fn test_search_outcome_accessors() {
        let solution = Solution {
            nonce: Nonce::new(7),
            time: BlockTime::new(100),
            digest: [0u8; 32],
        };
        assert_eq!(SearchOutcome::Found(solution).solution(), Some(&solution));
        assert_eq!(SearchOutcome::Exhausted.solution(), None);
    }

    #[test]
    fn test_default_limits_unbounded() {
        assert_eq!(SearchLimits::default().max_time_increments, u32::MAX);
    }
}
