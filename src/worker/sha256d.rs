//! Double-SHA-256 mining worker
//!
//! Multi-threaded search over the header nonce using `SHA256(SHA256(header))`
//! with a cached midstate: the 80-byte header spans two compression blocks and
//! only the second one contains the nonce, so the first block is compressed
//! once per time value and every attempt costs two compressions instead of
//! three.

use super::{
    mining_span, partition_nonce_space, MiningStats, MiningWorker, NonceRange, SearchLimits,
    SearchOutcome, SharedStats, Solution,
};
use crate::crypto::sha256::{self, Midstate};
use crate::{utils, BlockHeader, BlockTime, Error, Nonce, Result, Target};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Attempts between cancellation checks
const BATCH_SIZE: u64 = 100_000;

/// Double-SHA-256 engine for one header prefix.
///
/// Holds the state after compressing the first 64 header bytes plus the
/// prepared second block (merkle tail, time, bits, nonce and padding). An
/// attempt recompresses only the second block and the fused outer-hash block.
pub struct Sha256dEngine {
    midstate: [u32; 8],
    block2: [u32; 16],
    w: [u32; 64],
}

impl Sha256dEngine {
    /// Build an engine for a header, compressing the invariant first block
    pub fn new(header: &BlockHeader) -> Result<Self> {
        let bytes = header.serialize();
        let midstate = Midstate::compute(&bytes[..64])?;

        let mut block2 = [0u32; 16];
        utils::bytes_to_words_be(&bytes[64..80], &mut block2[..4]);
        block2[4] = 0x8000_0000;
        // words 5..15 stay zero; 80-byte message means a 640-bit length field
        block2[15] = 640;

        Ok(Self {
            midstate: *midstate.state(),
            block2,
            w: [0u32; 64],
        })
    }

    /// Install a time value. Wire integers are little-endian, so the value is
    /// byte-swapped into the big-endian message word.
    pub fn set_time(&mut self, time: BlockTime) {
        self.block2[1] = time.value().swap_bytes();
    }

    /// Install a nonce value
    pub fn set_nonce(&mut self, nonce: Nonce) {
        self.block2[3] = nonce.value().swap_bytes();
    }

    /// Double-hash the current assignment, returning the final hash state
    pub fn attempt(&mut self) -> [u32; 8] {
        let mut state = self.midstate;
        sha256::compress_block(&mut state, &self.block2, &mut self.w);
        sha256::second_pass(&mut state, &mut self.w);
        state
    }

    /// Wire-order digest of the current assignment
    pub fn digest(&mut self) -> [u8; 32] {
        let state = self.attempt();
        let mut digest = [0u8; 32];
        utils::words_to_bytes_be(&state, &mut digest);
        digest
    }
}

/// Multi-threaded double-SHA-256 worker
pub struct Sha256dWorker {
    thread_count: usize,
    stats: Arc<SharedStats>,
}

impl Sha256dWorker {
    /// Create a new worker with the given thread count (0 means all CPUs)
    pub fn new(thread_count: usize) -> Self {
        let thread_count = if thread_count == 0 {
            num_cpus::get()
        } else {
            thread_count
        };

        Self {
            thread_count,
            stats: Arc::new(SharedStats::new()),
        }
    }

    /// Search one nonce span at a fixed time value
    async fn mine_range(
        thread_id: usize,
        mut engine: Sha256dEngine,
        range: NonceRange,
        time: BlockTime,
        target: Target,
        stats: Arc<SharedStats>,
        cancellation: CancellationToken,
        solution_tx: mpsc::UnboundedSender<Solution>,
    ) {
        debug!("Thread {} searching {} nonces from {}", thread_id, range.count, range.start);

        let mut nonce = range.start;
        let mut remaining = range.count;

        while remaining > 0 {
            if cancellation.is_cancelled() {
                debug!("Thread {} cancelled", thread_id);
                return;
            }

            let batch = remaining.min(BATCH_SIZE);
            for _ in 0..batch {
                engine.set_nonce(nonce);
                let state = engine.attempt();
                if target.is_met_state_le(&state) {
                    stats.record_solution();

                    let mut digest = [0u8; 32];
                    utils::words_to_bytes_be(&state, &mut digest);
                    // Receiver may already be gone if a sibling won
                    let _ = solution_tx.send(Solution { nonce, time, digest });
                    return;
                }
                let _ = nonce.increment();
            }

            remaining -= batch;
            stats.record_hashes(batch);
            task::yield_now().await;
        }
    }

    /// Run one full-nonce-space round at a fixed time value.
    ///
    /// Returns the first solution any thread reports, or `None` when every
    /// span is exhausted.
    async fn mine_round(
        &self,
        header: &BlockHeader,
        time: BlockTime,
        start_nonce: Nonce,
        target: Target,
        cancellation: &CancellationToken,
    ) -> Result<Option<Solution>> {
        let mut round_header = *header;
        round_header.set_time(time);

        let round_token = cancellation.child_token();
        let (solution_tx, mut solution_rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(self.thread_count);
        for (thread_id, range) in partition_nonce_space(start_nonce, self.thread_count)
            .into_iter()
            .enumerate()
        {
            let engine = Sha256dEngine::new(&round_header)?;
            handles.push(task::spawn(Self::mine_range(
                thread_id,
                engine,
                range,
                time,
                target,
                Arc::clone(&self.stats),
                round_token.clone(),
                solution_tx.clone(),
            )));
        }
        drop(solution_tx);

        let result = tokio::select! {
            solution = solution_rx.recv() => Ok(solution),
            _ = cancellation.cancelled() => Err(Error::cancelled("sha256d mining")),
        };

        // Stop sibling threads before moving to the next time value
        round_token.cancel();
        for handle in handles {
            let _ = handle.await;
        }

        result
    }
}

#[async_trait]
impl MiningWorker for Sha256dWorker {
    fn worker_type(&self) -> &'static str {
        "sha256d"
    }

    async fn mine(
        &mut self,
        header: BlockHeader,
        target: Target,
        limits: SearchLimits,
        cancellation: CancellationToken,
        stats_tx: Option<mpsc::UnboundedSender<MiningStats>>,
    ) -> Result<SearchOutcome> {
        let span = mining_span(self.worker_type(), &target);
        let _enter = span.enter();

        info!(
            "Starting sha256d mining with {} threads (difficulty level: {})",
            self.thread_count,
            target.difficulty_level()
        );

        self.stats.begin();

        let stats_token = cancellation.child_token();
        let stats_handle = stats_tx.map(|tx| {
            let stats = Arc::clone(&self.stats);
            let token = stats_token.clone();
            task::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(5));
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let _ = tx.send(stats.to_mining_stats());
                        }
                        _ = token.cancelled() => break,
                    }
                }
            })
        });

        // Time values are tried strictly in order so the earliest viable
        // time wins. The first round starts at the header's nonce; later
        // rounds reopen the nonce space from zero.
        let mut outcome = Ok(SearchOutcome::Exhausted);
        for increment in 0..=limits.max_time_increments {
            if cancellation.is_cancelled() {
                outcome = Err(Error::cancelled("sha256d mining"));
                break;
            }

            let time = BlockTime::new(header.time.value().wrapping_add(increment));
            let start_nonce = if increment == 0 {
                header.nonce
            } else {
                Nonce::new(0)
            };

            if increment > 0 {
                debug!("Nonce space exhausted, advancing time to {}", time);
            }

            match self
                .mine_round(&header, time, start_nonce, target, &cancellation)
                .await
            {
                Ok(Some(solution)) => {
                    info!(
                        "Solution found: nonce={} time={} digest={}",
                        solution.nonce,
                        solution.time,
                        solution.digest_display()
                    );
                    outcome = Ok(SearchOutcome::Found(solution));
                    break;
                }
                Ok(None) => continue,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        stats_token.cancel();
        if let Some(handle) = stats_handle {
            let _ = handle.await;
        }
        self.stats.end();

        let final_stats = self.stats.to_mining_stats();
        info!(
            "sha256d mining finished. Total hashes: {}, rate: {}",
            final_stats.total_hashes,
            utils::format_hash_rate(final_stats.average_hash_rate)
        );

        outcome
    }

    fn stats(&self) -> MiningStats {
        self.stats.to_mining_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Sha256;
    use crate::CompactBits;

    fn genesis_header(nonce: u32) -> BlockHeader {
        BlockHeader::from_display_hex(
            1,
            "0000000000000000000000000000000000000000000000000000000000000000",
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            BlockTime::new(1_231_006_505),
            CompactBits::new(0x1d00_ffff),
            Nonce::new(nonce),
        )
        .unwrap()
    }

    #[test]
    fn test_engine_matches_full_double_hash_across_nonces() {
        // The midstate is computed once in the constructor; every subsequent
        // nonce must still produce exactly the digest of the full header.
        let mut header = genesis_header(0);
        let mut engine = Sha256dEngine::new(&header).unwrap();

        for nonce in (0u32..2000).step_by(97) {
            header.set_nonce(Nonce::new(nonce));
            engine.set_nonce(Nonce::new(nonce));
            assert_eq!(engine.digest(), Sha256::hash_double(&header.serialize()));
        }
    }

    #[test]
    fn test_engine_time_updates() {
        let mut header = genesis_header(123);
        let mut engine = Sha256dEngine::new(&header).unwrap();

        header.set_time(BlockTime::new(1_231_006_999));
        engine.set_time(BlockTime::new(1_231_006_999));
        engine.set_nonce(header.nonce);
        assert_eq!(engine.digest(), Sha256::hash_double(&header.serialize()));
    }

    #[test]
    fn test_genesis_block_digest() {
        let header = genesis_header(2_083_236_893);
        let mut engine = Sha256dEngine::new(&header).unwrap();
        engine.set_nonce(header.nonce);

        assert_eq!(
            utils::hash_to_display_hex(&engine.digest()),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );

        let target = Target::from_compact(header.bits).unwrap();
        assert!(target.is_met_state_le(&engine.attempt()));
    }

    #[tokio::test]
    async fn test_worker_finds_easy_solution() {
        let mut worker = Sha256dWorker::new(1);
        let outcome = worker
            .mine(
                genesis_header(0),
                Target::max(),
                SearchLimits::default(),
                CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        let solution = *outcome.solution().expect("easy target must be met");
        // Reported digest must be the real digest of the winning assignment
        let mut check = genesis_header(solution.nonce.value());
        check.set_time(solution.time);
        assert_eq!(Sha256::hash_double(&check.serialize()), solution.digest);
    }

    #[tokio::test]
    async fn test_worker_finds_genesis_nonce() {
        // Starting a few nonces below the known solution, the search must
        // stop exactly on it.
        let mut worker = Sha256dWorker::new(1);
        let header = genesis_header(2_083_236_890);
        let target = Target::from_compact(header.bits).unwrap();

        let outcome = worker
            .mine(
                header,
                target,
                SearchLimits::default(),
                CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        let solution = outcome.solution().expect("genesis nonce is in range");
        assert_eq!(solution.nonce, Nonce::new(2_083_236_893));
        assert_eq!(solution.time, header.time);
        assert_eq!(
            solution.digest_display(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[tokio::test]
    async fn test_worker_cancellation() {
        let mut worker = Sha256dWorker::new(1);
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let result = worker
            .mine(
                genesis_header(0),
                Target::min(),
                SearchLimits::default(),
                cancellation,
                None,
            )
            .await;

        assert!(matches!(result, Err(Error::Cancelled { .. })));
    }
}
