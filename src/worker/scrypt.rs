//! Scrypt mining worker
//!
//! Memory-hard proof of work in the Litecoin style: the digest of a header
//! assignment is `scrypt(header, header, N=1024, r=1, p=1, dkLen=32)`, with
//! the header serving as both password and salt. Because HMAC hashes the
//! 80-byte password down to `SHA256(header)` before padding, the engine caches
//! the SHA-256 midstate of the invariant first 64 header bytes and derives the
//! per-nonce HMAC key with a single extra compression.

use super::{
    mining_span, partition_nonce_space, MiningStats, MiningWorker, NonceRange, SearchLimits,
    SearchOutcome, SharedStats, Solution,
};
use crate::crypto::{Midstate, Scrypt, ScryptParams};
use crate::{utils, BlockHeader, BlockTime, Error, Nonce, Result, Target};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Attempts between cancellation checks; scrypt attempts are many orders of
/// magnitude slower than plain hashing, so batches are short
const BATCH_SIZE: u64 = 64;

/// Scrypt proof-of-work engine for one header prefix
pub struct ScryptPowEngine {
    header: BlockHeader,
    prefix: Midstate,
    scrypt: Scrypt,
}

impl ScryptPowEngine {
    pub fn new(header: &BlockHeader, params: ScryptParams) -> Result<Self> {
        let prefix = Midstate::compute(&header.serialize()[..64])?;
        Ok(Self {
            header: *header,
            prefix,
            scrypt: Scrypt::new(params),
        })
    }

    /// Install a time value. Time lives in the header tail, past the cached
    /// 64-byte prefix, so the midstate stays valid.
    pub fn set_time(&mut self, time: BlockTime) {
        self.header.set_time(time);
    }

    /// Proof-of-work digest for one nonce assignment
    pub fn attempt(&mut self, nonce: Nonce) -> Result<[u8; 32]> {
        self.header.set_nonce(nonce);
        let bytes = self.header.serialize();

        // HMAC would hash the 80-byte password down to SHA256(header);
        // finish that digest from the cached prefix instead
        let key = self.prefix.finish(&bytes[64..])?;
        self.scrypt.install_key(&key);

        let derived = self.scrypt.derive_with_current_key(&bytes, 32)?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&derived);
        Ok(digest)
    }
}

/// Multi-threaded scrypt worker
pub struct ScryptWorker {
    params: ScryptParams,
    thread_count: usize,
    stats: Arc<SharedStats>,
}

impl ScryptWorker {
    /// Create a new worker with the given thread count (0 means all CPUs)
    pub fn new(params: ScryptParams, thread_count: usize) -> Self {
        let thread_count = if thread_count == 0 {
            num_cpus::get()
        } else {
            thread_count
        };

        Self {
            params,
            thread_count,
            stats: Arc::new(SharedStats::new()),
        }
    }

    /// Search one nonce span at a fixed time value
    async fn mine_range(
        thread_id: usize,
        mut engine: ScryptPowEngine,
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
                let digest = match engine.attempt(nonce) {
                    Ok(digest) => digest,
                    Err(e) => {
                        error!("Thread {} scrypt attempt failed: {}", thread_id, e);
                        return;
                    }
                };
                if target.is_met_hash_le(&digest) {
                    stats.record_solution();
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

    /// Run one full-nonce-space round at a fixed time value
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
            let engine = ScryptPowEngine::new(&round_header, self.params)?;
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
            _ = cancellation.cancelled() => Err(Error::cancelled("scrypt mining")),
        };

        round_token.cancel();
        for handle in handles {
            let _ = handle.await;
        }

        result
    }
}

#[async_trait]
impl MiningWorker for ScryptWorker {
    fn worker_type(&self) -> &'static str {
        "scrypt"
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
            "Starting scrypt mining with {} threads, N={} r={} p={} (difficulty level: {})",
            self.thread_count,
            self.params.n,
            self.params.r,
            self.params.p,
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

        let mut outcome = Ok(SearchOutcome::Exhausted);
        for increment in 0..=limits.max_time_increments {
            if cancellation.is_cancelled() {
                outcome = Err(Error::cancelled("scrypt mining"));
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
            "scrypt mining finished. Total hashes: {}, rate: {}",
            final_stats.total_hashes,
            utils::format_hash_rate(final_stats.average_hash_rate)
        );

        outcome
    }

    fn stats(&self) -> MiningStats {
        self.stats.to_mining_stats()
    }
}
