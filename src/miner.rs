//! Miner state: local chains, honest mining, reorgs, and statistics.

pub mod selfish;

use log::trace;

use crate::block::{Block, MinerId, Timestamp};

/// One miner's full node as seen by the simulation loop.
///
/// Each miner owns its local chain outright; chains are never shared between
/// miners and index 0 is always the genesis block. Local chains may differ
/// slightly between miners because of propagation time. All mutation goes
/// through the methods below, driven by the simulation loop.
#[derive(Debug, Clone)]
pub struct MinerState {
    /// Identifier used to track which miner created a certain block.
    id: MinerId,
    /// Share of the total network hashrate, as an integer between 0 and 100.
    hashrate_perc: u64,
    /// The time for blocks produced by this miner to reach all other miners.
    propagation: Timestamp,
    /// Local chain on the miner's full node.
    chain: Vec<Block>,
    /// Number of blocks this miner created that were reorged out.
    stale_count: u64,
    /// Whether this miner follows the worst-case selfish mining strategy.
    is_selfish: bool,
}

impl MinerState {
    pub fn new(
        id: MinerId,
        hashrate_perc: u64,
        propagation: Timestamp,
        is_selfish: bool,
    ) -> Self {
        MinerState {
            id,
            hashrate_perc,
            propagation,
            chain: vec![Block::genesis()],
            stale_count: 0,
            is_selfish,
        }
    }

    #[inline]
    pub fn id(&self) -> MinerId {
        self.id
    }

    #[inline]
    pub fn hashrate_perc(&self) -> u64 {
        self.hashrate_perc
    }

    #[inline]
    pub fn propagation(&self) -> Timestamp {
        self.propagation
    }

    #[inline]
    pub fn is_selfish(&self) -> bool {
        self.is_selfish
    }

    #[inline]
    pub fn stale_count(&self) -> u64 {
        self.stale_count
    }

    /// The miner's full local chain, withheld and in-flight blocks included.
    #[inline]
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn strategy_name(&self) -> &'static str {
        if self.is_selfish {
            "selfish"
        } else {
            "honest"
        }
    }

    /// Append a block found by this miner at `find_time` to its local chain.
    ///
    /// `best_chain_size` is the network-best length observed at the end of
    /// the previous step; only selfish miners consult it, to detect a won
    /// 1-block race.
    pub fn found_block(&mut self, find_time: Timestamp, best_chain_size: usize) {
        if self.is_selfish {
            self.found_block_selfish(find_time, best_chain_size);
        } else {
            self.chain
                .push(Block::new(self.id, find_time + self.propagation));
        }
    }

    /// Number of trailing chain entries that have not reached the rest of
    /// the network yet. Unpublished blocks are always a contiguous suffix,
    /// so a tail scan suffices.
    pub fn unpublished_count(&self, now: Timestamp) -> usize {
        self.chain
            .iter()
            .rev()
            .take_while(|block| block.arrival > now)
            .count()
    }

    /// The prefix of the local chain the rest of the network has received.
    pub fn published_chain(&self, now: Timestamp) -> &[Block] {
        &self.chain[..self.chain.len() - self.unpublished_count(now)]
    }

    /// Earliest in-flight arrival strictly after `now`, if any. Withheld
    /// blocks have no scheduled arrival and are skipped.
    pub(crate) fn earliest_pending_arrival(&self, now: Timestamp) -> Option<Timestamp> {
        self.chain
            .iter()
            .rev()
            .take_while(|block| block.arrival > now)
            .filter(|block| !block.is_withheld())
            .map(|block| block.arrival)
            .min()
    }

    /// Let this miner know about the longest published chain.
    pub fn notify_best_chain(&mut self, best: &[Block], now: Timestamp) {
        if self.is_selfish {
            self.maybe_selfish_reveal(best, now);
        }
        self.maybe_reorg(best);
    }

    /// Switch to `best` if it is strictly longer than the local chain. Every
    /// displaced or truncated self-found block counts as stale.
    fn maybe_reorg(&mut self, best: &[Block]) {
        // All blocks are at the same difficulty, so longest means most work.
        if best.len() <= self.chain.len() {
            return;
        }

        // Only the last few blocks ever change; overwrite in place instead
        // of wiping and reallocating the whole vector.
        for (height, block) in best.iter().enumerate() {
            if height >= self.chain.len() {
                self.chain.push(*block);
            } else if self.chain[height] != *block {
                if self.chain[height].finder == self.id {
                    self.stale_count += 1;
                    trace!("miner {}: own block at height {} reorged out", self.id, height);
                }
                self.chain[height] = *block;
            }
            // else: same block at the same height.
        }

        if self.chain.len() > best.len() {
            for block in &self.chain[best.len()..] {
                if block.finder == self.id {
                    self.stale_count += 1;
                }
            }
            self.chain.truncate(best.len());
        }
    }

    /// Count of published blocks found by this miner.
    pub fn blocks_found(&self, now: Timestamp) -> usize {
        self.chain
            .iter()
            .filter(|block| block.finder == self.id && block.arrival <= now)
            .count()
    }

    /// Share of published blocks found by this miner, the genesis excluded
    /// from the denominator. Zero while only the genesis is published.
    pub fn blocks_found_share(&self, now: Timestamp) -> f64 {
        let published = self.chain.len() - self.unpublished_count(now);
        if published <= 1 {
            return 0.0;
        }
        self.blocks_found(now) as f64 / (published - 1) as f64
    }

    /// Proportion of stale blocks per block found by this miner. Zero when
    /// nothing was found.
    pub fn stale_rate(&self, now: Timestamp) -> f64 {
        let found = self.blocks_found(now);
        if found == 0 {
            return 0.0;
        }
        self.stale_count as f64 / found as f64
    }
}
