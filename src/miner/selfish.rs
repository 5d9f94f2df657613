//! Worst-case selfish mining: withholding, racing, and selective reveal.
//!
//! Implements the strategy from the 2013 "Majority is not Enough" paper
//! (<https://arxiv.org/pdf/1311.0243>, section 4.2) in its worst-case
//! setting, gamma = 0: in a 1-block race no other miner ever mines on top of
//! the selfish miner's block. Private blocks are encoded directly in the
//! miner's local chain with the withheld arrival sentinel, and revealing a
//! block is a rewrite of its arrival time.

use log::trace;

use crate::block::{Block, Timestamp, WITHHELD_ARRIVAL};

use super::MinerState;

impl MinerState {
    /// Length of the trailing run of withheld blocks, the private branch
    /// (`privateBranchLen` in the paper's algorithm).
    pub(crate) fn selfish_blocks(&self) -> usize {
        self.chain
            .iter()
            .rev()
            .take_while(|block| block.is_withheld())
            .count()
    }

    /// Selfish handling of a freshly found block.
    ///
    /// The miner always mines on top of its private chain and keeps the new
    /// block withheld, except when the new block wins a 1-block race: with
    /// exactly one withheld block and the public chain caught up to the same
    /// length, both blocks are published at once.
    pub(super) fn found_block_selfish(
        &mut self,
        find_time: Timestamp,
        best_chain_size: usize,
    ) {
        let is_race = self.selfish_blocks() == 1 && best_chain_size == self.chain.len();
        if is_race {
            let arrival = find_time + self.propagation;
            self.chain
                .last_mut()
                .expect("chain holds at least the genesis")
                .arrival = arrival;
            self.chain.push(Block::new(self.id, arrival));
            trace!("miner {}: won a 1-block race, publishing both blocks", self.id);
        } else {
            self.chain.push(Block::new(self.id, WITHHELD_ARRIVAL));
        }
    }

    /// Choose whether to reveal part of the private branch after observing
    /// the network-best published chain.
    ///
    /// While the local chain is at least as long as the best one, the miner
    /// keeps mining on it and reveals just enough withheld blocks to match
    /// the ground the public chain gained. A lead that has eroded to a
    /// single block triggers a full reveal instead, to win outright rather
    /// than enter a race.
    pub(super) fn maybe_selfish_reveal(&mut self, best: &[Block], now: Timestamp) {
        // Once their chain is longer we have to switch; the reorg path
        // overwrites the private branch.
        if best.len() > self.chain.len() {
            return;
        }

        let selfish_count = self.selfish_blocks();
        let current_lead = self.chain.len() - best.len();
        if selfish_count <= current_lead {
            return;
        }

        let mut reveal_count = selfish_count - current_lead;
        if selfish_count > 1 && current_lead == 1 {
            reveal_count = selfish_count;
        }

        // Broadcast by setting arrival times on the oldest withheld blocks;
        // the rest of the branch stays private.
        let start = self.chain.len() - selfish_count;
        for block in &mut self.chain[start..start + reveal_count] {
            block.arrival = now + self.propagation;
        }
        trace!(
            "miner {}: revealed {} of {} private blocks",
            self.id,
            reveal_count,
            selfish_count
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::block::{Block, Timestamp, WITHHELD_ARRIVAL};
    use crate::miner::MinerState;

    const S: usize = 0;
    const H: usize = 1;
    const T: Timestamp = 600_000;
    const P: Timestamp = 100;

    fn g() -> Block {
        Block::genesis()
    }

    fn b(finder: usize, arrival: Timestamp) -> Block {
        Block::new(finder, arrival)
    }

    fn w() -> Block {
        Block::new(S, WITHHELD_ARRIVAL)
    }

    fn selfish_with_chain(chain: Vec<Block>) -> MinerState {
        let mut miner = MinerState::new(S, 40, P, true);
        miner.chain = chain;
        miner
    }

    #[test]
    fn selfish_blocks_counts_the_withheld_suffix() {
        let miner = selfish_with_chain(vec![g(), b(S, T), w(), w()]);
        assert_eq!(miner.selfish_blocks(), 2);

        let miner = selfish_with_chain(vec![g(), b(S, T)]);
        assert_eq!(miner.selfish_blocks(), 0);
    }

    #[test]
    fn withheld_blocks_never_publish() {
        let miner = selfish_with_chain(vec![g(), b(S, T), w(), w()]);

        assert_eq!(miner.published_chain(Timestamp::MAX - 1).len(), 2);
        assert_eq!(miner.earliest_pending_arrival(T), None);
    }

    // Paper case (a): any state but a 1-block race, the pool finds a block
    // and lengthens its private branch.
    #[test]
    fn found_block_extends_private_branch() {
        let mut miner = selfish_with_chain(vec![g(), b(H, T), b(S, 2 * T)]);
        miner.found_block(3 * T, 3);

        assert_eq!(miner.chain(), &[g(), b(H, T), b(S, 2 * T), w()]);
        assert_eq!(miner.stale_count(), 0);
    }

    // Paper case (b): two branches of length 1, the pool finds the
    // race-deciding block and publishes both.
    #[test]
    fn found_block_wins_one_block_race() {
        let mut miner =
            selfish_with_chain(vec![g(), b(H, T), b(S, 2 * T), b(H, 3 * T), w()]);
        miner.found_block(6 * T, 5);

        assert_eq!(
            miner.chain(),
            &[
                g(),
                b(H, T),
                b(S, 2 * T),
                b(H, 3 * T),
                b(S, 6 * T + P),
                b(S, 6 * T + P),
            ]
        );
        assert_eq!(miner.stale_count(), 0);
    }

    // Paper case (f): the 1-block private lead is revealed to force a race
    // when the others catch up.
    #[test]
    fn reveal_single_private_block_forces_race() {
        let mut miner = selfish_with_chain(vec![g(), b(H, T), b(S, 2 * T), w()]);
        let best = vec![g(), b(H, T), b(S, 2 * T), b(H, 3 * T)];
        miner.notify_best_chain(&best, 3 * T);

        assert_eq!(miner.chain(), &[g(), b(H, T), b(S, 2 * T), b(S, 3 * T + P)]);
        assert_eq!(miner.stale_count(), 0);
    }

    // Paper case (g): a lead of 2 eroded to 1 reveals the entire private
    // branch to win decisively.
    #[test]
    fn reveal_everything_when_lead_erodes_to_one() {
        let mut miner =
            selfish_with_chain(vec![g(), b(H, T), b(S, 2 * T), w(), w()]);
        let best = vec![g(), b(H, T), b(S, 2 * T), b(H, 3 * T)];
        miner.notify_best_chain(&best, 3 * T);

        assert_eq!(
            miner.chain(),
            &[g(), b(H, T), b(S, 2 * T), b(S, 3 * T + P), b(S, 3 * T + P)]
        );
        assert_eq!(miner.stale_count(), 0);
    }

    // Paper case (h): with a lead above 2, reveal one oldest private block
    // to match the others' pace.
    #[test]
    fn reveal_oldest_block_with_long_lead() {
        let mut miner =
            selfish_with_chain(vec![g(), b(H, T), b(S, 2 * T), w(), w(), w()]);
        let best = vec![g(), b(H, T), b(S, 2 * T), b(H, 3 * T)];
        miner.notify_best_chain(&best, 3 * T);

        assert_eq!(
            miner.chain(),
            &[g(), b(H, T), b(S, 2 * T), b(S, 3 * T + P), w(), w()]
        );
        assert_eq!(miner.stale_count(), 0);
    }

    // Beyond the paper: the public chain wins two in a row against a
    // 1-block private lead, and the withheld block is reorged away.
    #[test]
    fn public_chain_overtakes_private_lead() {
        let mut miner =
            selfish_with_chain(vec![g(), b(H, T), b(S, 2 * T), b(H, 3 * T), w()]);
        let best = vec![
            g(),
            b(H, T),
            b(S, 2 * T),
            b(H, 3 * T),
            b(H, 4 * T),
            b(H, 5 * T),
        ];
        miner.notify_best_chain(&best, 5 * T);

        assert_eq!(miner.chain(), &best[..]);
        assert_eq!(miner.stale_count(), 1);
    }

    // Beyond the paper: the others find several blocks in a row while the
    // pool holds a long lead; the reveal matches their gain exactly.
    #[test]
    fn reveal_matches_multiple_public_blocks() {
        let mut miner =
            selfish_with_chain(vec![g(), b(S, T), w(), w(), w(), w()]);
        let best = vec![g(), b(S, T), b(H, 2 * T), b(H, 3 * T)];
        miner.notify_best_chain(&best, 3 * T);

        // Lead 2 with four withheld blocks: reveal two, keep two private.
        assert_eq!(
            miner.chain(),
            &[g(), b(S, T), b(S, 3 * T + P), b(S, 3 * T + P), w(), w()]
        );
        assert_eq!(miner.stale_count(), 0);
    }

    #[test]
    fn no_reveal_while_lead_covers_private_branch() {
        let mut miner =
            selfish_with_chain(vec![g(), b(S, T), b(S, 2 * T), w()]);
        // Best chain is two blocks behind: lead 2 >= 1 withheld, hold.
        let best = vec![g(), b(S, T)];
        miner.notify_best_chain(&best, 3 * T);

        assert_eq!(miner.chain(), &[g(), b(S, T), b(S, 2 * T), w()]);
    }
}
