//! Drawing block inter-arrival times and attributing block finds.

use crate::{
    block::Timestamp, miner::MinerState, rng::SimRng, simulation::SimulationError,
};

/// Expected time between blocks, the mean of the inter-arrival distribution.
pub const BLOCK_INTERVAL_MS: Timestamp = 600_000;

/// Maps integer percentages in `[0, 100]` onto cumulative `u64` thresholds.
pub(crate) const PERC_MULTIPLIER: u64 = u64::MAX / 100;

/// Samples the time between consecutive blocks across the whole network.
#[derive(Debug, Clone)]
pub struct IntervalSampler {
    rng: SimRng,
}

impl IntervalSampler {
    pub fn new(rng: SimRng) -> Self {
        IntervalSampler { rng }
    }

    /// Time between the last and the next block, in whole milliseconds.
    ///
    /// Zero is a legal result; the simulation loop must be prepared to
    /// resolve several finds at the same timestamp.
    pub fn next_interval(&mut self) -> Result<Timestamp, SimulationError> {
        let drawn = self.rng.exp(BLOCK_INTERVAL_MS as f64);
        if drawn < 0.0 {
            return Err(SimulationError::NegativeInterval(drawn));
        }
        Ok(drawn.round() as Timestamp)
    }
}

/// Pick which miner found the latest block, weighted by hashrate share.
///
/// Each miner's percentage is scaled by `u64::MAX / 100` into a band of the
/// 64-bit space, and one uniform draw lands in exactly one band. The
/// comparison is strict so that a zero-percentage miner can never win.
/// Returns the winner's index within `miners`, or
/// [`SimulationError::PercentagesDoNotSumTo100`] if the bands do not cover
/// the draw.
pub fn pick_finder(
    miners: &[MinerState],
    rng: &mut SimRng,
) -> Result<usize, SimulationError> {
    let drawn = rng.next_u64();
    let mut threshold = 0u64;
    for (index, miner) in miners.iter().enumerate() {
        threshold += miner.hashrate_perc() * PERC_MULTIPLIER;
        if threshold > drawn {
            return Ok(index);
        }
    }
    Err(SimulationError::PercentagesDoNotSumTo100)
}
