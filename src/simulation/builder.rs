//! Configuring and validating simulations.

use std::collections::HashSet;

use crate::{
    block::{MinerId, Timestamp, GENESIS_FINDER},
    miner::MinerState,
    rng::SimRng,
    sampling::IntervalSampler,
    simulation::{Simulation, TickPolicy},
};

/// Describes one miner before the run starts.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub id: MinerId,
    /// Share of the total network hashrate, an integer between 0 and 100.
    pub hashrate_perc: u64,
    /// Time for this miner's blocks to reach all other miners, in ms.
    pub propagation: Timestamp,
    pub is_selfish: bool,
}

/// Builds a [`Simulation`].
#[derive(Debug, Default, Clone)]
pub struct SimulationBuilder {
    miners: Vec<MinerConfig>,
    duration: Option<Timestamp>,
    seeds: Option<(u64, u64)>,
    tick_policy: TickPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationBuildError {
    #[error("no miners were added")]
    NoMinersGiven,
    #[error("hashrate percentages sum to {0}, not 100")]
    PercentagesDoNotSumTo100(u64),
    #[error("hashrate percentage {0} is not in the range 0..=100")]
    BadPercentage(u64),
    #[error("duplicate miner id {0}")]
    DuplicateMinerId(MinerId),
    #[error("miner id {0} is reserved for the genesis block")]
    ReservedMinerId(MinerId),
    #[error("simulation duration must be greater than 0")]
    ZeroDuration,
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a miner with an explicit configuration.
    pub fn miner(mut self, config: MinerConfig) -> Self {
        self.miners.push(config);
        self
    }

    /// Add an honest miner; its id is its position in order of addition.
    pub fn honest(self, hashrate_perc: u64, propagation: Timestamp) -> Self {
        let id = self.miners.len();
        self.miner(MinerConfig { id, hashrate_perc, propagation, is_selfish: false })
    }

    /// Add a selfish miner; its id is its position in order of addition.
    pub fn selfish(self, hashrate_perc: u64, propagation: Timestamp) -> Self {
        let id = self.miners.len();
        self.miner(MinerConfig { id, hashrate_perc, propagation, is_selfish: true })
    }

    /// Bound the run; [`Simulation::run`] advances to exactly this
    /// timestamp. Without a duration the simulation can only be advanced
    /// incrementally with [`Simulation::advance_to`].
    pub fn duration(mut self, duration: Timestamp) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Seed the inter-arrival and finder-picking generators. Without this,
    /// both generators are seeded from OS entropy.
    pub fn seeds(mut self, interval_seed: u64, picker_seed: u64) -> Self {
        self.seeds = Some((interval_seed, picker_seed));
        self
    }

    /// How simulated time advances (1 ms ticks by default).
    pub fn tick_policy(mut self, policy: TickPolicy) -> Self {
        self.tick_policy = policy;
        self
    }

    pub(crate) fn seed_pair(&self) -> Option<(u64, u64)> {
        self.seeds
    }

    /// Validates the configuration and creates a [`Simulation`].
    pub fn build(self) -> Result<Simulation, SimulationBuildError> {
        use SimulationBuildError::*;

        let SimulationBuilder { miners, duration, seeds, tick_policy } = self;

        if miners.is_empty() {
            return Err(NoMinersGiven);
        }
        if duration == Some(0) {
            return Err(ZeroDuration);
        }

        let mut seen = HashSet::new();
        for config in &miners {
            if config.id == GENESIS_FINDER {
                return Err(ReservedMinerId(config.id));
            }
            if !seen.insert(config.id) {
                return Err(DuplicateMinerId(config.id));
            }
            if config.hashrate_perc > 100 {
                return Err(BadPercentage(config.hashrate_perc));
            }
        }

        let total: u64 = miners.iter().map(|config| config.hashrate_perc).sum();
        if total != 100 {
            return Err(PercentagesDoNotSumTo100(total));
        }

        let (interval_rng, picker_rng) = match seeds {
            Some((interval_seed, picker_seed)) => (
                SimRng::seed_from_u64(interval_seed),
                SimRng::seed_from_u64(picker_seed),
            ),
            None => (SimRng::from_entropy(), SimRng::from_entropy()),
        };

        let miners = miners
            .into_iter()
            .map(|config| {
                MinerState::new(
                    config.id,
                    config.hashrate_perc,
                    config.propagation,
                    config.is_selfish,
                )
            })
            .collect();

        Ok(Simulation::from_parts(
            miners,
            IntervalSampler::new(interval_rng),
            picker_rng,
            duration,
            tick_policy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_build() {
        SimulationBuilder::new()
            .honest(60, 100)
            .selfish(40, 100)
            .duration(1_000)
            .build()
            .expect("valid simulation build");
    }

    #[test]
    fn rejects_empty_miner_set() {
        assert!(matches!(
            SimulationBuilder::new().build(),
            Err(SimulationBuildError::NoMinersGiven)
        ));
    }

    #[test]
    fn rejects_bad_percentage_sum() {
        let result = SimulationBuilder::new().honest(60, 0).honest(30, 0).build();
        assert!(matches!(
            result,
            Err(SimulationBuildError::PercentagesDoNotSumTo100(90))
        ));
    }

    #[test]
    fn rejects_out_of_range_percentage() {
        let result = SimulationBuilder::new()
            .miner(MinerConfig { id: 0, hashrate_perc: 101, propagation: 0, is_selfish: false })
            .build();
        assert!(matches!(result, Err(SimulationBuildError::BadPercentage(101))));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = SimulationBuilder::new()
            .miner(MinerConfig { id: 4, hashrate_perc: 50, propagation: 0, is_selfish: false })
            .miner(MinerConfig { id: 4, hashrate_perc: 50, propagation: 0, is_selfish: false })
            .build();
        assert!(matches!(result, Err(SimulationBuildError::DuplicateMinerId(4))));
    }

    #[test]
    fn rejects_reserved_genesis_id() {
        let result = SimulationBuilder::new()
            .miner(MinerConfig {
                id: GENESIS_FINDER,
                hashrate_perc: 100,
                propagation: 0,
                is_selfish: false,
            })
            .build();
        assert!(matches!(result, Err(SimulationBuildError::ReservedMinerId(_))));
    }

    #[test]
    fn rejects_zero_duration() {
        let result = SimulationBuilder::new().honest(100, 0).duration(0).build();
        assert!(matches!(result, Err(SimulationBuildError::ZeroDuration)));
    }
}
