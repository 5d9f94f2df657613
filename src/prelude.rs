/*!
Re-export of common values and datatypes used for configuring, running, and
analyzing simulations. Must be imported manually.

```
use nakamoto_sim::prelude::*;
```
*/

use crate::{block, miner, results, rng, sampling, simulation};

pub use block::{Block, MinerId, Timestamp, GENESIS_FINDER, WITHHELD_ARRIVAL};

pub use miner::MinerState;

pub use results::{Format, GroupRow, GroupSummary, MinerRow, SimulationReport};

pub use rng::SimRng;

pub use sampling::{pick_finder, IntervalSampler, BLOCK_INTERVAL_MS};

pub use simulation::{
    MinerConfig, Simulation, SimulationBuildError, SimulationBuilder,
    SimulationError, SimulationGroup, TickPolicy,
};
