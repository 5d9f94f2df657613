/*!
Discrete-event Monte Carlo simulator of Bitcoin-style Nakamoto consensus.

Miners with heterogeneous hashrate shares and fixed block propagation delays
mine on their own local chains; block inter-arrival times are drawn from an
exponential distribution and each find is attributed by a hashrate-weighted
pick. Miners follow today's Bitcoin Core behaviour (mine on your own block
immediately, switch only to a strictly longer propagated chain, break length
ties first-seen), and any miner can instead run the worst-case (gamma = 0)
selfish mining strategy from the 2013 "Majority is not Enough" paper.

The simulator measures, over one run or many independent runs, each miner's
share of the best chain and its stale-block rate.
*/

pub mod block;
pub mod miner;
pub mod prelude;
pub mod results;
pub mod rng;
pub mod sampling;
pub mod simulation;
