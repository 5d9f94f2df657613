use std::env;

use anyhow::Result;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use nakamoto_sim::prelude::*;

/// One day of simulated time.
const DAY_MS: Timestamp = 24 * 60 * 60 * 1000;

/// Simulate the Bitcoin mining process with five miners of heterogeneous
/// hashrate and a fixed 100 ms block propagation time, the largest of them
/// running the selfish mining strategy. Prints per-miner statistics once per
/// simulated day. The number of days is the first argument (default 14).
fn main() -> Result<()> {
    SimpleLogger::new().with_level(LevelFilter::Info).init().unwrap();

    let days: u64 = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(14);

    let mut simulation = SimulationBuilder::new()
        .honest(10, 100)
        .honest(15, 100)
        .honest(15, 100)
        .honest(20, 100)
        .selfish(40, 100)
        .tick_policy(TickPolicy::EventJump)
        .build()?;

    for _ in 0..days {
        simulation.advance_to(simulation.now() + DAY_MS)?;
        println!("{}", simulation.report());
    }

    Ok(())
}
