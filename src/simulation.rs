//! Driving simulations: the event loop, tick policies, and parallel groups.

use std::num::NonZeroUsize;

use log::{debug, trace};
use rayon::prelude::*;

use crate::{
    block::{Block, Timestamp},
    miner::MinerState,
    results::{GroupSummary, SimulationReport},
    rng::SimRng,
    sampling::{pick_finder, IntervalSampler},
};

pub mod builder;

pub use builder::{MinerConfig, SimulationBuildError, SimulationBuilder};

/// How simulated time advances between steps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TickPolicy {
    /// Fixed 1 ms ticks; the step body runs once per millisecond.
    #[default]
    Millisecond,
    /// Jump straight to the next block find or pending block arrival.
    /// Produces chain states identical to [`TickPolicy::Millisecond`] at
    /// every timestamp, in far fewer steps.
    EventJump,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The finder picker exhausted its cumulative thresholds with no winner.
    #[error("miner hashrate percentages do not sum to 100")]
    PercentagesDoNotSumTo100,
    /// An exponential draw came back negative. Impossible by construction;
    /// checked so a broken generator fails the run instead of corrupting it.
    #[error("inter-arrival draw produced a negative interval ({0})")]
    NegativeInterval(f64),
    #[error("cannot advance to {target} ms, the clock is already at {now} ms")]
    DurationInPast { target: Timestamp, now: Timestamp },
    #[error("run() requires a configured duration; advance with advance_to instead")]
    NoDurationConfigured,
    #[error(transparent)]
    Build(#[from] SimulationBuildError),
}

/// A single simulation instance: the miners, the clock, and the block
/// schedule.
///
/// The loop is single-threaded and deterministic. Each step resolves every
/// block find due at the current time, computes the network-best published
/// chain, and notifies the miners, which may reveal private blocks or
/// reorganize.
#[derive(Debug, Clone)]
pub struct Simulation {
    miners: Vec<MinerState>,
    intervals: IntervalSampler,
    picker_rng: SimRng,
    clock: Timestamp,
    /// Absolute time of the next block arrival. Not drawn until the first
    /// advance so that construction stays infallible.
    next_block_time: Timestamp,
    scheduled: bool,
    /// Best published length observed at the end of the previous step; fed
    /// back into `found_block` so selfish miners can detect a race.
    best_chain_size: usize,
    duration: Option<Timestamp>,
    tick_policy: TickPolicy,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    pub(crate) fn from_parts(
        miners: Vec<MinerState>,
        intervals: IntervalSampler,
        picker_rng: SimRng,
        duration: Option<Timestamp>,
        tick_policy: TickPolicy,
    ) -> Self {
        Simulation {
            miners,
            intervals,
            picker_rng,
            clock: 0,
            next_block_time: 0,
            scheduled: false,
            best_chain_size: 1,
            duration,
            tick_policy,
        }
    }

    /// Current simulated time in milliseconds.
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.clock
    }

    #[inline]
    pub fn miners(&self) -> &[MinerState] {
        &self.miners
    }

    pub fn duration(&self) -> Option<Timestamp> {
        self.duration
    }

    /// The longest published chain across all miners at the current time,
    /// ties broken first-seen.
    pub fn best_chain(&self) -> &[Block] {
        let (index, _, _) = self.best_chain_candidate(self.clock);
        self.miners[index].published_chain(self.clock)
    }

    /// Per-miner statistics at the current time.
    pub fn report(&self) -> SimulationReport {
        SimulationReport::new(self)
    }

    /// Run the whole configured duration.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        let duration = self.duration.ok_or(SimulationError::NoDurationConfigured)?;
        debug!(
            "running simulation of {} miners for {} ms ({:?})",
            self.miners.len(),
            duration,
            self.tick_policy,
        );
        self.advance_to(duration)
    }

    /// Advance simulated time to `target`, processing every step in
    /// `[now, target)`. Statistics may then be read at `target`.
    pub fn advance_to(&mut self, target: Timestamp) -> Result<(), SimulationError> {
        if target < self.clock {
            return Err(SimulationError::DurationInPast { target, now: self.clock });
        }
        if !self.scheduled {
            self.next_block_time = self.intervals.next_interval()?;
            self.scheduled = true;
        }

        match self.tick_policy {
            TickPolicy::Millisecond => {
                while self.clock < target {
                    self.step(self.clock)?;
                    self.clock += 1;
                }
            }
            TickPolicy::EventJump => {
                // Nothing observable happens between events, so stepping at
                // the current time and then jumping to the next find or
                // arrival visits exactly the timestamps at which the
                // millisecond policy would change state. A step that did
                // change state is followed by a 1 ms micro-step: with a zero
                // propagation delay a revealed chain is published instantly,
                // and the reaction the millisecond policy shows at the next
                // tick must not be deferred to the next scheduled event.
                while self.clock < target {
                    let previous_best = self.best_chain_size;
                    let found = self.step(self.clock)?;
                    let changed = found || self.best_chain_size != previous_best;
                    let next = if changed {
                        self.clock + 1
                    } else {
                        self.next_event_after(self.clock)
                    };
                    self.clock = next.min(target);
                }
            }
        }
        Ok(())
    }

    /// One simulation step at time `now`: resolve due block finds, compute
    /// the best published chain, and notify every miner. Returns whether any
    /// block was found.
    fn step(&mut self, now: Timestamp) -> Result<bool, SimulationError> {
        // `while`, not `if`: a zero-length interval is legal and may fire
        // again at the same timestamp.
        let mut found = false;
        while now == self.next_block_time {
            let finder = pick_finder(&self.miners, &mut self.picker_rng)?;
            let best_chain_size = self.best_chain_size;
            self.miners[finder].found_block(now, best_chain_size);
            trace!("block found at {} ms by miner {}", now, self.miners[finder].id());
            self.next_block_time += self.intervals.next_interval()?;
            found = true;
        }
        debug_assert!(now < self.next_block_time);

        let (best_index, best_len, _) = self.best_chain_candidate(now);

        // Notify in configuration order. The owner of the best chain is
        // skipped: both reorg and reveal are vacuous against the miner's
        // own published prefix, and skipping it lets the borrow of `best`
        // coexist with the mutation of everyone else.
        let (before, rest) = self.miners.split_at_mut(best_index);
        let (owner, after) = rest.split_first_mut().expect("best chain has an owner");
        let best = owner.published_chain(now);
        for miner in before.iter_mut().chain(after.iter_mut()) {
            miner.notify_best_chain(best, now);
        }

        self.best_chain_size = best_len;
        Ok(found)
    }

    /// Index, length, and tip arrival of the best published chain at `now`:
    /// strictly greater length wins, then the strictly earlier tip arrival
    /// (first-seen), then the first miner encountered.
    fn best_chain_candidate(&self, now: Timestamp) -> (usize, usize, Timestamp) {
        let mut best: (usize, usize, Timestamp) = (0, 0, 0);
        for (index, miner) in self.miners.iter().enumerate() {
            let published = miner.published_chain(now);
            let Some(tip) = published.last() else { continue };
            let more_work = published.len() > best.1;
            let first_seen = published.len() == best.1 && tip.arrival < best.2;
            if more_work || first_seen {
                best = (index, published.len(), tip.arrival);
            }
        }
        best
    }

    /// Next timestamp after `now` at which anything can happen: the
    /// scheduled block find or the earliest in-flight arrival.
    fn next_event_after(&self, now: Timestamp) -> Timestamp {
        let mut next = self.next_block_time;
        for miner in &self.miners {
            if let Some(arrival) = miner.earliest_pending_arrival(now) {
                next = next.min(arrival);
            }
        }
        next
    }
}

/// Runs the same configuration many times and aggregates per-miner results.
///
/// Every run owns an independent generator pair and miner set; runs share
/// no mutable state and are aggregated only at the join. With injected
/// seeds `(a, b)`, run `i` is seeded with `(a + i, b + i)` (wrapping);
/// without, every run seeds from OS entropy.
#[derive(Debug, Clone)]
pub struct SimulationGroup {
    builder: SimulationBuilder,
    repeat: NonZeroUsize,
}

impl SimulationGroup {
    pub fn new(builder: SimulationBuilder, repeat: NonZeroUsize) -> Self {
        SimulationGroup { builder, repeat }
    }

    /// Run every repetition, in parallel, and aggregate the reports.
    pub fn run_all(&self) -> Result<GroupSummary, SimulationError> {
        debug!("running {} independent simulations", self.repeat);

        let seeds = self.builder.seed_pair();
        let reports: Result<Vec<_>, SimulationError> = (0..self.repeat.get())
            .into_par_iter()
            .map(|run| {
                let mut builder = self.builder.clone();
                if let Some((interval_seed, picker_seed)) = seeds {
                    builder = builder.seeds(
                        interval_seed.wrapping_add(run as u64),
                        picker_seed.wrapping_add(run as u64),
                    );
                }
                let mut simulation = builder.build()?;
                simulation.run()?;
                Ok(simulation.report())
            })
            .collect();

        Ok(GroupSummary::from_reports(reports?))
    }
}
