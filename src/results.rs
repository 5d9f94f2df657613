//! Formatting per-miner statistics from finished simulations.

use std::fmt::{self, Display};

use crate::{
    block::{MinerId, Timestamp},
    simulation::Simulation,
};

/// Floating point precision of CSV results data.
pub const FLOAT_PRECISION_DIGITS: usize = 6;

/// Appearance of a results table as given by its [`Display`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub enum Format {
    /// Comma-separated, without extra whitespace.
    Csv,
    /// Human-readable.
    #[default]
    PrettyPrint,
}

/// One miner's statistics at a queried timestamp.
#[derive(Debug, Clone)]
pub struct MinerRow {
    pub id: MinerId,
    pub strategy: &'static str,
    pub hashrate_perc: u64,
    pub blocks_found: usize,
    pub blocks_share: f64,
    pub stale_rate: f64,
}

/// Per-miner statistics of one simulation at its current time.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    at: Timestamp,
    total_blocks: usize,
    rows: Vec<MinerRow>,
    format: Format,
}

impl SimulationReport {
    pub(crate) fn new(simulation: &Simulation) -> Self {
        let now = simulation.now();
        let total_blocks = simulation.best_chain().len() - 1;
        let rows = simulation
            .miners()
            .iter()
            .map(|miner| MinerRow {
                id: miner.id(),
                strategy: miner.strategy_name(),
                hashrate_perc: miner.hashrate_perc(),
                blocks_found: miner.blocks_found(now),
                blocks_share: miner.blocks_found_share(now),
                stale_rate: miner.stale_rate(now),
            })
            .collect();

        SimulationReport { at: now, total_blocks, rows, format: Format::default() }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Simulated time the statistics were taken at.
    pub fn at(&self) -> Timestamp {
        self.at
    }

    /// Length of the best published chain, the genesis excluded.
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    pub fn rows(&self) -> &[MinerRow] {
        &self.rows
    }
}

impl Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            Format::Csv => {
                writeln!(f, "miner,strategy,hashrate_perc,blocks_found,blocks_share,stale_rate")?;
                for row in &self.rows {
                    writeln!(
                        f,
                        "{},{},{},{},{:.prec$},{:.prec$}",
                        row.id,
                        row.strategy,
                        row.hashrate_perc,
                        row.blocks_found,
                        row.blocks_share,
                        row.stale_rate,
                        prec = FLOAT_PRECISION_DIGITS,
                    )?;
                }
                Ok(())
            }
            Format::PrettyPrint => {
                let days = self.at / (24 * 60 * 60 * 1000);
                writeln!(
                    f,
                    "After {} ms ({} days) and {} blocks found:",
                    self.at, days, self.total_blocks
                )?;
                for row in &self.rows {
                    write!(
                        f,
                        "  - Miner {} ({}% of network hashrate) found {} blocks i.e. {:.2}% of blocks. Stale rate: {:.2}%.",
                        row.id,
                        row.hashrate_perc,
                        row.blocks_found,
                        row.blocks_share * 100.0,
                        row.stale_rate * 100.0,
                    )?;
                    if row.strategy == "selfish" {
                        write!(f, " ('selfish mining' strategy)")?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
        }
    }
}

/// One miner's aggregated statistics over a group of runs.
#[derive(Debug, Clone)]
pub struct GroupRow {
    pub id: MinerId,
    pub strategy: &'static str,
    pub hashrate_perc: u64,
    /// Sample mean of the per-run block share.
    pub mean_share: f64,
    /// Sample standard deviation of the per-run block share.
    pub share_std_dev: f64,
    /// Sample mean of the per-run stale rate.
    pub mean_stale_rate: f64,
}

/// Aggregated per-miner statistics over repeated runs of one configuration.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    runs: usize,
    rows: Vec<GroupRow>,
    format: Format,
}

impl GroupSummary {
    pub(crate) fn from_reports(reports: Vec<SimulationReport>) -> Self {
        debug_assert!(!reports.is_empty(), "group runs at least once");

        let runs = reports.len();
        let rows = reports[0]
            .rows
            .iter()
            .enumerate()
            .map(|(index, first)| {
                let mut mean = 0.0;
                let mut squared_mean = 0.0;
                let mut stale = 0.0;
                for report in &reports {
                    let share = report.rows[index].blocks_share;
                    mean += share;
                    squared_mean += share * share;
                    stale += report.rows[index].stale_rate;
                }
                mean /= runs as f64;
                squared_mean /= runs as f64;
                stale /= runs as f64;

                let variance = (squared_mean - mean * mean).max(0.0);
                GroupRow {
                    id: first.id,
                    strategy: first.strategy,
                    hashrate_perc: first.hashrate_perc,
                    mean_share: mean,
                    share_std_dev: variance.sqrt(),
                    mean_stale_rate: stale,
                }
            })
            .collect();

        GroupSummary { runs, rows, format: Format::default() }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn rows(&self) -> &[GroupRow] {
        &self.rows
    }
}

impl Display for GroupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            Format::Csv => {
                writeln!(f, "miner,strategy,hashrate_perc,mean_share,share_std_dev,mean_stale_rate")?;
                for row in &self.rows {
                    writeln!(
                        f,
                        "{},{},{},{:.prec$},{:.prec$},{:.prec$}",
                        row.id,
                        row.strategy,
                        row.hashrate_perc,
                        row.mean_share,
                        row.share_std_dev,
                        row.mean_stale_rate,
                        prec = FLOAT_PRECISION_DIGITS,
                    )?;
                }
                Ok(())
            }
            Format::PrettyPrint => {
                writeln!(f, "Over {} independent runs:", self.runs)?;
                for row in &self.rows {
                    writeln!(
                        f,
                        "  - Miner {} ({}% of network hashrate, {}): mean share {:.2}% (std dev {:.2}%), mean stale rate {:.2}%",
                        row.id,
                        row.hashrate_perc,
                        row.strategy,
                        row.mean_share * 100.0,
                        row.share_std_dev * 100.0,
                        row.mean_stale_rate * 100.0,
                    )?;
                }
                Ok(())
            }
        }
    }
}
