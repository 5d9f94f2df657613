//! Fast, reproducible randomness for the simulator.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

/// Multiplier mapping the top 53 bits of a uniform draw into `[0, 1)`.
const UNIT_53: f64 = 1.0 / (1u64 << 53) as f64;

/// Non-cryptographic generator behind every random decision in a simulation.
///
/// Two independent instances drive a run: one samples block inter-arrival
/// times, the other picks which miner found each block. Given the same seed,
/// the same sequence of calls produces the same outputs.
#[derive(Debug, Clone)]
pub struct SimRng(Xoroshiro128PlusPlus);

impl SimRng {
    /// Seed from OS entropy.
    pub fn from_entropy() -> Self {
        SimRng(Xoroshiro128PlusPlus::from_entropy())
    }

    /// Seed deterministically. The 64-bit seed is expanded to the full
    /// generator state with SplitMix64.
    pub fn seed_from_u64(seed: u64) -> Self {
        SimRng(Xoroshiro128PlusPlus::seed_from_u64(seed))
    }

    /// One uniform draw over the full 64-bit range.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    /// One draw from an exponential distribution with the given mean.
    ///
    /// Never negative and never infinite for any underlying uniform draw.
    pub fn exp(&mut self, mean: f64) -> f64 {
        mean * standard_exp(self.next_u64())
    }
}

/// Map one uniform draw to a draw from the standard (mean 1) exponential
/// distribution.
///
/// The top 53 bits of `uniform` form a value `x` in `[0, 1)`; the result is
/// `-ln(1 - x)`, computed through `ln_1p` to keep precision when `x` is
/// small.
#[inline]
fn standard_exp(uniform: u64) -> f64 {
    -(-((uniform >> 11) as f64) * UNIT_53).ln_1p()
}
