//! Kernel random source
//!
//! Drivers draw randomness through [`RandomSource`], the analogue of
//! `get_random_u32()`. Any `rand_core` generator is a source, which lets the
//! host hand out an OS-backed generator in production and a seeded one in
//! tests.

use rand_core::RngCore;

/// A uniform random integer generator provided by the kernel
///
/// Drawing never fails and never blocks.
pub trait RandomSource {
    /// Returns a uniformly distributed 32-bit value
    fn random_u32(&mut self) -> u32;

    /// Returns a value uniformly distributed in `0..bound`
    ///
    /// Uses plain modulo reduction, so for bounds that do not divide 2^32
    /// the low values are very slightly favoured. `bound` must be non-zero.
    fn random_below(&mut self, bound: u32) -> u32 {
        self.random_u32() % bound
    }
}

impl<R: RngCore> RandomSource for R {
    fn random_u32(&mut self) -> u32 {
        self.next_u32()
    }
}
