// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use rand_core::{RngCore, SeedableRng};
use rand_xoshiro::SplitMix64;

/// The deterministic 64-bit generator behind every trial.
///
/// The engine relies on exactly two operations: reset from a 64-bit seed
/// and produce the next 64 bits. The same seed yields the same sequence on
/// every platform, which is what makes runs replayable from a seed alone.
#[derive(Clone, Debug)]
pub struct Prng {
	rng: SplitMix64,
}

impl Prng {
	pub fn new(seed: u64) -> Self {
		Self {
			rng: SplitMix64::seed_from_u64(seed),
		}
	}

	/// Reset the stream to the start of the sequence for `seed`.
	pub fn reset(&mut self, seed: u64) {
		self.rng = SplitMix64::seed_from_u64(seed);
	}

	pub fn next_u64(&mut self) -> u64 {
		self.rng.next_u64()
	}
}
