// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use provar_random::Entropy;
use tracing::trace;

use crate::model::{Action, Model};
use crate::mutate;
use crate::pool::{BitPool, DEFAULT_POOL_SIZE, PrintMode};

/// How many unsuccessful shrink attempts in a row before deciding a local
/// minimum has been reached.
pub const DEFAULT_MAX_FAILED_SHRINKS: u32 = 100;

// Odds of dropping a request are (1 + threshold) in (1 << bits).
const DEFAULT_DROP_THRESHOLD: u64 = 0;
const DEFAULT_DROP_BITS: u8 = 5;

/// Per-argument autoshrink configuration.
#[derive(Clone, Debug)]
pub struct AutoshrinkConfig {
	/// Initial pool allocation, in bits. Generating very complex
	/// instances may warrant a larger starting size.
	pub pool_size: usize,
	pub print_mode: PrintMode,
	/// See [`DEFAULT_MAX_FAILED_SHRINKS`].
	pub max_failed_shrinks: u32,
}

impl Default for AutoshrinkConfig {
	fn default() -> Self {
		Self {
			pool_size: DEFAULT_POOL_SIZE,
			print_mode: PrintMode::Default,
			max_failed_shrinks: DEFAULT_MAX_FAILED_SHRINKS,
		}
	}
}

/// Per-argument autoshrink state: the configuration, the tactic model,
/// and the pool that produced the argument's current instance.
///
/// The pool moves between here and the runner: it is installed into the
/// runner for the duration of a generation pass and handed back
/// afterwards, so there is exactly one owning reference at any time.
#[derive(Debug)]
pub struct Autoshrink {
	config: AutoshrinkConfig,
	drop_threshold: u64,
	drop_bits: u8,
	/// Skip candidate truncation; only meaningful in tests that inspect
	/// raw mutation output.
	pub leave_trailing_zeroes: bool,
	pub model: Model,
	pub pool: Option<BitPool>,
}

impl Autoshrink {
	pub fn new(config: AutoshrinkConfig) -> Self {
		Self {
			config,
			drop_threshold: DEFAULT_DROP_THRESHOLD,
			drop_bits: DEFAULT_DROP_BITS,
			leave_trailing_zeroes: false,
			model: Model::new(),
			pool: None,
		}
	}

	pub fn max_failed_shrinks(&self) -> u32 {
		self.config.max_failed_shrinks
	}

	pub fn print_mode(&self) -> PrintMode {
		self.config.print_mode
	}

	/// A fresh, empty pool for an initial generation pass.
	pub fn fresh_pool(&self) -> BitPool {
		BitPool::new(self.config.pool_size)
	}

	/// Produce a candidate pool for one shrink attempt: either a drop
	/// pass over the request list or a batch of in-place mutations,
	/// followed by trailing-zero truncation.
	///
	/// The current pool must be resident (not installed in the runner).
	pub fn candidate(&mut self, source: &mut dyn Entropy) -> BitPool {
		let Self {
			model,
			pool,
			drop_threshold,
			drop_bits,
			leave_trailing_zeroes,
			..
		} = self;
		let orig = pool.as_mut().expect("autoshrink pool is resident");

		orig.build_index();
		debug_assert_eq!(
			orig.requests().iter().map(|r| *r as usize).sum::<usize>(),
			orig.consumed(),
		);

		let mut copy = orig.candidate();
		model.begin_step();

		if model.should_drop(source, orig.request_count()) {
			model.mark_changed(Action::Drop);
			mutate::drop_requests(orig, &mut copy, *drop_threshold, *drop_bits, source);
		} else {
			mutate::mutate_pool(model, orig, &mut copy, source);
		}

		if !*leave_trailing_zeroes {
			copy.truncate_trailing_zero_bytes();
		}

		trace!(
			generation = copy.generation(),
			filled = copy.bits_filled(),
			limit = copy.limit(),
			"produced candidate pool"
		);
		copy
	}
}
