// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::any::Any;

use provar_pool::AutoshrinkConfig;

use crate::Runner;

/// A generated argument instance, type-erased for storage in the trial's
/// argument table. Properties downcast it back to the concrete type.
pub type Instance = Box<dyn Any>;

/// Outcome of one generation pass.
pub enum Generated {
	Value(Instance),
	/// This draw produced no usable instance; skip the trial.
	Skip,
	/// Generation failed; the run cannot continue.
	Error,
}

/// Outcome of one explicit shrink attempt.
pub enum Shrunk {
	/// A freshly allocated, simpler instance.
	Simpler(Instance),
	/// This tactic cannot simplify the instance further.
	DeadEnd,
	/// No tactics remain for this instance.
	NoMoreTactics,
	Error,
}

/// Capability record for one property argument: how to produce an
/// instance from the random bit stream, and optionally how to hash,
/// format, and shrink it.
///
/// `generate` draws bits through the runner handle; the engine routes
/// those draws from the recorded bit pool when autoshrinking is active
/// and straight from the PRNG otherwise. Generators must be deterministic
/// functions of the bits they observe: no clocks, no ambient entropy, no
/// hidden state.
///
/// Autoshrinking generators must additionally be *monotone*: reading
/// smaller values from the bit stream must produce simpler instances, and
/// a stream of zeroes must produce the generator's minimum instance. That
/// contract is what turns blind bit-level mutation into semantic
/// shrinking.
pub trait Generator {
	fn generate(&self, t: &mut Runner) -> Generated;

	/// Hash an instance for duplicate suppression. Autoshrinking
	/// generators may omit this; the engine hashes the consumed part of
	/// the bit pool instead.
	fn hash(&self, instance: &dyn Any) -> Option<u64> {
		let _ = instance;
		None
	}

	/// Render an instance for counter-example reports.
	fn format(&self, instance: &dyn Any) -> Option<String> {
		let _ = instance;
		None
	}

	/// Explicit shrink capability, for generators that opt out of
	/// autoshrinking. Supplying both this and [`Generator::autoshrink`]
	/// is a configuration error.
	fn shrinker(&self) -> Option<&dyn Shrinker> {
		None
	}

	/// Enable bit-pool autoshrinking for this argument.
	fn autoshrink(&self) -> Option<AutoshrinkConfig> {
		None
	}
}

/// Explicit per-type shrinking: propose a simpler variant of `instance`
/// for the given tactic index. Tactics are explored in increasing order
/// until one returns [`Shrunk::NoMoreTactics`].
pub trait Shrinker {
	fn shrink(&self, t: &mut Runner, instance: &dyn Any, tactic: u32) -> Shrunk;
}
