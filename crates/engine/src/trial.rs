// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::any::Any;

use provar_pool::Autoshrink;

use crate::generator::Instance;

/// One generated property argument: either an opaque instance from a
/// plain generator, or an instance plus the autoshrink state (model and
/// bit pool) that produced it.
pub(crate) enum TrialArg {
	Basic(Instance),
	Autoshrink(Instance, Autoshrink),
}

impl TrialArg {
	pub(crate) fn instance(&self) -> &dyn Any {
		match self {
			TrialArg::Basic(instance) => instance.as_ref(),
			TrialArg::Autoshrink(instance, _) => instance.as_ref(),
		}
	}

	pub(crate) fn replace_instance(&mut self, instance: Instance) -> Instance {
		match self {
			TrialArg::Basic(slot) => std::mem::replace(slot, instance),
			TrialArg::Autoshrink(slot, _) => std::mem::replace(slot, instance),
		}
	}

	pub(crate) fn autoshrink_mut(&mut self) -> Option<&mut Autoshrink> {
		match self {
			TrialArg::Basic(_) => None,
			TrialArg::Autoshrink(_, env) => Some(env),
		}
	}
}

/// Mutable per-trial state: the trial ordinal and seed, the shrink
/// counters, and the generated arguments.
#[derive(Default)]
pub(crate) struct TrialState {
	pub trial: usize,
	pub seed: u64,
	pub shrink_count: usize,
	pub successful_shrinks: usize,
	pub failed_shrinks: usize,
	pub args: Vec<TrialArg>,
}

impl TrialState {
	pub(crate) fn new(trial: usize, seed: u64) -> Self {
		Self {
			trial,
			seed,
			..Self::default()
		}
	}

	/// Argument instances as the property sees them.
	pub(crate) fn arg_refs(&self) -> Vec<&dyn Any> {
		self.args.iter().map(|arg| arg.instance()).collect()
	}
}
