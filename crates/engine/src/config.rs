// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::time::Duration;

use crate::generator::Generator;
use crate::hook::Hooks;
use crate::property::Property;
use crate::{DEFAULT_SEED, DEFAULT_TRIALS};

/// Process-isolation settings. When enabled, every trial's property call
/// runs in a forked child connected by a pipe, so crashes and hangs in
/// the code under test are reported as failures instead of taking the
/// runner down.
#[derive(Clone, Debug)]
pub struct ForkConfig {
	pub enable: bool,
	/// How long to wait for the child's result; `None` waits forever.
	pub timeout: Option<Duration>,
	/// Signal sent to a timed-out child. Defaults to SIGTERM.
	pub signal: Option<i32>,
	/// How long a signalled child gets to exit before SIGKILL.
	pub exit_timeout: Duration,
}

impl Default for ForkConfig {
	fn default() -> Self {
		Self {
			enable: false,
			timeout: None,
			signal: None,
			exit_timeout: Duration::from_millis(100),
		}
	}
}

/// Configuration for one run of a property.
pub struct RunConfig {
	/// Property name, used in reports.
	pub name: Option<String>,
	pub property: Property,
	/// One generator per property argument, in argument order.
	pub generators: Vec<Box<dyn Generator>>,
	/// Number of trials; 0 means the default.
	pub trials: usize,
	pub seed: u64,
	/// Seeds to run before the seed-derived sequence, e.g. for
	/// regression cases.
	pub always_seeds: Vec<u64>,
	pub fork: ForkConfig,
	/// Observer hooks; defaults to the console reporter.
	pub hooks: Option<Box<dyn Hooks>>,
}

impl RunConfig {
	pub fn new(property: Property) -> Self {
		Self {
			name: None,
			property,
			generators: Vec::new(),
			trials: DEFAULT_TRIALS,
			seed: DEFAULT_SEED,
			always_seeds: Vec::new(),
			fork: ForkConfig::default(),
			hooks: None,
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_generator(mut self, generator: impl Generator + 'static) -> Self {
		self.generators.push(Box::new(generator));
		self
	}

	pub fn with_trials(mut self, trials: usize) -> Self {
		self.trials = trials;
		self
	}

	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = seed;
		self
	}

	pub fn with_always_seeds(mut self, seeds: impl Into<Vec<u64>>) -> Self {
		self.always_seeds = seeds.into();
		self
	}

	pub fn with_fork(mut self, fork: ForkConfig) -> Self {
		self.fork = fork;
		self
	}

	pub fn with_hooks(mut self, hooks: impl Hooks + 'static) -> Self {
		self.hooks = Some(Box::new(hooks));
		self
	}
}
