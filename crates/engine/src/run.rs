// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::time::{SystemTime, UNIX_EPOCH};

use provar_hash::{Bloom, BloomConfig};
use provar_pool::{Autoshrink, PrintMode};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{ForkConfig, RunConfig};
use crate::error::Error;
use crate::generator::{Generated, Generator, Instance};
use crate::hook::{
	Flow, Hooks, PostRunInfo, PostTrialFlow, PreGenArgsInfo, PreRunInfo, PreTrialInfo,
	RunReport, TrialOutcome,
};
use crate::property::Property;
use crate::report::PrintHooks;
use crate::runner::Runner;
use crate::trial::{TrialArg, TrialState};
use crate::{DEFAULT_SEED, DEFAULT_TRIALS, MAX_ARITY};

const ANONYMOUS_NAME: &str = "(anonymous)";

/// Overall outcome of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunResult {
	/// At least one trial passed and none failed.
	Pass,
	/// At least one trial failed.
	Fail,
	/// No trial passed or failed.
	Skip,
}

impl std::fmt::Display for RunResult {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			RunResult::Pass => "PASS",
			RunResult::Fail => "FAIL",
			RunResult::Skip => "SKIP",
		})
	}
}

/// Result and tallies of a completed run.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RunSummary {
	pub result: RunResult,
	pub report: RunReport,
}

/// Run a series of randomized trials of a property function.
pub fn run(config: RunConfig) -> crate::Result<RunSummary> {
	if config.fork.enable && cfg!(not(unix)) {
		// Process isolation is a capability, not ambient behaviour:
		// without fork, a run that asked for it is skipped outright.
		return Ok(RunSummary {
			result: RunResult::Skip,
			report: RunReport::default(),
		});
	}

	let mut engine = Engine::init(config)?;
	engine.run_trials()
}

/// Generate one instance from `seed` without running a property; returns
/// the instance and its rendering, or `None` if the generator skipped.
pub fn generate(
	seed: u64,
	generator: &dyn Generator,
) -> crate::Result<Option<(Instance, Option<String>)>> {
	let mut runner = Runner::new(seed);
	match generator.generate(&mut runner) {
		Generated::Value(instance) => {
			let rendered = generator.format(instance.as_ref());
			Ok(Some((instance, rendered)))
		}
		Generated::Skip => Ok(None),
		Generated::Error => Err(Error::Generator { index: 0 }),
	}
}

/// A run seed derived from the current wall-clock time.
pub fn seed_of_time() -> u64 {
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default();
	provar_hash::hash_bytes(&now.as_nanos().to_le_bytes())
}

enum Generation {
	Ok,
	Skip,
	Dup,
	Error(usize),
}

pub(crate) struct Engine {
	pub(crate) runner: Runner,
	pub(crate) name: String,
	pub(crate) property: Property,
	pub(crate) generators: Vec<Box<dyn Generator>>,
	pub(crate) trials: usize,
	pub(crate) run_seed: u64,
	pub(crate) always_seeds: Vec<u64>,
	pub(crate) fork: ForkConfig,
	pub(crate) hooks: Box<dyn Hooks>,
	pub(crate) bloom: Option<Bloom>,
	pub(crate) counters: RunReport,
	pub(crate) trial: TrialState,
}

impl Engine {
	pub(crate) fn init(config: RunConfig) -> crate::Result<Self> {
		let arity = config.property.arity();
		if arity == 0 || arity > MAX_ARITY {
			return Err(Error::config(format!("unsupported arity {arity}")));
		}
		if config.generators.len() != arity {
			return Err(Error::config(format!(
				"property takes {arity} arguments but {} generators were supplied",
				config.generators.len()
			)));
		}
		for (index, generator) in config.generators.iter().enumerate() {
			if generator.autoshrink().is_some() && generator.shrinker().is_some() {
				return Err(Error::config(format!(
					"argument {index} supplies both an explicit shrinker and autoshrink"
				)));
			}
		}

		let run_seed = if config.seed == 0 { DEFAULT_SEED } else { config.seed };
		let trials = if config.trials == 0 { DEFAULT_TRIALS } else { config.trials };

		Ok(Self {
			runner: Runner::new(run_seed),
			name: config.name.unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
			property: config.property,
			generators: config.generators,
			trials,
			run_seed,
			always_seeds: config.always_seeds,
			fork: config.fork,
			hooks: config
				.hooks
				.unwrap_or_else(|| Box::new(PrintHooks::default())),
			bloom: Some(Bloom::new(BloomConfig::default())),
			counters: RunReport::default(),
			trial: TrialState::default(),
		})
	}

	pub(crate) fn run_trials(&mut self) -> crate::Result<RunSummary> {
		debug!(name = %self.name, trials = self.trials, seed = self.run_seed, "starting run");
		self.hooks.pre_run(&PreRunInfo {
			name: &self.name,
			total_trials: self.trials,
			run_seed: self.run_seed,
		})?;

		let mut seed = self.run_seed;
		for trial in 0..self.trials {
			let flow = self.run_step(trial, &mut seed)?;
			trace!(trial, next_seed = seed, "trial complete");
			if flow == Flow::Halt {
				break;
			}
		}

		let report = self.counters;
		self.hooks.post_run(&PostRunInfo {
			name: &self.name,
			total_trials: self.trials,
			run_seed: self.run_seed,
			report,
		})?;

		let result = if report.fail > 0 {
			RunResult::Fail
		} else if report.pass > 0 {
			RunResult::Pass
		} else {
			RunResult::Skip
		};
		Ok(RunSummary { result, report })
	}

	fn run_step(&mut self, trial: usize, seed: &mut u64) -> crate::Result<Flow> {
		// Seeds to always run come first; after them the cursor reverts
		// to the configured run seed.
		let always = self.always_seeds.len();
		if trial < always {
			*seed = self.always_seeds[trial];
		} else if always > 0 && trial == always {
			*seed = self.run_seed;
		}

		self.trial = TrialState::new(trial, *seed);

		let flow = self.hooks.pre_gen_args(&PreGenArgsInfo {
			name: &self.name,
			total_trials: self.trials,
			trial,
			failures: self.counters.fail,
			run_seed: self.run_seed,
			trial_seed: *seed,
			arity: self.property.arity(),
		})?;
		if flow == Flow::Halt {
			return Ok(Flow::Halt);
		}

		self.runner.set_seed(*seed);

		match self.generate_args() {
			Generation::Skip => {
				self.counters.skip += 1;
				self.post_trial_hook(TrialOutcome::Skip, false)?;
			}
			Generation::Dup => {
				self.counters.dup += 1;
				self.post_trial_hook(TrialOutcome::Duplicate, false)?;
			}
			Generation::Error(index) => {
				self.post_trial_hook(TrialOutcome::Error, false)?;
				return Err(Error::Generator { index });
			}
			Generation::Ok => {
				let flow = self.hooks.pre_trial(&PreTrialInfo {
					name: &self.name,
					total_trials: self.trials,
					trial,
					failures: self.counters.fail,
					run_seed: self.run_seed,
					trial_seed: self.trial.seed,
					arity: self.property.arity(),
				})?;
				if flow == Flow::Halt {
					return Ok(Flow::Halt);
				}
				self.trial_run()?;
			}
		}

		// The next trial seed is drawn from the PRNG as generation and
		// shrinking left it.
		*seed = self.runner.random_bits(64);
		Ok(Flow::Continue)
	}

	fn generate_args(&mut self) -> Generation {
		for index in 0..self.property.arity() {
			match self.generators[index].autoshrink() {
				Some(config) => {
					let mut env = Autoshrink::new(config);
					self.runner.install_pool(env.fresh_pool());
					let generated = self.generators[index].generate(&mut self.runner);
					env.pool = self.runner.take_pool();
					match generated {
						Generated::Value(instance) => {
							self.trial.args.push(TrialArg::Autoshrink(instance, env));
						}
						Generated::Skip => return Generation::Skip,
						Generated::Error => return Generation::Error(index),
					}
				}
				None => match self.generators[index].generate(&mut self.runner) {
					Generated::Value(instance) => {
						self.trial.args.push(TrialArg::Basic(instance));
					}
					Generated::Skip => return Generation::Skip,
					Generated::Error => return Generation::Error(index),
				},
			}
		}

		if self.bloom.is_some() && self.check_called() {
			return Generation::Dup;
		}
		Generation::Ok
	}

	pub(crate) fn post_trial_hook(
		&mut self,
		result: TrialOutcome,
		repeat: bool,
	) -> crate::Result<PostTrialFlow> {
		let args = self.trial.arg_refs();
		self.hooks.post_trial(&crate::hook::PostTrialInfo {
			name: &self.name,
			total_trials: self.trials,
			trial: self.trial.trial,
			failures: self.counters.fail,
			run_seed: self.run_seed,
			trial_seed: self.trial.seed,
			arity: self.property.arity(),
			args: &args,
			result,
			repeat,
		})
	}

	/// Render every argument for the counter-example report: the user's
	/// formatter, the bit-pool dump, or both, per the argument's print
	/// mode.
	pub(crate) fn render_args(&self) -> Vec<String> {
		self.trial
			.args
			.iter()
			.enumerate()
			.map(|(index, arg)| match arg {
				TrialArg::Basic(instance) => self.generators[index]
					.format(instance.as_ref())
					.unwrap_or_else(|| String::from("<unprintable>")),
				TrialArg::Autoshrink(instance, env) => {
					let user = self.generators[index].format(instance.as_ref());
					let mode = match env.print_mode() {
						PrintMode::Default if user.is_some() => PrintMode::User,
						PrintMode::Default => PrintMode::Requests,
						mode => mode,
					};
					let mut out = user.unwrap_or_default();
					if let Some(pool) = env.pool.as_ref() {
						out.push_str(&pool.dump(pool.consumed(), mode));
					}
					out
				}
			})
			.collect()
	}
}
