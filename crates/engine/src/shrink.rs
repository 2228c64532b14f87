// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::any::Any;

use provar_pool::BitPool;
use tracing::{debug, trace};

use crate::error::Error;
use crate::generator::{Generated, Instance, Shrunk};
use crate::hook::{Flow, PostShrinkInfo, PostShrinkState, PostShrinkTrialInfo, PreShrinkInfo};
use crate::property::Verdict;
use crate::run::Engine;

enum ArgShrink {
	/// Committed a simpler failing instance; keep going on this argument.
	Progress,
	/// This argument is at a local minimum.
	DeadEnd,
	/// A hook asked to stop shrinking altogether.
	Halt,
}

enum Candidate {
	Produced(Instance, Option<BitPool>),
	DeadEnd,
	NoMoreTactics,
	Error,
}

impl Engine {
	/// Simplify all arguments, left to right, greedily re-attacking each
	/// argument until it stops improving; repeat until a whole pass makes
	/// no progress.
	pub(crate) fn shrink(&mut self) -> crate::Result<()> {
		debug_assert!(!self.trial.args.is_empty());
		loop {
			let mut progress = false;

			for arg_i in 0..self.trial.args.len() {
				let can_shrink = {
					let generator = &self.generators[arg_i];
					generator.autoshrink().is_some() || generator.shrinker().is_some()
				};
				if !can_shrink {
					continue;
				}

				loop {
					match self.attempt_shrink_arg(arg_i)? {
						ArgShrink::Progress => progress = true,
						ArgShrink::Halt => return Ok(()),
						ArgShrink::DeadEnd => break,
					}
				}
			}

			if !progress {
				debug!(
					successful = self.trial.successful_shrinks,
					failed = self.trial.failed_shrinks,
					"shrinking reached a local minimum"
				);
				return Ok(());
			}
		}
	}

	/// One pass of tactics against a single argument. Returns `Progress`
	/// as soon as a candidate is committed; `DeadEnd` once tactics are
	/// exhausted without progress.
	fn attempt_shrink_arg(&mut self, arg_i: usize) -> crate::Result<ArgShrink> {
		let use_autoshrink = self.generators[arg_i].autoshrink().is_some();
		let mut tactic: u32 = 0;

		loop {
			trace!(arg_i, tactic, "shrink attempt");
			let flow = self.hooks.pre_shrink(&PreShrinkInfo {
				name: &self.name,
				total_trials: self.trials,
				trial: self.trial.trial,
				failures: self.counters.fail,
				run_seed: self.run_seed,
				trial_seed: self.trial.seed,
				arity: self.property.arity(),
				shrink_count: self.trial.shrink_count,
				successful_shrinks: self.trial.successful_shrinks,
				failed_shrinks: self.trial.failed_shrinks,
				arg_index: arg_i,
				arg: self.trial.args[arg_i].instance(),
				tactic,
			})?;
			if flow == Flow::Halt {
				return Ok(ArgShrink::Halt);
			}

			let candidate = if use_autoshrink {
				self.autoshrink_candidate(arg_i, tactic)
			} else {
				let shrinker = self.generators[arg_i]
					.shrinker()
					.expect("argument has an explicit shrinker");
				match shrinker.shrink(
					&mut self.runner,
					self.trial.args[arg_i].instance(),
					tactic,
				) {
					Shrunk::Simpler(instance) => Candidate::Produced(instance, None),
					Shrunk::DeadEnd => Candidate::DeadEnd,
					Shrunk::NoMoreTactics => Candidate::NoMoreTactics,
					Shrunk::Error => Candidate::Error,
				}
			};

			self.trial.shrink_count += 1;

			// Post-shrink hook, with the candidate when one exists.
			if !matches!(candidate, Candidate::Error) {
				let (arg, state): (Option<&dyn Any>, _) = match &candidate {
					Candidate::Produced(instance, _) => {
						(Some(instance.as_ref()), PostShrinkState::Shrunk)
					}
					Candidate::DeadEnd => (
						Some(self.trial.args[arg_i].instance()),
						PostShrinkState::ShrinkFailed,
					),
					_ => (
						Some(self.trial.args[arg_i].instance()),
						PostShrinkState::DoneShrinking,
					),
				};
				self.hooks.post_shrink(&PostShrinkInfo {
					name: &self.name,
					total_trials: self.trials,
					trial: self.trial.trial,
					run_seed: self.run_seed,
					trial_seed: self.trial.seed,
					arity: self.property.arity(),
					shrink_count: self.trial.shrink_count,
					successful_shrinks: self.trial.successful_shrinks,
					failed_shrinks: self.trial.failed_shrinks,
					arg_index: arg_i,
					arg,
					tactic,
					state,
				})?;
			}

			let (candidate_instance, candidate_pool) = match candidate {
				Candidate::Error => return Err(Error::Generator { index: arg_i }),
				Candidate::NoMoreTactics => return Ok(ArgShrink::DeadEnd),
				Candidate::DeadEnd => {
					tactic += 1;
					continue;
				}
				Candidate::Produced(instance, pool) => (instance, pool),
			};

			// Swap the candidate in; hold the previous instance and pool
			// for a revert.
			let prev_instance = self.trial.args[arg_i].replace_instance(candidate_instance);
			let prev_pool = match self.trial.args[arg_i].autoshrink_mut() {
				Some(env) => {
					let prev = env.pool.take();
					env.pool = candidate_pool;
					prev
				}
				None => None,
			};

			// Skip argument tuples that have probably been tried.
			if self.bloom.is_some() && self.check_called() {
				trace!(arg_i, tactic, "candidate already evaluated, reverting");
				self.revert(arg_i, prev_instance, prev_pool);
				tactic += 1;
				continue;
			}
			if self.bloom.is_some() {
				self.mark_called();
			}

			let mut repeated = false;
			let mut verdict;
			loop {
				verdict = self.call_property()?;
				if !repeated {
					if verdict == Verdict::Fail {
						self.trial.successful_shrinks += 1;
						self.update_model(arg_i, verdict, 3);
					} else {
						self.trial.failed_shrinks += 1;
					}
				}

				let flow = {
					let args = self.trial.arg_refs();
					self.hooks.post_shrink_trial(&PostShrinkTrialInfo {
						name: &self.name,
						total_trials: self.trials,
						trial: self.trial.trial,
						failures: self.counters.fail,
						run_seed: self.run_seed,
						trial_seed: self.trial.seed,
						arity: self.property.arity(),
						shrink_count: self.trial.shrink_count,
						successful_shrinks: self.trial.successful_shrinks,
						failed_shrinks: self.trial.failed_shrinks,
						arg_index: arg_i,
						args: &args,
						tactic,
						result: verdict,
					})?
				};
				match flow {
					crate::hook::PostTrialFlow::Repeat => repeated = true,
					crate::hook::PostTrialFlow::RepeatOnce if !repeated => repeated = true,
					_ => break,
				}
			}

			self.update_model(arg_i, verdict, 8);

			match verdict {
				Verdict::Pass | Verdict::Skip => {
					trace!(arg_i, tactic, %verdict, "candidate did not fail, reverting");
					self.revert(arg_i, prev_instance, prev_pool);
					tactic += 1;
				}
				Verdict::Fail => {
					trace!(arg_i, tactic, "candidate committed");
					return Ok(ArgShrink::Progress);
				}
				Verdict::Error => return Err(Error::Property),
			}
		}
	}

	/// Produce an autoshrink candidate: mutate a copy of the current
	/// pool, truncate it, and regenerate the instance from it.
	fn autoshrink_candidate(&mut self, arg_i: usize, tactic: u32) -> Candidate {
		let env = self.trial.args[arg_i]
			.autoshrink_mut()
			.expect("argument is autoshrinking");
		if tactic >= env.max_failed_shrinks() {
			return Candidate::NoMoreTactics;
		}

		let pool = env.candidate(&mut self.runner);
		self.runner.install_pool(pool);
		let generated = self.generators[arg_i].generate(&mut self.runner);
		let pool = self.runner.take_pool().expect("candidate pool still installed");

		match generated {
			Generated::Value(instance) => Candidate::Produced(instance, Some(pool)),
			Generated::Skip => Candidate::DeadEnd,
			Generated::Error => Candidate::Error,
		}
	}

	/// Undo a candidate swap, restoring the previous instance and pool.
	fn revert(&mut self, arg_i: usize, prev_instance: Instance, prev_pool: Option<BitPool>) {
		let candidate = self.trial.args[arg_i].replace_instance(prev_instance);
		drop(candidate);
		if let Some(env) = self.trial.args[arg_i].autoshrink_mut() {
			env.pool = prev_pool;
		}
	}

	fn update_model(&mut self, arg_i: usize, verdict: Verdict, adjustment: i16) {
		if let Some(env) = self.trial.args[arg_i].autoshrink_mut() {
			env.model.update(verdict == Verdict::Fail, adjustment);
		}
	}
}
