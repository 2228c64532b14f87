// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use tracing::warn;

use crate::error::Error;
use crate::hook::{CounterexampleInfo, PostTrialFlow, TrialOutcome};
use crate::property::Verdict;
use crate::run::Engine;
use crate::trial::TrialArg;

impl Engine {
	/// The little-endian concatenation of all argument hashes, or `None`
	/// when some argument cannot be hashed (which disables duplicate
	/// suppression for the trial).
	fn arg_hashes(&self) -> Option<Vec<u8>> {
		let mut bytes = Vec::with_capacity(self.trial.args.len() * 8);
		for (index, arg) in self.trial.args.iter().enumerate() {
			let hash = match arg {
				TrialArg::Basic(instance) => {
					self.generators[index].hash(instance.as_ref())?
				}
				TrialArg::Autoshrink(instance, env) => {
					match self.generators[index].hash(instance.as_ref()) {
						Some(hash) => hash,
						// No user hash: hash the consumed bits of
						// the pool that produced the instance.
						None => env.pool.as_ref()?.hash_consumed(),
					}
				}
			};
			bytes.extend_from_slice(&hash.to_le_bytes());
		}
		Some(bytes)
	}

	/// Has this combination of argument instances been evaluated before?
	pub(crate) fn check_called(&self) -> bool {
		match (&self.bloom, self.arg_hashes()) {
			(Some(bloom), Some(bytes)) => bloom.check(&bytes),
			_ => false,
		}
	}

	/// Record the current argument tuple as evaluated.
	pub(crate) fn mark_called(&mut self) {
		if let Some(bytes) = self.arg_hashes()
			&& let Some(bloom) = self.bloom.as_mut()
		{
			bloom.mark(&bytes);
		}
	}

	/// Invoke the property directly on the current arguments.
	pub(crate) fn call_inner(&self) -> Verdict {
		let args = self.trial.arg_refs();
		self.property.invoke(&args)
	}

	/// Invoke the property, under the fork harness when enabled.
	pub(crate) fn call_property(&mut self) -> crate::Result<Verdict> {
		#[cfg(unix)]
		if self.fork.enable {
			return self.call_forked();
		}
		Ok(self.call_inner())
	}

	/// Run the property on the generated arguments, update the tallies,
	/// and dispatch the post-trial protocol (shrinking on failure, the
	/// counterexample hook, and repeat requests).
	pub(crate) fn trial_run(&mut self) -> crate::Result<()> {
		if self.bloom.is_some() {
			self.mark_called();
		}

		let verdict = self.call_property()?;
		match verdict {
			Verdict::Pass => {
				self.counters.pass += 1;
				self.post_trial_hook(TrialOutcome::Pass, false)?;
				Ok(())
			}
			Verdict::Skip => {
				self.counters.skip += 1;
				self.post_trial_hook(TrialOutcome::Skip, false)?;
				Ok(())
			}
			Verdict::Error => {
				self.post_trial_hook(TrialOutcome::Error, false)?;
				Err(Error::Property)
			}
			Verdict::Fail => {
				self.shrink()?;
				self.counters.fail += 1;
				self.report_on_failure()
			}
		}
	}

	fn report_on_failure(&mut self) -> crate::Result<()> {
		let rendered = self.render_args();
		{
			let args = self.trial.arg_refs();
			self.hooks.counterexample(&CounterexampleInfo {
				name: &self.name,
				total_trials: self.trials,
				trial: self.trial.trial,
				trial_seed: self.trial.seed,
				arity: self.property.arity(),
				args: &args,
				rendered: &rendered,
			})?;
		}

		let mut repeated = false;
		loop {
			let flow = self.post_trial_hook(TrialOutcome::Fail, repeated)?;
			match flow {
				PostTrialFlow::Continue => return Ok(()),
				PostTrialFlow::RepeatOnce if repeated => return Ok(()),
				PostTrialFlow::Repeat | PostTrialFlow::RepeatOnce => {
					repeated = true;
					match self.call_property()? {
						Verdict::Fail => continue,
						Verdict::Pass => {
							warn!("failed property passed when re-run");
							return Err(Error::UnstableProperty);
						}
						Verdict::Skip => return Ok(()),
						Verdict::Error => return Err(Error::Property),
					}
				}
			}
		}
	}
}
