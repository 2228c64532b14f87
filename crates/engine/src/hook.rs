// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::any::Any;
use std::fmt;

use serde::Serialize;

use crate::property::Verdict;

/// Overall trial tallies for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
	pub pass: usize,
	pub fail: usize,
	pub skip: usize,
	pub dup: usize,
}

/// How one trial ended, as reported to the post-trial hook. Unlike
/// [`Verdict`] this includes duplicate suppression, which never reaches
/// the property itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialOutcome {
	Pass,
	Fail,
	Skip,
	Duplicate,
	Error,
}

impl fmt::Display for TrialOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			TrialOutcome::Pass => "PASS",
			TrialOutcome::Fail => "FAIL",
			TrialOutcome::Skip => "SKIP",
			TrialOutcome::Duplicate => "DUP",
			TrialOutcome::Error => "ERROR",
		})
	}
}

/// What a hook wants the trial loop to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
	Continue,
	/// Stop running trials (e.g. stop after N failures).
	Halt,
}

/// Post-trial hooks may additionally ask for the property to be invoked
/// again under the same arguments, e.g. for more verbose logging of the
/// minimised counter-example.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostTrialFlow {
	Continue,
	Repeat,
	RepeatOnce,
}

/// Did a shrink attempt make progress, and if not, is shrinking done?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostShrinkState {
	Shrunk,
	ShrinkFailed,
	DoneShrinking,
}

pub struct PreRunInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub run_seed: u64,
}

pub struct PostRunInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub run_seed: u64,
	pub report: RunReport,
}

pub struct PreGenArgsInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub trial: usize,
	pub failures: usize,
	pub run_seed: u64,
	pub trial_seed: u64,
	pub arity: usize,
}

pub struct PreTrialInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub trial: usize,
	pub failures: usize,
	pub run_seed: u64,
	pub trial_seed: u64,
	pub arity: usize,
}

pub struct PostForkInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub failures: usize,
	pub run_seed: u64,
	pub arity: usize,
}

pub struct PostTrialInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub trial: usize,
	pub failures: usize,
	pub run_seed: u64,
	pub trial_seed: u64,
	pub arity: usize,
	pub args: &'a [&'a dyn Any],
	pub result: TrialOutcome,
	pub repeat: bool,
}

pub struct CounterexampleInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub trial: usize,
	pub trial_seed: u64,
	pub arity: usize,
	pub args: &'a [&'a dyn Any],
	/// One display rendering per argument: the generator's formatter
	/// and/or the bit-pool dump, per the argument's print mode.
	pub rendered: &'a [String],
}

pub struct PreShrinkInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub trial: usize,
	pub failures: usize,
	pub run_seed: u64,
	pub trial_seed: u64,
	pub arity: usize,
	pub shrink_count: usize,
	pub successful_shrinks: usize,
	pub failed_shrinks: usize,
	pub arg_index: usize,
	pub arg: &'a dyn Any,
	pub tactic: u32,
}

pub struct PostShrinkInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub trial: usize,
	pub run_seed: u64,
	pub trial_seed: u64,
	pub arity: usize,
	pub shrink_count: usize,
	pub successful_shrinks: usize,
	pub failed_shrinks: usize,
	pub arg_index: usize,
	pub arg: Option<&'a dyn Any>,
	pub tactic: u32,
	pub state: PostShrinkState,
}

pub struct PostShrinkTrialInfo<'a> {
	pub name: &'a str,
	pub total_trials: usize,
	pub trial: usize,
	pub failures: usize,
	pub run_seed: u64,
	pub trial_seed: u64,
	pub arity: usize,
	pub shrink_count: usize,
	pub successful_shrinks: usize,
	pub failed_shrinks: usize,
	pub arg_index: usize,
	pub args: &'a [&'a dyn Any],
	pub tactic: u32,
	pub result: Verdict,
}

/// Observer callbacks at defined points of a run. All callbacks default
/// to "continue silently"; returning an error halts everything, cleans
/// up, and fails the run.
#[allow(unused_variables)]
pub trait Hooks {
	/// Before the start of a run (group of trials).
	fn pre_run(&mut self, info: &PreRunInfo) -> crate::Result<()> {
		Ok(())
	}

	/// After the whole run has completed, with overall results.
	fn post_run(&mut self, info: &PostRunInfo) -> crate::Result<()> {
		Ok(())
	}

	/// Before a trial's arguments are generated.
	fn pre_gen_args(&mut self, info: &PreGenArgsInfo) -> crate::Result<Flow> {
		Ok(Flow::Continue)
	}

	/// Before running a trial, after its arguments were generated.
	fn pre_trial(&mut self, info: &PreTrialInfo) -> crate::Result<Flow> {
		Ok(Flow::Continue)
	}

	/// On the child side, right after forking.
	fn post_fork(&mut self, info: &PostForkInfo) -> crate::Result<()> {
		Ok(())
	}

	/// After a trial ran, with its arguments and result.
	fn post_trial(&mut self, info: &PostTrialInfo) -> crate::Result<PostTrialFlow> {
		Ok(PostTrialFlow::Continue)
	}

	/// When a counter-example has been found (and minimised).
	fn counterexample(&mut self, info: &CounterexampleInfo) -> crate::Result<()> {
		Ok(())
	}

	/// Before each shrink attempt.
	fn pre_shrink(&mut self, info: &PreShrinkInfo) -> crate::Result<Flow> {
		Ok(Flow::Continue)
	}

	/// After a shrink attempt, with the candidate (if one was produced).
	fn post_shrink(&mut self, info: &PostShrinkInfo) -> crate::Result<()> {
		Ok(())
	}

	/// After running a trial with shrunken arguments.
	fn post_shrink_trial(&mut self, info: &PostShrinkTrialInfo) -> crate::Result<PostTrialFlow> {
		Ok(PostTrialFlow::Continue)
	}
}

/// The all-defaults hook set: observe nothing, continue everywhere.
/// Useful when a run's output is consumed programmatically.
pub struct SilentHooks;

impl Hooks for SilentHooks {}
