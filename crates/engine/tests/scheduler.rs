// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{ByteGen, Capture, OpaqueByteGen};
use provar_engine::{
	Error, Flow, Hooks, PostTrialFlow, PostTrialInfo, PreTrialInfo, Property, RunConfig,
	RunResult, TrialOutcome, Verdict, run,
};

#[test]
fn test_all_pass_counts_every_trial() {
	let (hooks, state) = Capture::new();
	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Pass))
		.with_generator(OpaqueByteGen)
		.with_trials(50)
		.with_hooks(hooks);
	let summary = run(config).unwrap();

	assert_eq!(summary.result, RunResult::Pass);
	let report = state.borrow().report.unwrap();
	assert_eq!(report.pass, 50);
	assert_eq!(report.fail, 0);
	assert_eq!(report.skip, 0);
	assert_eq!(report.dup, 0);
}

#[test]
fn test_all_skip_returns_skip() {
	let (hooks, state) = Capture::new();
	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Skip))
		.with_generator(OpaqueByteGen)
		.with_trials(7)
		.with_hooks(hooks);
	let summary = run(config).unwrap();

	assert_eq!(summary.result, RunResult::Skip);
	assert_eq!(state.borrow().report.unwrap().skip, 7);
}

#[test]
fn test_small_domain_trials_deduplicate() {
	struct BitGen;
	impl provar_engine::Generator for BitGen {
		fn generate(&self, t: &mut provar_engine::Runner) -> provar_engine::Generated {
			provar_engine::Generated::Value(Box::new(t.random_bits(1) != 0))
		}
		fn autoshrink(&self) -> Option<provar_engine::AutoshrinkConfig> {
			Some(provar_engine::AutoshrinkConfig::default())
		}
	}

	let (hooks, state) = Capture::new();
	let config = RunConfig::new(Property::unary(|_: &bool| Verdict::Pass))
		.with_generator(BitGen)
		.with_trials(20)
		.with_hooks(hooks);
	let summary = run(config).unwrap();

	assert_eq!(summary.result, RunResult::Pass);
	let report = state.borrow().report.unwrap();
	assert!(report.dup >= 10, "expected heavy deduplication: {report:?}");
	assert_eq!(report.pass + report.dup, 20);
}

#[test]
fn test_pre_trial_halt_stops_the_loop() {
	struct HaltAfter {
		remaining: usize,
	}
	impl Hooks for HaltAfter {
		fn pre_trial(&mut self, _info: &PreTrialInfo) -> provar_engine::Result<Flow> {
			if self.remaining == 0 {
				return Ok(Flow::Halt);
			}
			self.remaining -= 1;
			Ok(Flow::Continue)
		}
	}

	let calls = Rc::new(Cell::new(0usize));
	let calls_in_prop = calls.clone();
	let config = RunConfig::new(Property::unary(move |_: &u8| {
		calls_in_prop.set(calls_in_prop.get() + 1);
		Verdict::Pass
	}))
	.with_generator(OpaqueByteGen)
	.with_trials(100)
	.with_hooks(HaltAfter { remaining: 5 });
	let summary = run(config).unwrap();

	assert_eq!(calls.get(), 5);
	assert_eq!(summary.report.pass, 5);
}

#[test]
fn test_repeat_once_reinvokes_property() {
	struct RepeatOnceHooks;
	impl Hooks for RepeatOnceHooks {
		fn post_trial(&mut self, info: &PostTrialInfo) -> provar_engine::Result<PostTrialFlow> {
			if info.result == TrialOutcome::Fail {
				return Ok(PostTrialFlow::RepeatOnce);
			}
			Ok(PostTrialFlow::Continue)
		}
	}

	let calls = Rc::new(Cell::new(0usize));
	let calls_in_prop = calls.clone();
	let config = RunConfig::new(Property::unary(move |_: &u8| {
		calls_in_prop.set(calls_in_prop.get() + 1);
		Verdict::Fail
	}))
	.with_generator(OpaqueByteGen)
	.with_trials(1)
	.with_hooks(RepeatOnceHooks);
	let summary = run(config).unwrap();

	assert_eq!(summary.result, RunResult::Fail);
	// Once for the trial, once for the repeat. No shrinking: the
	// generator has no shrink capability.
	assert_eq!(calls.get(), 2);
}

#[test]
fn test_arity_mismatch_is_a_config_error() {
	let config = RunConfig::new(Property::binary(|_: &u8, _: &u8| Verdict::Pass))
		.with_generator(OpaqueByteGen);
	assert!(matches!(run(config), Err(Error::Config { .. })));
}

#[test]
fn test_conflicting_shrink_capabilities_are_rejected() {
	struct Conflicted;
	struct NoopShrinker;
	impl provar_engine::Shrinker for NoopShrinker {
		fn shrink(
			&self,
			_t: &mut provar_engine::Runner,
			_instance: &dyn std::any::Any,
			_tactic: u32,
		) -> provar_engine::Shrunk {
			provar_engine::Shrunk::NoMoreTactics
		}
	}
	impl provar_engine::Generator for Conflicted {
		fn generate(&self, t: &mut provar_engine::Runner) -> provar_engine::Generated {
			provar_engine::Generated::Value(Box::new(t.random_bits(8) as u8))
		}
		fn shrinker(&self) -> Option<&dyn provar_engine::Shrinker> {
			Some(&NoopShrinker)
		}
		fn autoshrink(&self) -> Option<provar_engine::AutoshrinkConfig> {
			Some(provar_engine::AutoshrinkConfig::default())
		}
	}

	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Pass))
		.with_generator(Conflicted);
	assert!(matches!(run(config), Err(Error::Config { .. })));
}

#[test]
fn test_generator_skip_counts_as_skip() {
	struct SkippingGen;
	impl provar_engine::Generator for SkippingGen {
		fn generate(&self, _t: &mut provar_engine::Runner) -> provar_engine::Generated {
			provar_engine::Generated::Skip
		}
	}

	let (hooks, state) = Capture::new();
	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Pass))
		.with_generator(SkippingGen)
		.with_trials(5)
		.with_hooks(hooks);
	let summary = run(config).unwrap();
	assert_eq!(summary.result, RunResult::Skip);
	assert_eq!(state.borrow().report.unwrap().skip, 5);
}

#[test]
fn test_generator_error_aborts_the_run() {
	struct BrokenGen;
	impl provar_engine::Generator for BrokenGen {
		fn generate(&self, _t: &mut provar_engine::Runner) -> provar_engine::Generated {
			provar_engine::Generated::Error
		}
	}

	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Pass))
		.with_generator(BrokenGen)
		.with_trials(5)
		.with_hooks(common::Capture::default());
	assert!(matches!(run(config), Err(Error::Generator { index: 0 })));
}

#[test]
fn test_property_error_aborts_the_run() {
	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Error))
		.with_generator(ByteGen)
		.with_trials(5)
		.with_hooks(common::Capture::default());
	assert!(matches!(run(config), Err(Error::Property)));
}
