// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

mod common;

use common::{ByteGen, Capture};
use provar_engine::{Property, RunConfig, Verdict, run};

fn failing_config(hooks: Capture) -> RunConfig {
	RunConfig::new(Property::unary(|x: &u8| Verdict::from(*x < 128)))
		.with_generator(ByteGen)
		.with_seed(0x0123_4567_89ab_cdef)
		.with_trials(40)
		.with_hooks(hooks)
}

#[test]
fn test_two_runs_are_identical() {
	let (hooks_a, state_a) = Capture::new();
	let summary_a = run(failing_config(hooks_a)).unwrap();

	let (hooks_b, state_b) = Capture::new();
	let summary_b = run(failing_config(hooks_b)).unwrap();

	assert_eq!(summary_a.result, summary_b.result);
	assert_eq!(summary_a.report, summary_b.report);

	let state_a = state_a.borrow();
	let state_b = state_b.borrow();
	assert_eq!(state_a.trial_seeds, state_b.trial_seeds);
	assert_eq!(state_a.outcomes, state_b.outcomes);
	assert_eq!(state_a.counterexamples_u8, state_b.counterexamples_u8);
}

#[test]
fn test_distinct_run_seeds_diverge() {
	let (hooks_a, state_a) = Capture::new();
	run(failing_config(hooks_a).with_seed(1)).unwrap();
	let (hooks_b, state_b) = Capture::new();
	run(failing_config(hooks_b).with_seed(2)).unwrap();

	assert_ne!(state_a.borrow().trial_seeds, state_b.borrow().trial_seeds);
}

#[test]
fn test_always_seeds_run_first_then_run_seed() {
	let (hooks, state) = Capture::new();
	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Pass))
		.with_generator(ByteGen)
		.with_seed(0xabcd)
		.with_trials(6)
		.with_always_seeds(vec![11, 22, 33])
		.with_hooks(hooks);
	run(config).unwrap();

	let seeds = state.borrow().trial_seeds.clone();
	assert_eq!(&seeds[..4], &[11, 22, 33, 0xabcd]);
	assert_eq!(seeds.len(), 6);
}

#[test]
fn test_zero_seed_falls_back_to_default() {
	let (hooks, state) = Capture::new();
	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Pass))
		.with_generator(ByteGen)
		.with_seed(0)
		.with_trials(1)
		.with_hooks(hooks);
	run(config).unwrap();
	assert_eq!(state.borrow().trial_seeds[0], provar_engine::DEFAULT_SEED);
}
