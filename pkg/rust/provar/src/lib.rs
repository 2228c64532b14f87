// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

//! Provar is a property-based test runner: declare a property over one or
//! more generated arguments, and the runner searches for a counter-example,
//! automatically shrinking any failing input to a simpler one before
//! reporting it. Runs replay deterministically from a seed, and trials can
//! be isolated in child processes so crashes and timeouts are recoverable.
//!
//! ```no_run
//! use provar::{builtin::Uint8, Property, RunConfig, Verdict};
//!
//! let config = RunConfig::new(Property::unary(|x: &u8| Verdict::from(*x < 42)))
//! 	.with_name("all bytes are small")
//! 	.with_generator(Uint8::new());
//! let summary = provar::run(config).unwrap();
//! println!("{}", summary.result);
//! ```

pub use provar_builtin as builtin;
pub use provar_engine::{
	AutoshrinkConfig, BitPool, CounterexampleInfo, DEFAULT_SEED, DEFAULT_TRIALS, Entropy,
	Error, Flow, ForkConfig, Generated, Generator, Hooks, Instance, MAX_ARITY, PostForkInfo,
	PostRunInfo, PostShrinkInfo, PostShrinkState, PostShrinkTrialInfo, PostTrialFlow,
	PostTrialInfo, PreGenArgsInfo, PreRunInfo, PreShrinkInfo, PreTrialInfo, PrintHooks,
	PrintMode, Property, Result, RunConfig, RunReport, RunResult, RunSummary, Runner,
	Shrinker, Shrunk, SilentHooks, TrialOutcome, Verdict, generate, run, seed_of_time,
};
