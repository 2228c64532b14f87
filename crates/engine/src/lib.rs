// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

//! The Provar trial engine: property declarations, generator capabilities,
//! the trial scheduler, bit-pool autoshrinking, and optional per-trial
//! process isolation.

pub use config::{ForkConfig, RunConfig};
pub use error::Error;
pub use generator::{Generated, Generator, Instance, Shrunk, Shrinker};
pub use hook::{
	CounterexampleInfo, Flow, Hooks, PostForkInfo, PostRunInfo, PostShrinkInfo,
	PostShrinkState, PostShrinkTrialInfo, PostTrialFlow, PostTrialInfo, PreGenArgsInfo,
	PreRunInfo, PreShrinkInfo, PreTrialInfo, RunReport, SilentHooks, TrialOutcome,
};
pub use property::{Property, Verdict};
pub use report::PrintHooks;
pub use run::{RunResult, RunSummary, generate, run, seed_of_time};
pub use runner::Runner;

// Re-exported so run configurations can name autoshrink settings without
// depending on the pool crate directly.
pub use provar_pool::{AutoshrinkConfig, BitPool, PrintMode};
pub use provar_random::Entropy;

mod call;
mod config;
mod error;
#[cfg(unix)]
mod fork;
mod generator;
mod hook;
mod property;
mod report;
mod run;
mod runner;
mod shrink;
mod trial;

pub type Result<T> = std::result::Result<T, Error>;

/// A property can have at most this many arguments.
pub const MAX_ARITY: usize = 7;

/// Default number of trials in a run.
pub const DEFAULT_TRIALS: usize = 100;

/// Default run seed.
pub const DEFAULT_SEED: u64 = 0xa600d64b175eed;
