// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use provar_engine::{
	AutoshrinkConfig, CounterexampleInfo, Generated, Generator, Hooks, PostRunInfo,
	PostTrialFlow, PostTrialInfo, PreGenArgsInfo, RunReport, Runner, TrialOutcome,
};

/// Minimal autoshrinking byte generator: eight bits, no specials.
pub struct ByteGen;

impl Generator for ByteGen {
	fn generate(&self, t: &mut Runner) -> Generated {
		Generated::Value(Box::new(t.random_bits(8) as u8))
	}

	fn format(&self, instance: &dyn Any) -> Option<String> {
		instance.downcast_ref::<u8>().map(|v| v.to_string())
	}

	fn autoshrink(&self) -> Option<AutoshrinkConfig> {
		Some(AutoshrinkConfig::default())
	}
}

/// Plain generator with no hash, no shrink capability: runs with
/// duplicate suppression disabled.
pub struct OpaqueByteGen;

impl Generator for OpaqueByteGen {
	fn generate(&self, t: &mut Runner) -> Generated {
		Generated::Value(Box::new(t.random_bits(8) as u8))
	}
}

#[derive(Default)]
pub struct CaptureState {
	pub trial_seeds: Vec<u64>,
	pub outcomes: Vec<TrialOutcome>,
	pub counterexamples_u8: Vec<u8>,
	pub counterexamples_u32: Vec<u32>,
	pub report: Option<RunReport>,
}

/// Hooks that record everything observable and stay silent.
#[derive(Default)]
pub struct Capture {
	pub state: Rc<RefCell<CaptureState>>,
}

impl Capture {
	pub fn new() -> (Self, Rc<RefCell<CaptureState>>) {
		let capture = Self::default();
		let state = capture.state.clone();
		(capture, state)
	}
}

impl Hooks for Capture {
	fn pre_gen_args(&mut self, info: &PreGenArgsInfo) -> provar_engine::Result<provar_engine::Flow> {
		self.state.borrow_mut().trial_seeds.push(info.trial_seed);
		Ok(provar_engine::Flow::Continue)
	}

	fn post_trial(&mut self, info: &PostTrialInfo) -> provar_engine::Result<PostTrialFlow> {
		self.state.borrow_mut().outcomes.push(info.result);
		Ok(PostTrialFlow::Continue)
	}

	fn counterexample(&mut self, info: &CounterexampleInfo) -> provar_engine::Result<()> {
		let mut state = self.state.borrow_mut();
		for arg in info.args {
			if let Some(v) = arg.downcast_ref::<u8>() {
				state.counterexamples_u8.push(*v);
			}
			if let Some(v) = arg.downcast_ref::<u32>() {
				state.counterexamples_u32.push(*v);
			}
		}
		Ok(())
	}

	fn post_run(&mut self, info: &PostRunInfo) -> provar_engine::Result<()> {
		self.state.borrow_mut().report = Some(info.report);
		Ok(())
	}
}
