// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::io::{self, Write};

use crate::hook::{
	CounterexampleInfo, Flow, Hooks, PostRunInfo, PostTrialFlow, PostTrialInfo, PreRunInfo,
	PreTrialInfo, TrialOutcome,
};

/// Default number of columns after which the trial tally wraps.
const DEFAULT_MAX_COLUMNS: usize = 72;

const PASS_SCALE_FACTOR: usize = 100;
const SKIP_SCALE_FACTOR: usize = 10;
const DUP_SCALE_FACTOR: usize = 10;

/// The default hook set: a console reporter printing a pre-run banner,
/// one tally mark per trial (autoscaling under long streaks), the
/// counter-example block, and a post-run summary.
pub struct PrintHooks {
	out: Box<dyn Write>,
	max_column: usize,
	halt_after_first_failure: bool,

	column: usize,
	scale_pass: usize,
	scale_skip: usize,
	scale_dup: usize,
	consec_pass: usize,
	consec_skip: usize,
	consec_dup: usize,
}

impl Default for PrintHooks {
	fn default() -> Self {
		Self::new(Box::new(io::stdout()))
	}
}

impl PrintHooks {
	pub fn new(out: Box<dyn Write>) -> Self {
		Self {
			out,
			max_column: DEFAULT_MAX_COLUMNS,
			halt_after_first_failure: false,
			column: 0,
			scale_pass: 0,
			scale_skip: 0,
			scale_dup: 0,
			consec_pass: 0,
			consec_skip: 0,
			consec_dup: 0,
		}
	}

	pub fn with_max_column(mut self, max_column: usize) -> Self {
		self.max_column = max_column;
		self
	}

	/// Stop the trial loop after the first failing trial.
	pub fn with_halt_after_first_failure(mut self) -> Self {
		self.halt_after_first_failure = true;
		self
	}
}

/// One tally marker, but after `scale_factor` consecutive markers of the
/// same kind, step the scale up by an order of magnitude and only print
/// every `scale`-th one.
fn autoscale_tally(
	scale_factor: usize,
	name: &str,
	cur_scale: &mut usize,
	tally: char,
	count: &mut usize,
) -> String {
	let scale = if *cur_scale == 0 { 1 } else { *cur_scale };
	let nscale = scale_factor * scale;
	let out = if scale > 1 || *count >= nscale {
		if *count == nscale {
			*cur_scale = nscale;
			format!("({name} x {nscale}){tally}")
		} else if *count % scale == 0 {
			tally.to_string()
		} else {
			String::new()
		}
	} else {
		tally.to_string()
	};
	*count += 1;
	out
}

impl Hooks for PrintHooks {
	fn pre_run(&mut self, info: &PreRunInfo) -> crate::Result<()> {
		writeln!(
			self.out,
			"\n== PROP '{}': {} trials, seed 0x{:016x}",
			info.name, info.total_trials, info.run_seed
		)?;
		Ok(())
	}

	fn pre_trial(&mut self, info: &PreTrialInfo) -> crate::Result<Flow> {
		if self.halt_after_first_failure && info.failures > 0 {
			return Ok(Flow::Halt);
		}
		Ok(Flow::Continue)
	}

	fn post_trial(&mut self, info: &PostTrialInfo) -> crate::Result<PostTrialFlow> {
		let mark = match info.result {
			TrialOutcome::Pass => autoscale_tally(
				PASS_SCALE_FACTOR,
				"PASS",
				&mut self.scale_pass,
				'.',
				&mut self.consec_pass,
			),
			TrialOutcome::Fail => {
				self.scale_pass = 1;
				self.consec_pass = 0;
				self.column = 0;
				String::from("F")
			}
			TrialOutcome::Skip => autoscale_tally(
				SKIP_SCALE_FACTOR,
				"SKIP",
				&mut self.scale_skip,
				's',
				&mut self.consec_skip,
			),
			TrialOutcome::Duplicate => autoscale_tally(
				DUP_SCALE_FACTOR,
				"DUP",
				&mut self.scale_dup,
				'd',
				&mut self.consec_dup,
			),
			TrialOutcome::Error => String::from("E"),
		};

		if self.column + mark.len() >= self.max_column {
			writeln!(self.out)?;
			self.column = 0;
		}
		write!(self.out, "{mark}")?;
		self.out.flush()?;
		self.column += mark.len();

		Ok(PostTrialFlow::Continue)
	}

	fn counterexample(&mut self, info: &CounterexampleInfo) -> crate::Result<()> {
		writeln!(self.out, "\n\n -- Counter-Example: {}", info.name)?;
		writeln!(
			self.out,
			"    Trial {}, Seed 0x{:016x}",
			info.trial, info.trial_seed
		)?;
		for (index, rendered) in info.rendered.iter().enumerate() {
			writeln!(self.out, "    Argument {index}:")?;
			writeln!(self.out, "{rendered}")?;
		}
		Ok(())
	}

	fn post_run(&mut self, info: &PostRunInfo) -> crate::Result<()> {
		let report = &info.report;
		writeln!(
			self.out,
			"\n== {} '{}': pass {}, fail {}, skip {}, dup {}",
			if report.fail > 0 { "FAIL" } else { "PASS" },
			info.name,
			report.pass,
			report.fail,
			report.skip,
			report.dup
		)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tally_prints_plain_marks_below_scale() {
		let mut scale = 0;
		let mut count = 0;
		for _ in 0..99 {
			assert_eq!(autoscale_tally(100, "PASS", &mut scale, '.', &mut count), ".");
		}
		assert_eq!(scale, 0);
	}

	#[test]
	fn test_tally_scales_at_factor() {
		let mut scale = 0;
		let mut count = 100;
		let mark = autoscale_tally(100, "PASS", &mut scale, '.', &mut count);
		assert_eq!(mark, "(PASS x 100).");
		assert_eq!(scale, 100);

		// Between scale marks, nothing is printed.
		assert_eq!(autoscale_tally(100, "PASS", &mut scale, '.', &mut count), "");
		// At the next multiple of the scale, one mark.
		let mut count = 200;
		assert_eq!(autoscale_tally(100, "PASS", &mut scale, '.', &mut count), ".");
	}
}
