// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::io::Write;
use std::sync::{Arc, Mutex};

use provar::builtin::Uint8;
use provar::{PrintHooks, Property, RunConfig, RunResult, Verdict, run};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
	fn contents(&self) -> String {
		String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
	}
}

impl Write for SharedBuf {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

#[test]
fn test_console_report_banner_and_summary() {
	let buf = SharedBuf::default();
	let config = RunConfig::new(Property::unary(|_: &u8| Verdict::Pass))
		.with_name("everything is fine")
		.with_seed(0x42)
		.with_trials(10)
		.with_generator(Uint8::new())
		.with_hooks(PrintHooks::new(Box::new(buf.clone())));
	let summary = run(config).unwrap();
	assert_eq!(summary.result, RunResult::Pass);

	let out = buf.contents();
	assert!(
		out.contains("== PROP 'everything is fine': 10 trials, seed 0x0000000000000042"),
		"missing banner: {out}"
	);
	assert!(out.contains("== PASS 'everything is fine': pass "), "missing summary: {out}");
	assert!(out.contains('.'), "missing pass tally: {out}");
}

#[test]
fn test_console_report_counterexample_block() {
	let buf = SharedBuf::default();
	let config = RunConfig::new(Property::unary(|x: &u8| Verdict::from(*x < 42)))
		.with_name("small bytes")
		.with_trials(50)
		.with_generator(Uint8::new())
		.with_hooks(
			PrintHooks::new(Box::new(buf.clone())).with_halt_after_first_failure(),
		);
	let summary = run(config).unwrap();
	assert_eq!(summary.result, RunResult::Fail);

	let out = buf.contents();
	assert!(out.contains(" -- Counter-Example: small bytes"), "missing block: {out}");
	assert!(out.contains("Argument 0:"), "missing argument: {out}");
	assert!(out.contains("== FAIL 'small bytes'"), "missing summary: {out}");
}
