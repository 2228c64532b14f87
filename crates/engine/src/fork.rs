// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

// Per-trial process isolation. The child runs the property and writes a
// single result byte on a pipe; a closed pipe with no byte means the
// child crashed. The parent polls the read end under the configured
// timeout and escalates from the configured signal to SIGKILL when the
// child will not exit.

use std::io;
use std::time::Duration;

use libc::{c_int, c_void, pid_t};
use tracing::{debug, warn};

use crate::error::Error;
use crate::hook::PostForkInfo;
use crate::property::Verdict;
use crate::run::Engine;

// Doubling backoff for transient fork failures: 1 ns up to 2^10 ns.
const MAX_FORK_RETRIES: u32 = 10;

// Grace period after SIGKILL before giving up on the child, in msec.
const KILL_WAIT_MSEC: u64 = 10;

const DEFAULT_EXIT_TIMEOUT_MSEC: u64 = 100;

pub(crate) struct Worker {
	pid: pid_t,
	stopped: bool,
	wstatus: c_int,
}

impl Engine {
	/// Run the property in a forked child and report its verdict.
	pub(crate) fn call_forked(&mut self) -> crate::Result<Verdict> {
		let mut fds = [0 as c_int; 2];
		if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
			return Err(Error::os("pipe"));
		}

		let mut delay_ns: u64 = 1;
		let pid = loop {
			let pid = unsafe { libc::fork() };
			if pid != -1 {
				break pid;
			}

			let err = io::Error::last_os_error();
			if err.raw_os_error() != Some(libc::EAGAIN) {
				close_both(&fds);
				return Err(Error::Os { call: "fork", source: err });
			}

			// EAGAIN: probably RLIMIT_NPROC. Reap any exited children
			// and retry with doubling backoff.
			warn!("fork returned EAGAIN, reaping and retrying");
			step_waitpid(None)?;
			sleep(Duration::from_nanos(delay_ns))?;
			if delay_ns >= 1 << MAX_FORK_RETRIES {
				close_both(&fds);
				return Err(Error::Os { call: "fork", source: err });
			}
			delay_ns <<= 1;
		};

		if pid == 0 {
			// Child: close the read end, run the property, report one
			// byte, and exit without unwinding into the parent's state.
			unsafe { libc::close(fds[0]) };
			let out_fd = fds[1];

			if self.run_post_fork_hook().is_err() {
				write_result_byte(out_fd, Verdict::Error);
				unsafe { libc::_exit(1) };
			}

			let verdict = self.call_inner();
			let wrote = write_result_byte(out_fd, verdict);
			unsafe { libc::_exit(if wrote && verdict == Verdict::Pass { 0 } else { 1 }) };
		}

		// Parent.
		unsafe { libc::close(fds[1]) };
		let mut worker = Worker {
			pid,
			stopped: false,
			wstatus: 0,
		};
		let res = self.supervise_child(fds[0], &mut worker);
		unsafe { libc::close(fds[0]) };
		step_waitpid(Some(&mut worker))?;
		res
	}

	fn run_post_fork_hook(&mut self) -> crate::Result<()> {
		self.hooks.post_fork(&PostForkInfo {
			name: &self.name,
			total_trials: self.trials,
			failures: self.counters.fail,
			run_seed: self.run_seed,
			arity: self.property.arity(),
		})
	}

	fn supervise_child(&mut self, fd: c_int, worker: &mut Worker) -> crate::Result<Verdict> {
		let timeout_ms: c_int = match self.fork.timeout {
			Some(timeout) if !timeout.is_zero() => {
				timeout.as_millis().min(c_int::MAX as u128) as c_int
			}
			_ => -1,
		};

		let mut pfd = libc::pollfd {
			fd,
			events: libc::POLLIN,
			revents: 0,
		};
		let res = loop {
			let res = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
			if res == -1 {
				let err = io::Error::last_os_error();
				match err.raw_os_error() {
					Some(libc::EAGAIN) | Some(libc::EINTR) => continue,
					_ => return Err(Error::Os { call: "poll", source: err }),
				}
			}
			break res;
		};

		if res == 0 {
			// Timed out: signal the child, give it exit_timeout to wind
			// down, then SIGKILL and a short grace period.
			let kill_signal = self.fork.signal.unwrap_or(libc::SIGTERM);
			debug!(pid = worker.pid, kill_signal, "trial timed out, signalling child");
			if unsafe { libc::kill(worker.pid, kill_signal) } == -1 {
				return Err(Error::os("kill"));
			}

			let exit_timeout_ms = if self.fork.exit_timeout.is_zero() {
				DEFAULT_EXIT_TIMEOUT_MSEC
			} else {
				self.fork.exit_timeout.as_millis() as u64
			};
			wait_for_exit(worker, exit_timeout_ms, KILL_WAIT_MSEC)?;

			// A child that exited successfully anyway counts as a pass;
			// there was just a race on the timeout.
			if worker.stopped {
				let st = worker.wstatus;
				if libc::WIFEXITED(st) && libc::WEXITSTATUS(st) == 0 {
					return Ok(Verdict::Pass);
				}
			}
			return Ok(Verdict::Fail);
		}

		let mut byte = 0u8;
		let rd = loop {
			let rd = unsafe { libc::read(fd, &mut byte as *mut u8 as *mut c_void, 1) };
			if rd == -1 {
				let err = io::Error::last_os_error();
				if err.raw_os_error() == Some(libc::EINTR) {
					continue;
				}
				return Err(Error::Os { call: "read", source: err });
			}
			break rd;
		};

		if rd == 0 {
			// Pipe closed without a result byte: the child crashed.
			debug!(pid = worker.pid, "child closed pipe without a result");
			Ok(Verdict::Fail)
		} else {
			Ok(Verdict::from_wire(byte))
		}
	}
}

fn close_both(fds: &[c_int; 2]) {
	unsafe {
		libc::close(fds[0]);
		libc::close(fds[1]);
	}
}

fn write_result_byte(fd: c_int, verdict: Verdict) -> bool {
	let byte = verdict.wire();
	let wrote = unsafe { libc::write(fd, &byte as *const u8 as *const c_void, 1) };
	wrote == 1
}

// Clean up after all child processes that have changed state, recording
// the exit status of the current worker.
fn step_waitpid(mut worker: Option<&mut Worker>) -> crate::Result<()> {
	loop {
		let mut wstatus: c_int = 0;
		let res = unsafe { libc::waitpid(-1, &mut wstatus, libc::WNOHANG) };
		if res == -1 {
			let err = io::Error::last_os_error();
			if err.raw_os_error() == Some(libc::ECHILD) {
				break; // no children
			}
			return Err(Error::Os { call: "waitpid", source: err });
		} else if res == 0 {
			break; // no children have changed state
		} else if let Some(worker) = worker.as_deref_mut()
			&& res == worker.pid
		{
			worker.stopped = true;
			worker.wstatus = wstatus;
		}
	}
	Ok(())
}

// Wait up to timeout msec for the worker to exit; at the deadline send
// SIGKILL and wait kill_timeout msec more.
fn wait_for_exit(worker: &mut Worker, timeout_ms: u64, kill_timeout_ms: u64) -> crate::Result<()> {
	for elapsed in 0..=timeout_ms + kill_timeout_ms {
		step_waitpid(Some(worker))?;
		if worker.stopped {
			break;
		}

		if elapsed == timeout_ms
			&& unsafe { libc::kill(worker.pid, libc::SIGKILL) } == -1
		{
			let err = io::Error::last_os_error();
			if err.raw_os_error() != Some(libc::ESRCH) {
				return Err(Error::Os { call: "kill", source: err });
			}
			// The child just exited on its own; waitpid handles it.
		}

		sleep(Duration::from_millis(1))?;
	}
	Ok(())
}

fn sleep(duration: Duration) -> crate::Result<()> {
	let ts = libc::timespec {
		tv_sec: duration.as_secs() as libc::time_t,
		tv_nsec: i64::from(duration.subsec_nanos()) as libc::c_long,
	};
	if unsafe { libc::nanosleep(&ts, std::ptr::null_mut()) } == -1 {
		return Err(Error::os("nanosleep"));
	}
	Ok(())
}
