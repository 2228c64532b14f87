// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid run configuration: {reason}")]
	Config { reason: String },

	#[error("generator for argument {index} reported an error")]
	Generator { index: usize },

	#[error("property reported an unrecoverable error")]
	Property,

	#[error("{hook} hook aborted the run")]
	Hook { hook: &'static str },

	#[error("failed property passed when re-run with the same arguments")]
	UnstableProperty,

	#[error("{call} failed: {source}")]
	Os {
		call: &'static str,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Error {
	pub fn config(reason: impl Into<String>) -> Self {
		Error::Config {
			reason: reason.into(),
		}
	}

	pub fn hook(hook: &'static str) -> Self {
		Error::Hook { hook }
	}

	#[cfg(unix)]
	pub(crate) fn os(call: &'static str) -> Self {
		Error::Os {
			call,
			source: std::io::Error::last_os_error(),
		}
	}
}
