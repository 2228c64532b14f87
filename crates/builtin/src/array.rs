// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::any::Any;
use std::fmt::Write as _;

use provar_engine::{AutoshrinkConfig, Generated, Generator, Runner};

/// Generator for `Vec<u8>`: bytes are drawn one at a time until a 0x00
/// byte, which terminates generation and is not part of the instance.
///
/// A zero stream (or a first-draw 0x00) produces the empty array, which
/// is the minimum instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByteArray {
	max_len: Option<usize>,
}

impl ByteArray {
	pub fn new() -> Self {
		Self { max_len: None }
	}

	/// Generate arrays with fewer than `max_len` bytes.
	pub fn with_max_len(max_len: usize) -> Self {
		assert!(max_len > 0);
		Self {
			max_len: Some(max_len),
		}
	}
}

impl Generator for ByteArray {
	fn generate(&self, t: &mut Runner) -> Generated {
		let mut bytes = Vec::with_capacity(8);
		loop {
			if let Some(max_len) = self.max_len
				&& bytes.len() + 1 == max_len
			{
				break;
			}
			let byte = t.random_bits(8) as u8;
			if byte == 0x00 {
				break;
			}
			bytes.push(byte);
		}
		Generated::Value(Box::new(bytes))
	}

	fn format(&self, instance: &dyn Any) -> Option<String> {
		instance.downcast_ref::<Vec<u8>>().map(|bytes| hexdump(bytes))
	}

	fn autoshrink(&self) -> Option<AutoshrinkConfig> {
		Some(AutoshrinkConfig::default())
	}
}

fn hexdump(raw: &[u8]) -> String {
	let mut out = String::new();
	for (row_i, row) in raw.chunks(16).enumerate() {
		let _ = write!(out, "{:04x}: ", 16 * row_i);
		for byte in row {
			let _ = write!(out, "{byte:02x} ");
		}
		for _ in row.len()..16 {
			out.push_str("   ");
		}
		for byte in row {
			let c = *byte as char;
			out.push(if c.is_ascii_graphic() || c == ' ' { c } else { '.' });
		}
		out.push('\n');
	}
	out
}
