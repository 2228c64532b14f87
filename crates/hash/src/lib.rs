// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

pub use bloom::{Bloom, BloomConfig};

mod bloom;

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// Hash a byte buffer in one pass.
pub fn hash_bytes(data: &[u8]) -> u64 {
	xxh3_64(data)
}

/// Incremental 64-bit hasher for callers that produce their bytes in
/// pieces, such as the bit pool hashing its consumed prefix.
#[derive(Default)]
pub struct Hasher {
	inner: Xxh3,
}

impl Hasher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sink(&mut self, data: &[u8]) {
		self.inner.update(data);
	}

	pub fn finish(&self) -> u64 {
		self.inner.digest()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_one_pass_matches_incremental() {
		let data = b"the quick brown fox jumps over the lazy dog";
		let mut hasher = Hasher::new();
		hasher.sink(&data[..10]);
		hasher.sink(&data[10..]);
		assert_eq!(hasher.finish(), hash_bytes(data));
	}

	#[test]
	fn test_distinct_inputs_distinct_hashes() {
		assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
		assert_ne!(hash_bytes(b""), hash_bytes(b"\x00"));
	}
}
