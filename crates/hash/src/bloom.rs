// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

// A dynamic blocked bloom filter, loosely based on _Cache Efficient Bloom
// Filters for Shared Memory Machines_ by Tim Kaler.
//
// The top level uses the low `top_block_bits` bits of the hash to choose
// between `1 << top_block_bits` distinct blocks. Each block is a chain of
// bloom filters; marking only touches the front (largest) filter, and when
// a mark finds every probed bit already set, a doubled filter is prepended
// to the chain. A lookup hits iff some filter in the chain reports all
// probed bits set, so entries marked in older filters keep matching.

use tracing::warn;

// How many probes to check per filter.
const HASH_COUNT: u32 = 4;

const DEFAULT_TOP_BLOCK_BITS: u8 = 9;
const DEFAULT_MIN_FILTER_BITS: u8 = 9;

#[derive(Clone, Copy, Debug)]
pub struct BloomConfig {
	/// log2 of the top-level block count.
	pub top_block_bits: u8,
	/// log2 of the bit count of a block's first filter.
	pub min_filter_bits: u8,
}

impl Default for BloomConfig {
	fn default() -> Self {
		Self {
			top_block_bits: DEFAULT_TOP_BLOCK_BITS,
			min_filter_bits: DEFAULT_MIN_FILTER_BITS,
		}
	}
}

#[derive(Debug)]
struct Filter {
	/// log2 of the bit count.
	size2: u8,
	bits: Vec<u8>,
}

impl Filter {
	fn new(size2: u8) -> Self {
		Self {
			size2,
			bits: vec![0u8; (1usize << size2) / 8],
		}
	}

	fn probe(&self, hash: u64, i: u32) -> (usize, u8) {
		let mask = (1u64 << self.size2) - 1;
		let v = (hash >> (i * u32::from(self.size2))) & mask;
		((v / 8) as usize, 1u8 << (v & 0x07))
	}
}

/// Approximate-membership filter over 64-bit hashes: false positives are
/// possible, false negatives are not.
#[derive(Debug)]
pub struct Bloom {
	top_block2: u8,
	min_filter2: u8,
	// Chains start empty and are lazily populated; front = largest.
	blocks: Vec<Vec<Filter>>,
}

impl Bloom {
	pub fn new(config: BloomConfig) -> Self {
		let top_block2 = config.top_block_bits;
		let mut blocks = Vec::with_capacity(1usize << top_block2);
		blocks.resize_with(1usize << top_block2, Vec::new);
		Self {
			top_block2,
			min_filter2: config.min_filter_bits,
			blocks,
		}
	}

	/// Hash `data` and mark it in the filter.
	pub fn mark(&mut self, data: &[u8]) {
		let hash = crate::hash_bytes(data);
		let block_id = (hash & ((1u64 << self.top_block2) - 1)) as usize;
		let hash = hash >> self.top_block2;

		let min_filter2 = self.min_filter2;
		let chain = &mut self.blocks[block_id];
		if chain.is_empty() {
			chain.push(Filter::new(min_filter2));
		}

		// Only mark in the front filter.
		let front = &mut chain[0];
		let mut any_set = false;
		for i in 0..HASH_COUNT {
			let (offset, bit) = front.probe(hash, i);
			if front.bits[offset] & bit == 0 {
				any_set = true;
			}
			front.bits[offset] |= bit;
		}

		// All probed bits were already set: the front filter is too
		// full. Prepend a doubled filter so new entries see fewer
		// false positives, unless the 64 hash bits are exhausted.
		if !any_set {
			let size2 = chain[0].size2;
			if u32::from(self.top_block2) + HASH_COUNT * u32::from(size2 + 1) > 64 {
				warn!(block_id, size2, "bloom filter block cannot grow further");
			} else {
				chain.insert(0, Filter::new(size2 + 1));
			}
		}
	}

	/// Check whether `data`'s hash has been marked.
	pub fn check(&self, data: &[u8]) -> bool {
		let hash = crate::hash_bytes(data);
		let block_id = (hash & ((1u64 << self.top_block2) - 1)) as usize;
		let hash = hash >> self.top_block2;

		self.blocks[block_id].iter().any(|filter| {
			(0..HASH_COUNT).all(|i| {
				let (offset, bit) = filter.probe(hash, i);
				filter.bits[offset] & bit != 0
			})
		})
	}
}
