// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use std::fmt::Write as _;

use provar_hash::Hasher;
use provar_random::Prng;
use tracing::trace;

/// Default bit-pool allocation, in bits. The pool is filled and grown on
/// demand; an excessively small initial pool would just cause a burst of
/// reallocations during the first generation pass.
pub const DEFAULT_POOL_SIZE: usize = 64 * 8 * 8;

const REQUEST_CAPACITY: usize = 16;

/// How much of a dumped bit pool to include alongside the instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrintMode {
	/// The user's formatter when one exists, otherwise the request
	/// listing.
	#[default]
	Default,
	/// Only the user's formatter.
	User,
	/// The raw byte buffer.
	BitPool,
	/// The per-request listing.
	Requests,
	/// Raw buffer and request listing.
	All,
}

impl PrintMode {
	pub fn includes_raw(self) -> bool {
		matches!(self, PrintMode::BitPool | PrintMode::All)
	}

	pub fn includes_requests(self) -> bool {
		matches!(self, PrintMode::Requests | PrintMode::All)
	}
}

/// A recorded, re-playable log of the random bits a generator consumed
/// during one generation pass.
///
/// While generating, the pool materialises 64-bit words from the PRNG
/// lazily and logs one request per draw. While shrinking, the pool is a
/// frozen copy that serves the (mutated) recorded bits back to the
/// generator, returning zeroes once `consumed` reaches `limit`.
///
/// Bit layout is little-endian within each byte (bit 0 is the LSB), both
/// when serving bits to the generator and for the offset-addressed reads
/// and writes the mutation tactics use.
#[derive(Debug)]
pub struct BitPool {
	pub(crate) bits: Vec<u8>,
	pub(crate) shrinking: bool,
	pub(crate) bits_filled: usize,
	pub(crate) bits_ceil: usize,
	pub(crate) limit: usize,
	pub(crate) consumed: usize,
	pub(crate) requests: Vec<u32>,
	pub(crate) generation: usize,
	pub(crate) index: Option<Vec<usize>>,
}

fn aligned(size: usize, alignment: usize) -> usize {
	match size % alignment {
		0 => size,
		rem => size + alignment - rem,
	}
}

impl BitPool {
	/// An empty pool with capacity for `size_bits` bits, rounded up to a
	/// multiple of 64.
	pub fn new(size_bits: usize) -> Self {
		let bits_ceil = aligned(size_bits, 64);
		Self {
			bits: vec![0u8; bits_ceil / 8],
			shrinking: false,
			bits_filled: 0,
			bits_ceil,
			limit: usize::MAX,
			consumed: 0,
			requests: Vec::with_capacity(REQUEST_CAPACITY),
			generation: 0,
			index: None,
		}
	}

	pub fn generation(&self) -> usize {
		self.generation
	}

	pub fn consumed(&self) -> usize {
		self.consumed
	}

	pub fn bits_filled(&self) -> usize {
		self.bits_filled
	}

	pub fn limit(&self) -> usize {
		self.limit
	}

	/// Cap the number of bits served to the generator; reads past the
	/// limit yield zeroes and are not recorded as requests.
	pub fn set_limit(&mut self, limit: usize) {
		self.limit = limit;
	}

	pub fn requests(&self) -> &[u32] {
		&self.requests
	}

	pub fn request_count(&self) -> usize {
		self.requests.len()
	}

	/// An empty shrinking copy sized for this pool's filled bits, one
	/// generation later, with the same limit.
	pub fn candidate(&self) -> BitPool {
		let mut copy = BitPool::new(self.bits_filled);
		copy.shrinking = true;
		copy.limit = self.limit;
		copy.generation = self.generation + 1;
		copy
	}

	/// Serve `bit_count` bits into `buf` (little-endian), advancing the
	/// cursor. During generation the pool extends itself from `rng` in
	/// 64-bit chunks; during shrinking it only replays recorded bits.
	/// Once the cursor reaches `limit` all further reads are zero and no
	/// request is recorded; a read crossing `limit` is truncated and the
	/// truncated width is what gets recorded.
	pub fn draw(&mut self, rng: &mut Prng, bit_count: u32, save_request: bool, buf: &mut [u64]) {
		if bit_count == 0 {
			return;
		}

		if !self.shrinking {
			self.fill_to(rng, bit_count);
		}

		buf.fill(0);

		if self.consumed == self.limit {
			trace!(consumed = self.consumed, "end of bit pool, yielding zeroes");
			return;
		}

		let mut bit_count = bit_count as usize;
		if self.consumed + bit_count >= self.limit {
			bit_count = self.limit - self.consumed;
		}

		if save_request {
			self.requests.push(bit_count as u32);
		}

		self.fill_buf(bit_count, buf);
	}

	fn fill_to(&mut self, rng: &mut Prng, bit_count: u32) {
		while self.consumed + bit_count as usize > self.bits_ceil {
			let nceil = (2 * self.bits_ceil).max(64);
			trace!(from = self.bits_ceil, to = nceil, "growing bit pool");
			self.bits.resize(nceil / 8, 0);
			self.bits_ceil = nceil;
		}

		while self.consumed + bit_count as usize > self.bits_filled {
			let word = rng.next_u64();
			let offset = self.bits_filled / 8;
			self.bits[offset..offset + 8].copy_from_slice(&word.to_le_bytes());
			self.bits_filled += 64;
		}
	}

	fn fill_buf(&mut self, bit_count: usize, dst: &mut [u64]) {
		let mut done = 0usize;
		let mut word = 0usize;
		while done < bit_count {
			let take = (bit_count - done).min(64) as u8;
			dst[word] = self.read_bits(self.consumed + done, take);
			word += 1;
			done += usize::from(take);
		}
		self.consumed += bit_count;
	}

	/// Read `size` bits (at most 64) starting at an arbitrary bit offset.
	pub fn read_bits(&self, bit_offset: usize, size: u8) -> u64 {
		debug_assert!(size <= 64);
		let mut byte = bit_offset / 8;
		let mut bit = 1u8 << (bit_offset % 8);
		let mut acc = 0u64;

		for i in 0..size {
			if self.bits.get(byte).copied().unwrap_or(0) & bit != 0 {
				acc |= 1u64 << i;
			}
			bit = bit.wrapping_shl(1);
			if bit == 0 {
				bit = 0x01;
				byte += 1;
			}
		}

		acc
	}

	/// Write `size` bits (at most 64) starting at an arbitrary bit offset.
	pub fn write_bits(&mut self, bit_offset: usize, size: u8, value: u64) {
		debug_assert!(size <= 64);
		let mut byte = bit_offset / 8;
		let mut bit = 1u8 << (bit_offset % 8);

		for i in 0..size {
			if byte < self.bits.len() {
				if value & (1u64 << i) != 0 {
					self.bits[byte] |= bit;
				} else {
					self.bits[byte] &= !bit;
				}
			}
			bit = bit.wrapping_shl(1);
			if bit == 0 {
				bit = 0x01;
				byte += 1;
			}
		}
	}

	/// Build the prefix-sum index over the request list, if it has not
	/// been built yet. Mutation tactics address request payloads through
	/// this index.
	pub fn build_index(&mut self) {
		if self.index.is_none() {
			let mut index = Vec::with_capacity(self.requests.len());
			let mut total = 0usize;
			for req in &self.requests {
				index.push(total);
				total += *req as usize;
			}
			self.index = Some(index);
		}
	}

	/// Bit offset of request `pos`'s payload.
	pub fn offset_of(&self, pos: usize) -> usize {
		match &self.index {
			Some(index) => index[pos],
			None => self.requests[..pos].iter().map(|r| *r as usize).sum(),
		}
	}

	/// Shrink `bits_filled` to the byte past the last non-zero byte and
	/// clamp `limit` to it. Applied to every candidate pool before it is
	/// handed to the generator, so fewer bits means a simpler instance.
	pub fn truncate_trailing_zero_bytes(&mut self) {
		let byte_size = self.bits_filled.div_ceil(8);
		let mut nsize = 0usize;
		for i in (0..byte_size).rev() {
			if self.bits[i] != 0x00 {
				nsize = i + 1;
				break;
			}
		}

		self.bits_filled = nsize * 8;
		if self.limit > self.bits_filled {
			self.limit = self.bits_filled;
		}
	}

	/// Hash the consumed prefix of the pool: whole bytes, then any
	/// residual bits masked into one trailing byte. Used for duplicate
	/// suppression when the generator has no hash of its own.
	pub fn hash_consumed(&self) -> u64 {
		let mut hasher = Hasher::new();
		let full_bytes = self.consumed / 8;
		hasher.sink(&self.bits[..full_bytes]);

		let rem_bits = (self.consumed % 8) as u8;
		if rem_bits > 0 {
			let rem = self.bits[full_bytes] & ((1u8 << rem_bits) - 1);
			hasher.sink(&[rem]);
		}
		hasher.finish()
	}

	/// Render the pool in the debug dump format: a header, then the raw
	/// buffer and/or the request listing depending on `mode`.
	pub fn dump(&self, bit_count: usize, mode: PrintMode) -> String {
		let mut out = String::new();
		let shown_limit = if self.limit == usize::MAX {
			self.bits_filled
		} else {
			self.limit
		};
		let _ = write!(
			out,
			"\n-- autoshrink [generation: {}, requests: {} -- {}/{} bits consumed]\n",
			self.generation,
			self.requests.len(),
			self.consumed,
			shown_limit,
		);

		let mut prev = false;

		if mode.includes_raw() {
			prev = true;
			let byte_count = bit_count / 8;
			let left_pad = "      ";

			out.push_str("raw:  ");
			for i in 0..byte_count {
				let byte = self.read_bits(8 * i, 8) as u8;
				let _ = write!(out, "{byte:02x} ");
				if i & 0x0f == 0x0f {
					let _ = write!(out, "\n{left_pad}");
				} else if i & 0x03 == 0x03 {
					out.push(' ');
				}
			}
			let rem = (bit_count % 8) as u8;
			if rem != 0 {
				let byte = self.bits.get(byte_count).copied().unwrap_or(0)
					& ((1u8 << rem) - 1);
				let _ = write!(out, "{byte:02x}/{rem}");
				if byte_count & 0x0f == 0x0e {
					out.push('\n');
					prev = false;
				}
			}
		}

		if mode.includes_requests() {
			if prev {
				out.push_str("\n\n");
			}
			let mut offset = 0usize;
			if !self.requests.is_empty() {
				let _ = write!(out, "requests: ({})\n", self.requests.len());
			}
			for (i, req) in self.requests.iter().enumerate() {
				let mut req_size = *req as usize;
				if offset + req_size > self.bits_filled {
					req_size = self.bits_filled - offset;
				}
				if req_size <= 64 {
					let bits = self.read_bits(offset, req_size as u8);
					let _ = write!(out, "{i} -- {req_size} bits: {bits} (0x{bits:x})\n");
				} else {
					let header = format!("{i} -- {req_size} bits: [ ");
					let left_pad = " ".repeat(header.len());
					out.push_str(&header);

					let byte_count = req_size / 8;
					let rem = (req_size % 8) as u8;
					for bi in 0..byte_count {
						let bits = self.read_bits(offset + 8 * bi, 8) as u8;
						let _ = write!(out, "{bits:02x} ");
						if bi & 15 == 15 {
							let _ = write!(out, "\n{left_pad}");
						} else if bi & 3 == 3 {
							out.push(' ');
						}
					}
					if rem > 0 {
						let bits = self.read_bits(offset + 8 * byte_count, rem) as u8;
						let _ = write!(out, "{bits:02x}/{rem} ");
					}
					out.push_str("]\n");
				}
				offset += *req as usize;
			}
		}

		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn drained_pool(seed: u64, draws: &[u32]) -> (BitPool, Vec<u64>) {
		let mut rng = Prng::new(seed);
		let mut pool = BitPool::new(DEFAULT_POOL_SIZE);
		let mut values = Vec::new();
		for &width in draws {
			let mut buf = [0u64; 4];
			pool.draw(&mut rng, width, true, &mut buf);
			values.push(buf[0]);
		}
		(pool, values)
	}

	#[test]
	fn test_requests_sum_to_consumed() {
		let draws = [3, 8, 64, 1, 17, 5, 64, 64, 9];
		let (pool, _) = drained_pool(0xfeed, &draws);
		let total: usize = pool.requests().iter().map(|r| *r as usize).sum();
		assert_eq!(total, pool.consumed());
		assert_eq!(pool.request_count(), draws.len());
	}

	#[test]
	fn test_delivered_bits_land_at_indexed_offsets() {
		let draws = [8, 3, 64, 21];
		let (mut pool, values) = drained_pool(42, &draws);
		pool.build_index();
		for (i, &width) in draws.iter().enumerate() {
			let offset = pool.offset_of(i);
			assert_eq!(pool.read_bits(offset, width as u8), values[i]);
		}
	}

	#[test]
	fn test_draws_replay_the_prng_stream() {
		let mut rng = Prng::new(7);
		let expected = rng.next_u64();

		let (_, values) = drained_pool(7, &[16, 16, 32]);
		let got = values[0] | (values[1] << 16) | (values[2] << 32);
		assert_eq!(got, expected);
	}

	#[test]
	fn test_limit_zeroes_and_stops_recording() {
		let mut rng = Prng::new(1);
		let mut pool = BitPool::new(128);
		pool.set_limit(10);

		let mut buf = [0u64; 1];
		pool.draw(&mut rng, 8, true, &mut buf);
		// Crossing the limit truncates the recorded request.
		pool.draw(&mut rng, 8, true, &mut buf);
		assert_eq!(pool.requests(), &[8, 2]);
		assert_eq!(pool.consumed(), 10);

		// At the limit, reads yield zeroes and are not recorded.
		buf = [u64::MAX; 1];
		pool.draw(&mut rng, 8, true, &mut buf);
		assert_eq!(buf[0], 0);
		assert_eq!(pool.requests(), &[8, 2]);
		assert_eq!(pool.consumed(), 10);
	}

	#[test]
	fn test_read_write_round_trip() {
		let mut pool = BitPool::new(256);
		// Materialise some bits so the buffer is sized.
		let mut rng = Prng::new(3);
		let mut buf = [0u64; 4];
		pool.draw(&mut rng, 192, true, &mut buf);

		for &(offset, size, value) in &[
			(0usize, 1u8, 1u64),
			(3, 8, 0xa5),
			(13, 17, 0x1_2345),
			(64, 64, 0xdead_beef_cafe_f00d),
			(100, 33, 0x1_fff0_000f),
		] {
			pool.write_bits(offset, size, value);
			let mask = if size == 64 { u64::MAX } else { (1u64 << size) - 1 };
			assert_eq!(pool.read_bits(offset, size), value & mask);
		}
	}

	#[test]
	fn test_truncation_clamps_limit_and_is_idempotent() {
		let mut pool = BitPool::new(256);
		let mut rng = Prng::new(11);
		let mut buf = [0u64; 2];
		pool.draw(&mut rng, 128, true, &mut buf);

		// Zero everything past the first byte.
		for offset in (8..128).step_by(8) {
			pool.write_bits(offset, 8, 0);
		}
		pool.write_bits(0, 8, 0x40);

		pool.truncate_trailing_zero_bytes();
		assert_eq!(pool.bits_filled(), 8);
		assert_eq!(pool.limit(), 8);

		let filled = pool.bits_filled();
		let limit = pool.limit();
		pool.truncate_trailing_zero_bytes();
		assert_eq!(pool.bits_filled(), filled);
		assert_eq!(pool.limit(), limit);
	}

	#[test]
	fn test_all_zero_pool_truncates_to_nothing() {
		let mut pool = BitPool::new(128);
		let mut rng = Prng::new(2);
		let mut buf = [0u64; 2];
		pool.draw(&mut rng, 128, true, &mut buf);
		for offset in (0..128).step_by(8) {
			pool.write_bits(offset, 8, 0);
		}
		pool.truncate_trailing_zero_bytes();
		assert_eq!(pool.bits_filled(), 0);
		assert_eq!(pool.limit(), 0);
	}

	#[test]
	fn test_candidate_inherits_limit_and_bumps_generation() {
		let (mut pool, _) = drained_pool(5, &[64, 64]);
		pool.set_limit(100);
		let copy = pool.candidate();
		assert_eq!(copy.generation(), pool.generation() + 1);
		assert_eq!(copy.limit(), 100);
		assert_eq!(copy.consumed(), 0);
		assert_eq!(copy.request_count(), 0);
	}

	#[test]
	fn test_hash_consumed_ignores_unconsumed_tail() {
		let (pool_a, _) = drained_pool(21, &[64, 5]);
		let (pool_b, _) = drained_pool(21, &[64, 5]);
		assert_eq!(pool_a.hash_consumed(), pool_b.hash_consumed());

		let (pool_c, _) = drained_pool(22, &[64, 5]);
		assert_ne!(pool_a.hash_consumed(), pool_c.hash_consumed());
	}

	#[test]
	fn test_dump_header_and_remainder_notation() {
		let (mut pool, _) = drained_pool(9, &[8, 8, 3]);
		pool.set_limit(19);
		let dump = pool.dump(19, PrintMode::All);
		assert!(dump.contains("-- autoshrink [generation: 0, requests: 3 -- 19/19 bits consumed]"));
		assert!(dump.contains("raw:  "));
		assert!(dump.contains("/3"), "missing residual-bit notation: {dump}");
		assert!(dump.contains("requests: (3)"));
	}

	#[test]
	fn test_dump_sections_are_ordered_raw_then_requests() {
		let (pool, _) = drained_pool(13, &[16, 16]);
		let dump = pool.dump(32, PrintMode::All);
		let raw_at = dump.find("raw:").unwrap();
		let req_at = dump.find("requests:").unwrap();
		assert!(raw_at < req_at);
	}
}
