// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Provar

use provar_random::Entropy;
use tracing::trace;

use crate::model::{Action, Model, Mutation};
use crate::pool::BitPool;

/// Sentinel for the raw 32-bit drop-selection draw: when hit, no request
/// is force-dropped this pass. Production draws reach it with probability
/// 2^-32, which merely skips the forced drop; tests reach it through a
/// scripted entropy source.
pub(crate) const DROP_NONE: u64 = 0xFFFF_FFFF;

fn log2ceil(value: usize) -> u8 {
	let mut res = 0u8;
	while (1u64 << res) < value as u64 {
		res += 1;
	}
	res
}

/// Copy `count` bits from `src` at `src_offset` to `dst` at `dst_offset`,
/// in 64-bit chunks.
fn copy_bits(src: &BitPool, src_offset: usize, dst: &mut BitPool, dst_offset: usize, count: usize) {
	let mut done = 0usize;
	while done < count {
		let take = (count - done).min(64) as u8;
		let bits = src.read_bits(src_offset + done, take);
		dst.write_bits(dst_offset + done, take, bits);
		done += usize::from(take);
	}
}

/// Copy the original pool into `copy`, dropping individual requests with
/// small probability, plus one pre-selected request. Requests wider than
/// 64 bits may lose only an inner sub-range. The surviving bit count
/// becomes the copy's fill level.
pub(crate) fn drop_requests(
	orig: &BitPool,
	copy: &mut BitPool,
	drop_threshold: u64,
	drop_bits: u8,
	source: &mut dyn Entropy,
) {
	let mut src_offset = 0usize;
	let mut dst_offset = 0usize;

	// Always drop at least one request, unless the sentinel comes up.
	let raw = source.bits(32);
	let to_drop = if raw != DROP_NONE && orig.request_count() > 0 {
		Some((raw % orig.request_count() as u64) as usize)
	} else {
		None
	};

	let mut drop_count = 0usize;

	for (ri, req) in orig.requests().iter().enumerate() {
		let req_size = *req as usize;
		let forced = to_drop == Some(ri);
		if forced || source.bits(drop_bits) <= drop_threshold {
			drop_count += 1;
			if req_size > 64 {
				// Drop only an inner sub-range of a large request.
				let drop_offset = (source.bits(32) % req_size as u64) as usize;
				let drop_size = (source.bits(32) % req_size as u64) as usize;
				trace!(ri, drop_offset, drop_size, req_size, "dropping sub-range");

				let head = drop_offset.min(req_size);
				copy_bits(orig, src_offset, copy, dst_offset, head);
				dst_offset += head;

				let tail_start = drop_offset + drop_size + 1;
				if tail_start < req_size {
					copy_bits(
						orig,
						src_offset + tail_start,
						copy,
						dst_offset,
						req_size - tail_start,
					);
					dst_offset += req_size - tail_start;
				}
			} else {
				trace!(ri, req_size, "dropping request");
			}
			src_offset += req_size;
		} else {
			copy_bits(orig, src_offset, copy, dst_offset, req_size);
			src_offset += req_size;
			dst_offset += req_size;
		}
	}

	trace!(
		from = orig.bits_filled(),
		to = dst_offset,
		drop_count,
		"drop pass complete"
	);
	copy.bits_filled = dst_offset;
}

/// Copy the original pool into `copy` and apply a batch of in-place
/// mutations, then tighten the copy's limit to halve the unconsumed tail.
pub(crate) fn mutate_pool(
	model: &mut Model,
	orig: &BitPool,
	copy: &mut BitPool,
	source: &mut dyn Entropy,
) {
	let orig_bytes = orig.bits_filled().div_ceil(8);
	copy.bits[..orig_bytes].copy_from_slice(&orig.bits[..orig_bytes]);
	copy.bits_filled = orig.bits_filled();

	let mut max_changes = 5u8;
	while (1u64 << max_changes) < orig.request_count() as u64 {
		max_changes += 1;
	}

	// One effective change per set bit, at least one.
	let mut change_count = source.bits(max_changes).count_ones() as usize + 1;

	// With only a few small requests, several changes to the same small
	// surface tend to overshoot once the input is near a local minimum,
	// so clamp the budget to the request count.
	if change_count > orig.request_count() {
		let all_small = orig.requests().iter().all(|r| *r <= 64);
		if all_small {
			trace!(change_count, clamped = orig.request_count(), "clamping change budget");
			change_count = orig.request_count();
		}
	}

	let mut changed = 0usize;

	// Attempt up to CHANGE_COUNT changes, with limited retries for when
	// the random modifications have no effect.
	for attempt in 0..10 * change_count {
		if choose_and_mutate_request(model, orig, copy, source) {
			changed += 1;
			trace!(attempt, changed, change_count, "mutation step changed bits");
			if changed == change_count {
				break;
			}
		}
	}

	// Truncate half of the unconsumed bits.
	let nsize = orig.consumed() + (orig.bits_filled() - orig.consumed()) / 2;
	if nsize < copy.limit {
		copy.limit = nsize;
	}
}

fn choose_and_mutate_request(
	model: &mut Model,
	orig: &BitPool,
	pool: &mut BitPool,
	source: &mut dyn Entropy,
) -> bool {
	if orig.request_count() == 0 {
		return false;
	}

	let mutation = model.weighted_mutation(source);
	let request_bits = log2ceil(orig.request_count());

	// Align the change with a random request; the mod biases toward
	// earlier requests.
	let pos = (source.bits(request_bits) % orig.request_count() as u64) as usize;
	let bit_offset = orig.offset_of(pos);
	let size = orig.requests()[pos] as usize;

	match mutation {
		Mutation::Shift => {
			model.mark_tried(Action::Shift);
			let shift = source.bits(2) as u32 + 1;

			let (rel_pos, to_change) = mutation_region(size, source);
			let bits = pool.read_bits(bit_offset + rel_pos, to_change);
			let nbits = bits >> shift;
			trace!(shift, size, rel_pos, bit_offset, bits, nbits, "shift");
			pool.write_bits(bit_offset + rel_pos, to_change, nbits);
			if bits != nbits {
				model.mark_changed(Action::Shift);
				return true;
			}
			false
		}
		Mutation::Mask => {
			model.mark_tried(Action::Mask);
			// Clear each bit with 1/4 probability.
			let mask_size = size.min(64) as u8;
			let mut mask = source.bits(mask_size) | source.bits(mask_size);
			if mask == provar_random::bit_mask(mask_size) {
				// Always clear at least one bit.
				let one_bit = (source.bits(8) % u64::from(mask_size)) as u32;
				mask &= !(1u64 << one_bit);
			}

			let (rel_pos, to_change) = mutation_region(size, source);
			let bits = pool.read_bits(bit_offset + rel_pos, to_change);
			let nbits = bits & mask;
			trace!(mask, size, rel_pos, bit_offset, bits, nbits, "mask");
			pool.write_bits(bit_offset + rel_pos, to_change, nbits);
			if bits != nbits {
				model.mark_changed(Action::Mask);
				return true;
			}
			false
		}
		Mutation::Swap => {
			model.mark_tried(Action::Swap);
			if size > 64 {
				// Maybe swap two non-overlapping blocks within the
				// request, if that lowers the earlier one.
				let mut to_swap = source.bits(6) as usize;
				while 2 * to_swap >= size {
					to_swap /= 2;
				}
				if to_swap == 0 {
					return false;
				}
				let pos_a = (source.bits(32) % (size - to_swap) as u64) as usize;
				let pos_b = (source.bits(32) % (size - 2 * to_swap) as u64) as usize;
				if (pos_a < pos_b && pos_a + to_swap > pos_b)
					|| (pos_b < pos_a && pos_b + to_swap > pos_a)
				{
					return false; // overlapping
				}

				let a = pool.read_bits(bit_offset + pos_a, to_swap as u8);
				let b = pool.read_bits(bit_offset + pos_b, to_swap as u8);
				if b < a {
					trace!(pos_a, pos_b, to_swap, "swapping blocks");
					pool.write_bits(bit_offset + pos_a, to_swap as u8, b);
					pool.write_bits(bit_offset + pos_b, to_swap as u8, a);
					model.mark_changed(Action::Swap);
					return true;
				}
				false
			} else {
				// Maybe swap with a later request of the same size
				// whose value is strictly smaller.
				let bits = pool.read_bits(bit_offset, size as u8);
				for i in pos + 1..orig.request_count() {
					if orig.requests()[i] as usize == size {
						let other_offset = orig.offset_of(i);
						let other = pool.read_bits(other_offset, size as u8);
						if other < bits {
							trace!(pos, i, "swapping requests");
							pool.write_bits(bit_offset, size as u8, other);
							pool.write_bits(other_offset, size as u8, bits);
							model.mark_changed(Action::Swap);
							return true;
						}
					}
				}
				false
			}
		}
		Mutation::Sub => {
			model.mark_tried(Action::Sub);
			let sub_size = size.min(64) as u8;
			let sub = source.bits(sub_size);

			let (rel_pos, to_change) = mutation_region(size, source);
			let bits = pool.read_bits(bit_offset + rel_pos, to_change);
			if bits > 0 {
				let mut nbits = bits - (sub % bits);
				if nbits == bits {
					nbits -= 1;
				}
				trace!(sub, size, rel_pos, bit_offset, bits, nbits, "sub");
				pool.write_bits(bit_offset + rel_pos, to_change, nbits);
				model.mark_changed(Action::Sub);
				return true;
			}
			false
		}
	}
}

/// For requests that fit in 64 bits the whole payload is mutated; for
/// larger requests, pick a random inner region of up to 63 bits.
fn mutation_region(size: usize, source: &mut dyn Entropy) -> (usize, u8) {
	if size > 64 {
		let rel_pos = (source.bits(32) % size as u64) as usize;
		let mut to_change = source.bits(6) as usize;
		if to_change > size - rel_pos {
			to_change = size - rel_pos;
		}
		(rel_pos, to_change as u8)
	} else {
		(0, size as u8)
	}
}
