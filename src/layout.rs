/*
 * Created on Tue Mar 05 2024
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2024, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Capacity/bucket-count arithmetic (§4.1) and the single aligned allocation a
//! [`crate::Table`] owns for its whole life.
//!
//! The reference implementation hand-rolls pointer alignment on top of plain
//! `malloc`, because C's `malloc` only guarantees `alignof(max_align_t)`.
//! Rust's allocator API takes an arbitrary power-of-two alignment directly
//! (`Layout::from_size_align`), so this module asks for the aligned buffer it
//! wants up front instead of over-allocating and shifting a raw pointer.

use crate::bucket::{Bucket, LANES};
use crate::config::TableConfig;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Derived, immutable-per-allocation layout metadata: how many buckets a table
/// of a given logical `capacity` actually needs, including the overflow tail
/// that lets every probe run off the end without wrapping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableLayout {
    /// Logical capacity: a power of two, the `C` callers reason about.
    pub capacity: usize,
    /// `capacity / 4`.
    pub buckets: usize,
    /// Extra buckets appended past `buckets` so a probe starting near the end
    /// never wraps around.
    pub tail_buckets: usize,
    /// `buckets + tail_buckets - 1`, the buckets actually allocated.
    pub buckets_real: usize,
    /// `buckets_real * LANES`.
    pub slots_real: usize,
    /// `64 - log2(capacity)`: the right-shift that turns a hash's top bits
    /// into a home slot.
    pub slot_hash_shift: u32,
}

impl TableLayout {
    pub fn compute(capacity: usize, cfg: &TableConfig) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let buckets = capacity / LANES;
        let tail_buckets = core::cmp::max(
            cfg.dist_slot_max as usize / LANES,
            cfg.dist_bkt_max as usize,
        );
        let buckets_real = buckets + tail_buckets - 1;
        let slots_real = buckets_real * LANES;
        let slot_hash_shift = 64 - capacity.trailing_zeros();
        Self {
            capacity,
            buckets,
            tail_buckets,
            buckets_real,
            slots_real,
            slot_hash_shift,
        }
    }

    #[inline]
    pub fn alloc_layout(&self, mem_align: usize) -> Option<Layout> {
        Layout::from_size_align(self.buckets_real * core::mem::size_of::<Bucket>(), mem_align).ok()
    }
}

/// The single zero-initialized, aligned buffer a table owns.
///
/// Always holds exactly `layout.buckets_real` [`Bucket`]s, all zeroed (every
/// slot starts empty, per §3's all-zero sentinel).
pub(crate) struct AlignedBuckets {
    ptr: NonNull<Bucket>,
    layout: Layout,
    len: usize,
}

impl AlignedBuckets {
    pub fn alloc(layout: &TableLayout, mem_align: usize) -> Option<Self> {
        let alloc_layout = layout.alloc_layout(mem_align)?;
        // SAFETY: `alloc_layout` has nonzero size for any capacity this crate
        // constructs (capacity is always >= 1 bucket).
        let raw = unsafe { alloc::alloc_zeroed(alloc_layout) };
        let ptr = NonNull::new(raw)?.cast::<Bucket>();
        Some(Self {
            ptr,
            layout: alloc_layout,
            len: layout.buckets_real,
        })
    }

    #[inline]
    pub fn as_slice(&self) -> &[Bucket] {
        // SAFETY: `ptr` was allocated for exactly `len` zeroed `Bucket`s and is
        // never aliased outside `&self`/`&mut self` borrows of this type.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [Bucket] {
        // SAFETY: see `as_slice`; `&mut self` guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuckets {
    fn drop(&mut self) {
        // SAFETY: `self.ptr`/`self.layout` are exactly the pointer and layout
        // `alloc_zeroed` returned in `alloc`, and this is the only place that
        // frees them.
        unsafe {
            alloc::dealloc(self.ptr.as_ptr().cast(), self.layout);
        }
    }
}

/// Rounds `n` up to the next power of two, per `nextPow2` in the spec.
#[inline]
pub(crate) fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> TableConfig {
        TableConfig::new(10)
    }

    #[test]
    fn next_pow2_rounds_up() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(10), 16);
        assert_eq!(next_pow2(16), 16);
        assert_eq!(next_pow2(17), 32);
    }

    #[test]
    fn layout_tail_gives_room_past_logical_capacity() {
        let layout = TableLayout::compute(16, &cfg());
        assert_eq!(layout.buckets, 4);
        assert!(layout.buckets_real > layout.buckets);
        assert_eq!(layout.slots_real, layout.buckets_real * LANES);
    }

    #[test]
    fn slot_hash_shift_matches_log2_capacity() {
        let layout = TableLayout::compute(1024, &cfg());
        assert_eq!(layout.slot_hash_shift, 64 - 10);
    }

    #[test]
    fn aligned_buckets_are_zeroed_and_empty() {
        let layout = TableLayout::compute(16, &cfg());
        let buf = AlignedBuckets::alloc(&layout, 4096).expect("alloc");
        for bucket in buf.as_slice() {
            for lane in 0..LANES {
                assert!(bucket.lane_is_empty(lane));
            }
        }
    }

    #[test]
    fn aligned_buckets_pointer_respects_mem_align() {
        let layout = TableLayout::compute(16, &cfg());
        let buf = AlignedBuckets::alloc(&layout, 4096).expect("alloc");
        let addr = buf.as_slice().as_ptr() as usize;
        assert_eq!(addr % 4096, 0);
    }
}
