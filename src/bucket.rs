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

//! The physical unit of storage: a group of 4 slots laid out struct-of-arrays
//! style so one 32-byte SIMD load picks up all four `hi` (or `lo`, or `vals`)
//! entries in the group at once.

/// Number of slots in a bucket. This is fixed to match one 256-bit (4 x u64)
/// SIMD register; unlike the table's capacity, it is not a tunable.
pub const LANES: usize = 4;

/// A group of 4 slots, struct-of-arrays layout: `hi[4]`, then `lo[4]`, then
/// `vals[4]`, each array contiguous so it can be loaded with a single aligned
/// 32-byte SIMD load.
///
/// `#[repr(C, align(32))]` pins both field order (matching the spec's layout)
/// and alignment (matching the minimum SIMD load requirement); the table's
/// backing buffer additionally honors `TableConfig::mem_align`, which may ask
/// for a coarser alignment still (e.g. page alignment), but never a finer one.
#[repr(C, align(32))]
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    pub hi: [u64; LANES],
    pub lo: [u64; LANES],
    pub vals: [u64; LANES],
}

impl Bucket {
    /// The all-zero bucket: every lane empty.
    pub const EMPTY: Bucket = Bucket {
        hi: [0; LANES],
        lo: [0; LANES],
        vals: [0; LANES],
    };

    /// A slot is empty iff its `(hi, lo, val)` triple is all-zero (§3 Invariant).
    #[inline]
    pub fn lane_is_empty(&self, lane: usize) -> bool {
        self.hi[lane] == 0 && self.lo[lane] == 0 && self.vals[lane] == 0
    }

    #[inline]
    pub fn clear_lane(&mut self, lane: usize) {
        self.hi[lane] = 0;
        self.lo[lane] = 0;
        self.vals[lane] = 0;
    }

    #[inline]
    pub fn set_lane(&mut self, lane: usize, hi: u64, lo: u64, val: u64) {
        self.hi[lane] = hi;
        self.lo[lane] = lo;
        self.vals[lane] = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{align_of, size_of};

    #[test]
    fn bucket_is_96_bytes_of_three_simd_lanes() {
        assert_eq!(size_of::<Bucket>(), 3 * LANES * size_of::<u64>());
    }

    #[test]
    fn bucket_is_32_byte_aligned() {
        assert_eq!(align_of::<Bucket>(), 32);
    }

    #[test]
    fn empty_bucket_has_all_lanes_empty() {
        let b = Bucket::EMPTY;
        for lane in 0..LANES {
            assert!(b.lane_is_empty(lane));
        }
    }

    #[test]
    fn set_then_clear_round_trips_to_empty() {
        let mut b = Bucket::EMPTY;
        b.set_lane(2, 7, 9, 11);
        assert!(!b.lane_is_empty(2));
        b.clear_lane(2);
        assert!(b.lane_is_empty(2));
    }
}
