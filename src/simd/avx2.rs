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

//! AVX2 bucket matching: one 256-bit aligned load gets all four lanes of a
//! `hi` (or `lo`) array at once.
//!
//! Every entry point here is `unsafe fn` carrying `#[target_feature(enable =
//! "avx2")]`: the compiler is free to emit AVX2 instructions in its body only
//! because the caller (`super::find_matching_lane`) has already run
//! `std::is_x86_feature_detected!("avx2")` at runtime. Unlike SSE2, AVX2 isn't
//! guaranteed present on x86_64, so it cannot be gated with a plain
//! `cfg(target_feature = ...)` the way the SSE2 backend it's descended from is.

#[cfg(target_arch = "x86")]
use core::arch::x86 as arch;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as arch;

use crate::bucket::Bucket;

/// Broadcast-compare `needle` against all four lanes of `hi`, returning a 4-bit
/// mask (bit `i` set iff `hi[i] == needle`).
///
/// # Safety
/// Caller must have confirmed `is_x86_feature_detected!("avx2")` first.
#[inline]
#[target_feature(enable = "avx2")]
pub unsafe fn match_hi(bucket: &Bucket, needle: u64) -> u8 {
    match_lane_array(bucket.hi.as_ptr(), needle)
}

/// Same as [`match_hi`] but over the `lo` array.
///
/// # Safety
/// Caller must have confirmed `is_x86_feature_detected!("avx2")` first.
#[inline]
#[target_feature(enable = "avx2")]
pub unsafe fn match_lo(bucket: &Bucket, needle: u64) -> u8 {
    match_lane_array(bucket.lo.as_ptr(), needle)
}

/// # Safety
/// `ptr` must point to 4 contiguous, 32-byte-aligned `u64`s (true of
/// `Bucket::hi`/`Bucket::lo`, both offsets are multiples of 32 given
/// `Bucket`'s `repr(C, align(32))`), and the CPU must support AVX2.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn match_lane_array(ptr: *const u64, needle: u64) -> u8 {
    let haystack = arch::_mm256_load_si256(ptr.cast());
    let needle = arch::_mm256_set1_epi64x(needle as i64);
    let cmp = arch::_mm256_cmpeq_epi64(haystack, needle);
    // each 64-bit lane of `cmp` is all-ones or all-zeros; reinterpreting as 4
    // packed doubles and taking the sign-bit movemask reads off one bit per
    // lane without performing any floating-point comparison (cmpeq_epi64
    // already did the comparison as integers).
    arch::_mm256_movemask_pd(arch::_mm256_castsi256_pd(cmp)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_every_lane_that_equals_the_needle() {
        if !std::is_x86_feature_detected!("avx2") {
            // host running the test suite doesn't have AVX2; scalar.rs covers
            // the same behavior and super::mod.rs's tests exercise the dispatch.
            return;
        }
        let mut b = Bucket::EMPTY;
        b.hi = [5, 9, 5, 1];
        unsafe {
            assert_eq!(match_hi(&b, 5), 0b0101);
            assert_eq!(match_hi(&b, 9), 0b0010);
            assert_eq!(match_hi(&b, 42), 0);
        }
    }
}
