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

//! 4-wide SIMD (or scalar-fallback) equality matching over a [`Bucket`].
//!
//! Each backend exposes `match_hi`/`match_lo`, returning a 4-bit mask (one bit
//! per lane, bit `i` set iff lane `i` matched the needle). [`find_matching_lane`]
//! is the only entry point the rest of the crate calls: it intersects the two
//! masks before testing any bit, which is the fix for the historical
//! mask-intersection defect described in the spec this module implements (a
//! lowest-set-bit-of-each-mask comparison can falsely match two different
//! entries that happen to share a hi half and, independently, a lo half).
//!
//! Unlike SSE2 (guaranteed present on every x86_64 target), AVX2 is not part of
//! the x86_64 baseline, so the AVX2 backend is selected with a runtime feature
//! check rather than a `cfg(target_feature = ...)` gate; the check is cached
//! after the first call.

use crate::bucket::Bucket;
use crate::compiler::likely;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod avx2;
mod scalar;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline]
fn avx2_available() -> bool {
    use std::sync::OnceLock;
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| std::is_x86_feature_detected!("avx2"))
}

/// Intersect the hi-mask and lo-mask for `bucket` and return the lowest lane
/// index where both matched, or `None` if no lane matched both.
#[inline]
pub fn find_matching_lane(bucket: &Bucket, hi: u64, lo: u64) -> Option<usize> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if likely(avx2_available()) {
        // SAFETY: `avx2_available` just confirmed the CPU supports AVX2.
        let hi_mask = unsafe { avx2::match_hi(bucket, hi) };
        if hi_mask == 0 {
            // fast exit: §4.3 step c, skip the lo load entirely when no hi lane matched
            return None;
        }
        let lo_mask = unsafe { avx2::match_lo(bucket, lo) };
        return intersect(hi_mask, lo_mask);
    }

    let hi_mask = scalar::match_hi(bucket, hi);
    if hi_mask == 0 {
        return None;
    }
    let lo_mask = scalar::match_lo(bucket, lo);
    intersect(hi_mask, lo_mask)
}

#[inline]
fn intersect(hi_mask: u8, lo_mask: u8) -> Option<usize> {
    let both = hi_mask & lo_mask;
    if both == 0 {
        None
    } else {
        Some(both.trailing_zeros() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_lane_both_masks_agree_on() {
        let mut b = Bucket::EMPTY;
        b.set_lane(0, 111, 222, 1);
        b.set_lane(1, 333, 444, 2);
        assert_eq!(find_matching_lane(&b, 333, 444), Some(1));
        assert_eq!(find_matching_lane(&b, 111, 222), Some(0));
    }

    #[test]
    fn does_not_match_when_hi_matches_but_lo_does_not() {
        let mut b = Bucket::EMPTY;
        b.set_lane(0, 111, 222, 1);
        assert_eq!(find_matching_lane(&b, 111, 999), None);
    }

    #[test]
    fn intersects_masks_instead_of_comparing_independent_lowest_bits() {
        // two entries share a hi half; a third, different entry shares the lo half
        // of the *first* one at a *different* lane. independent-ctz comparison
        // would falsely match; intersection must not.
        let mut b = Bucket::EMPTY;
        b.set_lane(0, 7, 100, 1); // shares hi with lane 1, shares nothing else
        b.set_lane(1, 7, 200, 2); // shares hi with lane 0
        b.set_lane(2, 9, 100, 3); // shares lo with lane 0, different hi/lane
        assert_eq!(find_matching_lane(&b, 7, 100), Some(0));
        assert_eq!(find_matching_lane(&b, 7, 999), None);
    }

    #[test]
    fn empty_bucket_never_matches() {
        let b = Bucket::EMPTY;
        assert_eq!(find_matching_lane(&b, 0, 0), None);
    }
}
