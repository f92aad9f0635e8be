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

//! Scalar fallback for hosts without AVX2: a branchy loop over the 4 lanes.
//! Produces bit-for-bit the same 4-bit mask the AVX2 backend does, so
//! [`super::find_matching_lane`] is identical above this seam.

use crate::bucket::Bucket;

#[inline]
pub fn match_hi(bucket: &Bucket, needle: u64) -> u8 {
    match_lane_array(&bucket.hi, needle)
}

#[inline]
pub fn match_lo(bucket: &Bucket, needle: u64) -> u8 {
    match_lane_array(&bucket.lo, needle)
}

#[inline]
fn match_lane_array(lanes: &[u64; crate::bucket::LANES], needle: u64) -> u8 {
    let mut mask = 0u8;
    for (i, &v) in lanes.iter().enumerate() {
        if v == needle {
            mask |= 1 << i;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_every_lane_that_equals_the_needle() {
        let mut b = Bucket::EMPTY;
        b.hi = [5, 9, 5, 1];
        assert_eq!(match_hi(&b, 5), 0b0101);
        assert_eq!(match_hi(&b, 9), 0b0010);
        assert_eq!(match_hi(&b, 42), 0);
    }
}
