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

//! The keyed hashing seam.
//!
//! The table engine never looks inside a key past this module: every operation
//! reduces a `&[u8]` to a [`Hash128`] exactly once, and everything downstream
//! (slot arithmetic, SIMD matching, Robin-Hood displacement) only ever touches
//! the two 64-bit halves.

use xxhash_rust::xxh3::xxh3_128;

/// The two independent 64-bit halves of a 128-bit key hash.
///
/// `hi` supplies the home slot (its top bits are used directly, see
/// [`crate::layout`]); `lo` only ever participates in the SIMD equality check.
/// `(hi, lo) == (0, 0)` is reserved: it is indistinguishable from an empty slot.
/// See [`crate::table::Table::insert`] for the practical consequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hash128 {
    pub hi: u64,
    pub lo: u64,
}

impl Hash128 {
    /// Returns `true` iff this hash collides with the reserved empty-slot sentinel.
    #[inline]
    pub const fn is_reserved_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }
}

/// A pluggable keyed hash producing a [`Hash128`] from raw key bytes.
///
/// The table engine treats key-hashing as an external collaborator: any
/// implementation is acceptable as long as it behaves like a high-quality,
/// independent 128-bit hash (good high-bit mixing in particular, since the
/// home slot is derived from `hi`'s top bits rather than a modulo). [`Xxh3Hasher`]
/// is the one concrete implementation shipped with this crate.
pub trait KeyHasher {
    fn hash(&self, key: &[u8]) -> Hash128;
}

/// The default [`KeyHasher`], backed by XXH3-128.
///
/// This is the same hash family the reference C implementation this crate is
/// modeled on links against (`xxhash.h`): a single keyless, high-quality 128-bit
/// hash with excellent avalanche behavior in both halves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh3Hasher;

impl KeyHasher for Xxh3Hasher {
    #[inline]
    fn hash(&self, key: &[u8]) -> Hash128 {
        let h = xxh3_128(key);
        Hash128 {
            hi: (h >> 64) as u64,
            lo: h as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_keys_usually_hash_distinctly() {
        let h = Xxh3Hasher;
        let a = h.hash(b"one");
        let b = h.hash(b"two");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic() {
        let h = Xxh3Hasher;
        assert_eq!(h.hash(b"repeatable"), h.hash(b"repeatable"));
    }

    #[test]
    fn empty_key_is_not_the_reserved_zero_hash() {
        // sanity: XXH3 of the empty string is a well known nonzero constant,
        // so it does not collide with the empty-slot sentinel.
        let h = Xxh3Hasher;
        assert!(!h.hash(b"").is_reserved_zero());
    }
}
