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

//! A hashtable with SIMD lookup, Robin-Hood insertion and backward-shift deletion.
//!
//! `skymap` trades exact key storage for a strong 128-bit keyed hash: instead of
//! keeping the original key bytes around, every slot stores only the hash's two
//! 64-bit halves and a 64-bit value. Lookups broadcast the needle hash across a
//! 256-bit SIMD register and compare four slots (one bucket) at a time, which is
//! what lets point lookups run at tens of millions of operations per second per
//! core on short-to-medium keys.
//!
//! ## Acknowledgements
//!
//! The bucketed, SIMD-compared, Robin-Hood-displaced layout in this crate follows
//! the same family of ideas as:
//! - [SwissTable](https://abseil.io/blog/20180927-swisstables), the Abseil/Google
//!   design this crate's own [`mod@crate::bucket`] and [`mod@crate::simd`] lean on for the
//!   "load a group, compare, extract a bitmask" discipline.
//! - [`benwills/MapV`](https://github.com/benwills/MapV), whose bucket-of-4,
//!   struct-of-arrays layout and probe-distance rehash triggers this crate is a
//!   direct Rust rendition of.
//!
//! ## What this crate is not
//!
//! This is not a general-purpose [`std::collections::HashMap`] replacement: the
//! original key is never retained, so two distinct keys that happen to collide in
//! the full 128-bit hash space are indistinguishable (see [`Hash128`]). The engine
//! is also single-threaded, unordered, has no stable references across a mutating
//! call, and only ever grows.

#![deny(unused_must_use)]

mod bucket;
mod compiler;
mod config;
mod error;
mod hash;
mod layout;
mod simd;
mod table;

pub use config::TableConfig;
pub use error::{CreateError, DeleteError, GrowError, InsertError};
pub use hash::{Hash128, KeyHasher, Xxh3Hasher};
pub use table::Table;
