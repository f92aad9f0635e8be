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

//! The error taxonomy surfaced by the public contract.
//!
//! `TABLE_MUST_GROW` from the original taxonomy has no type here: it is a purely
//! internal retry signal inside [`crate::table::Table::insert`] and never escapes
//! the crate boundary (see [`crate::table::ProbeOutcome`]).

use std::fmt;

/// Failure to construct a [`crate::Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateError {
    /// `mem_align` was zero or not a multiple of 32.
    BadAlignment { provided: usize },
    /// `cap_pct_max` was zero or greater than 100.
    BadLoadFactorCeiling { provided: u8 },
    /// `dist_slot_max` or `dist_bkt_max` was zero.
    BadProbeBound,
    /// The initial layout could not be allocated.
    AllocFailed,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAlignment { provided } => write!(
                f,
                "mem_align must be a nonzero multiple of 32, got {provided}"
            ),
            Self::BadLoadFactorCeiling { provided } => write!(
                f,
                "cap_pct_max must be in 1..=100, got {provided}"
            ),
            Self::BadProbeBound => {
                write!(f, "dist_slot_max and dist_bkt_max must both be nonzero")
            }
            Self::AllocFailed => write!(f, "failed to allocate the initial table buffer"),
        }
    }
}

impl std::error::Error for CreateError {}

/// Failure while growing (rehashing into a larger) table.
///
/// This is the Rust analogue of `TABLE_GROW_FAILED`. It is always wrapped inside
/// [`InsertError::GrowFailed`] at the public boundary: growth is only ever
/// triggered from within `insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowError {
    /// The new, larger buffer could not be allocated. The table is left exactly
    /// as it was before the grow attempt.
    AllocFailed,
    /// The freshly doubled table still reported `TABLE_MUST_GROW` while
    /// redistributing a live entry. This is the spec's "unreachable-state"
    /// case (§7): it signals a logic bug (a `dist_*_max`/`cap_pct_max`
    /// combination that a single doubling cannot satisfy) rather than caller
    /// misuse, but is propagated as a typed error instead of aborting, per the
    /// spec's own recommendation.
    ImmediatelyFull,
}

impl fmt::Display for GrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocFailed => write!(f, "failed to allocate the grown table buffer"),
            Self::ImmediatelyFull => write!(
                f,
                "table still exceeded its rehash triggers immediately after growing"
            ),
        }
    }
}

impl std::error::Error for GrowError {}

/// Failure to insert a `(key, value)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// An entry with the same 128-bit hash already exists and
    /// `overwrite_if_exists` was `false`.
    KeyExists,
    /// The automatic grow-then-retry could not complete.
    GrowFailed(GrowError),
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyExists => write!(f, "an entry for this key already exists"),
            Self::GrowFailed(ge) => write!(f, "insert required a grow, which failed: {ge}"),
        }
    }
}

impl std::error::Error for InsertError {}

impl From<GrowError> for InsertError {
    fn from(ge: GrowError) -> Self {
        Self::GrowFailed(ge)
    }
}

/// Failure to delete a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteError {
    /// No entry matching the key's hash was found.
    NotFound,
}

impl fmt::Display for DeleteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no entry found for this key"),
        }
    }
}

impl std::error::Error for DeleteError {}
