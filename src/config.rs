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

//! Table configuration, fixed for the lifetime of a [`crate::Table`].

use crate::error::CreateError;

/// Configuration for a [`crate::Table`], supplied once at [`crate::Table::create`]
/// and immutable afterwards.
///
/// All three `dist_*`/`cap_pct_max` fields are rehash triggers (§4.4): crossing
/// any one of them during an insert forces the table to grow before the insert
/// can complete. `mem_align` and `initial_slot_count` only affect the initial
/// (and every subsequent) allocation's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Hard cap on per-entry probe sequence length (PSL) before a rehash is forced.
    pub dist_slot_max: u32,
    /// Hard cap on inter-bucket probe distance before a rehash is forced.
    pub dist_bkt_max: u32,
    /// Load-factor percentage ceiling (0-100) before a rehash is forced.
    pub cap_pct_max: u8,
    /// Backing buffer alignment, in bytes. Must be a multiple of 32 so that the
    /// 256-bit SIMD loads in [`crate::simd`] are always aligned.
    pub mem_align: usize,
    /// Seed capacity hint; the real initial capacity is the next power of two
    /// greater than or equal to this value.
    pub initial_slot_count: usize,
}

impl TableConfig {
    /// A configuration with the same defaults as the reference implementation's
    /// test harness: `dist_slot_max = 32`, `dist_bkt_max = 8`, `cap_pct_max = 90`,
    /// `mem_align = 4096`.
    pub const fn new(initial_slot_count: usize) -> Self {
        Self {
            dist_slot_max: 32,
            dist_bkt_max: 8,
            cap_pct_max: 90,
            mem_align: 4096,
            initial_slot_count,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CreateError> {
        if self.mem_align == 0 || self.mem_align % 32 != 0 || !self.mem_align.is_power_of_two() {
            return Err(CreateError::BadAlignment {
                provided: self.mem_align,
            });
        }
        if self.cap_pct_max == 0 || self.cap_pct_max > 100 {
            return Err(CreateError::BadLoadFactorCeiling {
                provided: self.cap_pct_max,
            });
        }
        if self.dist_slot_max == 0 || self.dist_bkt_max == 0 {
            return Err(CreateError::BadProbeBound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_misaligned_mem_align() {
        let cfg = TableConfig {
            mem_align: 24,
            ..TableConfig::new(10)
        };
        assert!(matches!(
            cfg.validate(),
            Err(CreateError::BadAlignment { provided: 24 })
        ));
    }

    #[test]
    fn rejects_multiple_of_32_that_is_not_a_power_of_two() {
        let cfg = TableConfig {
            mem_align: 96,
            ..TableConfig::new(10)
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_page_aligned_config() {
        let cfg = TableConfig::new(10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_load_factor_ceiling_over_100() {
        let cfg = TableConfig {
            cap_pct_max: 101,
            ..TableConfig::new(10)
        };
        assert!(cfg.validate().is_err());
    }
}
