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

//! The table engine: slot arithmetic, the Robin-Hood insert loop, backward-shift
//! delete, and growth/redistribution, wired up behind the five-operation public
//! contract (create / insert / find / delete / destroy).

use crate::bucket::{Bucket, LANES};
use crate::compiler::unlikely;
use crate::config::TableConfig;
use crate::error::{CreateError, DeleteError, GrowError, InsertError};
use crate::hash::{Hash128, KeyHasher, Xxh3Hasher};
use crate::layout::{next_pow2, AlignedBuckets, TableLayout};
use crate::simd;

/// A probabilistic, open-addressed hash table from byte-string keys to 64-bit
/// values, using Robin-Hood displacement and SIMD-parallel bucket matching.
///
/// See the crate-level docs for what "probabilistic" means here: the original
/// key bytes are never retained, only a 128-bit hash of them.
pub struct Table<H: KeyHasher = Xxh3Hasher> {
    buckets: AlignedBuckets,
    layout: TableLayout,
    cfg: TableConfig,
    hasher: H,
    used: usize,
    max_psl: u32,
    max_bkt_dist: u32,
}

/// Outcome of a single probe-loop attempt to place `(hash, value)`. `MustGrow`
/// is the Rust analogue of the spec's internal `TABLE_MUST_GROW`: it never
/// escapes [`Table::insert`], which retries once after growing.
enum ProbeOutcome {
    Inserted,
    Overwritten,
    KeyExists,
    MustGrow,
}

impl Table<Xxh3Hasher> {
    /// Creates a table using the default [`Xxh3Hasher`].
    pub fn create(cfg: TableConfig) -> Result<Self, CreateError> {
        Self::create_with_hasher(cfg, Xxh3Hasher)
    }
}

impl<H: KeyHasher> Table<H> {
    /// Creates a table with an explicit [`KeyHasher`].
    pub fn create_with_hasher(cfg: TableConfig, hasher: H) -> Result<Self, CreateError> {
        cfg.validate()?;
        let capacity = core::cmp::max(next_pow2(cfg.initial_slot_count), LANES);
        let layout = TableLayout::compute(capacity, &cfg);
        let buckets = AlignedBuckets::alloc(&layout, cfg.mem_align).ok_or(CreateError::AllocFailed)?;
        log::debug!(
            "skymap: created table with capacity={} buckets_real={}",
            layout.capacity,
            layout.buckets_real
        );
        Ok(Self {
            buckets,
            layout,
            cfg,
            hasher,
            used: 0,
            max_psl: 0,
            max_bkt_dist: 0,
        })
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// The logical (power-of-two) capacity; the physically allocated bucket
    /// count is somewhat larger to accommodate the overflow tail (§3).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.capacity
    }

    /// Inserts `(key, value)`. If an entry with the same 128-bit hash already
    /// exists: overwrites it and returns `Ok(())` when `overwrite_if_exists` is
    /// `true`, otherwise returns [`InsertError::KeyExists`] and leaves the table
    /// unchanged.
    ///
    /// # Reserved input
    /// A key whose hash happens to be `(0, 0)` combined with `value == 0` is
    /// indistinguishable from an empty slot and must not be presented (§3).
    pub fn insert(&mut self, key: &[u8], value: u64, overwrite_if_exists: bool) -> Result<(), InsertError> {
        let hash = self.hasher.hash(key);
        match self.try_insert_once(hash, value, overwrite_if_exists) {
            ProbeOutcome::Inserted | ProbeOutcome::Overwritten => Ok(()),
            ProbeOutcome::KeyExists => Err(InsertError::KeyExists),
            ProbeOutcome::MustGrow => {
                self.grow()?;
                match self.try_insert_once(hash, value, overwrite_if_exists) {
                    ProbeOutcome::Inserted | ProbeOutcome::Overwritten => Ok(()),
                    ProbeOutcome::KeyExists => Err(InsertError::KeyExists),
                    ProbeOutcome::MustGrow => Err(InsertError::GrowFailed(GrowError::ImmediatelyFull)),
                }
            }
        }
    }

    /// Looks up `key`, returning its value if present.
    pub fn find(&self, key: &[u8]) -> Option<u64> {
        let hash = self.hasher.hash(key);
        let slot = locate_slot(self.buckets.as_slice(), &self.layout, &self.cfg, self.max_bkt_dist, hash)?;
        let (bucket, lane) = (slot / LANES, slot % LANES);
        Some(self.buckets.as_slice()[bucket].vals[lane])
    }

    /// Removes the entry matching `key` via backward-shift deletion (§4.5).
    pub fn delete(&mut self, key: &[u8]) -> Result<(), DeleteError> {
        let hash = self.hasher.hash(key);
        let found = locate_slot(self.buckets.as_slice(), &self.layout, &self.cfg, self.max_bkt_dist, hash)
            .ok_or(DeleteError::NotFound)?;
        backward_shift_delete(self.buckets.as_slice_mut(), &self.layout, found);
        self.used -= 1;
        Ok(())
    }

    /// Explicit, consuming counterpart to `Drop` for symmetry with the
    /// five-operation contract. Cannot fail: Rust's ownership model makes a
    /// "null handle" unrepresentable, so there is no analogue of
    /// `DESTROY_MAP_IS_NULL` to report (see DESIGN.md).
    pub fn destroy(self) {
        drop(self)
    }

    #[inline]
    fn slot_home(&self, hash_hi: u64) -> usize {
        (hash_hi >> self.layout.slot_hash_shift) as usize
    }

    #[inline]
    fn load_pct(&self) -> usize {
        self.used * 100 / self.layout.slots_real
    }

    fn try_insert_once(&mut self, hash: Hash128, value: u64, overwrite: bool) -> ProbeOutcome {
        if unlikely(self.rehash_triggered()) {
            return ProbeOutcome::MustGrow;
        }
        raw_insert(
            self.buckets.as_slice_mut(),
            &self.layout,
            &self.cfg,
            &mut self.max_psl,
            &mut self.max_bkt_dist,
            &mut self.used,
            hash,
            value,
            overwrite,
        )
    }

    #[inline]
    fn rehash_triggered(&self) -> bool {
        let dist_slot_iter = self.max_psl + 1;
        let dist_bkt_iter = self.max_bkt_dist + 1;
        dist_slot_iter > self.cfg.dist_slot_max
            || dist_bkt_iter > self.cfg.dist_bkt_max
            || self.load_pct() > self.cfg.cap_pct_max as usize
    }

    /// Doubles (at least) the table's capacity and redistributes every live
    /// entry into the new buffer (§4.6). Leaves `self` untouched on failure.
    fn grow(&mut self) -> Result<(), GrowError> {
        let new_capacity = core::cmp::max(next_pow2(self.layout.capacity + 1), LANES);
        let new_layout = TableLayout::compute(new_capacity, &self.cfg);
        let mut new_buckets =
            AlignedBuckets::alloc(&new_layout, self.cfg.mem_align).ok_or(GrowError::AllocFailed)?;

        if self.used == 0 {
            log::debug!(
                "skymap: grew empty table {} -> {}",
                self.layout.capacity,
                new_capacity
            );
            self.buckets = new_buckets;
            self.layout = new_layout;
            self.max_psl = 0;
            self.max_bkt_dist = 0;
            return Ok(());
        }

        let mut new_max_psl = 0u32;
        let mut new_max_bkt_dist = 0u32;
        let mut new_used = 0usize;
        for slot in 0..self.layout.slots_real {
            let (bucket_idx, lane) = (slot / LANES, slot % LANES);
            let bucket = &self.buckets.as_slice()[bucket_idx];
            if bucket.lane_is_empty(lane) {
                continue;
            }
            let hash = Hash128 {
                hi: bucket.hi[lane],
                lo: bucket.lo[lane],
            };
            let value = bucket.vals[lane];
            match raw_insert(
                new_buckets.as_slice_mut(),
                &new_layout,
                &self.cfg,
                &mut new_max_psl,
                &mut new_max_bkt_dist,
                &mut new_used,
                hash,
                value,
                true,
            ) {
                ProbeOutcome::Inserted | ProbeOutcome::Overwritten => {}
                ProbeOutcome::KeyExists => unreachable!("redistribution always overwrites"),
                ProbeOutcome::MustGrow => {
                    log::warn!("skymap: table still overfull immediately after growing");
                    return Err(GrowError::ImmediatelyFull);
                }
            }
        }

        log::debug!(
            "skymap: grew table {} -> {}, redistributed {} entries",
            self.layout.capacity,
            new_capacity,
            new_used
        );
        self.buckets = new_buckets;
        self.layout = new_layout;
        self.used = new_used;
        self.max_psl = new_max_psl;
        self.max_bkt_dist = new_max_bkt_dist;
        Ok(())
    }
}

/// Finds the slot holding `hash`, or `None` if absent. Shared by `find` and
/// `delete`; never mutates.
fn locate_slot(
    buckets: &[Bucket],
    layout: &TableLayout,
    cfg: &TableConfig,
    max_bkt_dist: u32,
    hash: Hash128,
) -> Option<usize> {
    let home_slot = (hash.hi >> layout.slot_hash_shift) as usize;
    let home_bucket = home_slot / LANES;
    let dist_bkt_iter = core::cmp::min(max_bkt_dist + 1, cfg.dist_bkt_max + 1) as usize;
    for step in 0..dist_bkt_iter {
        let bucket_idx = home_bucket + step;
        if bucket_idx >= buckets.len() {
            break;
        }
        if let Some(lane) = simd::find_matching_lane(&buckets[bucket_idx], hash.hi, hash.lo) {
            return Some(bucket_idx * LANES + lane);
        }
    }
    None
}

/// The Robin-Hood placement loop (§4.4), independent of any particular
/// [`Table`] instance so it can drive both live inserts and rehash
/// redistribution against a brand-new buffer.
#[allow(clippy::too_many_arguments)]
fn raw_insert(
    buckets: &mut [Bucket],
    layout: &TableLayout,
    cfg: &TableConfig,
    max_psl: &mut u32,
    max_bkt_dist: &mut u32,
    used: &mut usize,
    hash: Hash128,
    value: u64,
    overwrite: bool,
) -> ProbeOutcome {
    let home = |hi: u64| -> usize { (hi >> layout.slot_hash_shift) as usize };
    let mut cand_hash = hash;
    let mut cand_value = value;
    let mut s = home(hash.hi);

    loop {
        assert!(
            s < layout.slots_real,
            "probe ran past the overflow tail; this is an engine invariant violation"
        );
        let bucket_idx = s / LANES;
        let lane = s % LANES;

        let is_empty = buckets[bucket_idx].lane_is_empty(lane);
        if is_empty {
            buckets[bucket_idx].set_lane(lane, cand_hash.hi, cand_hash.lo, cand_value);
            record_placement(max_psl, max_bkt_dist, layout, cand_hash.hi, s);
            *used += 1;
            return ProbeOutcome::Inserted;
        }

        let incumbent_hi = buckets[bucket_idx].hi[lane];
        let incumbent_lo = buckets[bucket_idx].lo[lane];
        if incumbent_hi == cand_hash.hi && incumbent_lo == cand_hash.lo {
            if overwrite {
                buckets[bucket_idx].vals[lane] = cand_value;
                return ProbeOutcome::Overwritten;
            }
            return ProbeOutcome::KeyExists;
        }

        let cand_psl = (s - home(cand_hash.hi)) as u32;
        let incumbent_psl = (s - home(incumbent_hi)) as u32;

        if cand_psl > incumbent_psl {
            // the newcomer is poorer (more displaced): it takes the slot, the
            // richer incumbent is evicted and keeps searching.
            let evicted_hi = incumbent_hi;
            let evicted_lo = incumbent_lo;
            let evicted_value = buckets[bucket_idx].vals[lane];
            buckets[bucket_idx].set_lane(lane, cand_hash.hi, cand_hash.lo, cand_value);
            record_placement(max_psl, max_bkt_dist, layout, cand_hash.hi, s);
            cand_hash = Hash128 {
                hi: evicted_hi,
                lo: evicted_lo,
            };
            cand_value = evicted_value;
        }

        let settled_psl = core::cmp::max(cand_psl, incumbent_psl);
        if unlikely(settled_psl >= cfg.dist_slot_max) {
            return ProbeOutcome::MustGrow;
        }

        s += 1;
    }
}

#[inline]
fn record_placement(max_psl: &mut u32, max_bkt_dist: &mut u32, layout: &TableLayout, hash_hi: u64, slot: usize) {
    let home = (hash_hi >> layout.slot_hash_shift) as usize;
    let psl = (slot - home) as u32;
    if psl > *max_psl {
        *max_psl = psl;
    }
    let bkt_dist = (slot / LANES - home / LANES) as u32;
    if bkt_dist > *max_bkt_dist {
        *max_bkt_dist = bkt_dist;
    }
}

/// Backward-shift deletion (§4.5): clears `found`, then repeatedly pulls the
/// next slot's entry back one position as long as doing so does not move it
/// in front of its own home.
fn backward_shift_delete(buckets: &mut [Bucket], layout: &TableLayout, found: usize) {
    let home = |hi: u64| -> usize { (hi >> layout.slot_hash_shift) as usize };
    let mut cur = found;
    let (cb, cl) = (cur / LANES, cur % LANES);
    buckets[cb].clear_lane(cl);

    loop {
        let next = cur + 1;
        if next >= layout.slots_real {
            break;
        }
        let (nb, nl) = (next / LANES, next % LANES);
        if buckets[nb].lane_is_empty(nl) {
            break;
        }
        let next_hi = buckets[nb].hi[nl];
        let next_psl = next - home(next_hi);
        if next_psl == 0 {
            break;
        }
        let (hi, lo, val) = (buckets[nb].hi[nl], buckets[nb].lo[nl], buckets[nb].vals[nl]);
        buckets[nb].clear_lane(nl);
        let (cb2, cl2) = (cur / LANES, cur % LANES);
        buckets[cb2].set_lane(cl2, hi, lo, val);
        cur = next;
    }
}

#[cfg(test)]
impl<H: KeyHasher> Table<H> {
    /// Walks every live slot and asserts invariants 1-4 of the testable
    /// properties: Robin Hood monotonicity, no entry precedes its home, no
    /// entry exceeds the configured probe caps, and the load factor never
    /// outran `cap_pct_max` as of the last settled insert.
    fn check_invariants(&self) {
        let home = |hi: u64| -> usize { (hi >> self.layout.slot_hash_shift) as usize };
        let mut prev_psl: Option<u32> = None;
        for slot in 0..self.layout.slots_real {
            let (b, l) = (slot / LANES, slot % LANES);
            let bucket = &self.buckets.as_slice()[b];
            if bucket.lane_is_empty(l) {
                prev_psl = None;
                continue;
            }
            let home_slot = home(bucket.hi[l]);
            assert!(slot >= home_slot, "entry at {slot} precedes its home {home_slot}");
            let psl = (slot - home_slot) as u32;
            assert!(
                psl <= self.cfg.dist_slot_max,
                "entry at {slot} has psl {psl} exceeding dist_slot_max {}",
                self.cfg.dist_slot_max
            );
            let bkt_dist = (b - home_slot / LANES) as u32;
            assert!(
                bkt_dist <= self.cfg.dist_bkt_max,
                "entry at {slot} has bucket distance {bkt_dist} exceeding dist_bkt_max {}",
                self.cfg.dist_bkt_max
            );
            if let Some(prev) = prev_psl {
                assert!(
                    psl == 0 || psl <= prev + 1,
                    "psl at {slot} is {psl}, more than one greater than the previous slot's {prev}"
                );
            }
            prev_psl = Some(psl);
        }
        assert!(
            self.load_pct() <= self.cfg.cap_pct_max as usize,
            "load factor {}% exceeds cap_pct_max {}",
            self.load_pct(),
            self.cfg.cap_pct_max
        );
    }
}

impl<H: KeyHasher> Drop for Table<H> {
    fn drop(&mut self) {
        log::trace!("skymap: dropping table with {} live entries", self.used);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoke_cfg() -> TableConfig {
        TableConfig {
            dist_slot_max: 32,
            dist_bkt_max: 8,
            cap_pct_max: 90,
            mem_align: 4096,
            initial_slot_count: 10,
        }
    }

    // S1 — Smoke
    #[test]
    fn s1_smoke() {
        let mut t = Table::create(smoke_cfg()).unwrap();
        t.insert(b"one", 1, false).unwrap();
        t.insert(b"two", 2, false).unwrap();
        t.insert(b"three", 3, false).unwrap();

        assert_eq!(t.find(b"two"), Some(2));
        assert_eq!(t.find(b"four"), None);
        t.delete(b"two").unwrap();
        assert_eq!(t.find(b"two"), None);
        assert_eq!(t.find(b"one"), Some(1));
    }

    // S2 — Grow under load
    #[test]
    fn s2_grow_under_load() {
        let mut t = Table::create(smoke_cfg()).unwrap();
        let initial_capacity = t.capacity();
        assert!(initial_capacity < 10_000);

        for i in 0..10_000u64 {
            let key = format!("key-{i}");
            t.insert(key.as_bytes(), i, false).unwrap();
        }
        assert!(t.capacity() > initial_capacity);
        for i in 0..10_000u64 {
            let key = format!("key-{i}");
            assert_eq!(t.find(key.as_bytes()), Some(i));
        }
    }

    // S3 — Duplicate handling
    #[test]
    fn s3_duplicate_handling() {
        let mut t = Table::create(smoke_cfg()).unwrap();
        t.insert(b"x", 1, false).unwrap();
        assert_eq!(t.insert(b"x", 2, false), Err(InsertError::KeyExists));
        assert_eq!(t.find(b"x"), Some(1));
        t.insert(b"x", 2, true).unwrap();
        assert_eq!(t.find(b"x"), Some(2));
    }

    // S4 — Delete missing
    #[test]
    fn s4_delete_missing() {
        let mut t = Table::create(smoke_cfg()).unwrap();
        assert_eq!(t.delete(b"never"), Err(DeleteError::NotFound));
        t.insert(b"present", 1, false).unwrap();
        assert_eq!(t.delete(b"never"), Err(DeleteError::NotFound));
    }

    // S5 — Compaction after delete
    #[test]
    fn s5_compaction_after_delete() {
        let mut t = Table::create(smoke_cfg()).unwrap();
        let keys: Vec<String> = (0..100).map(|i| format!("compact-{i}")).collect();
        for (i, k) in keys.iter().enumerate() {
            t.insert(k.as_bytes(), i as u64, false).unwrap();
        }
        for (i, k) in keys.iter().enumerate() {
            if i % 3 == 0 {
                t.delete(k.as_bytes()).unwrap();
            }
        }
        for (i, k) in keys.iter().enumerate() {
            if i % 3 == 0 {
                assert_eq!(t.find(k.as_bytes()), None);
            } else {
                assert_eq!(t.find(k.as_bytes()), Some(i as u64));
            }
        }
    }

    // S6 — Alignment rejection
    #[test]
    fn s6_alignment_rejection() {
        let cfg = TableConfig {
            mem_align: 24,
            ..smoke_cfg()
        };
        assert!(Table::create(cfg).is_err());
    }

    #[test]
    fn insert_then_delete_then_reinsert_works() {
        let mut t = Table::create(smoke_cfg()).unwrap();
        t.insert(b"a", 1, false).unwrap();
        t.delete(b"a").unwrap();
        assert_eq!(t.find(b"a"), None);
        t.insert(b"a", 2, false).unwrap();
        assert_eq!(t.find(b"a"), Some(2));
    }

    #[test]
    fn len_tracks_live_entries_only() {
        let mut t = Table::create(smoke_cfg()).unwrap();
        assert_eq!(t.len(), 0);
        t.insert(b"a", 1, false).unwrap();
        t.insert(b"b", 2, false).unwrap();
        assert_eq!(t.len(), 2);
        t.delete(b"a").unwrap();
        assert_eq!(t.len(), 1);
        // an overwrite must not change the live count
        t.insert(b"b", 3, true).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[derive(Debug, Clone)]
    struct RandomOp {
        key: u8,
        value: u64,
        delete: bool,
    }

    impl quickcheck::Arbitrary for RandomOp {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            RandomOp {
                key: u8::arbitrary(g) % 48,
                value: u64::arbitrary(g),
                delete: bool::arbitrary(g),
            }
        }
    }

    #[quickcheck_macros::quickcheck]
    fn probe_and_load_invariants_hold_after_every_op(ops: Vec<RandomOp>) -> bool {
        let mut t = Table::create(smoke_cfg()).unwrap();
        for op in ops {
            let key = [op.key];
            if op.delete {
                let _ = t.delete(&key);
            } else {
                let _ = t.insert(&key, op.value, true);
            }
            t.check_invariants();
        }
        true
    }
}
