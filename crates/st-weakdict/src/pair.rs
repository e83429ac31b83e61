// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Two-key identity dictionary.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::ident::{arc_ident, mix_pair};
use crate::{next_prime, INITIAL_BUCKETS, MAX_LOAD};

struct PairRecord<K1, K2, V> {
    i1: usize,
    i2: usize,
    k1: Weak<K1>,
    k2: Weak<K2>,
    value: V,
}

impl<K1, K2, V> PairRecord<K1, K2, V> {
    fn alive(&self) -> bool {
        self.k1.strong_count() > 0 && self.k2.strong_count() > 0
    }

    fn matches(&self, i1: usize, i2: usize) -> bool {
        self.i1 == i1 && self.i2 == i2
    }
}

/// Dictionary keyed by the identities of two `Arc` allocations.
///
/// Both components are held weakly; the entry reads as absent as soon as
/// either one dies. Bucket index is `i1 + 13·i2` reduced modulo an odd
/// prime bucket count.
pub struct PairDict<K1, K2, V> {
    buckets: Vec<Vec<PairRecord<K1, K2, V>>>,
    records: usize,
}

impl<K1, K2, V> PairDict<K1, K2, V> {
    pub fn new() -> Self {
        PairDict {
            buckets: (0..INITIAL_BUCKETS).map(|_| Vec::new()).collect(),
            records: 0,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of live entries. Walks the table.
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .flatten()
            .filter(|r| r.alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, k1: &Arc<K1>, k2: &Arc<K2>) -> Option<&V> {
        let (i1, i2) = (arc_ident(k1), arc_ident(k2));
        let bucket = &self.buckets[mix_pair(i1, i2) % self.buckets.len()];
        bucket
            .iter()
            .find(|r| r.matches(i1, i2) && r.alive())
            .map(|r| &r.value)
    }

    /// First-write-wins insert; returns a reference to the stored value.
    pub fn set(&mut self, k1: &Arc<K1>, k2: &Arc<K2>, value: V) -> &V {
        let (i1, i2) = (arc_ident(k1), arc_ident(k2));
        self.sweep_bucket(mix_pair(i1, i2) % self.buckets.len());
        if self.records + 1 > self.buckets.len() * MAX_LOAD {
            self.resize();
        }
        let slot = mix_pair(i1, i2) % self.buckets.len();
        let bucket = &mut self.buckets[slot];
        let at = match bucket.iter().position(|r| r.matches(i1, i2)) {
            Some(existing) => existing,
            None => {
                bucket.push(PairRecord {
                    i1,
                    i2,
                    k1: Arc::downgrade(k1),
                    k2: Arc::downgrade(k2),
                    value,
                });
                self.records += 1;
                bucket.len() - 1
            }
        };
        &self.buckets[slot][at].value
    }

    /// Removes the entry. `None` covers never-inserted and died-key cases
    /// alike.
    pub fn remove(&mut self, k1: &Arc<K1>, k2: &Arc<K2>) -> Option<V> {
        let (i1, i2) = (arc_ident(k1), arc_ident(k2));
        let slot = mix_pair(i1, i2) % self.buckets.len();
        let bucket = &mut self.buckets[slot];
        let at = bucket.iter().position(|r| r.matches(i1, i2))?;
        let record = bucket.swap_remove(at);
        self.records -= 1;
        record.alive().then_some(record.value)
    }

    /// Reclaims every record with a dead component.
    pub fn sweep(&mut self) -> usize {
        let mut dropped = 0;
        for bucket in &mut self.buckets {
            let before = bucket.len();
            bucket.retain(|r| r.alive());
            dropped += before - bucket.len();
        }
        self.records -= dropped;
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = (Arc<K1>, Arc<K2>, &V)> {
        self.buckets.iter().flatten().filter_map(|r| {
            let k1 = r.k1.upgrade()?;
            let k2 = r.k2.upgrade()?;
            Some((k1, k2, &r.value))
        })
    }

    fn sweep_bucket(&mut self, slot: usize) {
        let bucket = &mut self.buckets[slot];
        let before = bucket.len();
        bucket.retain(|r| r.alive());
        self.records -= before - bucket.len();
    }

    fn resize(&mut self) {
        let target = next_prime(self.buckets.len() * 2 + 1);
        let mut fresh: Vec<Vec<PairRecord<K1, K2, V>>> = (0..target).map(|_| Vec::new()).collect();
        let mut records = 0;
        for record in self.buckets.drain(..).flatten() {
            if record.alive() {
                fresh[mix_pair(record.i1, record.i2) % target].push(record);
                records += 1;
            }
        }
        self.buckets = fresh;
        self.records = records;
    }
}

impl<K1, K2, V> Default for PairDict<K1, K2, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K1, K2, V> fmt::Debug for PairDict<K1, K2, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairDict")
            .field("buckets", &self.buckets.len())
            .field("records", &self.records)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_pairs_are_distinct_keys() {
        let mut dict: PairDict<u32, u32, &str> = PairDict::new();
        let p = Arc::new(1u32);
        let q = Arc::new(2u32);
        dict.set(&p, &q, "pq");
        dict.set(&q, &p, "qp");
        assert_eq!(dict.get(&p, &q), Some(&"pq"));
        assert_eq!(dict.get(&q, &p), Some(&"qp"));
    }

    #[test]
    fn either_dead_component_hides_the_entry() {
        let mut dict: PairDict<u32, u32, u32> = PairDict::new();
        let p = Arc::new(1u32);
        let q = Arc::new(2u32);
        dict.set(&p, &q, 12);
        drop(q);
        assert_eq!(dict.len(), 0);
        assert_eq!(dict.sweep(), 1);
    }

    #[test]
    fn fresh_pair_with_equal_values_misses_stale_slots() {
        let mut dict: PairDict<u32, u32, u32> = PairDict::new();
        let p = Arc::new(5u32);
        let q = Arc::new(6u32);
        dict.set(&p, &q, 56);
        drop(p);
        drop(q);
        let p2 = Arc::new(5u32);
        let q2 = Arc::new(6u32);
        assert_eq!(dict.get(&p2, &q2), None);
    }
}
