// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Three-key identity dictionary: two weak components plus one token.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use crate::ident::{arc_ident, mix_triple, token_hash};
use crate::{next_prime, INITIAL_BUCKETS, MAX_LOAD};

struct TripleRecord<K1, K2, C, V> {
    i1: usize,
    i2: usize,
    h3: usize,
    k1: Weak<K1>,
    k2: Weak<K2>,
    token: C,
    value: V,
}

impl<K1, K2, C: Eq, V> TripleRecord<K1, K2, C, V> {
    fn alive(&self) -> bool {
        self.k1.strong_count() > 0 && self.k2.strong_count() > 0
    }

    fn matches(&self, i1: usize, i2: usize, token: &C) -> bool {
        self.i1 == i1 && self.i2 == i2 && self.token == *token
    }
}

/// Dictionary keyed by two `Arc` identities and one by-value token.
///
/// The refcounted components are weak; the token (`Copy + Eq + Hash`) is
/// stored by value and never expires, which is the documented strong-key
/// exception to weak semantics. Bucket index is `(i1 + 13·i2) ^ 503·h3`
/// reduced modulo an odd prime bucket count.
pub struct TripleDict<K1, K2, C, V> {
    buckets: Vec<Vec<TripleRecord<K1, K2, C, V>>>,
    records: usize,
}

impl<K1, K2, C: Copy + Eq + Hash, V> TripleDict<K1, K2, C, V> {
    pub fn new() -> Self {
        TripleDict {
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

    pub fn get(&self, k1: &Arc<K1>, k2: &Arc<K2>, token: C) -> Option<&V> {
        let (i1, i2, h3) = (arc_ident(k1), arc_ident(k2), token_hash(&token));
        let bucket = &self.buckets[mix_triple(i1, i2, h3) % self.buckets.len()];
        bucket
            .iter()
            .find(|r| r.matches(i1, i2, &token) && r.alive())
            .map(|r| &r.value)
    }

    /// First-write-wins insert; returns a reference to the stored value.
    pub fn set(&mut self, k1: &Arc<K1>, k2: &Arc<K2>, token: C, value: V) -> &V {
        let (i1, i2, h3) = (arc_ident(k1), arc_ident(k2), token_hash(&token));
        self.sweep_bucket(mix_triple(i1, i2, h3) % self.buckets.len());
        if self.records + 1 > self.buckets.len() * MAX_LOAD {
            self.resize();
        }
        let slot = mix_triple(i1, i2, h3) % self.buckets.len();
        let bucket = &mut self.buckets[slot];
        let at = match bucket.iter().position(|r| r.matches(i1, i2, &token)) {
            Some(existing) => existing,
            None => {
                bucket.push(TripleRecord {
                    i1,
                    i2,
                    h3,
                    k1: Arc::downgrade(k1),
                    k2: Arc::downgrade(k2),
                    token,
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
    pub fn remove(&mut self, k1: &Arc<K1>, k2: &Arc<K2>, token: C) -> Option<V> {
        let (i1, i2, h3) = (arc_ident(k1), arc_ident(k2), token_hash(&token));
        let slot = mix_triple(i1, i2, h3) % self.buckets.len();
        let bucket = &mut self.buckets[slot];
        let at = bucket.iter().position(|r| r.matches(i1, i2, &token))?;
        let record = bucket.swap_remove(at);
        self.records -= 1;
        record.alive().then_some(record.value)
    }

    /// Reclaims every record with a dead weak component.
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

    pub fn iter(&self) -> impl Iterator<Item = (Arc<K1>, Arc<K2>, C, &V)> {
        self.buckets.iter().flatten().filter_map(|r| {
            let k1 = r.k1.upgrade()?;
            let k2 = r.k2.upgrade()?;
            Some((k1, k2, r.token, &r.value))
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
        let mut fresh: Vec<Vec<TripleRecord<K1, K2, C, V>>> =
            (0..target).map(|_| Vec::new()).collect();
        let mut records = 0;
        for record in self.buckets.drain(..).flatten() {
            if record.alive() {
                fresh[mix_triple(record.i1, record.i2, record.h3) % target].push(record);
                records += 1;
            }
        }
        self.buckets = fresh;
        self.records = records;
    }
}

impl<K1, K2, C: Copy + Eq + Hash, V> Default for TripleDict<K1, K2, C, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K1, K2, C, V> fmt::Debug for TripleDict<K1, K2, C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripleDict")
            .field("buckets", &self.buckets.len())
            .field("records", &self.records)
            .finish()
    }
}
