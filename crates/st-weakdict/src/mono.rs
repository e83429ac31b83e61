// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Single-key identity dictionary.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::ident::arc_ident;
use crate::{next_prime, INITIAL_BUCKETS, MAX_LOAD};

struct MonoRecord<K, V> {
    ident: usize,
    key: Weak<K>,
    value: V,
}

impl<K, V> MonoRecord<K, V> {
    fn alive(&self) -> bool {
        self.key.strong_count() > 0
    }
}

/// Dictionary keyed by the identity of one `Arc` allocation.
///
/// The key is held weakly: once its last strong reference drops, the entry
/// reads as absent. Lookup is an average-O(1) bucket scan comparing raw
/// identities before touching the weak reference.
pub struct MonoDict<K, V> {
    buckets: Vec<Vec<MonoRecord<K, V>>>,
    records: usize,
}

impl<K, V> MonoDict<K, V> {
    pub fn new() -> Self {
        MonoDict {
            buckets: (0..INITIAL_BUCKETS).map(|_| Vec::new()).collect(),
            records: 0,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of live entries. Walks the table; dead records are not counted.
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

    /// Looks up by key identity. A record whose key has died reads as absent.
    pub fn get(&self, key: &Arc<K>) -> Option<&V> {
        let ident = arc_ident(key);
        let bucket = &self.buckets[ident % self.buckets.len()];
        bucket
            .iter()
            .find(|r| r.ident == ident && r.alive())
            .map(|r| &r.value)
    }

    /// Inserts under first-write-wins: if a live entry for this key already
    /// exists it is kept, and a reference to the stored value is returned.
    pub fn set(&mut self, key: &Arc<K>, value: V) -> &V {
        let ident = arc_ident(key);
        self.sweep_bucket(ident % self.buckets.len());
        if self.records + 1 > self.buckets.len() * MAX_LOAD {
            self.resize();
        }
        let slot = ident % self.buckets.len();
        let bucket = &mut self.buckets[slot];
        let at = match bucket.iter().position(|r| r.ident == ident) {
            Some(existing) => existing,
            None => {
                bucket.push(MonoRecord {
                    ident,
                    key: Arc::downgrade(key),
                    value,
                });
                self.records += 1;
                bucket.len() - 1
            }
        };
        &self.buckets[slot][at].value
    }

    /// Removes and returns the entry for `key`. Returns `None` both when the
    /// key was never inserted and when its referent has died; the two cases
    /// are indistinguishable by design.
    pub fn remove(&mut self, key: &Arc<K>) -> Option<V> {
        let ident = arc_ident(key);
        let slot = ident % self.buckets.len();
        let bucket = &mut self.buckets[slot];
        let at = bucket.iter().position(|r| r.ident == ident)?;
        let record = bucket.swap_remove(at);
        self.records -= 1;
        record.alive().then_some(record.value)
    }

    /// Reclaims every dead record, returning how many were dropped.
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

    /// Lazy iteration over live entries. Borrowing the dict rules out
    /// concurrent mutation for the iterator's lifetime.
    pub fn iter(&self) -> impl Iterator<Item = (Arc<K>, &V)> {
        self.buckets
            .iter()
            .flatten()
            .filter_map(|r| r.key.upgrade().map(|k| (k, &r.value)))
    }

    fn sweep_bucket(&mut self, slot: usize) {
        let bucket = &mut self.buckets[slot];
        let before = bucket.len();
        bucket.retain(|r| r.alive());
        self.records -= before - bucket.len();
    }

    fn resize(&mut self) {
        let target = next_prime(self.buckets.len() * 2 + 1);
        let mut fresh: Vec<Vec<MonoRecord<K, V>>> = (0..target).map(|_| Vec::new()).collect();
        let mut records = 0;
        for record in self.buckets.drain(..).flatten() {
            if record.alive() {
                fresh[record.ident % target].push(record);
                records += 1;
            }
        }
        self.buckets = fresh;
        self.records = records;
    }
}

impl<K, V> Default for MonoDict<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for MonoDict<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonoDict")
            .field("buckets", &self.buckets.len())
            .field("records", &self.records)
            .finish()
    }
}
