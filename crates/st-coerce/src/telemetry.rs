// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide engine counters.
//!
//! Dispatch and discovery bump these on their decision points; the testable
//! properties of the engine (fast path never discovers, negative results
//! memoize) are asserted through snapshots of this module.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static DISCOVERY_CALLS: AtomicU64 = AtomicU64::new(0);
static SEARCH_RUNS: AtomicU64 = AtomicU64::new(0);
static CACHE_HITS: AtomicU64 = AtomicU64::new(0);
static CACHE_MISSES: AtomicU64 = AtomicU64::new(0);
static PROBE_RUNS: AtomicU64 = AtomicU64::new(0);
static FAST_PATH_HITS: AtomicU64 = AtomicU64::new(0);

pub(crate) fn count_discovery() {
    DISCOVERY_CALLS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn count_search() {
    SEARCH_RUNS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn count_cache_hit() {
    CACHE_HITS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn count_cache_miss() {
    CACHE_MISSES.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn count_probe() {
    PROBE_RUNS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn count_fast_path() {
    FAST_PATH_HITS.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of the engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoerceStats {
    pub discovery_calls: u64,
    pub search_runs: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub probe_runs: u64,
    pub fast_path_hits: u64,
}

pub fn coerce_stats() -> CoerceStats {
    CoerceStats {
        discovery_calls: DISCOVERY_CALLS.load(Ordering::Relaxed),
        search_runs: SEARCH_RUNS.load(Ordering::Relaxed),
        cache_hits: CACHE_HITS.load(Ordering::Relaxed),
        cache_misses: CACHE_MISSES.load(Ordering::Relaxed),
        probe_runs: PROBE_RUNS.load(Ordering::Relaxed),
        fast_path_hits: FAST_PATH_HITS.load(Ordering::Relaxed),
    }
}

/// Zeroes every counter. Test support.
pub fn reset_coerce_stats() {
    DISCOVERY_CALLS.store(0, Ordering::Relaxed);
    SEARCH_RUNS.store(0, Ordering::Relaxed);
    CACHE_HITS.store(0, Ordering::Relaxed);
    CACHE_MISSES.store(0, Ordering::Relaxed);
    PROBE_RUNS.store(0, Ordering::Relaxed);
    FAST_PATH_HITS.store(0, Ordering::Relaxed);
}
