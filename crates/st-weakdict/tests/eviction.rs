// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::sync::Arc;

use st_weakdict::{MonoDict, PairDict, TripleDict};

#[test]
fn mono_entries_vanish_with_their_keys() {
    let mut dict: MonoDict<String, usize> = MonoDict::new();
    let keep = Arc::new("keep".to_string());
    dict.set(&keep, 0);
    for i in 0..128 {
        let transient = Arc::new(format!("transient-{i}"));
        dict.set(&transient, i);
    }
    // Every transient key has died; writes along the way reclaimed buckets
    // and the resize skipped dead records.
    assert_eq!(dict.len(), 1);
    assert_eq!(dict.get(&keep), Some(&0));
}

#[test]
fn pair_value_is_dropped_when_a_key_side_dies() {
    struct Canary(Arc<std::sync::atomic::AtomicUsize>);
    impl Drop for Canary {
        fn drop(&mut self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    let drops = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut dict: PairDict<u32, u32, Canary> = PairDict::new();
    let left = Arc::new(1u32);
    let right = Arc::new(2u32);
    dict.set(&left, &right, Canary(Arc::clone(&drops)));
    drop(right);
    assert_eq!(dict.sweep(), 1);
    assert_eq!(drops.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn triple_restarted_iteration_sees_a_consistent_snapshot() {
    let mut dict: TripleDict<u32, u32, u8, &str> = TripleDict::new();
    let a = Arc::new(1u32);
    let b = Arc::new(2u32);
    let c = Arc::new(3u32);
    dict.set(&a, &b, 0, "ab");
    dict.set(&a, &c, 0, "ac");
    let first: Vec<&str> = dict.iter().map(|(_, _, _, v)| *v).collect();
    let second: Vec<&str> = dict.iter().map(|(_, _, _, v)| *v).collect();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}
