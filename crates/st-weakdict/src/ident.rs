// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Identity hashes and bucket-index mixing.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

/// Identity of an `Arc` allocation, stable for the allocation's lifetime.
pub fn arc_ident<T: ?Sized>(key: &Arc<T>) -> usize {
    Arc::as_ptr(key) as *const () as usize
}

/// Hash for token key components that are compared by value.
pub(crate) fn token_hash<C: Hash>(token: &C) -> usize {
    let mut hasher = FxHasher::default();
    token.hash(&mut hasher);
    hasher.finish() as usize
}

/// Combined index for two identity hashes.
pub(crate) fn mix_pair(h1: usize, h2: usize) -> usize {
    h1.wrapping_add(h2.wrapping_mul(13))
}

/// Combined index for two identity hashes and a token hash.
pub(crate) fn mix_triple(h1: usize, h2: usize, h3: usize) -> usize {
    mix_pair(h1, h2) ^ h3.wrapping_mul(503)
}
