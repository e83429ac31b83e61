// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide weak set of live structure descriptors.
//!
//! Diagnostics only; nothing in discovery or dispatch depends on it. The
//! registry holds parents weakly, so enrollment never extends a
//! structure's lifetime.

use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use st_weakdict::MonoDict;

use crate::parent::{Parent, ParentRef};

static LIVE_PARENTS: Lazy<Mutex<MonoDict<Parent, ()>>> = Lazy::new(|| Mutex::new(MonoDict::new()));

pub(crate) fn enroll(parent: &ParentRef) {
    LIVE_PARENTS.lock().unwrap().set(parent, ());
}

/// Every structure descriptor still alive in the process.
pub fn live_parents() -> Vec<ParentRef> {
    LIVE_PARENTS
        .lock()
        .unwrap()
        .iter()
        .map(|(parent, _)| parent)
        .collect()
}

/// Renders the live structures and their registered coercion edges.
pub fn export_graph() -> Value {
    let parents = live_parents();
    let nodes: Vec<Value> = parents
        .iter()
        .map(|p| {
            json!({
                "name": p.name(),
                "base": p.base().map(|b| b.name()),
                "coerces_from": p.coercion_source_names(),
            })
        })
        .collect();
    json!({ "structures": nodes })
}
