// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Coercion and action discovery with memoization.
//!
//! Every query lands in one of three process-wide identity-keyed caches.
//! A cached `None` is a real answer, "there is no path", and is
//! distinguished from "never asked" by the cache miss itself. Writes are
//! first-write-wins, so racing discoveries of the same pair converge on a
//! single memoized object.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use serde::Serialize;
use st_weakdict::{PairDict, TripleDict};
use tracing::{debug, trace};

use crate::action::Action;
use crate::element::Element;
use crate::error::{arithmetic, CoerceError, Result};
use crate::morphism::Morphism;
use crate::op::{ActSide, ActionKey, BinOp};
use crate::parent::{Parent, ParentRef};
use crate::telemetry;

/// Search bounds for path discovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscoveryLimits {
    /// Queue nodes a single search may examine.
    pub search_nodes: usize,
    /// Queue nodes still examined after the first complete path, looking
    /// for a strictly cheaper one.
    pub path_slack: usize,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        DiscoveryLimits {
            search_nodes: 64,
            path_slack: 4,
        }
    }
}

impl DiscoveryLimits {
    /// Environment overrides; unset or unparsable variables are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        DiscoveryLimits {
            search_nodes: env_usize("ST_COERCE_SEARCH_NODES").unwrap_or(defaults.search_nodes),
            path_slack: env_usize("ST_COERCE_PATH_SLACK").unwrap_or(defaults.path_slack),
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.parse().ok()
}

static LIMITS: Lazy<DiscoveryLimits> = Lazy::new(DiscoveryLimits::from_env);

/// The limits in effect for this process.
pub fn discovery_limits() -> DiscoveryLimits {
    *LIMITS
}

type CoerceCache = PairDict<Parent, Parent, Option<Arc<Morphism>>>;
type ActionCache = TripleDict<Parent, Parent, ActionKey, Option<Arc<Action>>>;

static COERCE_CACHE: Lazy<Mutex<CoerceCache>> = Lazy::new(|| Mutex::new(PairDict::new()));
static CONVERT_CACHE: Lazy<Mutex<CoerceCache>> = Lazy::new(|| Mutex::new(PairDict::new()));
static ACTION_CACHE: Lazy<Mutex<ActionCache>> = Lazy::new(|| Mutex::new(TripleDict::new()));

thread_local! {
    static PROBING: RefCell<FxHashSet<(usize, usize)>> = RefCell::new(FxHashSet::default());
    static COERCING: RefCell<FxHashSet<(usize, usize)>> = RefCell::new(FxHashSet::default());
}

/// Registers the unordered pair under probe; re-entry is a cycle. The set
/// entry is released on drop, unconditionally.
struct ProbeGuard {
    key: (usize, usize),
}

impl ProbeGuard {
    fn acquire(a: &ParentRef, b: &ParentRef) -> Result<ProbeGuard> {
        let (ia, ib) = (Parent::ident_of(a), Parent::ident_of(b));
        let key = (ia.min(ib), ia.max(ib));
        let fresh = PROBING.with(|set| set.borrow_mut().insert(key));
        if !fresh {
            return Err(CoerceError::ProbeCycle {
                left: a.name().to_string(),
                right: b.name().to_string(),
            });
        }
        Ok(ProbeGuard { key })
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        PROBING.with(|set| {
            set.borrow_mut().remove(&self.key);
        });
    }
}

/// In-progress marker for a coercion query, so embedding chains that loop
/// back onto a pending pair terminate instead of recursing. A query cut
/// short this way answers `None` without memoizing.
struct CoercionGuard {
    key: (usize, usize),
}

impl CoercionGuard {
    fn acquire(target: &ParentRef, source: &ParentRef) -> Option<CoercionGuard> {
        let key = (Parent::ident_of(target), Parent::ident_of(source));
        let fresh = COERCING.with(|set| set.borrow_mut().insert(key));
        fresh.then_some(CoercionGuard { key })
    }
}

impl Drop for CoercionGuard {
    fn drop(&mut self) {
        COERCING.with(|set| {
            set.borrow_mut().remove(&self.key);
        });
    }
}

/// Is there a canonical way to map values of `source` into `target`?
///
/// The identity case is answered without touching the cache. Everything
/// else is memoized, including negative answers; asking twice returns the
/// same morphism object.
pub fn coercion_map(target: &ParentRef, source: &ParentRef) -> Option<Arc<Morphism>> {
    telemetry::count_discovery();
    if Parent::same(target, source) {
        return Some(Morphism::identity(target));
    }
    if let Some(cached) = peek_coercion(target, source) {
        telemetry::count_cache_hit();
        return cached;
    }
    telemetry::count_cache_miss();
    let _guard = CoercionGuard::acquire(target, source)?;
    let found = discover_coercion(target, source);
    match &found {
        Some(path) => debug!(
            into = target.name(),
            from = source.name(),
            cost = path.cost(),
            "coercion path discovered"
        ),
        None => {
            record_failure("coercion", target.name(), source.name());
            debug!(into = target.name(), from = source.name(), "no coercion path");
        }
    }
    COERCE_CACHE
        .lock()
        .unwrap()
        .set(target, source, found)
        .clone()
}

/// Cache peek without discovery. Outer `None` means "never computed";
/// inner `None` is a memoized negative answer.
pub fn peek_coercion(target: &ParentRef, source: &ParentRef) -> Option<Option<Arc<Morphism>>> {
    COERCE_CACHE.lock().unwrap().get(target, source).cloned()
}

fn discover_coercion(target: &ParentRef, source: &ParentRef) -> Option<Arc<Morphism>> {
    // The source may embed into a larger structure that reaches the target.
    if let Some(embedding) = source.embedding() {
        if embedding.codomain_ident() == Parent::ident_of(target) {
            return Some(embedding);
        }
        if let Some(through) = embedding.codomain() {
            if let Some(tail) = coercion_map(target, &through) {
                return Some(Morphism::compose(&embedding, &tail));
            }
        }
    }
    // Structure-specific rule; accepted tentatively, the search below may
    // still find a cheaper registered path.
    let tentative = target
        .ops()
        .coerce_rule(target, source)
        .filter(|rule| {
            rule.domain_ident() == Parent::ident_of(source)
                && rule.codomain_ident() == Parent::ident_of(target)
        });
    search_registered_paths(target, source, tentative)
}

/// Bounded breadth-first search over the target's registered coercion
/// sources. Lowest cumulative cost wins; on a tie the first discovered
/// path is kept.
fn search_registered_paths(
    target: &ParentRef,
    source: &ParentRef,
    tentative: Option<Arc<Morphism>>,
) -> Option<Arc<Morphism>> {
    telemetry::count_search();
    let limits = discovery_limits();
    let source_ident = Parent::ident_of(source);
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    visited.insert(Parent::ident_of(target));

    let mut queue: VecDeque<(ParentRef, Arc<Morphism>)> = VecDeque::new();
    {
        // Direct registered edges memoize as the canonical answer for
        // their own pair while we are here.
        let mut cache = COERCE_CACHE.lock().unwrap();
        for edge in target.coerce_sources() {
            cache.set(target, &edge.domain, Some(Arc::clone(&edge.via)));
            queue.push_back((edge.domain, edge.via));
        }
    }

    let mut best = tentative;
    let mut nodes = 0usize;
    let mut slack = 0usize;
    while let Some((node, path)) = queue.pop_front() {
        nodes += 1;
        if nodes > limits.search_nodes {
            break;
        }
        if best.is_some() {
            slack += 1;
            if slack > limits.path_slack {
                break;
            }
        }
        // Goal checks run before dedup: several queued paths may reach the
        // source, and each one is a cost candidate.
        if Parent::ident_of(&node) == source_ident {
            best = match best {
                Some(incumbent) if incumbent.cost() <= path.cost() => Some(incumbent),
                _ => Some(path),
            };
            continue;
        }
        if !visited.insert(Parent::ident_of(&node)) {
            continue;
        }
        trace!(via = node.name(), cost = path.cost(), "searching coercion sources");
        for edge in node.coerce_sources() {
            if visited.contains(&Parent::ident_of(&edge.domain)) {
                continue;
            }
            queue.push_back((edge.domain.clone(), Morphism::compose(&edge.via, &path)));
        }
    }
    best
}

/// Explicit-construction variant: weaker than coercion, but always
/// answers, in the worst case with the codomain's constructor.
pub fn conversion_map(target: &ParentRef, source: &ParentRef) -> Option<Arc<Morphism>> {
    telemetry::count_discovery();
    if Parent::same(target, source) {
        return Some(Morphism::identity(target));
    }
    if let Some(cached) = { CONVERT_CACHE.lock().unwrap().get(target, source).cloned() } {
        telemetry::count_cache_hit();
        return cached;
    }
    telemetry::count_cache_miss();
    let found = discover_conversion(target, source);
    CONVERT_CACHE
        .lock()
        .unwrap()
        .set(target, source, found)
        .clone()
}

fn discover_conversion(target: &ParentRef, source: &ParentRef) -> Option<Arc<Morphism>> {
    if let Some(canonical) = coercion_map(target, source) {
        return Some(canonical);
    }
    let edges = target.convert_sources();
    for edge in &edges {
        if Parent::same(&edge.domain, source) {
            return Some(Arc::clone(&edge.via));
        }
    }
    for edge in &edges {
        if let Some(head) = coercion_map(&edge.domain, source) {
            return Some(Morphism::compose(&head, &edge.via));
        }
    }
    Some(Morphism::construct(source, target))
}

/// Does `actor` act on values of `operand` under `op` from `side`?
///
/// `Err(ProbeCycle)` is the only hard failure; it is never memoized, so a
/// pair probed mid-cycle stays askable once the cycle unwinds.
pub fn action(
    actor: &ParentRef,
    operand: &ParentRef,
    op: BinOp,
    side: ActSide,
) -> Result<Option<Arc<Action>>> {
    telemetry::count_discovery();
    let key: ActionKey = (op, side);
    if let Some(cached) = { ACTION_CACHE.lock().unwrap().get(actor, operand, key).cloned() } {
        telemetry::count_cache_hit();
        return Ok(cached);
    }
    telemetry::count_cache_miss();
    let found = discover_action(actor, operand, op, side)?;
    if found.is_none() {
        record_failure("action", actor.name(), operand.name());
    }
    Ok(ACTION_CACHE
        .lock()
        .unwrap()
        .set(actor, operand, key, found)
        .clone())
}

/// Cache peek without discovery.
pub fn peek_action(
    actor: &ParentRef,
    operand: &ParentRef,
    op: BinOp,
    side: ActSide,
) -> Option<Option<Arc<Action>>> {
    ACTION_CACHE.lock().unwrap().get(actor, operand, (op, side)).cloned()
}

fn discover_action(
    actor: &ParentRef,
    operand: &ParentRef,
    op: BinOp,
    side: ActSide,
) -> Result<Option<Arc<Action>>> {
    let operand_ident = Parent::ident_of(operand);
    let declared = actor.declared_actions();
    for act in &declared {
        if act.op() == op && act.side() == side && act.operand_ident() == operand_ident {
            return Ok(Some(Arc::clone(act)));
        }
    }
    // A declared action whose operand the queried structure coerces into.
    for act in &declared {
        if act.op() != op || act.side() != side {
            continue;
        }
        if let Some(declared_operand) = act.operand() {
            if let Some(via) = coercion_map(&declared_operand, operand) {
                debug!(
                    actor = act.actor_name(),
                    operand = operand.name(),
                    through = declared_operand.name(),
                    "action reached through coercion"
                );
                return Ok(Some(Action::derived(act, operand, via)));
            }
        }
    }
    if op == BinOp::Mul {
        return probe_mul_action(actor, operand, side);
    }
    Ok(None)
}

fn probe_mul_action(
    actor: &ParentRef,
    operand: &ParentRef,
    side: ActSide,
) -> Result<Option<Arc<Action>>> {
    let _guard = ProbeGuard::acquire(actor, operand)?;
    telemetry::count_probe();
    let actor_sample = actor.ops().sample(actor);
    let operand_sample = operand.ops().sample(operand);
    // Probe failures are discarded; only a nested cycle is fatal.
    match actor.ops().probe_mul(&actor_sample, &operand_sample, side) {
        Err(cycle @ CoerceError::ProbeCycle { .. }) => return Err(cycle),
        Err(_) | Ok(None) => return Ok(None),
        Ok(Some(_)) => {}
    }
    let ops = Arc::clone(actor.ops());
    let actor_name = actor.name().to_string();
    let rule = move |actor_value: &Element, operand_value: &Element| -> Result<Element> {
        match ops.probe_mul(actor_value, operand_value, side)? {
            Some(result) => Ok(result),
            None => Err(arithmetic(
                actor_name.clone(),
                "multiplication hook declined a value it probed successfully",
            )),
        }
    };
    Ok(Some(Arc::new(Action::new(
        actor,
        operand,
        BinOp::Mul,
        side,
        rule,
    ))))
}

/// The structure both arguments canonically coerce into, if any.
pub fn common_parent(a: &ParentRef, b: &ParentRef) -> Result<ParentRef> {
    if Parent::same(a, b) {
        return Ok(Arc::clone(a));
    }
    if coercion_map(a, b).is_some() {
        return Ok(Arc::clone(a));
    }
    if coercion_map(b, a).is_some() {
        return Ok(Arc::clone(b));
    }
    Err(CoerceError::NoCommonParent {
        left: a.name().to_string(),
        right: b.name().to_string(),
    })
}

/// Maps both values into their common structure.
pub fn canonical_coercion(x: &Element, y: &Element) -> Result<(Element, Element)> {
    let common = common_parent(x.parent(), y.parent())?;
    Ok((map_into(&common, x)?, map_into(&common, y)?))
}

fn map_into(common: &ParentRef, value: &Element) -> Result<Element> {
    if Parent::same(common, value.parent()) {
        return Ok(value.clone());
    }
    match coercion_map(common, value.parent()) {
        Some(path) => path.apply(value),
        None => Err(CoerceError::NoCommonParent {
            left: common.name().to_string(),
            right: value.parent().name().to_string(),
        }),
    }
}

/// Drops dead records from all three discovery caches, returning how many
/// were reclaimed.
pub fn sweep_caches() -> usize {
    COERCE_CACHE.lock().unwrap().sweep()
        + CONVERT_CACHE.lock().unwrap().sweep()
        + ACTION_CACHE.lock().unwrap().sweep()
}

const FAILURE_RING: usize = 32;

/// One remembered negative discovery, for diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveryFailure {
    pub kind: &'static str,
    pub target: String,
    pub source: String,
}

static RECENT_FAILURES: Lazy<Mutex<VecDeque<DiscoveryFailure>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(FAILURE_RING)));

fn record_failure(kind: &'static str, target: &str, source: &str) {
    let mut ring = RECENT_FAILURES.lock().unwrap();
    if ring.len() == FAILURE_RING {
        ring.pop_front();
    }
    ring.push_back(DiscoveryFailure {
        kind,
        target: target.to_string(),
        source: source.to_string(),
    });
}

/// The most recent negative discoveries, oldest first.
pub fn recent_failures() -> Vec<DiscoveryFailure> {
    RECENT_FAILURES.lock().unwrap().iter().cloned().collect()
}
