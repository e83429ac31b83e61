// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Binary operator dispatch.
//!
//! Strategy order for `a op b` with distinct structures: canonical
//! coercion in either direction, declared/discovered actions (`*` and `/`
//! only), the additive scalar-extension fallback, then the integer-scaling
//! fallback. The identical-structure fast path short-circuits all of it
//! and never touches discovery or the caches.

use std::cmp::Ordering;

use crate::discover;
use crate::element::Element;
use crate::error::{arithmetic, CoerceError, Result};
use crate::op::{ActSide, BinOp};
use crate::parent::{Parent, ParentRef};
use crate::telemetry;

pub fn add(a: &Element, b: &Element) -> Result<Element> {
    bin_op(BinOp::Add, a, b)
}

pub fn sub(a: &Element, b: &Element) -> Result<Element> {
    bin_op(BinOp::Sub, a, b)
}

pub fn mul(a: &Element, b: &Element) -> Result<Element> {
    bin_op(BinOp::Mul, a, b)
}

pub fn div(a: &Element, b: &Element) -> Result<Element> {
    bin_op(BinOp::Div, a, b)
}

/// Dispatches `a op b`. Discovery runs at most once per structure pair;
/// repeated dispatches of the same shapes resolve from the caches.
pub fn bin_op(op: BinOp, a: &Element, b: &Element) -> Result<Element> {
    let pa = a.parent().clone();
    let pb = b.parent().clone();
    if Parent::same(&pa, &pb) {
        telemetry::count_fast_path();
        return pa.ops().arith(&pa, op, a, b);
    }

    if let Some(path) = discover::coercion_map(&pa, &pb) {
        let rhs = path.apply(b)?;
        return pa.ops().arith(&pa, op, a, &rhs);
    }
    if let Some(path) = discover::coercion_map(&pb, &pa) {
        let lhs = path.apply(a)?;
        return pb.ops().arith(&pb, op, &lhs, b);
    }

    let mut probe_cycle: Option<CoerceError> = None;
    if matches!(op, BinOp::Mul | BinOp::Div) {
        match discover::action(&pa, &pb, op, ActSide::Left) {
            Ok(Some(action)) => return action.apply(a, b),
            Ok(None) => {}
            Err(cycle) => probe_cycle = Some(cycle),
        }
        match discover::action(&pb, &pa, op, ActSide::Right) {
            Ok(Some(action)) => return action.apply(b, a),
            Ok(None) => {}
            Err(cycle) => probe_cycle = probe_cycle.or(Some(cycle)),
        }
    }

    if matches!(op, BinOp::Add | BinOp::Sub) {
        if let Some(result) = try_base_extension(op, a, b)? {
            return Ok(result);
        }
    }

    if op == BinOp::Mul {
        if let Some(scalar) = pb.ops().as_int(b) {
            return mul_int(a, scalar);
        }
        if let Some(scalar) = pa.ops().as_int(a) {
            return mul_int(b, scalar);
        }
    }

    if let Some(cycle) = probe_cycle {
        return Err(cycle);
    }
    Err(CoerceError::NoCommonStructure {
        op,
        left: pa.name().to_string(),
        right: pb.name().to_string(),
    })
}

/// Additive fallback when the operands are not mutually coercible but one
/// side's base structure relates to the other side: ask the owning library
/// for the extended structure, re-express both operands there, retry the
/// identical-structure case once.
fn try_base_extension(op: BinOp, a: &Element, b: &Element) -> Result<Option<Element>> {
    if let Some(result) = extend_one_side(op, a, b, false)? {
        return Ok(Some(result));
    }
    extend_one_side(op, b, a, true)
}

fn extend_one_side(op: BinOp, x: &Element, y: &Element, swapped: bool) -> Result<Option<Element>> {
    let px = x.parent().clone();
    let py = y.parent().clone();
    let base = match px.base() {
        Some(base) => base.clone(),
        None => return Ok(None),
    };
    let related = discover::coercion_map(&base, &py).is_some()
        || discover::coercion_map(&py, &base).is_some();
    if !related {
        return Ok(None);
    }
    let extended = match px.ops().extend_base(&px, &py) {
        Some(extended) if !Parent::same(&extended, &px) => extended,
        _ => return Ok(None),
    };
    let into_ext_x = match discover::conversion_map(&extended, &px) {
        Some(path) => path,
        None => return Ok(None),
    };
    let into_ext_y = match discover::conversion_map(&extended, &py) {
        Some(path) => path,
        None => return Ok(None),
    };
    // Re-expression is an attempt; a failing conversion falls through to
    // the remaining strategies instead of erroring the dispatch.
    let (cx, cy) = match (into_ext_x.apply(x), into_ext_y.apply(y)) {
        (Ok(cx), Ok(cy)) => (cx, cy),
        _ => return Ok(None),
    };
    let (lhs, rhs) = if swapped { (cy, cx) } else { (cx, cy) };
    extended.ops().arith(&extended, op, &lhs, &rhs).map(Some)
}

/// Scalar-by-integer through repeated doubling over the structure's
/// addition. `n = 0` answers the additive identity.
pub fn mul_int(value: &Element, n: i64) -> Result<Element> {
    let parent = value.parent().clone();
    let ops = parent.ops().clone();
    if n == 0 {
        return Ok(ops.zero(&parent));
    }
    let mut magnitude = n.unsigned_abs();
    let mut doubling = value.clone();
    let mut total: Option<Element> = None;
    loop {
        if magnitude & 1 == 1 {
            total = Some(match total {
                Some(sum) => ops.arith(&parent, BinOp::Add, &sum, &doubling)?,
                None => doubling.clone(),
            });
        }
        magnitude >>= 1;
        if magnitude == 0 {
            break;
        }
        doubling = ops.arith(&parent, BinOp::Add, &doubling, &doubling)?;
    }
    let total = match total {
        Some(total) => total,
        None => return Ok(ops.zero(&parent)),
    };
    if n < 0 {
        let zero = ops.zero(&parent);
        ops.arith(&parent, BinOp::Sub, &zero, &total)
    } else {
        Ok(total)
    }
}

/// Integer powers through repeated squaring over the structure's
/// multiplication. `n = 0` requires a multiplicative identity.
pub fn pow_int(value: &Element, n: u32) -> Result<Element> {
    let parent = value.parent().clone();
    let ops = parent.ops().clone();
    if n == 0 {
        return ops.one(&parent).ok_or_else(|| {
            arithmetic(parent.name(), "zeroth power of a structure without identity")
        });
    }
    let mut exponent = n;
    let mut squaring = value.clone();
    let mut total: Option<Element> = None;
    loop {
        if exponent & 1 == 1 {
            total = Some(match total {
                Some(product) => ops.arith(&parent, BinOp::Mul, &product, &squaring)?,
                None => squaring.clone(),
            });
        }
        exponent >>= 1;
        if exponent == 0 {
            break;
        }
        squaring = ops.arith(&parent, BinOp::Mul, &squaring, &squaring)?;
    }
    match total {
        Some(total) => Ok(total),
        None => ops.one(&parent).ok_or_else(|| {
            arithmetic(parent.name(), "zeroth power of a structure without identity")
        }),
    }
}

/// Compares across structures by coercing both sides into their common
/// parent first.
pub fn cmp(a: &Element, b: &Element) -> Result<Ordering> {
    let pa = a.parent().clone();
    if Parent::same(&pa, b.parent()) {
        return pa.ops().cmp(a, b).ok_or_else(|| incomparable(a, b));
    }
    match discover::canonical_coercion(a, b) {
        Ok((ca, cb)) => {
            let common = ca.parent().clone();
            common.ops().cmp(&ca, &cb).ok_or_else(|| incomparable(a, b))
        }
        Err(_) => Err(incomparable(a, b)),
    }
}

/// Equality through [`cmp`]; any failure to compare reads as "not equal".
pub fn eq(a: &Element, b: &Element) -> bool {
    matches!(cmp(a, b), Ok(Ordering::Equal))
}

fn incomparable(a: &Element, b: &Element) -> CoerceError {
    CoerceError::Incomparable {
        left: a.parent().name().to_string(),
        right: b.parent().name().to_string(),
    }
}

/// Human-readable rendering of the strategy dispatch would choose for
/// `op` between the two structures. Consults the engine, so caches
/// populate as a side effect, exactly as a real dispatch would.
pub fn explain(op: BinOp, left: &ParentRef, right: &ParentRef) -> String {
    if Parent::same(left, right) {
        return format!(
            "`{}` and the right operand are the same structure; `{op}` dispatches directly",
            left.name()
        );
    }
    if let Some(path) = discover::coercion_map(left, right) {
        return format!(
            "coerce the right operand from `{}` into `{}` (cost {}), then `{op}` there",
            right.name(),
            left.name(),
            path.cost()
        );
    }
    if let Some(path) = discover::coercion_map(right, left) {
        return format!(
            "coerce the left operand from `{}` into `{}` (cost {}), then `{op}` there",
            left.name(),
            right.name(),
            path.cost()
        );
    }
    if matches!(op, BinOp::Mul | BinOp::Div) {
        if let Ok(Some(action)) = discover::action(left, right, op, ActSide::Left) {
            return format!(
                "apply the {} action of `{}` on `{}`",
                action.side(),
                action.actor_name(),
                action.operand_name()
            );
        }
        if let Ok(Some(action)) = discover::action(right, left, op, ActSide::Right) {
            return format!(
                "apply the {} action of `{}` on `{}`",
                action.side(),
                action.actor_name(),
                action.operand_name()
            );
        }
    }
    format!(
        "no strategy: `{op}` between `{}` and `{}` raises NoCommonStructure",
        left.name(),
        right.name()
    )
}
