// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Toy numeric structures for integration tests: machine integers, exact
//! rationals, and floats, with the canonical Z → Q → R tower.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Arc;

use st_coerce::{
    arithmetic, BinOp, CoerceError, Element, Morphism, Parent, ParentRef, Payload, Result,
    StructureOps, DEFAULT_RULE_COST,
};

/// Exact rational payload, always normalized with a positive denominator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rat {
    pub num: i64,
    pub den: i64,
}

impl Rat {
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "rational with zero denominator");
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i64;
        Rat {
            num: sign * num / g,
            den: sign * den / g,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

pub fn int_of(value: &Element) -> Result<i64> {
    value
        .downcast_ref::<i64>()
        .copied()
        .ok_or_else(|| arithmetic(value.parent().name(), "expected integer payload"))
}

pub fn rat_of(value: &Element) -> Result<Rat> {
    value
        .downcast_ref::<Rat>()
        .copied()
        .ok_or_else(|| arithmetic(value.parent().name(), "expected rational payload"))
}

pub fn real_of(value: &Element) -> Result<f64> {
    value
        .downcast_ref::<f64>()
        .copied()
        .ok_or_else(|| arithmetic(value.parent().name(), "expected float payload"))
}

pub struct IntOps;

impl StructureOps for IntOps {
    fn arith(&self, parent: &ParentRef, op: BinOp, a: &Element, b: &Element) -> Result<Element> {
        let (x, y) = (int_of(a)?, int_of(b)?);
        let value = match op {
            BinOp::Add => x + y,
            BinOp::Sub => x - y,
            BinOp::Mul => x * y,
            BinOp::Div => {
                if y == 0 || x % y != 0 {
                    return Err(arithmetic(parent.name(), "inexact integer division"));
                }
                x / y
            }
        };
        Ok(Element::new(parent, value))
    }

    fn sample(&self, parent: &ParentRef) -> Element {
        Element::new(parent, 2i64)
    }

    fn zero(&self, parent: &ParentRef) -> Element {
        Element::new(parent, 0i64)
    }

    fn one(&self, parent: &ParentRef) -> Option<Element> {
        Some(Element::new(parent, 1i64))
    }

    fn make(&self, parent: &ParentRef, input: &dyn Payload) -> Result<Element> {
        if let Some(n) = input.as_any().downcast_ref::<i64>() {
            return Ok(Element::new(parent, *n));
        }
        Err(CoerceError::Unconstructible {
            parent: parent.name().to_string(),
            input: format!("{input:?}"),
        })
    }

    fn cmp(&self, a: &Element, b: &Element) -> Option<Ordering> {
        Some(int_of(a).ok()?.cmp(&int_of(b).ok()?))
    }

    fn as_int(&self, value: &Element) -> Option<i64> {
        value.downcast_ref::<i64>().copied()
    }
}

pub struct RatOps;

impl StructureOps for RatOps {
    fn arith(&self, parent: &ParentRef, op: BinOp, a: &Element, b: &Element) -> Result<Element> {
        let (x, y) = (rat_of(a)?, rat_of(b)?);
        let value = match op {
            BinOp::Add => Rat::new(x.num * y.den + y.num * x.den, x.den * y.den),
            BinOp::Sub => Rat::new(x.num * y.den - y.num * x.den, x.den * y.den),
            BinOp::Mul => Rat::new(x.num * y.num, x.den * y.den),
            BinOp::Div => {
                if y.num == 0 {
                    return Err(arithmetic(parent.name(), "division by zero"));
                }
                Rat::new(x.num * y.den, x.den * y.num)
            }
        };
        Ok(Element::new(parent, value))
    }

    fn sample(&self, parent: &ParentRef) -> Element {
        Element::new(parent, Rat::new(1, 2))
    }

    fn zero(&self, parent: &ParentRef) -> Element {
        Element::new(parent, Rat::new(0, 1))
    }

    fn one(&self, parent: &ParentRef) -> Option<Element> {
        Some(Element::new(parent, Rat::new(1, 1)))
    }

    fn make(&self, parent: &ParentRef, input: &dyn Payload) -> Result<Element> {
        if let Some(r) = input.as_any().downcast_ref::<Rat>() {
            return Ok(Element::new(parent, *r));
        }
        if let Some(n) = input.as_any().downcast_ref::<i64>() {
            return Ok(Element::new(parent, Rat::new(*n, 1)));
        }
        Err(CoerceError::Unconstructible {
            parent: parent.name().to_string(),
            input: format!("{input:?}"),
        })
    }

    fn cmp(&self, a: &Element, b: &Element) -> Option<Ordering> {
        let (x, y) = (rat_of(a).ok()?, rat_of(b).ok()?);
        Some((x.num * y.den).cmp(&(y.num * x.den)))
    }
}

pub struct RealOps;

impl StructureOps for RealOps {
    fn arith(&self, parent: &ParentRef, op: BinOp, a: &Element, b: &Element) -> Result<Element> {
        let (x, y) = (real_of(a)?, real_of(b)?);
        let value = match op {
            BinOp::Add => x + y,
            BinOp::Sub => x - y,
            BinOp::Mul => x * y,
            BinOp::Div => {
                if y == 0.0 {
                    return Err(arithmetic(parent.name(), "division by zero"));
                }
                x / y
            }
        };
        Ok(Element::new(parent, value))
    }

    fn sample(&self, parent: &ParentRef) -> Element {
        Element::new(parent, 1.5f64)
    }

    fn zero(&self, parent: &ParentRef) -> Element {
        Element::new(parent, 0.0f64)
    }

    fn one(&self, parent: &ParentRef) -> Option<Element> {
        Some(Element::new(parent, 1.0f64))
    }

    fn make(&self, parent: &ParentRef, input: &dyn Payload) -> Result<Element> {
        if let Some(x) = input.as_any().downcast_ref::<f64>() {
            return Ok(Element::new(parent, *x));
        }
        if let Some(r) = input.as_any().downcast_ref::<Rat>() {
            return Ok(Element::new(parent, r.as_f64()));
        }
        if let Some(n) = input.as_any().downcast_ref::<i64>() {
            return Ok(Element::new(parent, *n as f64));
        }
        Err(CoerceError::Unconstructible {
            parent: parent.name().to_string(),
            input: format!("{input:?}"),
        })
    }

    fn cmp(&self, a: &Element, b: &Element) -> Option<Ordering> {
        real_of(a).ok()?.partial_cmp(&real_of(b).ok()?)
    }
}

/// Free monoid on strings: concatenation only, no hooks. Useful as a
/// structure that relates to nothing.
pub struct WordFree;

impl StructureOps for WordFree {
    fn arith(&self, parent: &ParentRef, op: BinOp, a: &Element, b: &Element) -> Result<Element> {
        let (x, y) = (
            a.downcast_ref::<String>().cloned(),
            b.downcast_ref::<String>().cloned(),
        );
        match (op, x, y) {
            (BinOp::Add, Some(x), Some(y)) => Ok(Element::new(parent, format!("{x}{y}"))),
            _ => Err(arithmetic(parent.name(), "free words only concatenate")),
        }
    }

    fn sample(&self, parent: &ParentRef) -> Element {
        Element::new(parent, "w".to_string())
    }

    fn zero(&self, parent: &ParentRef) -> Element {
        Element::new(parent, String::new())
    }
}

pub fn integers() -> ParentRef {
    Parent::new("Z", Arc::new(IntOps))
}

pub fn rationals() -> ParentRef {
    Parent::new("Q", Arc::new(RatOps))
}

pub fn reals() -> ParentRef {
    Parent::new("R", Arc::new(RealOps))
}

/// The morphism Z → Q. Builds in the codomain handed to the rule, so no
/// structure handle is captured.
pub fn int_to_rat(z: &ParentRef, q: &ParentRef) -> Arc<Morphism> {
    Morphism::from_rule(z, q, DEFAULT_RULE_COST, |codomain: &ParentRef, value: &Element| {
        let n = int_of(value)?;
        Ok(Element::new(codomain, Rat::new(n, 1)))
    })
}

/// The morphism Q → R.
pub fn rat_to_real(q: &ParentRef, r: &ParentRef) -> Arc<Morphism> {
    Morphism::from_rule(q, r, DEFAULT_RULE_COST, |codomain: &ParentRef, value: &Element| {
        let x = rat_of(value)?;
        Ok(Element::new(codomain, x.as_f64()))
    })
}

/// Fresh Z → Q → R tower with both coercions registered.
pub fn tower() -> (ParentRef, ParentRef, ParentRef) {
    let z = integers();
    let q = rationals();
    let r = reals();
    Parent::register_coercion(&q, int_to_rat(&z, &q)).expect("register Z into Q");
    Parent::register_coercion(&r, rat_to_real(&q, &r)).expect("register Q into R");
    (z, q, r)
}
