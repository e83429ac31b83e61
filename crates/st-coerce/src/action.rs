// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Cross-structure operator rules.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::element::Element;
use crate::error::Result;
use crate::morphism::Morphism;
use crate::op::{ActSide, BinOp};
use crate::parent::{Parent, ParentRef};

/// The rule body of an action. Blanket-implemented for closures.
///
/// Rules that need a structure handle should take it from one of the two
/// values' parents or hold a `Weak`; capturing a strong handle would keep
/// that structure alive for as long as the action stays cached.
pub trait ActionFn: Send + Sync + 'static {
    fn apply(&self, actor: &Element, operand: &Element) -> Result<Element>;
}

impl<F> ActionFn for F
where
    F: Fn(&Element, &Element) -> Result<Element> + Send + Sync + 'static,
{
    fn apply(&self, actor: &Element, operand: &Element) -> Result<Element> {
        (self)(actor, operand)
    }
}

/// A declared or discovered rule "`actor` may `op`-multiply values of
/// `operand` from `side`". Immutable once built; endpoints are weak so a
/// cached action never keeps a structure alive.
pub struct Action {
    actor: Weak<Parent>,
    operand: Weak<Parent>,
    actor_ident: usize,
    operand_ident: usize,
    actor_name: String,
    operand_name: String,
    op: BinOp,
    side: ActSide,
    /// Precomposition applied to the operand before the rule body runs;
    /// present on actions derived through an intermediate coercion.
    via: Option<Arc<Morphism>>,
    rule: Arc<dyn ActionFn>,
}

impl Action {
    pub fn new(
        actor: &ParentRef,
        operand: &ParentRef,
        op: BinOp,
        side: ActSide,
        rule: impl ActionFn,
    ) -> Self {
        Action {
            actor: Arc::downgrade(actor),
            operand: Arc::downgrade(operand),
            actor_ident: Parent::ident_of(actor),
            operand_ident: Parent::ident_of(operand),
            actor_name: actor.name().to_string(),
            operand_name: operand.name().to_string(),
            op,
            side,
            via: None,
            rule: Arc::new(rule),
        }
    }

    /// Rebinds a declared action to a new operand structure reached through
    /// `via` (a coercion from `operand` into the declared operand).
    pub(crate) fn derived(
        base: &Arc<Action>,
        operand: &ParentRef,
        via: Arc<Morphism>,
    ) -> Arc<Action> {
        let chained = match &base.via {
            Some(existing) => Morphism::compose(&via, existing),
            None => via,
        };
        Arc::new(Action {
            actor: base.actor.clone(),
            operand: Arc::downgrade(operand),
            actor_ident: base.actor_ident,
            operand_ident: Parent::ident_of(operand),
            actor_name: base.actor_name.clone(),
            operand_name: operand.name().to_string(),
            op: base.op,
            side: base.side,
            via: Some(chained),
            rule: Arc::clone(&base.rule),
        })
    }

    pub fn op(&self) -> BinOp {
        self.op
    }

    pub fn side(&self) -> ActSide {
        self.side
    }

    pub fn actor(&self) -> Option<ParentRef> {
        self.actor.upgrade()
    }

    pub fn operand(&self) -> Option<ParentRef> {
        self.operand.upgrade()
    }

    pub fn actor_ident(&self) -> usize {
        self.actor_ident
    }

    pub fn operand_ident(&self) -> usize {
        self.operand_ident
    }

    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    pub fn operand_name(&self) -> &str {
        &self.operand_name
    }

    /// Applies the action: `actor_value` must belong to the actor
    /// structure, `operand_value` to the operand structure.
    pub fn apply(&self, actor_value: &Element, operand_value: &Element) -> Result<Element> {
        match &self.via {
            Some(via) => {
                let mapped = via.apply(operand_value)?;
                self.rule.apply(actor_value, &mapped)
            }
            None => self.rule.apply(actor_value, operand_value),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action({} {} {} from {})",
            self.actor_name, self.op, self.operand_name, self.side
        )
    }
}
