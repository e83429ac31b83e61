// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Directed, composable conversions between structures.
//!
//! Morphisms are immutable once constructed. Both endpoints are held
//! weakly so that a morphism sitting in a cache never keeps a structure
//! alive; the stored idents and names stay valid for lookup and
//! diagnostics even after an endpoint dies.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::element::Element;
use crate::error::{CoerceError, Result};
use crate::parent::{Parent, ParentRef};

/// Cost of a registered morphism when the caller does not say otherwise.
pub const DEFAULT_RULE_COST: u32 = 10;

/// Cost of the constructor-based default conversion. Deliberately above
/// anything registered so that explicit paths always win.
pub const CONSTRUCT_COST: u32 = 100;

/// User-supplied mapping logic. Blanket-implemented for closures.
///
/// The codomain is handed in at application time, resolved from the
/// morphism's weak endpoint. Rules should build their result in it and
/// must not capture strong structure handles of their own, or a cached
/// morphism would keep its endpoints alive.
pub trait MorphismFn: Send + Sync + 'static {
    fn apply(&self, codomain: &ParentRef, value: &Element) -> Result<Element>;
}

impl<F> MorphismFn for F
where
    F: Fn(&ParentRef, &Element) -> Result<Element> + Send + Sync + 'static,
{
    fn apply(&self, codomain: &ParentRef, value: &Element) -> Result<Element> {
        (self)(codomain, value)
    }
}

enum MorphKind {
    Identity,
    Rule(Arc<dyn MorphismFn>),
    /// Apply by handing the payload to the codomain's constructor.
    Construct,
    Composed {
        first: Arc<Morphism>,
        then: Arc<Morphism>,
    },
}

/// A directed map `domain → codomain` with a cost estimate used to prefer
/// cheaper composed paths.
pub struct Morphism {
    domain: Weak<Parent>,
    codomain: Weak<Parent>,
    domain_ident: usize,
    codomain_ident: usize,
    domain_name: String,
    codomain_name: String,
    cost: u32,
    kind: MorphKind,
}

impl Morphism {
    fn build(domain: &ParentRef, codomain: &ParentRef, cost: u32, kind: MorphKind) -> Arc<Self> {
        Arc::new(Morphism {
            domain: Arc::downgrade(domain),
            codomain: Arc::downgrade(codomain),
            domain_ident: Parent::ident_of(domain),
            codomain_ident: Parent::ident_of(codomain),
            domain_name: domain.name().to_string(),
            codomain_name: codomain.name().to_string(),
            cost,
            kind,
        })
    }

    /// The identity on `parent`. Cost zero; composes away.
    pub fn identity(parent: &ParentRef) -> Arc<Self> {
        Self::build(parent, parent, 0, MorphKind::Identity)
    }

    /// Wraps user mapping logic as a morphism.
    pub fn from_rule(
        domain: &ParentRef,
        codomain: &ParentRef,
        cost: u32,
        rule: impl MorphismFn,
    ) -> Arc<Self> {
        Self::build(domain, codomain, cost, MorphKind::Rule(Arc::new(rule)))
    }

    /// The constructor-based default: apply by rebuilding the payload in
    /// the codomain.
    pub(crate) fn construct(domain: &ParentRef, codomain: &ParentRef) -> Arc<Self> {
        Self::build(domain, codomain, CONSTRUCT_COST, MorphKind::Construct)
    }

    /// Composition `then ∘ first`: applies `first`, then `then`. Identity
    /// on either side collapses to the other morphism.
    pub fn compose(first: &Arc<Morphism>, then: &Arc<Morphism>) -> Arc<Morphism> {
        if matches!(first.kind, MorphKind::Identity) {
            return Arc::clone(then);
        }
        if matches!(then.kind, MorphKind::Identity) {
            return Arc::clone(first);
        }
        Arc::new(Morphism {
            domain: first.domain.clone(),
            codomain: then.codomain.clone(),
            domain_ident: first.domain_ident,
            codomain_ident: then.codomain_ident,
            domain_name: first.domain_name.clone(),
            codomain_name: then.codomain_name.clone(),
            cost: first.cost.saturating_add(then.cost),
            kind: MorphKind::Composed {
                first: Arc::clone(first),
                then: Arc::clone(then),
            },
        })
    }

    pub fn domain(&self) -> Option<ParentRef> {
        self.domain.upgrade()
    }

    pub fn codomain(&self) -> Option<ParentRef> {
        self.codomain.upgrade()
    }

    pub fn domain_ident(&self) -> usize {
        self.domain_ident
    }

    pub fn codomain_ident(&self) -> usize {
        self.codomain_ident
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn codomain_name(&self) -> &str {
        &self.codomain_name
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.kind, MorphKind::Identity)
    }

    /// Maps a value of the domain into the codomain.
    pub fn apply(&self, value: &Element) -> Result<Element> {
        match &self.kind {
            MorphKind::Identity => Ok(value.clone()),
            MorphKind::Rule(rule) => {
                let codomain = self.live_codomain()?;
                rule.apply(&codomain, value)
            }
            MorphKind::Construct => {
                let codomain = self.live_codomain()?;
                codomain.ops().make(&codomain, value.payload())
            }
            MorphKind::Composed { first, then } => then.apply(&first.apply(value)?),
        }
    }

    fn live_codomain(&self) -> Result<ParentRef> {
        self.codomain
            .upgrade()
            .ok_or_else(|| CoerceError::StructureGone(self.codomain_name.clone()))
    }
}

impl fmt::Debug for Morphism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            MorphKind::Identity => "identity",
            MorphKind::Rule(_) => "rule",
            MorphKind::Construct => "construct",
            MorphKind::Composed { .. } => "composed",
        };
        write!(
            f,
            "Morphism({} → {}, cost {}, {kind})",
            self.domain_name, self.codomain_name, self.cost
        )
    }
}
