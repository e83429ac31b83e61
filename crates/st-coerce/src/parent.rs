// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Structure descriptors and their registration surface.
//!
//! A [`Parent`] describes one algebraic structure. The descriptor itself is
//! inert; all structure-specific behavior comes in through a single
//! [`StructureOps`] implementation supplied by the owning mathematics
//! library. Registration lists are append-only after construction in the
//! common case; every read path takes a snapshot, so the discovery engine
//! may append while another call is iterating.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::action::Action;
use crate::element::{Element, Payload};
use crate::error::{CoerceError, Result};
use crate::morphism::Morphism;
use crate::op::{ActSide, BinOp};
use crate::registry;

/// Shared handle to a structure descriptor. Identity of the handle *is*
/// identity of the structure.
pub type ParentRef = Arc<Parent>;

/// Extension-point interface implemented by the owning mathematics library.
///
/// Only same-structure arithmetic, a representative sample, and the
/// additive identity are mandatory; everything else defaults to "this
/// structure does not participate".
pub trait StructureOps: Send + Sync + 'static {
    /// Same-structure binary arithmetic. Both operands are guaranteed to
    /// belong to `parent` when called through dispatch.
    fn arith(&self, parent: &ParentRef, op: BinOp, a: &Element, b: &Element) -> Result<Element>;

    /// Representative value, used only for action probing.
    fn sample(&self, parent: &ParentRef) -> Element;

    /// Additive identity.
    fn zero(&self, parent: &ParentRef) -> Element;

    /// Multiplicative identity, when the structure has one.
    fn one(&self, _parent: &ParentRef) -> Option<Element> {
        None
    }

    /// Builds an element of `parent` from a foreign payload. Backs the
    /// constructor-based default conversion morphism.
    fn make(&self, parent: &ParentRef, input: &dyn Payload) -> Result<Element> {
        Err(CoerceError::Unconstructible {
            parent: parent.name().to_string(),
            input: format!("{input:?}"),
        })
    }

    /// Structure-specific coercion rule, consulted before the generic
    /// search. A returned morphism must map `from` into `parent`.
    fn coerce_rule(&self, _parent: &ParentRef, _from: &ParentRef) -> Option<Arc<Morphism>> {
        None
    }

    /// Per-value multiplication hook used by action probing. `own` belongs
    /// to this structure and sits on `side`. `Ok(None)` declines; errors
    /// propagate so a nested probe cycle can surface.
    fn probe_mul(
        &self,
        _own: &Element,
        _foreign: &Element,
        _side: ActSide,
    ) -> Result<Option<Element>> {
        Ok(None)
    }

    /// Rebuilds this structure over a base large enough to also hold
    /// `other`, for the additive scalar-extension fallback.
    fn extend_base(&self, _parent: &ParentRef, _other: &ParentRef) -> Option<ParentRef> {
        None
    }

    /// Same-structure comparison.
    fn cmp(&self, _a: &Element, _b: &Element) -> Option<Ordering> {
        None
    }

    /// Machine-integer view of a value, when the structure is integer-like.
    /// Enables the repeated-doubling multiplication fallback.
    fn as_int(&self, _value: &Element) -> Option<i64> {
        None
    }
}

/// A registered source of canonical coercions or explicit conversions.
#[derive(Clone)]
pub(crate) struct RegisteredSource {
    /// Held strongly on purpose: registration expresses a construction-time
    /// dependency, unlike discovered paths which are weak.
    pub domain: ParentRef,
    pub via: Arc<Morphism>,
}

/// What a registration call accepts: a bare structure (coerce through the
/// target's constructor) or an explicit morphism.
pub enum CoerceSource {
    Structure(ParentRef),
    Morphism(Arc<Morphism>),
}

impl From<&ParentRef> for CoerceSource {
    fn from(parent: &ParentRef) -> Self {
        CoerceSource::Structure(Arc::clone(parent))
    }
}

impl From<Arc<Morphism>> for CoerceSource {
    fn from(morphism: Arc<Morphism>) -> Self {
        CoerceSource::Morphism(morphism)
    }
}

/// A structure descriptor.
pub struct Parent {
    name: String,
    base: Option<ParentRef>,
    ops: Arc<dyn StructureOps>,
    coerce_from: RwLock<Vec<RegisteredSource>>,
    convert_from: RwLock<Vec<RegisteredSource>>,
    actions: RwLock<Vec<Arc<Action>>>,
    embedding: RwLock<Option<Arc<Morphism>>>,
}

impl Parent {
    pub fn new(name: impl Into<String>, ops: Arc<dyn StructureOps>) -> ParentRef {
        Self::build(name.into(), None, ops)
    }

    pub fn with_base(
        name: impl Into<String>,
        base: &ParentRef,
        ops: Arc<dyn StructureOps>,
    ) -> ParentRef {
        Self::build(name.into(), Some(Arc::clone(base)), ops)
    }

    fn build(name: String, base: Option<ParentRef>, ops: Arc<dyn StructureOps>) -> ParentRef {
        let parent = Arc::new(Parent {
            name,
            base,
            ops,
            coerce_from: RwLock::new(Vec::new()),
            convert_from: RwLock::new(Vec::new()),
            actions: RwLock::new(Vec::new()),
            embedding: RwLock::new(None),
        });
        registry::enroll(&parent);
        parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&ParentRef> {
        self.base.as_ref()
    }

    pub fn ops(&self) -> &Arc<dyn StructureOps> {
        &self.ops
    }

    /// Identity of a descriptor: the address of its allocation.
    pub fn ident_of(parent: &ParentRef) -> usize {
        st_weakdict::arc_ident(parent)
    }

    /// Identity comparison, the default notion of "same structure".
    pub fn same(a: &ParentRef, b: &ParentRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Registers a canonical coercion into `target`.
    ///
    /// The registered map must be composition-safe: if `source` itself
    /// coerces from some `T`, coercing `T` through `source` and coercing
    /// `T` directly must agree, or algebra built on top becomes unsound.
    pub fn register_coercion(target: &ParentRef, source: impl Into<CoerceSource>) -> Result<()> {
        let entry = Self::resolve_source(target, source.into(), "coercion")?;
        target.coerce_from.write().unwrap().push(entry);
        Ok(())
    }

    /// Registers an explicit, not-necessarily-canonical conversion.
    pub fn register_conversion(target: &ParentRef, source: impl Into<CoerceSource>) -> Result<()> {
        let entry = Self::resolve_source(target, source.into(), "conversion")?;
        target.convert_from.write().unwrap().push(entry);
        Ok(())
    }

    /// Declares an action whose actor is `target`.
    pub fn register_action(target: &ParentRef, action: Action) -> Result<Arc<Action>> {
        if action.actor_ident() != Self::ident_of(target) {
            return Err(CoerceError::MalformedRegistration(format!(
                "action actor `{}` is not `{}`",
                action.actor_name(),
                target.name()
            )));
        }
        let action = Arc::new(action);
        target.actions.write().unwrap().push(Arc::clone(&action));
        Ok(action)
    }

    /// Sets the embedding of `source` into a larger structure. At most one
    /// embedding may be set over a descriptor's lifetime.
    pub fn set_embedding(source: &ParentRef, morphism: Arc<Morphism>) -> Result<()> {
        if morphism.domain_ident() != Self::ident_of(source) {
            return Err(CoerceError::MalformedRegistration(format!(
                "embedding domain `{}` is not `{}`",
                morphism.domain_name(),
                source.name()
            )));
        }
        if morphism.codomain_ident() == Self::ident_of(source) {
            return Err(CoerceError::MalformedRegistration(format!(
                "embedding of `{}` into itself",
                source.name()
            )));
        }
        let mut slot = source.embedding.write().unwrap();
        if slot.is_some() {
            return Err(CoerceError::MalformedRegistration(format!(
                "embedding of `{}` is already set",
                source.name()
            )));
        }
        *slot = Some(morphism);
        Ok(())
    }

    pub fn embedding(&self) -> Option<Arc<Morphism>> {
        self.embedding.read().unwrap().clone()
    }

    /// Snapshot of the registered coercion sources. Cloning keeps iteration
    /// elsewhere safe against concurrent appends.
    pub(crate) fn coerce_sources(&self) -> Vec<RegisteredSource> {
        self.coerce_from.read().unwrap().clone()
    }

    pub(crate) fn convert_sources(&self) -> Vec<RegisteredSource> {
        self.convert_from.read().unwrap().clone()
    }

    pub(crate) fn declared_actions(&self) -> Vec<Arc<Action>> {
        self.actions.read().unwrap().clone()
    }

    /// Names of registered coercion sources, for diagnostics export.
    pub fn coercion_source_names(&self) -> Vec<String> {
        self.coerce_from
            .read()
            .unwrap()
            .iter()
            .map(|s| s.domain.name().to_string())
            .collect()
    }

    fn resolve_source(
        target: &ParentRef,
        source: CoerceSource,
        what: &str,
    ) -> Result<RegisteredSource> {
        match source {
            CoerceSource::Structure(domain) => {
                if Self::same(&domain, target) {
                    return Err(CoerceError::MalformedRegistration(format!(
                        "{what} from `{}` into itself",
                        target.name()
                    )));
                }
                let via = Morphism::construct(&domain, target);
                Ok(RegisteredSource { domain, via })
            }
            CoerceSource::Morphism(via) => {
                if via.codomain_ident() != Self::ident_of(target) {
                    return Err(CoerceError::MalformedRegistration(format!(
                        "{what} morphism into `{}` registered on `{}`",
                        via.codomain_name(),
                        target.name()
                    )));
                }
                let domain = via.domain().ok_or_else(|| {
                    CoerceError::MalformedRegistration(format!(
                        "{what} morphism with dropped domain `{}`",
                        via.domain_name()
                    ))
                })?;
                if Self::same(&domain, target) {
                    return Err(CoerceError::MalformedRegistration(format!(
                        "{what} from `{}` into itself",
                        target.name()
                    )));
                }
                Ok(RegisteredSource { domain, via })
            }
        }
    }
}

impl fmt::Debug for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parent")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name()))
            .finish()
    }
}
