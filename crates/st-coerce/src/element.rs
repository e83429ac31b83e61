// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Values and their opaque payloads.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::dispatch;
use crate::error::Result;
use crate::parent::{Parent, ParentRef};

/// Opaque payload carried by an [`Element`]. The engine never inspects
/// payloads; structure implementations downcast them back out.
pub trait Payload: Send + Sync + fmt::Debug + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Send + Sync + fmt::Debug + 'static> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value belonging to exactly one structure.
///
/// The parent back-reference is a strong `Arc`; the weak-lifetime behavior
/// the caches rely on lives in the cached morphisms and actions, which hold
/// their endpoints weakly. Cloning an element is cheap: payloads are
/// shared, never copied.
#[derive(Clone)]
pub struct Element {
    parent: ParentRef,
    payload: Arc<dyn Payload>,
}

impl Element {
    pub fn new<P: Payload>(parent: &ParentRef, payload: P) -> Self {
        Element {
            parent: Arc::clone(parent),
            payload: Arc::new(payload),
        }
    }

    pub fn from_shared(parent: &ParentRef, payload: Arc<dyn Payload>) -> Self {
        Element {
            parent: Arc::clone(parent),
            payload,
        }
    }

    pub fn parent(&self) -> &ParentRef {
        &self.parent
    }

    /// Identity of the owning structure.
    pub fn parent_ident(&self) -> usize {
        Parent::ident_of(&self.parent)
    }

    pub fn payload(&self) -> &dyn Payload {
        self.payload.as_ref()
    }

    pub fn payload_shared(&self) -> Arc<dyn Payload> {
        Arc::clone(&self.payload)
    }

    /// Typed view of the payload.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ∈ {}", self.payload, self.parent.name())
    }
}

impl std::ops::Add<&Element> for &Element {
    type Output = Result<Element>;

    fn add(self, rhs: &Element) -> Result<Element> {
        dispatch::add(self, rhs)
    }
}

impl std::ops::Sub<&Element> for &Element {
    type Output = Result<Element>;

    fn sub(self, rhs: &Element) -> Result<Element> {
        dispatch::sub(self, rhs)
    }
}

impl std::ops::Mul<&Element> for &Element {
    type Output = Result<Element>;

    fn mul(self, rhs: &Element) -> Result<Element> {
        dispatch::mul(self, rhs)
    }
}

impl std::ops::Div<&Element> for &Element {
    type Output = Result<Element>;

    fn div(self, rhs: &Element) -> Result<Element> {
        dispatch::div(self, rhs)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        dispatch::eq(self, other)
    }
}
