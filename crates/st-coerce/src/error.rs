// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

use crate::op::BinOp;

/// Errors surfaced by registration, discovery, and dispatch.
///
/// A discovery that simply finds no path is *not* an error; those come
/// back as `None` and are memoized as such. Only cycle detection and
/// malformed input are hard failures.
#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("no common structure for `{op}` between `{left}` and `{right}`")]
    NoCommonStructure {
        op: BinOp,
        left: String,
        right: String,
    },
    #[error("no common structure for `{left}` and `{right}`")]
    NoCommonParent { left: String, right: String },
    #[error("action probe re-entered for `{left}` and `{right}`")]
    ProbeCycle { left: String, right: String },
    #[error("malformed registration: {0}")]
    MalformedRegistration(String),
    #[error("structure `{0}` has already been dropped")]
    StructureGone(String),
    #[error("`{parent}` cannot build an element from {input}")]
    Unconstructible { parent: String, input: String },
    #[error("arithmetic failed in `{parent}`: {reason}")]
    Arithmetic { parent: String, reason: String },
    #[error("values of `{left}` and `{right}` cannot be compared")]
    Incomparable { left: String, right: String },
}

pub type Result<T> = std::result::Result<T, CoerceError>;

/// Shorthand for the arithmetic failure variant, used by structure
/// implementations.
pub fn arithmetic<S: Into<String>, R: Into<String>>(parent: S, reason: R) -> CoerceError {
    CoerceError::Arithmetic {
        parent: parent.into(),
        reason: reason.into(),
    }
}
