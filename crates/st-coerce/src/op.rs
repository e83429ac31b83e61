// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Operator tokens shared by dispatch, discovery, and the action cache.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary arithmetic operators routed through dispatch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which side the acting structure sits on in an action.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ActSide {
    Left,
    Right,
}

impl fmt::Display for ActSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActSide::Left => f.write_str("left"),
            ActSide::Right => f.write_str("right"),
        }
    }
}

/// Token key for the action cache: one cached slot per operator and side.
pub(crate) type ActionKey = (BinOp, ActSide);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_render_for_error_messages() {
        assert_eq!(BinOp::Add.to_string(), "+");
        assert_eq!(BinOp::Div.to_string(), "/");
        assert_eq!(ActSide::Left.to_string(), "left");
    }

    #[test]
    fn action_keys_distinguish_operator_and_side() {
        let keys: Vec<ActionKey> = vec![
            (BinOp::Mul, ActSide::Left),
            (BinOp::Mul, ActSide::Right),
            (BinOp::Div, ActSide::Left),
        ];
        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                assert_eq!(a == b, i == j);
            }
        }
    }
}
