//! Piece data model
//!
//! A piece is either a number ball (value + merge tier) or an operator ball
//! (×2 / ÷2) that transforms whatever number it touches.

use serde::{Deserialize, Serialize};

use super::value::{TierStyle, radius_for, style_for_tier};
use crate::consts::*;

/// Operator ball kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    Multiply,
    Divide,
}

impl OperatorKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            OperatorKind::Multiply => "×",
            OperatorKind::Divide => "÷",
        }
    }

    /// Apply the operator and clamp into `[-VALUE_CAP, VALUE_CAP]`
    ///
    /// Division truncates toward zero (`-7 ÷ 2 = -3`). `operand` is the
    /// fixed nonzero `OPERATOR_OPERAND`.
    pub fn apply(&self, value: i32, operand: i32) -> i32 {
        let raw = match self {
            OperatorKind::Multiply => value.saturating_mul(operand),
            OperatorKind::Divide => value / operand,
        };
        clamp_value(raw)
    }
}

/// Clamp a value into the symmetric cap
#[inline]
pub fn clamp_value(value: i32) -> i32 {
    value.clamp(-VALUE_CAP, VALUE_CAP)
}

/// Merge tier of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// Operator balls: merge with a number of any tier
    Wildcard,
    /// Number balls: count of merges in the lineage
    Rank(u32),
}

/// What a piece carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    Number { value: i32, tier: u32 },
    Operator { op: OperatorKind, operand: i32 },
}

impl PieceKind {
    pub fn tier(&self) -> Tier {
        match *self {
            PieceKind::Number { tier, .. } => Tier::Rank(tier),
            PieceKind::Operator { .. } => Tier::Wildcard,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, PieceKind::Operator { .. })
    }

    /// Text painted on the ball ("+3", "-7", "×2")
    pub fn label(&self) -> String {
        match *self {
            PieceKind::Number { value, .. } => signed(value),
            PieceKind::Operator { op, operand } => format!("{}{}", op.symbol(), operand),
        }
    }

    /// Tier style for number balls; operators are drawn as a rainbow instead
    pub fn style(&self) -> Option<TierStyle> {
        match *self {
            PieceKind::Number { tier, .. } => Some(style_for_tier(tier)),
            PieceKind::Operator { .. } => None,
        }
    }
}

/// Format a value with an explicit sign for positives
pub fn signed(value: i32) -> String {
    if value > 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

/// A not-yet-dropped piece (preview queue entry)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceDescriptor {
    pub kind: PieceKind,
    pub radius: f32,
}

impl PieceDescriptor {
    /// Number ball descriptor; value is clamped into the cap
    pub fn number(value: i32, tier: u32) -> Self {
        let value = clamp_value(value);
        Self {
            kind: PieceKind::Number { value, tier },
            radius: radius_for(value.unsigned_abs()),
        }
    }

    /// Operator ball descriptor (fixed operand, fixed medium size)
    pub fn operator(op: OperatorKind) -> Self {
        Self {
            kind: PieceKind::Operator {
                op,
                operand: OPERATOR_OPERAND,
            },
            radius: OPERATOR_RADIUS,
        }
    }
}

/// A live piece in the play field (game data attached to a physics body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub radius: f32,
    /// A merge involving this piece has been committed; removal pending
    pub merging: bool,
    /// Just dropped; may not merge until the grace period ends
    pub fresh: bool,
}

impl Piece {
    pub fn from_descriptor(desc: &PieceDescriptor, fresh: bool) -> Self {
        Self {
            kind: desc.kind,
            radius: desc.radius,
            merging: false,
            fresh,
        }
    }

    /// Whether this piece may take part in a new merge resolution
    pub fn can_merge(&self) -> bool {
        !self.merging && !self.fresh
    }
}
