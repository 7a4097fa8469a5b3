// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operators and the piece selection table

use super::classification::Classification;
use super::triangle_splitting::Piece;
use super::Vertex;
use crate::error::Operand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    Union,
    /// A minus B
    Subtract,
    Intersect,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtract => "subtract",
            BooleanOp::Intersect => "intersect",
        };
        f.write_str(name)
    }
}

impl FromStr for BooleanOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "union" | "add" => Ok(BooleanOp::Union),
            "subtract" | "difference" | "minus" => Ok(BooleanOp::Subtract),
            "intersect" | "intersection" => Ok(BooleanOp::Intersect),
            other => Err(format!("unknown boolean operation '{}'", other)),
        }
    }
}

/// What happens to a classified piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Keep,
    /// Keep with reversed winding and negated normals
    KeepFlipped,
    Drop,
}

/// Selection table. Coplanar faces are kept at most once, from A.
pub fn select(op: BooleanOp, operand: Operand, class: Classification) -> Selection {
    use Classification::*;
    use Selection::*;

    match (op, operand, class) {
        (BooleanOp::Union, _, Outside) => Keep,
        (BooleanOp::Union, Operand::A, CoplanarSame) => Keep,
        (BooleanOp::Union, _, _) => Drop,

        (BooleanOp::Intersect, _, Inside) => Keep,
        (BooleanOp::Intersect, Operand::A, CoplanarSame) => Keep,
        (BooleanOp::Intersect, _, _) => Drop,

        (BooleanOp::Subtract, Operand::A, Outside) => Keep,
        (BooleanOp::Subtract, Operand::A, CoplanarOpposite) => Keep,
        (BooleanOp::Subtract, Operand::B, Inside) => KeepFlipped,
        (BooleanOp::Subtract, _, _) => Drop,
    }
}

/// Triangle chosen for the output, in final orientation
#[derive(Debug, Clone)]
pub struct SelectedTriangle {
    pub vertices: [Vertex; 3],
    pub tag: u32,
}

/// Apply the table to classified pieces, appending to `out` in piece order
pub fn collect_selected(
    op: BooleanOp,
    operand: Operand,
    pieces: &[Piece],
    classes: &[Classification],
    out: &mut Vec<SelectedTriangle>,
) {
    for (piece, &class) in pieces.iter().zip(classes) {
        match select(op, operand, class) {
            Selection::Keep => out.extend(piece.triangles.iter().map(|t| SelectedTriangle {
                vertices: *t,
                tag: piece.tag,
            })),
            Selection::KeepFlipped => out.extend(piece.triangles.iter().map(|[a, b, c]| SelectedTriangle {
                vertices: [c.flipped(), b.flipped(), a.flipped()],
                tag: piece.tag,
            })),
            Selection::Drop => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Classification::*;

    #[test]
    fn test_union_table() {
        assert_eq!(select(BooleanOp::Union, Operand::A, Outside), Selection::Keep);
        assert_eq!(select(BooleanOp::Union, Operand::B, Outside), Selection::Keep);
        assert_eq!(select(BooleanOp::Union, Operand::A, Inside), Selection::Drop);
        assert_eq!(select(BooleanOp::Union, Operand::A, CoplanarSame), Selection::Keep);
        assert_eq!(select(BooleanOp::Union, Operand::B, CoplanarSame), Selection::Drop);
        assert_eq!(select(BooleanOp::Union, Operand::A, CoplanarOpposite), Selection::Drop);
        assert_eq!(select(BooleanOp::Union, Operand::B, CoplanarOpposite), Selection::Drop);
    }

    #[test]
    fn test_intersect_table() {
        assert_eq!(select(BooleanOp::Intersect, Operand::A, Inside), Selection::Keep);
        assert_eq!(select(BooleanOp::Intersect, Operand::B, Inside), Selection::Keep);
        assert_eq!(select(BooleanOp::Intersect, Operand::B, Outside), Selection::Drop);
        assert_eq!(select(BooleanOp::Intersect, Operand::A, CoplanarSame), Selection::Keep);
        assert_eq!(select(BooleanOp::Intersect, Operand::B, CoplanarSame), Selection::Drop);
        assert_eq!(select(BooleanOp::Intersect, Operand::A, CoplanarOpposite), Selection::Drop);
    }

    #[test]
    fn test_subtract_table() {
        assert_eq!(select(BooleanOp::Subtract, Operand::A, Outside), Selection::Keep);
        assert_eq!(select(BooleanOp::Subtract, Operand::A, Inside), Selection::Drop);
        assert_eq!(select(BooleanOp::Subtract, Operand::B, Inside), Selection::KeepFlipped);
        assert_eq!(select(BooleanOp::Subtract, Operand::B, Outside), Selection::Drop);
        assert_eq!(select(BooleanOp::Subtract, Operand::A, CoplanarSame), Selection::Drop);
        assert_eq!(select(BooleanOp::Subtract, Operand::B, CoplanarSame), Selection::Drop);
        assert_eq!(select(BooleanOp::Subtract, Operand::A, CoplanarOpposite), Selection::Keep);
        assert_eq!(select(BooleanOp::Subtract, Operand::B, CoplanarOpposite), Selection::Drop);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Union".parse::<BooleanOp>().unwrap(), BooleanOp::Union);
        assert_eq!("difference".parse::<BooleanOp>().unwrap(), BooleanOp::Subtract);
        assert_eq!("intersect".parse::<BooleanOp>().unwrap(), BooleanOp::Intersect);
        assert!("xor".parse::<BooleanOp>().is_err());
        assert_eq!(BooleanOp::Subtract.to_string(), "subtract");
    }
}
