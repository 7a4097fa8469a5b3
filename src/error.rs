// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error taxonomy for boolean evaluation

use crate::geometry::BooleanOp;
use thiserror::Error;

/// Which operand of a boolean call an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    A,
    B,
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::A => write!(f, "A"),
            Operand::B => write!(f, "B"),
        }
    }
}

/// Failures reported by the engine. No partial mesh is ever returned alongside one.
#[derive(Debug, Error)]
pub enum CsgError {
    /// Input mesh is open, has zero-area polygons, or intersects itself
    #[error("ill-defined input mesh {operand}: {reason}")]
    IllDefinedInput { operand: Operand, reason: String },

    /// A computation could not be resolved within tolerance after retries
    #[error("numeric degeneracy during {stage}: {detail}")]
    NumericDegeneracy { stage: &'static str, detail: String },

    /// The operation is valid but selects no geometry
    #[error("{op:?} produced an empty result")]
    DegenerateResult { op: BooleanOp },
}

impl CsgError {
    pub fn ill_defined(operand: Operand, reason: impl Into<String>) -> Self {
        CsgError::IllDefinedInput {
            operand,
            reason: reason.into(),
        }
    }

    pub fn numeric(stage: &'static str, detail: impl Into<String>) -> Self {
        CsgError::NumericDegeneracy {
            stage,
            detail: detail.into(),
        }
    }

    pub fn is_degenerate_result(&self) -> bool {
        matches!(self, CsgError::DegenerateResult { .. })
    }

    pub fn is_ill_defined(&self) -> bool {
        matches!(self, CsgError::IllDefinedInput { .. })
    }
}

pub type CsgResult<T> = Result<T, CsgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CsgError::ill_defined(Operand::B, "mesh is not closed");
        assert_eq!(err.to_string(), "ill-defined input mesh B: mesh is not closed");
        assert!(err.is_ill_defined());

        let err = CsgError::DegenerateResult {
            op: BooleanOp::Intersect,
        };
        assert!(err.is_degenerate_result());
        assert!(err.to_string().contains("Intersect"));
    }
}
