// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe CSG
//!
//! Boundary evaluation of boolean operations (union, subtract, intersect)
//! on closed triangle meshes. Operands are triangulated and validated, cut
//! along their mutual intersections, classified against each other by ray
//! parity, and the selected pieces are welded into a closed result.

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod io;
pub mod job;

pub use config::EngineConfig;
pub use engine::{evaluate, Engine, EvaluationReport};
pub use error::{CsgError, CsgResult, Operand};
pub use geometry::{BooleanOp, Mesh, Polygon, Primitive, Vertex};
pub use io::{export_json, export_stl, import_stl};
pub use job::{spawn_evaluation, EvaluationHandle};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_subtract() {
        let a = Primitive::cube(1.0).to_mesh();
        let b = Primitive::sphere(0.6, 16).to_mesh();
        let result = evaluate(&a, &b, BooleanOp::Subtract);
        assert!(result.is_ok());
    }
}
