// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric mesh comparison
//!
//! Boolean results are compared by what they enclose, not by their
//! triangulation, so two evaluations of the same solid compare equal.

use crate::geometry::Mesh;
use serde::{Deserialize, Serialize};

/// Result of mesh comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshComparison {
    pub volume_a: f64,
    pub volume_b: f64,
    pub area_a: f64,
    pub area_b: f64,
    pub volume_match: bool,
    pub area_match: bool,
    pub bbox_match: bool,
    /// Relative tolerance used for volume and area, absolute for the bbox
    pub tolerance: f64,
    pub passed: bool,
}

impl MeshComparison {
    /// Relative difference of the volumes
    pub fn volume_error(&self) -> f64 {
        relative_error(self.volume_a, self.volume_b)
    }
}

/// Compare two meshes for geometric equivalence
pub fn compare_meshes(mesh_a: &Mesh, mesh_b: &Mesh, tolerance: f64) -> MeshComparison {
    let volume_a = mesh_a.volume();
    let volume_b = mesh_b.volume();
    let area_a = mesh_a.surface_area();
    let area_b = mesh_b.surface_area();

    let volume_match = relative_error(volume_a, volume_b) <= tolerance;
    let area_match = relative_error(area_a, area_b) <= tolerance;
    let bbox_match = mesh_a
        .bounding_box()
        .approx_eq(&mesh_b.bounding_box(), tolerance);

    MeshComparison {
        volume_a,
        volume_b,
        area_a,
        area_b,
        volume_match,
        area_match,
        bbox_match,
        tolerance,
        passed: volume_match && area_match && bbox_match,
    }
}

fn relative_error(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    #[test]
    fn test_same_solid_different_triangulation() {
        let quads = Primitive::cube(1.0).to_mesh();
        let triangles = quads.triangulate();
        assert!(compare_meshes(&quads, &triangles, 1e-12).passed);
    }

    #[test]
    fn test_different_solids() {
        let a = Primitive::cube(1.0).to_mesh();
        let b = Primitive::cube(1.1).to_mesh();
        let cmp = compare_meshes(&a, &b, 1e-6);
        assert!(!cmp.passed);
        assert!(!cmp.volume_match);

        let moved = a.translated(Vector3::new(0.5, 0.0, 0.0));
        let cmp = compare_meshes(&a, &moved, 1e-6);
        assert!(cmp.volume_match && !cmp.bbox_match);
    }
}
