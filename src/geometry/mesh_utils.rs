// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh validation and welding utilities

use super::Mesh;
use ahash::AHashMap;
use nalgebra::Point3;

/// Merges positions closer than a tolerance into shared representatives.
///
/// Positions are bucketed on a grid whose cell size equals the tolerance, so
/// a lookup only has to scan the 27 cells around the query.
pub struct PositionWelder {
    tolerance: f64,
    cells: AHashMap<[i64; 3], Vec<usize>>,
    representatives: Vec<Point3<f64>>,
}

impl PositionWelder {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(f64::MIN_POSITIVE),
            cells: AHashMap::new(),
            representatives: Vec::new(),
        }
    }

    fn cell_of(&self, p: &Point3<f64>) -> [i64; 3] {
        [
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        ]
    }

    /// Existing representative within tolerance of `p`
    pub fn find(&self, p: &Point3<f64>) -> Option<usize> {
        let [cx, cy, cz] = self.cell_of(p);
        let mut best: Option<(usize, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [cx.saturating_add(dx), cy.saturating_add(dy), cz.saturating_add(dz)];
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    for &id in bucket {
                        let d = (self.representatives[id] - p).norm();
                        // Lowest id wins ties so results do not depend on hash order
                        let better = match best {
                            None => true,
                            Some((best_id, best_d)) => d < best_d || (d == best_d && id < best_id),
                        };
                        if d <= self.tolerance && better {
                            best = Some((id, d));
                        }
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Id of the representative for `p`, creating one if needed
    pub fn insert(&mut self, p: &Point3<f64>) -> usize {
        if let Some(id) = self.find(p) {
            return id;
        }
        let id = self.representatives.len();
        self.representatives.push(*p);
        let key = self.cell_of(p);
        self.cells.entry(key).or_default().push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    pub fn into_positions(self) -> Vec<Point3<f64>> {
        self.representatives
    }
}

/// Welded position id for every vertex of the mesh
pub fn weld_mesh_positions(mesh: &Mesh, tolerance: f64) -> (Vec<usize>, PositionWelder) {
    let mut welder = PositionWelder::new(tolerance);
    let ids = mesh
        .vertices
        .iter()
        .map(|v| welder.insert(&v.position))
        .collect();
    (ids, welder)
}

/// Directed edge counts over welded positions
fn directed_edge_counts(mesh: &Mesh, ids: &[usize]) -> AHashMap<(usize, usize), u32> {
    let mut counts: AHashMap<(usize, usize), u32> = AHashMap::new();
    for polygon in &mesh.polygons {
        let n = polygon.indices.len();
        for k in 0..n {
            let a = ids[polygon.indices[k]];
            let b = ids[polygon.indices[(k + 1) % n]];
            // Collapsed edges carry no topology
            if a != b {
                *counts.entry((a, b)).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Mesh validation report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshValidation {
    pub is_manifold: bool,
    pub is_closed: bool,
    pub edge_count: usize,
    pub boundary_edge_count: usize,
}

/// Validate topology after welding positions within `tolerance`.
///
/// An undirected edge is a boundary when its two directions are used a
/// different number of times. It is non-manifold when used by more than two
/// polygons.
pub fn validate_mesh(mesh: &Mesh, tolerance: f64) -> MeshValidation {
    let (ids, _) = weld_mesh_positions(mesh, tolerance);
    let counts = directed_edge_counts(mesh, &ids);

    let mut edge_count = 0;
    let mut boundary_edge_count = 0;
    let mut is_manifold = true;
    for (&(a, b), &forward) in &counts {
        let backward = counts.get(&(b, a)).copied().unwrap_or(0);
        // Visit each undirected edge once
        if backward > 0 && b < a {
            continue;
        }
        edge_count += 1;
        if forward != backward {
            boundary_edge_count += 1;
        }
        if forward + backward > 2 {
            is_manifold = false;
        }
    }

    MeshValidation {
        is_manifold,
        is_closed: boundary_edge_count == 0 && !mesh.polygons.is_empty(),
        edge_count,
        boundary_edge_count,
    }
}

/// Check if every edge is matched by an oppositely directed edge
pub fn is_closed(mesh: &Mesh, tolerance: f64) -> bool {
    validate_mesh(mesh, tolerance).is_closed
}

/// Check if mesh is manifold (each edge shared by at most 2 polygons)
pub fn is_manifold(mesh: &Mesh, tolerance: f64) -> bool {
    validate_mesh(mesh, tolerance).is_manifold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Polygon, Primitive};
    use nalgebra::Vector3;

    #[test]
    fn test_welder_merges_close_points() {
        let mut welder = PositionWelder::new(1e-6);
        let a = welder.insert(&Point3::new(0.0, 0.0, 0.0));
        let b = welder.insert(&Point3::new(5e-7, 0.0, 0.0));
        let c = welder.insert(&Point3::new(1.0, 0.0, 0.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(welder.len(), 2);
    }

    #[test]
    fn test_welder_across_cell_boundary() {
        let mut welder = PositionWelder::new(1e-3);
        let a = welder.insert(&Point3::new(0.9999e-3, 0.0, 0.0));
        let b = welder.insert(&Point3::new(1.0001e-3, 0.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_cube_is_closed() {
        // Faces carry their own vertices; welding restores connectivity
        let mesh = Primitive::cube(10.0).to_mesh();
        let validation = validate_mesh(&mesh, 1e-9);
        assert!(validation.is_closed);
        assert!(validation.is_manifold);
        assert_eq!(validation.edge_count, 12);
    }

    #[test]
    fn test_open_mesh_has_boundary() {
        let mut mesh = Primitive::cube(1.0).to_mesh();
        mesh.polygons.pop();
        let validation = validate_mesh(&mesh, 1e-9);
        assert!(!validation.is_closed);
        assert_eq!(validation.boundary_edge_count, 4);
    }

    #[test]
    fn test_inconsistent_winding_is_not_closed() {
        let mut mesh = Primitive::cube(1.0).to_mesh();
        mesh.polygons[0].indices.reverse();
        assert!(!is_closed(&mesh, 1e-9));
    }

    #[test]
    fn test_non_manifold_edge() {
        let mut mesh = Primitive::cube(1.0).to_mesh();
        let duplicate = mesh.polygons[0].clone();
        mesh.polygons.push(duplicate.clone());
        mesh.polygons
            .push(Polygon::new(duplicate.indices.iter().rev().copied().collect(), 0));
        assert!(!is_manifold(&mesh, 1e-9));
    }

    #[test]
    fn test_cylinder_is_closed() {
        let mesh = Primitive::cylinder(10.0, 5.0, 32).to_mesh();
        assert!(is_closed(&mesh, 1e-9));
        let mesh = Primitive::sphere(1.0, 16)
            .to_mesh()
            .translated(Vector3::new(1.0, 2.0, 3.0));
        assert!(is_closed(&mesh, 1e-9));
    }
}
