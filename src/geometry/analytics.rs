// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::mesh_utils::validate_mesh;
use super::Mesh;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Geometry statistics and analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Enclosed volume (positive for outward winding)
    pub volume: f64,
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Center of mass of the enclosed volume [x, y, z]
    pub centroid: [f64; 3],
    pub vertex_count: usize,
    pub polygon_count: usize,
    pub triangle_count: usize,
    /// Distinct polygon tags, ascending
    pub tags: Vec<u32>,
    /// Every edge matched by an opposite edge
    pub is_watertight: bool,
    pub is_manifold: bool,
}

impl GeometryStats {
    /// Create empty stats
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            centroid: [0.0; 3],
            vertex_count: 0,
            polygon_count: 0,
            triangle_count: 0,
            tags: Vec::new(),
            is_watertight: false,
            is_manifold: false,
        }
    }

    /// Pretty print statistics
    pub fn print(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║              GEOMETRY ANALYTICS                          ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║ Volume:          {:>12.6}                            ║", self.volume);
        println!("║ Surface Area:    {:>12.6}                            ║", self.surface_area);
        println!(
            "║ Centroid:        ({:>8.4}, {:>8.4}, {:>8.4})         ║",
            self.centroid[0], self.centroid[1], self.centroid[2]
        );
        println!("║                                                          ║");
        println!("║ Bounding Box:                                            ║");
        println!(
            "║   Min: ({:>8.4}, {:>8.4}, {:>8.4})                   ║",
            self.bbox[0], self.bbox[1], self.bbox[2]
        );
        println!(
            "║   Max: ({:>8.4}, {:>8.4}, {:>8.4})                   ║",
            self.bbox[3], self.bbox[4], self.bbox[5]
        );
        println!("║                                                          ║");
        println!("║ Vertices:        {:>10}                              ║", self.vertex_count);
        println!("║ Polygons:        {:>10}                              ║", self.polygon_count);
        println!("║ Triangles:       {:>10}                              ║", self.triangle_count);
        println!("║ Tags:            {:>10}                              ║", self.tags.len());
        println!(
            "║ Watertight:      {:>10}                              ║",
            if self.is_watertight { "Yes" } else { "No" }
        );
        println!(
            "║ Manifold:        {:>10}                              ║",
            if self.is_manifold { "Yes" } else { "No" }
        );
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

/// Analyze mesh geometry; `tolerance` is the weld distance for topology checks
pub fn analyze(mesh: &Mesh, tolerance: f64) -> GeometryStats {
    if mesh.vertices.is_empty() || mesh.polygons.is_empty() {
        return GeometryStats::empty();
    }

    let bbox = mesh.bounding_box();
    let validation = validate_mesh(mesh, tolerance);
    let tags: BTreeSet<u32> = mesh.polygons.iter().map(|p| p.tag).collect();

    GeometryStats {
        volume: mesh.volume(),
        surface_area: mesh.surface_area(),
        bbox: [bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z],
        centroid: calculate_centroid(mesh),
        vertex_count: mesh.vertex_count(),
        polygon_count: mesh.polygon_count(),
        triangle_count: mesh.triangle_count(),
        tags: tags.into_iter().collect(),
        is_watertight: validation.is_closed,
        is_manifold: validation.is_manifold,
    }
}

/// Volume centroid from signed tetrahedra against the origin; falls back to
/// the vertex average for meshes without volume
fn calculate_centroid(mesh: &Mesh) -> [f64; 3] {
    let triangles = mesh.triangulate();
    let mut weighted = nalgebra::Vector3::zeros();
    let mut total = 0.0;

    for polygon in &triangles.polygons {
        let v0 = triangles.vertices[polygon.indices[0]].position.coords;
        let v1 = triangles.vertices[polygon.indices[1]].position.coords;
        let v2 = triangles.vertices[polygon.indices[2]].position.coords;
        let signed = v0.dot(&v1.cross(&v2)) / 6.0;
        weighted += (v0 + v1 + v2) / 4.0 * signed;
        total += signed;
    }

    if total.abs() > 1e-300 {
        let c = weighted / total;
        return [c.x, c.y, c.z];
    }

    let n = mesh.vertices.len() as f64;
    let sum = mesh
        .vertices
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, v| acc + v.position.coords);
    [sum.x / n, sum.y / n, sum.z / n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_cube_analytics() {
        let mesh = Primitive::cube(2.0)
            .to_mesh()
            .translated(Vector3::new(1.0, 1.0, 1.0))
            .with_tag(3);
        let stats = analyze(&mesh, 1e-9);

        assert_relative_eq!(stats.volume, 8.0, epsilon = 1e-9);
        assert_relative_eq!(stats.surface_area, 24.0, epsilon = 1e-9);
        assert_relative_eq!(stats.centroid[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(stats.centroid[2], 1.0, epsilon = 1e-9);
        assert_eq!(stats.bbox, [0.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
        assert_eq!(stats.polygon_count, 6);
        assert_eq!(stats.triangle_count, 12);
        assert_eq!(stats.tags, vec![3]);
        assert!(stats.is_watertight);
        assert!(stats.is_manifold);
    }

    #[test]
    fn test_empty_mesh() {
        let stats = analyze(&Mesh::new(), 1e-9);
        assert_eq!(stats, GeometryStats::empty());
    }

    #[test]
    fn test_serializes() {
        let stats = analyze(&Primitive::cube(1.0).to_mesh(), 1e-9);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"is_watertight\":true"));
    }
}
