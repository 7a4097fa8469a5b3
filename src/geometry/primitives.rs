// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! Every primitive is centered on the origin, closed, and wound
//! counter-clockwise seen from outside.

use super::{Mesh, Polygon, Vertex};
use nalgebra::{Point3, Vector2, Vector3};
use std::f64::consts::PI;

const DEFAULT_SEGMENTS: u32 = 32;

/// Geometric primitives
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cuboid { size: Vector3<f64> },
    Sphere { radius: f64, segments: u32, rings: u32 },
    Cylinder { height: f64, radius: f64, segments: u32 },
}

impl Primitive {
    pub fn cuboid(size: Vector3<f64>) -> Self {
        Self::Cuboid { size }
    }

    /// Axis-aligned cube with edge length `size`
    pub fn cube(size: f64) -> Self {
        Self::Cuboid {
            size: Vector3::repeat(size),
        }
    }

    /// UV sphere with `segments` longitudes and half as many latitude bands
    pub fn sphere(radius: f64, segments: u32) -> Self {
        let segments = if segments > 0 { segments.max(3) } else { DEFAULT_SEGMENTS };
        Self::uv_sphere(radius, segments, (segments / 2).max(2))
    }

    pub fn uv_sphere(radius: f64, segments: u32, rings: u32) -> Self {
        Self::Sphere {
            radius,
            segments: segments.max(3),
            rings: rings.max(2),
        }
    }

    /// Cylinder along the Z axis
    pub fn cylinder(height: f64, radius: f64, segments: u32) -> Self {
        let segments = if segments > 0 { segments.max(3) } else { DEFAULT_SEGMENTS };
        Self::Cylinder {
            height,
            radius,
            segments,
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cuboid { size } => generate_cuboid_mesh(*size),
            Self::Sphere {
                radius,
                segments,
                rings,
            } => generate_sphere_mesh(*radius, *segments, *rings),
            Self::Cylinder {
                height,
                radius,
                segments,
            } => generate_cylinder_mesh(*height, *radius, *segments),
        }
    }
}

fn generate_cuboid_mesh(size: Vector3<f64>) -> Mesh {
    let half = size / 2.0;
    let mut mesh = Mesh::with_capacity(24, 6);

    // (normal, u, v) with u × v = normal
    let faces = [
        (Vector3::x(), Vector3::y(), Vector3::z()),
        (-Vector3::x(), Vector3::z(), Vector3::y()),
        (Vector3::y(), Vector3::z(), Vector3::x()),
        (-Vector3::y(), Vector3::x(), Vector3::z()),
        (Vector3::z(), Vector3::x(), Vector3::y()),
        (-Vector3::z(), Vector3::y(), Vector3::x()),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    for (normal, u, v) in faces {
        let center = normal.component_mul(&half);
        let u = u.component_mul(&half);
        let v = v.component_mul(&half);
        let indices = corners
            .iter()
            .map(|&(su, sv)| {
                let position = Point3::from(center + u * su + v * sv);
                let uv = Vector2::new((su + 1.0) / 2.0, (sv + 1.0) / 2.0);
                mesh.add_vertex(Vertex::new(position, normal, uv))
            })
            .collect();
        mesh.add_polygon(Polygon::new(indices, 0));
    }

    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32, rings: u32) -> Mesh {
    let (segments, rings) = (segments as usize, rings as usize);
    let columns = segments + 1;
    let mut mesh = Mesh::with_capacity(columns * (rings + 1), segments * rings);

    // Grid of (rings + 1) x (segments + 1); the seam column is duplicated for UVs.
    // Pole rows hold one vertex per column at the same position.
    for i in 0..=rings {
        let theta = PI * i as f64 / rings as f64;
        for j in 0..columns {
            let phi = 2.0 * PI * (j % segments) as f64 / segments as f64;
            let normal = if i == 0 {
                Vector3::y()
            } else if i == rings {
                -Vector3::y()
            } else {
                Vector3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
            };
            let uv = Vector2::new(j as f64 / segments as f64, i as f64 / rings as f64);
            mesh.add_vertex(Vertex::new(Point3::from(normal * radius), normal, uv));
        }
    }

    let index = |i: usize, j: usize| i * columns + j;
    for i in 0..rings {
        for j in 0..segments {
            let polygon = if i == 0 {
                vec![index(0, j), index(1, j + 1), index(1, j)]
            } else if i == rings - 1 {
                vec![index(i, j), index(i, j + 1), index(i + 1, j)]
            } else {
                vec![index(i, j), index(i, j + 1), index(i + 1, j + 1), index(i + 1, j)]
            };
            mesh.add_polygon(Polygon::new(polygon, 0));
        }
    }

    mesh
}

fn generate_cylinder_mesh(height: f64, radius: f64, segments: u32) -> Mesh {
    let segments = segments as usize;
    let half = height / 2.0;
    let mut mesh = Mesh::with_capacity(4 * segments + 2, segments + 2);

    let ring = |j: usize| {
        let phi = 2.0 * PI * (j % segments) as f64 / segments as f64;
        Vector3::new(phi.cos(), phi.sin(), 0.0)
    };

    // Side: bottom and top rows with a duplicated seam column
    let side_start = mesh.vertices.len();
    for j in 0..=segments {
        let dir = ring(j);
        let u = j as f64 / segments as f64;
        for (z, v) in [(-half, 0.0), (half, 1.0)] {
            let position = Point3::new(dir.x * radius, dir.y * radius, z);
            mesh.add_vertex(Vertex::new(position, dir, Vector2::new(u, v)));
        }
    }
    for j in 0..segments {
        let b0 = side_start + 2 * j;
        let t0 = b0 + 1;
        let b1 = b0 + 2;
        let t1 = b0 + 3;
        mesh.add_polygon(Polygon::new(vec![b0, b1, t1, t0], 0));
    }

    // Caps as single n-gons
    for (z, normal) in [(half, Vector3::z()), (-half, -Vector3::z())] {
        let mut cap: Vec<usize> = (0..segments)
            .map(|j| {
                let dir = ring(j);
                let position = Point3::new(dir.x * radius, dir.y * radius, z);
                let uv = Vector2::new(0.5 + dir.x / 2.0, 0.5 + dir.y / 2.0);
                mesh.add_vertex(Vertex::new(position, normal, uv))
            })
            .collect();
        if normal.z < 0.0 {
            cap.reverse();
        }
        mesh.add_polygon(Polygon::new(cap, 0));
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_utils::is_closed;
    use approx::assert_relative_eq;

    #[test]
    fn test_cuboid() {
        let mesh = Primitive::cuboid(Vector3::new(1.0, 2.0, 3.0)).to_mesh();
        assert_eq!(mesh.polygon_count(), 6);
        assert_eq!(mesh.triangle_count(), 12);
        assert_relative_eq!(mesh.volume(), 6.0, epsilon = 1e-12);
        assert!(is_closed(&mesh, 1e-9));

        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.min, Point3::new(-0.5, -1.0, -1.5));
        assert_relative_eq!(bbox.max, Point3::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn test_cuboid_normals_point_outward() {
        let mesh = Primitive::cube(1.0).to_mesh();
        for polygon in &mesh.polygons {
            let area = mesh.polygon_area_vector(polygon).normalize();
            let normal = mesh.vertices[polygon.indices[0]].normal;
            assert_relative_eq!(area, normal, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sphere() {
        let mesh = Primitive::sphere(1.0, 32).to_mesh();
        assert_eq!(mesh.polygon_count(), 32 * 16);
        assert!(is_closed(&mesh, 1e-9));
        let volume = mesh.volume();
        assert!(volume > 0.0);
        // Inscribed tessellation is slightly smaller than the true sphere
        let exact = 4.0 / 3.0 * PI;
        assert!(volume < exact && volume > exact * 0.95);
    }

    #[test]
    fn test_sphere_bands_are_planar() {
        let mesh = Primitive::uv_sphere(2.0, 12, 6).to_mesh();
        for polygon in mesh.polygons.iter().filter(|p| p.len() == 4) {
            let pts = mesh.polygon_positions(polygon);
            let n = (pts[1] - pts[0]).cross(&(pts[2] - pts[0]));
            assert!(n.normalize().dot(&(pts[3] - pts[0])).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cylinder() {
        let mesh = Primitive::cylinder(2.0, 1.0, 24).to_mesh();
        assert_eq!(mesh.polygon_count(), 26);
        assert!(is_closed(&mesh, 1e-9));
        // Regular 24-gon prism
        let expected = 2.0 * 0.5 * 24.0 * (2.0 * PI / 24.0).sin();
        assert_relative_eq!(mesh.volume(), expected, epsilon = 1e-9);
    }
}
