// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::triangulation::{ear_clip, newell_normal, PlaneBasis};
use super::BoundingBox;
use anyhow::{bail, Result};
use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position, normal and texture coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    pub uv: Vector2<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>, uv: Vector2<f64>) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Linear interpolation of every attribute; the normal is re-normalized
    pub fn lerp(&self, other: &Vertex, t: f64) -> Vertex {
        let position = self.position + (other.position - self.position) * t;
        let normal = self.normal.lerp(&other.normal, t);
        Vertex {
            position,
            normal: normal.try_normalize(1e-12).unwrap_or(self.normal),
            uv: self.uv.lerp(&other.uv, t),
        }
    }

    /// Same vertex facing the other way
    pub fn flipped(&self) -> Vertex {
        Vertex {
            normal: -self.normal,
            ..*self
        }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        // Normals transform by the inverse transpose
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        let normal = normal_matrix.transform_vector(&self.normal);
        self.normal = normal.try_normalize(1e-12).unwrap_or(self.normal);
    }
}

/// Planar polygon defined by vertex indices, counter-clockwise seen from outside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub indices: Vec<usize>,
    /// Material / identity tag carried to every derived triangle
    #[serde(default)]
    pub tag: u32,
}

impl Polygon {
    pub fn new(indices: Vec<usize>, tag: u32) -> Self {
        Self { indices, tag }
    }

    pub fn triangle(indices: [usize; 3], tag: u32) -> Self {
        Self {
            indices: indices.to_vec(),
            tag,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Flat, un-indexed render buffers: three corners per triangle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Polygon mesh over a shared vertex pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub polygons: Vec<Polygon>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            polygons: Vec::new(),
        }
    }

    pub fn with_capacity(vertex_count: usize, polygon_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            polygons: Vec::with_capacity(polygon_count),
        }
    }

    /// Build a mesh from flat attribute buffers and per-polygon index lists.
    ///
    /// `normals` and `texcoords` may be empty; otherwise they must match
    /// `positions` in length. Missing normals are filled from polygon planes.
    pub fn from_buffers(
        positions: &[[f64; 3]],
        normals: &[[f64; 3]],
        texcoords: &[[f64; 2]],
        polygons: &[Vec<usize>],
    ) -> Result<Mesh> {
        if !normals.is_empty() && normals.len() != positions.len() {
            bail!(
                "normal buffer has {} entries, expected {}",
                normals.len(),
                positions.len()
            );
        }
        if !texcoords.is_empty() && texcoords.len() != positions.len() {
            bail!(
                "texcoord buffer has {} entries, expected {}",
                texcoords.len(),
                positions.len()
            );
        }

        let mut mesh = Mesh::with_capacity(positions.len(), polygons.len());
        for (i, p) in positions.iter().enumerate() {
            let normal = normals.get(i).map(|n| Vector3::from(*n)).unwrap_or_else(Vector3::zeros);
            let uv = texcoords.get(i).map(|t| Vector2::from(*t)).unwrap_or_else(Vector2::zeros);
            mesh.add_vertex(Vertex::new(Point3::from(*p), normal, uv));
        }

        for (i, indices) in polygons.iter().enumerate() {
            if indices.len() < 3 {
                bail!("polygon {} has {} vertices", i, indices.len());
            }
            if let Some(&bad) = indices.iter().find(|&&idx| idx >= positions.len()) {
                bail!("polygon {} references vertex {} out of {}", i, bad, positions.len());
            }
            mesh.add_polygon(Polygon::new(indices.clone(), 0));
        }

        if normals.is_empty() {
            mesh.recompute_normals();
        }
        Ok(mesh)
    }

    /// Convert to un-indexed triangle buffers, one entry per triangle corner
    pub fn to_buffers(&self) -> MeshBuffers {
        let triangles = self.triangulate();
        let corners = triangles.polygons.len() * 3;
        let mut buffers = MeshBuffers {
            positions: Vec::with_capacity(corners),
            normals: Vec::with_capacity(corners),
            texcoords: Vec::with_capacity(corners),
            indices: Vec::with_capacity(corners),
        };

        for polygon in &triangles.polygons {
            for &idx in &polygon.indices {
                let v = &triangles.vertices[idx];
                buffers.indices.push(buffers.positions.len() as u32);
                buffers.positions.push([
                    v.position.x as f32,
                    v.position.y as f32,
                    v.position.z as f32,
                ]);
                buffers
                    .normals
                    .push([v.normal.x as f32, v.normal.y as f32, v.normal.z as f32]);
                buffers.texcoords.push([v.uv.x as f32, v.uv.y as f32]);
            }
        }
        buffers
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a polygon and return its index
    pub fn add_polygon(&mut self, polygon: Polygon) -> usize {
        let index = self.polygons.len();
        self.polygons.push(polygon);
        index
    }

    pub fn add_triangle(&mut self, indices: [usize; 3], tag: u32) -> usize {
        self.add_polygon(Polygon::triangle(indices, tag))
    }

    /// Set the tag of every polygon
    pub fn with_tag(mut self, tag: u32) -> Self {
        for polygon in &mut self.polygons {
            polygon.tag = tag;
        }
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Number of triangles after fan/ear triangulation
    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.indices.len().saturating_sub(2))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    pub fn polygon_positions(&self, polygon: &Polygon) -> Vec<Point3<f64>> {
        polygon
            .indices
            .iter()
            .map(|&i| self.vertices[i].position)
            .collect()
    }

    /// Area-weighted polygon normal (length is twice the area)
    pub fn polygon_area_vector(&self, polygon: &Polygon) -> Vector3<f64> {
        newell_normal(&self.polygon_positions(polygon))
    }

    /// Split every polygon into triangles, sharing the vertex pool
    pub fn triangulate(&self) -> Mesh {
        let mut result = Mesh::with_capacity(self.vertices.len(), self.triangle_count());
        result.vertices = self.vertices.clone();

        for polygon in &self.polygons {
            for tri in self.triangulate_polygon(polygon) {
                result.add_triangle(tri, polygon.tag);
            }
        }
        result
    }

    /// Triangles (as vertex indices) covering one polygon
    pub fn triangulate_polygon(&self, polygon: &Polygon) -> Vec<[usize; 3]> {
        let indices = &polygon.indices;
        match indices.len() {
            0..=2 => Vec::new(),
            3 => vec![[indices[0], indices[1], indices[2]]],
            _ => {
                let positions = self.polygon_positions(polygon);
                let normal = newell_normal(&positions);
                let Some(basis) = PlaneBasis::new(positions[0], &normal) else {
                    // Degenerate loop, fall back to a fan
                    return (1..indices.len() - 1)
                        .map(|i| [indices[0], indices[i], indices[i + 1]])
                        .collect();
                };
                let projected: Vec<_> = positions.iter().map(|p| basis.project(p)).collect();
                ear_clip(&projected, 0.0)
                    .into_iter()
                    .map(|[a, b, c]| [indices[a], indices[b], indices[c]])
                    .collect()
            }
        }
    }

    /// Copy with reversed winding and negated normals
    pub fn flipped(&self) -> Mesh {
        Mesh {
            vertices: self.vertices.iter().map(Vertex::flipped).collect(),
            polygons: self
                .polygons
                .iter()
                .map(|p| Polygon::new(p.indices.iter().rev().copied().collect(), p.tag))
                .collect(),
        }
    }

    /// Transform all vertices by a matrix
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix);
        }
        // Mirroring transforms invert the winding
        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            for polygon in &mut self.polygons {
                polygon.indices.reverse();
            }
        }
    }

    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Copy translated by `offset`
    pub fn translated(&self, offset: Vector3<f64>) -> Mesh {
        let mut mesh = self.clone();
        mesh.translate(offset);
        mesh
    }

    /// Merge with another mesh (simple union without CSG)
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for polygon in &other.polygons {
            self.polygons.push(Polygon::new(
                polygon.indices.iter().map(|i| i + offset).collect(),
                polygon.tag,
            ));
        }
    }

    /// Enclosed volume by the divergence theorem (positive for outward winding)
    pub fn volume(&self) -> f64 {
        let mut volume = 0.0;
        for polygon in &self.polygons {
            let positions = self.polygon_positions(polygon);
            if positions.len() < 3 {
                continue;
            }
            let area_vector = newell_normal(&positions);
            volume += area_vector.dot(&positions[0].coords);
        }
        volume / 6.0
    }

    pub fn surface_area(&self) -> f64 {
        self.polygons
            .iter()
            .map(|p| self.polygon_area_vector(p).norm() * 0.5)
            .sum()
    }

    /// Replace vertex normals with area-weighted polygon normals.
    /// Vertices shared across polygons get the average.
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vector3::zeros(); self.vertices.len()];
        for polygon in &self.polygons {
            let normal = self.polygon_area_vector(polygon);
            for &i in &polygon.indices {
                accum[i] += normal;
            }
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = normal.try_normalize(1e-300).unwrap_or_else(Vector3::z);
        }
    }
}
