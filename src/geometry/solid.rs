// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Operand preparation: triangulation, validation and acceleration structures

use super::bvh::BVH;
use super::mesh_utils::{validate_mesh, PositionWelder};
use super::robust_predicates::{triangle_min_height, Plane};
use super::triangle_intersection::{intersect_triangles, TriangleContact};
use super::{BoundingBox, Mesh, Vertex};
use crate::error::{CsgError, CsgResult, Operand};
use ahash::AHashMap;
use nalgebra::Point3;
use rayon::prelude::*;
use tracing::debug;

/// Normals closer than this (as a dot product) count as the same plane
const COPLANAR_DOT: f64 = 1.0 - 1e-9;

/// Triangle of a prepared operand
#[derive(Debug, Clone)]
pub struct SolidTriangle {
    pub vertices: [Vertex; 3],
    pub plane: Plane,
    pub tag: u32,
    /// Source polygon index
    pub polygon: usize,
    /// Welded position ids of the corners
    pub ids: [usize; 3],
    /// Edge `k` (corner `k` to `k + 1`) bounds a face region rather than
    /// being an internal diagonal of a flat area
    pub feature: [bool; 3],
}

impl SolidTriangle {
    pub fn corners(&self) -> [Point3<f64>; 3] {
        [
            self.vertices[0].position,
            self.vertices[1].position,
            self.vertices[2].position,
        ]
    }

    pub fn edge(&self, k: usize) -> (Point3<f64>, Point3<f64>) {
        (self.vertices[k].position, self.vertices[(k + 1) % 3].position)
    }
}

/// Closed, triangulated operand with its BVH
#[derive(Debug, Clone)]
pub struct Solid {
    pub operand: Operand,
    pub triangles: Vec<SolidTriangle>,
    pub bvh: BVH,
    pub bbox: BoundingBox,
}

impl Solid {
    /// Triangulate and validate a mesh.
    ///
    /// Fails with `IllDefinedInput` for invalid indices, zero-area polygons or
    /// an open surface. Positions within `eps` are treated as one vertex.
    pub fn prepare(mesh: &Mesh, operand: Operand, eps: f64, leaf_size: usize) -> CsgResult<Solid> {
        if mesh.polygons.is_empty() {
            return Err(CsgError::ill_defined(operand, "mesh has no polygons"));
        }

        for (i, polygon) in mesh.polygons.iter().enumerate() {
            if polygon.indices.len() < 3 {
                return Err(CsgError::ill_defined(
                    operand,
                    format!("polygon {} has {} vertices", i, polygon.indices.len()),
                ));
            }
            if let Some(&bad) = polygon.indices.iter().find(|&&idx| idx >= mesh.vertices.len()) {
                return Err(CsgError::ill_defined(
                    operand,
                    format!("polygon {} references missing vertex {}", i, bad),
                ));
            }
            let area = mesh.polygon_area_vector(polygon).norm() * 0.5;
            if area < eps * eps {
                return Err(CsgError::ill_defined(
                    operand,
                    format!("polygon {} has zero area", i),
                ));
            }
        }

        let validation = validate_mesh(mesh, eps);
        if !validation.is_closed {
            return Err(CsgError::ill_defined(
                operand,
                format!("mesh is not closed ({} boundary edges)", validation.boundary_edge_count),
            ));
        }

        let mut welder = PositionWelder::new(eps);
        let ids: Vec<usize> = mesh.vertices.iter().map(|v| welder.insert(&v.position)).collect();

        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        for (polygon_index, polygon) in mesh.polygons.iter().enumerate() {
            for [i0, i1, i2] in mesh.triangulate_polygon(polygon) {
                let vertices = [mesh.vertices[i0], mesh.vertices[i1], mesh.vertices[i2]];
                let (a, b, c) = (&vertices[0].position, &vertices[1].position, &vertices[2].position);
                // Collinear corners from the triangulation of a flat run
                if triangle_min_height(a, b, c) <= eps {
                    continue;
                }
                let Some(plane) = Plane::from_triangle(a, b, c) else {
                    continue;
                };
                triangles.push(SolidTriangle {
                    vertices,
                    plane,
                    tag: polygon.tag,
                    polygon: polygon_index,
                    ids: [ids[i0], ids[i1], ids[i2]],
                    feature: [true; 3],
                });
            }
        }

        mark_feature_edges(&mut triangles);

        let bvh = BVH::from_triangles(
            &triangles.iter().map(SolidTriangle::corners).collect::<Vec<_>>(),
            leaf_size,
        );
        let bbox = mesh.bounding_box();

        debug!(
            operand = %operand,
            polygons = mesh.polygon_count(),
            triangles = triangles.len(),
            welded_vertices = welder.len(),
            "prepared operand"
        );

        Ok(Solid {
            operand,
            triangles,
            bvh,
            bbox,
        })
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Fail with `IllDefinedInput` when two triangles that share no corner
    /// cross each other along a segment longer than `eps`
    pub fn check_self_intersection(&self, eps: f64) -> CsgResult<()> {
        let pairs: Vec<(usize, usize)> = self
            .bvh
            .query_overlaps(&self.bvh, eps)
            .into_iter()
            .filter(|&(i, j)| i < j)
            .filter(|&(i, j)| {
                let a = &self.triangles[i].ids;
                let b = &self.triangles[j].ids;
                !a.iter().any(|id| b.contains(id))
            })
            .collect();

        let crossing = pairs.par_iter().find_first(|&&(i, j)| {
            let ta = &self.triangles[i];
            let tb = &self.triangles[j];
            match intersect_triangles(&ta.corners(), &ta.plane, &tb.corners(), &tb.plane, eps) {
                TriangleContact::Segment(p, q) => (q - p).norm() > eps,
                _ => false,
            }
        });

        match crossing {
            Some(&(i, j)) => Err(CsgError::ill_defined(
                self.operand,
                format!(
                    "surface intersects itself (polygons {} and {})",
                    self.triangles[i].polygon, self.triangles[j].polygon
                ),
            )),
            None => Ok(()),
        }
    }
}

/// Clear the feature flag on edges shared with a coplanar neighbour
fn mark_feature_edges(triangles: &mut [SolidTriangle]) {
    let mut edges: AHashMap<(usize, usize), Vec<(usize, usize)>> = AHashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            let key = (tri.ids[k], tri.ids[(k + 1) % 3]);
            edges.entry(key).or_default().push((t, k));
        }
    }

    let mut flat = Vec::new();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            let reverse = (tri.ids[(k + 1) % 3], tri.ids[k]);
            let Some(neighbours) = edges.get(&reverse) else {
                continue;
            };
            let coplanar = neighbours.iter().any(|&(n, _)| {
                let other = &triangles[n];
                other.polygon == tri.polygon || other.plane.normal.dot(&tri.plane.normal) > COPLANAR_DOT
            });
            if coplanar {
                flat.push((t, k));
            }
        }
    }

    for (t, k) in flat {
        triangles[t].feature[k] = false;
    }
}
