// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Output assembly: vertex welding, T-junction repair and mesh emission

use super::boolean::SelectedTriangle;
use super::bvh::BVH;
use super::mesh_utils::PositionWelder;
use super::robust_predicates::point_segment_distance;
use super::triangulation::{ear_clip, PlaneBasis};
use super::{BoundingBox, Mesh, Vertex};
use ahash::AHashMap;
use nalgebra::Point3;
use tracing::debug;

/// T-junction search radius in multiples of the weld tolerance
const TJUNCTION_FACTOR: f64 = 4.0;

/// Counters from assembling a mesh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionStats {
    pub welded_vertices: usize,
    pub tjunctions_repaired: usize,
    pub collapsed_triangles: usize,
}

/// Vertex snapped onto a welded position id
#[derive(Debug, Clone, Copy)]
struct WeldedVertex {
    id: usize,
    vertex: Vertex,
}

/// Build the output mesh from selected triangles.
///
/// Positions within `eps` are merged, vertices that lie on the open interior
/// of another triangle's edge are inserted into that edge, and triangles
/// that collapse are removed. Identical (position, normal, uv) corners share
/// one output vertex.
pub fn reconstruct_mesh(triangles: &[SelectedTriangle], eps: f64) -> (Mesh, ReconstructionStats) {
    let mut stats = ReconstructionStats::default();

    let mut welder = PositionWelder::new(eps);
    let mut welded: Vec<([WeldedVertex; 3], u32)> = Vec::with_capacity(triangles.len());
    for triangle in triangles {
        let corners = triangle.vertices.map(|v| {
            let id = welder.insert(&v.position);
            WeldedVertex { id, vertex: v }
        });
        if corners[0].id == corners[1].id || corners[1].id == corners[2].id || corners[2].id == corners[0].id {
            stats.collapsed_triangles += 1;
            continue;
        }
        welded.push((corners, triangle.tag));
    }
    stats.welded_vertices = welder.len();

    let positions = welder.into_positions();
    let point_bvh = BVH::build(
        positions
            .iter()
            .enumerate()
            .map(|(i, p)| (i, BoundingBox::new(*p, *p)))
            .collect(),
    );
    let tolerance = eps * TJUNCTION_FACTOR;

    let mut emitter = Emitter::new(&positions);
    for (corners, tag) in &welded {
        let ring = insert_tjunction_vertices(corners, &positions, &point_bvh, tolerance);
        if ring.len() == 3 {
            emitter.triangle([ring[0], ring[1], ring[2]], *tag);
            continue;
        }

        stats.tjunctions_repaired += ring.len() - 3;
        let normal = (positions[corners[1].id] - positions[corners[0].id])
            .cross(&(positions[corners[2].id] - positions[corners[0].id]));
        let Some(basis) = PlaneBasis::new(positions[corners[0].id], &normal) else {
            continue;
        };
        let points: Vec<_> = ring.iter().map(|v| basis.project(&positions[v.id])).collect();
        for [i, j, k] in ear_clip(&points, tolerance) {
            emitter.triangle([ring[i], ring[j], ring[k]], *tag);
        }
    }

    stats.collapsed_triangles += emitter.collapsed;
    debug!(
        welded_vertices = stats.welded_vertices,
        tjunctions = stats.tjunctions_repaired,
        collapsed = stats.collapsed_triangles,
        "reconstructed mesh"
    );
    (emitter.mesh, stats)
}

/// Corner loop of a triangle with every welded vertex lying on the open
/// interior of one of its edges inserted in order
fn insert_tjunction_vertices(
    corners: &[WeldedVertex; 3],
    positions: &[Point3<f64>],
    point_bvh: &BVH,
    tolerance: f64,
) -> Vec<WeldedVertex> {
    let mut ring = Vec::with_capacity(3);
    for k in 0..3 {
        let start = corners[k];
        let end = corners[(k + 1) % 3];
        ring.push(start);

        let (a, b) = (positions[start.id], positions[end.id]);
        let length = (b - a).norm();
        let query = BoundingBox::from_points([a, b].iter()).expanded(tolerance);

        let mut on_edge: Vec<(f64, usize)> = point_bvh
            .query_box(&query)
            .into_iter()
            .filter(|&id| id != start.id && id != end.id)
            .filter_map(|id| {
                let p = positions[id];
                let (distance, t) = point_segment_distance(&p, &a, &b);
                let interior = t * length > tolerance && (1.0 - t) * length > tolerance;
                (distance <= tolerance && interior).then_some((t, id))
            })
            .collect();
        on_edge.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

        for (t, id) in on_edge {
            let mut vertex = start.vertex.lerp(&end.vertex, t);
            vertex.position = positions[id];
            ring.push(WeldedVertex { id, vertex });
        }
    }
    ring
}

/// Emits output vertices, sharing identical corners
struct Emitter<'a> {
    positions: &'a [Point3<f64>],
    mesh: Mesh,
    lookup: AHashMap<(usize, [u64; 3], [u64; 2]), usize>,
    collapsed: usize,
}

impl<'a> Emitter<'a> {
    fn new(positions: &'a [Point3<f64>]) -> Self {
        Self {
            positions,
            mesh: Mesh::new(),
            lookup: AHashMap::new(),
            collapsed: 0,
        }
    }

    fn vertex(&mut self, welded: &WeldedVertex) -> usize {
        let v = &welded.vertex;
        let key = (
            welded.id,
            [v.normal.x.to_bits(), v.normal.y.to_bits(), v.normal.z.to_bits()],
            [v.uv.x.to_bits(), v.uv.y.to_bits()],
        );
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.mesh.add_vertex(Vertex::new(self.positions[welded.id], v.normal, v.uv));
        self.lookup.insert(key, index);
        index
    }

    fn triangle(&mut self, corners: [WeldedVertex; 3], tag: u32) {
        if corners[0].id == corners[1].id || corners[1].id == corners[2].id || corners[2].id == corners[0].id {
            self.collapsed += 1;
            return;
        }
        let indices = [
            self.vertex(&corners[0]),
            self.vertex(&corners[1]),
            self.vertex(&corners[2]),
        ];
        self.mesh.add_triangle(indices, tag);
    }
}
