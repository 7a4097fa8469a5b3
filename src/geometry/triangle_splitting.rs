// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle splitting along intersection cuts
//!
//! A cut triangle is broken into convex fragments by the full lines through
//! its cuts, then each fragment is ear-clipped back into triangles. Every
//! resulting triangle lies on one side of every cut.

use super::robust_predicates::triangle_min_height;
use super::solid::{Solid, SolidTriangle};
use super::triangle_intersection::Cut;
use super::triangulation::{ear_clip, PlaneBasis};
use super::Vertex;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use rayon::prelude::*;
use tracing::debug;

/// Convex region of a source triangle crossed by no cut
#[derive(Debug, Clone)]
pub struct Piece {
    pub triangles: Vec<[Vertex; 3]>,
    /// Area-weighted centroid, used as the classification sample point
    pub centroid: Point3<f64>,
    /// Outward normal of the source triangle
    pub normal: Vector3<f64>,
    pub area: f64,
    /// Index of the source triangle in its solid
    pub source: usize,
    pub tag: u32,
}

/// Pieces of a whole solid plus counters
#[derive(Debug, Clone, Default)]
pub struct SplitOutput {
    pub pieces: Vec<Piece>,
    pub split_triangles: usize,
    pub slivers_dropped: usize,
}

/// Convex polygon in a triangle's plane, with 2D coordinates in its basis
#[derive(Debug, Clone)]
struct Fragment {
    vertices: Vec<Vertex>,
    points: Vec<Point2<f64>>,
}

/// Split every triangle of `solid` against its cuts, in parallel
pub fn split_solid(solid: &Solid, cuts: &[Vec<Cut>], eps: f64) -> SplitOutput {
    let results: Vec<(Vec<Piece>, bool, usize)> = solid
        .triangles
        .par_iter()
        .zip(cuts.par_iter())
        .enumerate()
        .map(|(index, (triangle, cuts))| split_triangle(index, triangle, cuts, eps))
        .collect();

    let mut output = SplitOutput::default();
    for (pieces, was_split, slivers) in results {
        output.pieces.extend(pieces);
        output.split_triangles += usize::from(was_split);
        output.slivers_dropped += slivers;
    }

    if output.slivers_dropped > 0 {
        debug!(
            operand = %solid.operand,
            slivers = output.slivers_dropped,
            "dropped sliver triangles"
        );
    }
    output
}

/// Split one triangle; returns its pieces, whether it was split, and the
/// number of sliver triangles dropped
pub fn split_triangle(
    index: usize,
    triangle: &SolidTriangle,
    cuts: &[Cut],
    eps: f64,
) -> (Vec<Piece>, bool, usize) {
    if cuts.is_empty() {
        return (vec![whole_piece(index, triangle)], false, 0);
    }

    let Some(basis) = PlaneBasis::new(triangle.vertices[0].position, &triangle.plane.normal) else {
        return (vec![whole_piece(index, triangle)], false, 0);
    };

    let mut fragments = vec![Fragment {
        vertices: triangle.vertices.to_vec(),
        points: triangle.vertices.iter().map(|v| basis.project(&v.position)).collect(),
    }];

    for (c0, c1) in cuts {
        let q0 = basis.project(c0);
        let q1 = basis.project(c1);
        let mut next = Vec::with_capacity(fragments.len() + 1);
        for fragment in fragments {
            match split_fragment(&fragment, (c0, &q0), (c1, &q1), eps) {
                Some((front, back)) => {
                    next.push(front);
                    next.push(back);
                }
                None => next.push(fragment),
            }
        }
        fragments = next;
    }

    if fragments.len() == 1 {
        return (vec![whole_piece(index, triangle)], false, 0);
    }

    let mut slivers = 0;
    let pieces = fragments
        .into_iter()
        .filter_map(|fragment| {
            let mut triangles = Vec::with_capacity(fragment.vertices.len() - 2);
            for [i, j, k] in ear_clip(&fragment.points, eps) {
                let corners = [fragment.vertices[i], fragment.vertices[j], fragment.vertices[k]];
                if triangle_min_height(&corners[0].position, &corners[1].position, &corners[2].position) <= eps {
                    slivers += 1;
                } else {
                    triangles.push(corners);
                }
            }
            build_piece(index, triangle, triangles)
        })
        .collect();

    (pieces, true, slivers)
}

fn whole_piece(index: usize, triangle: &SolidTriangle) -> Piece {
    let [a, b, c] = triangle.corners();
    Piece {
        triangles: vec![triangle.vertices],
        centroid: Point3::from((a.coords + b.coords + c.coords) / 3.0),
        normal: triangle.plane.normal,
        area: (b - a).cross(&(c - a)).norm() * 0.5,
        source: index,
        tag: triangle.tag,
    }
}

fn build_piece(index: usize, triangle: &SolidTriangle, triangles: Vec<[Vertex; 3]>) -> Option<Piece> {
    let mut area = 0.0;
    let mut weighted = Vector3::zeros();
    for [a, b, c] in &triangles {
        let (a, b, c) = (a.position, b.position, c.position);
        let t_area = (b - a).cross(&(c - a)).norm() * 0.5;
        area += t_area;
        weighted += (a.coords + b.coords + c.coords) / 3.0 * t_area;
    }
    if triangles.is_empty() || area <= 0.0 {
        return None;
    }
    Some(Piece {
        triangles,
        centroid: Point3::from(weighted / area),
        normal: triangle.plane.normal,
        area,
        source: index,
        tag: triangle.tag,
    })
}

/// Split a convex fragment by the line through a cut.
///
/// Only splits when vertices lie strictly on both sides and the cut's own
/// extent overlaps the chord of the fragment by more than `eps`.
fn split_fragment(
    fragment: &Fragment,
    (c0, q0): (&Point3<f64>, &Point2<f64>),
    (c1, q1): (&Point3<f64>, &Point2<f64>),
    eps: f64,
) -> Option<(Fragment, Fragment)> {
    let d = q1 - q0;
    let len = d.norm();
    if len <= eps {
        return None;
    }
    let along = d / len;
    let across = Vector2::new(-along.y, along.x);

    let sides: Vec<f64> = fragment
        .points
        .iter()
        .map(|p| {
            let s = across.dot(&(p - q0));
            if s.abs() <= eps {
                0.0
            } else {
                s
            }
        })
        .collect();

    if !sides.iter().any(|&s| s > 0.0) || !sides.iter().any(|&s| s < 0.0) {
        return None;
    }

    // Chord of the fragment on the cut line, as parameters along the cut
    let n = fragment.points.len();
    let mut chord_min = f64::INFINITY;
    let mut chord_max = f64::NEG_INFINITY;
    for k in 0..n {
        let j = (k + 1) % n;
        let point = if sides[k] == 0.0 {
            Some(fragment.points[k])
        } else if sides[k] * sides[j] < 0.0 {
            let t = sides[k] / (sides[k] - sides[j]);
            Some(fragment.points[k] + (fragment.points[j] - fragment.points[k]) * t)
        } else {
            None
        };
        if let Some(point) = point {
            let s = along.dot(&(point - q0));
            chord_min = chord_min.min(s);
            chord_max = chord_max.max(s);
        }
    }
    if chord_max.min(len) - chord_min.max(0.0) <= eps {
        return None;
    }

    let mut front = Fragment {
        vertices: Vec::with_capacity(n + 1),
        points: Vec::with_capacity(n + 1),
    };
    let mut back = front.clone();

    for k in 0..n {
        let j = (k + 1) % n;
        if sides[k] >= 0.0 {
            front.vertices.push(fragment.vertices[k]);
            front.points.push(fragment.points[k]);
        }
        if sides[k] <= 0.0 {
            back.vertices.push(fragment.vertices[k]);
            back.points.push(fragment.points[k]);
        }
        if sides[k] * sides[j] < 0.0 {
            let t = sides[k] / (sides[k] - sides[j]);
            let mut vertex = fragment.vertices[k].lerp(&fragment.vertices[j], t);
            let mut point = fragment.points[k] + (fragment.points[j] - fragment.points[k]) * t;
            // Reuse exact cut endpoints so neighbouring triangles agree
            if (point - q0).norm() <= eps {
                vertex.position = *c0;
                point = *q0;
            } else if (point - q1).norm() <= eps {
                vertex.position = *c1;
                point = *q1;
            }
            front.vertices.push(vertex);
            front.points.push(point);
            back.vertices.push(vertex);
            back.points.push(point);
        }
    }

    Some((front, back))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operand;
    use crate::geometry::robust_predicates::Plane;
    use crate::geometry::{Mesh, Primitive};
    use approx::assert_relative_eq;
    use nalgebra::Vector2 as V2;

    fn solid_triangle(points: [Point3<f64>; 3]) -> SolidTriangle {
        let plane = Plane::from_triangle(&points[0], &points[1], &points[2]).unwrap();
        SolidTriangle {
            vertices: points.map(|p| Vertex::new(p, plane.normal, V2::new(p.x, p.y))),
            plane,
            tag: 7,
            polygon: 0,
            ids: [0, 1, 2],
            feature: [true; 3],
        }
    }

    fn right_triangle() -> SolidTriangle {
        solid_triangle([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ])
    }

    fn total_area(pieces: &[Piece]) -> f64 {
        pieces.iter().map(|p| p.area).sum()
    }

    #[test]
    fn test_uncut_triangle_is_one_piece() {
        let (pieces, split, slivers) = split_triangle(3, &right_triangle(), &[], 1e-9);
        assert_eq!(pieces.len(), 1);
        assert!(!split);
        assert_eq!(slivers, 0);
        assert_eq!(pieces[0].source, 3);
        assert_eq!(pieces[0].tag, 7);
    }

    #[test]
    fn test_single_cut_preserves_area() {
        let cut = (Point3::new(0.5, -1.0, 0.0), Point3::new(0.5, 3.0, 0.0));
        let (pieces, split, _) = split_triangle(0, &right_triangle(), &[cut], 1e-9);
        assert!(split);
        assert_eq!(pieces.len(), 2);
        assert_relative_eq!(total_area(&pieces), 2.0, epsilon = 1e-12);
        // Every triangle lies on one side of the cut line
        for piece in &pieces {
            let xs: Vec<f64> = piece.triangles.iter().flatten().map(|v| v.position.x).collect();
            assert!(xs.iter().all(|&x| x <= 0.5 + 1e-12) || xs.iter().all(|&x| x >= 0.5 - 1e-12));
        }
    }

    #[test]
    fn test_crossing_cuts() {
        let cuts = [
            (Point3::new(0.5, -1.0, 0.0), Point3::new(0.5, 3.0, 0.0)),
            (Point3::new(-1.0, 0.5, 0.0), Point3::new(3.0, 0.5, 0.0)),
        ];
        let (pieces, _, slivers) = split_triangle(0, &right_triangle(), &cuts, 1e-9);
        assert_eq!(pieces.len(), 4);
        assert_eq!(slivers, 0);
        assert_relative_eq!(total_area(&pieces), 2.0, epsilon = 1e-12);
        for piece in &pieces {
            for tri in &piece.triangles {
                let n = (tri[1].position - tri[0].position).cross(&(tri[2].position - tri[0].position));
                assert!(n.z > 0.0, "winding must be preserved");
            }
        }
    }

    #[test]
    fn test_cut_outside_or_on_boundary_is_ignored() {
        let outside = (Point3::new(5.0, -1.0, 0.0), Point3::new(5.0, 3.0, 0.0));
        let boundary = (Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let (pieces, split, _) = split_triangle(0, &right_triangle(), &[outside, boundary], 1e-9);
        assert!(!split);
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn test_short_cut_away_from_triangle_is_ignored() {
        // The line crosses the triangle but the cut itself stays outside
        let cut = (Point3::new(0.5, 5.0, 0.0), Point3::new(0.5, 6.0, 0.0));
        let (pieces, split, _) = split_triangle(0, &right_triangle(), &[cut], 1e-9);
        assert!(!split);
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn test_attributes_are_interpolated() {
        let cut = (Point3::new(1.0, -1.0, 0.0), Point3::new(1.0, 3.0, 0.0));
        let (pieces, _, _) = split_triangle(0, &right_triangle(), &[cut], 1e-9);
        for v in pieces.iter().flat_map(|p| p.triangles.iter().flatten()) {
            assert_relative_eq!(v.uv, V2::new(v.position.x, v.position.y), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_split_solid_counts() {
        let mesh: Mesh = Primitive::cube(1.0).to_mesh();
        let solid = Solid::prepare(&mesh, Operand::A, 1e-9, 4).unwrap();
        let mut cuts = vec![Vec::new(); solid.len()];
        // Cut the first triangle through its interior
        let centroid = solid.triangles[0]
            .corners()
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / 3.0;
        let edge = solid.triangles[0].edge(0);
        let dir = edge.1 - edge.0;
        cuts[0].push((Point3::from(centroid - dir), Point3::from(centroid + dir)));
        let output = split_solid(&solid, &cuts, 1e-9);
        assert_eq!(output.split_triangles, 1);
        assert_eq!(output.pieces.len(), 13);
    }
}
