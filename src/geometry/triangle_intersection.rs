// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle-triangle intersection between two prepared operands

use super::robust_predicates::{point_segment_distance, snap, Plane};
use super::solid::Solid;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Planes whose normals' cross product is shorter than this are parallel
const PARALLEL_EPS: f64 = 1e-12;

/// A cut line segment in a triangle's plane
pub type Cut = (Point3<f64>, Point3<f64>);

/// Outcome of intersecting two triangles
#[derive(Debug, Clone, PartialEq)]
pub enum TriangleContact {
    /// Disjoint, or touching only at a point or along a shared boundary
    None,
    /// Both supporting planes coincide within tolerance
    Coplanar,
    /// The triangles cross along this segment
    Segment(Point3<f64>, Point3<f64>),
}

/// Segment where triangle `tri_a` of A and `tri_b` of B cross
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionSegment {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    pub tri_a: usize,
    pub tri_b: usize,
}

/// Every contact found between two operands
#[derive(Debug, Clone, Default)]
pub struct IntersectionSet {
    pub segments: Vec<IntersectionSegment>,
    /// Coplanar `(tri_a, tri_b)` pairs
    pub coplanar: Vec<(usize, usize)>,
    /// Pairs that survived the broad phase
    pub candidate_pairs: usize,
}

impl IntersectionSet {
    /// Per-triangle cut lists for A and B.
    ///
    /// Crossing segments cut both triangles. A coplanar contact hands each
    /// triangle the feature edges of its partner.
    pub fn cuts(&self, a: &Solid, b: &Solid) -> (Vec<Vec<Cut>>, Vec<Vec<Cut>>) {
        let mut cuts_a = vec![Vec::new(); a.len()];
        let mut cuts_b = vec![Vec::new(); b.len()];

        for segment in &self.segments {
            cuts_a[segment.tri_a].push((segment.start, segment.end));
            cuts_b[segment.tri_b].push((segment.start, segment.end));
        }

        for &(i, j) in &self.coplanar {
            let (ta, tb) = (&a.triangles[i], &b.triangles[j]);
            for k in 0..3 {
                if tb.feature[k] {
                    cuts_a[i].push(tb.edge(k));
                }
                if ta.feature[k] {
                    cuts_b[j].push(ta.edge(k));
                }
            }
        }

        (cuts_a, cuts_b)
    }
}

/// Broad phase through both BVHs, then the exact test on every candidate
pub fn compute_intersections(a: &Solid, b: &Solid, eps: f64) -> IntersectionSet {
    let pairs = a.bvh.query_overlaps(&b.bvh, eps);

    let contacts: Vec<(usize, usize, TriangleContact)> = pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            let ta = &a.triangles[i];
            let tb = &b.triangles[j];
            match intersect_triangles(&ta.corners(), &ta.plane, &tb.corners(), &tb.plane, eps) {
                TriangleContact::None => None,
                contact => Some((i, j, contact)),
            }
        })
        .collect();

    let mut set = IntersectionSet {
        candidate_pairs: pairs.len(),
        ..Default::default()
    };
    for (tri_a, tri_b, contact) in contacts {
        match contact {
            TriangleContact::Segment(start, end) => set.segments.push(IntersectionSegment {
                start,
                end,
                tri_a,
                tri_b,
            }),
            TriangleContact::Coplanar => set.coplanar.push((tri_a, tri_b)),
            TriangleContact::None => {}
        }
    }
    set
}

/// Intersect two triangles given with their supporting planes
pub fn intersect_triangles(
    a: &[Point3<f64>; 3],
    plane_a: &Plane,
    b: &[Point3<f64>; 3],
    plane_b: &Plane,
    eps: f64,
) -> TriangleContact {
    let dist_a = a.map(|p| snap(plane_b.signed_distance(&p), eps));
    let dist_b = b.map(|p| snap(plane_a.signed_distance(&p), eps));

    if dist_a.iter().all(|&d| d == 0.0) || dist_b.iter().all(|&d| d == 0.0) {
        return TriangleContact::Coplanar;
    }
    if same_strict_side(&dist_a) || same_strict_side(&dist_b) {
        return TriangleContact::None;
    }

    let dir = plane_a.normal.cross(&plane_b.normal);
    let Some(dir) = dir.try_normalize(PARALLEL_EPS) else {
        return TriangleContact::None;
    };

    let crossings_a = plane_crossings(a, &dist_a);
    let crossings_b = plane_crossings(b, &dist_b);
    let (Some(span_a), Some(span_b)) = (span(&crossings_a, &dir), span(&crossings_b, &dir)) else {
        return TriangleContact::None;
    };

    let start = if span_a.0 .0 >= span_b.0 .0 { span_a.0 } else { span_b.0 };
    let end = if span_a.1 .0 <= span_b.1 .0 { span_a.1 } else { span_b.1 };
    if end.0 - start.0 <= eps {
        return TriangleContact::None;
    }

    let (p, q) = (start.1, end.1);
    if on_boundary(a, &p, &q, eps) && on_boundary(b, &p, &q, eps) {
        return TriangleContact::None;
    }
    TriangleContact::Segment(p, q)
}

fn same_strict_side(distances: &[f64; 3]) -> bool {
    distances.iter().all(|&d| d > 0.0) || distances.iter().all(|&d| d < 0.0)
}

/// Points where a triangle meets the other plane: corners on the plane, and
/// crossings of edges whose ends lie on opposite sides
fn plane_crossings(tri: &[Point3<f64>; 3], dist: &[f64; 3]) -> Vec<Point3<f64>> {
    let mut points = Vec::with_capacity(2);
    for k in 0..3 {
        if dist[k] == 0.0 {
            points.push(tri[k]);
        }
    }
    for k in 0..3 {
        let j = (k + 1) % 3;
        if dist[k] * dist[j] < 0.0 {
            points.push(edge_crossing(&tri[k], dist[k], &tri[j], dist[j]));
        }
    }
    points
}

/// Crossing point of edge (p, q) with a plane. Endpoints are ordered
/// lexicographically first so a shared edge yields bit-identical points.
fn edge_crossing(p: &Point3<f64>, dp: f64, q: &Point3<f64>, dq: f64) -> Point3<f64> {
    let (p, dp, q, dq) = if lex_cmp(p, q) == Ordering::Greater {
        (q, dq, p, dp)
    } else {
        (p, dp, q, dq)
    };
    let t = dp / (dp - dq);
    p + (q - p) * t
}

fn lex_cmp(a: &Point3<f64>, b: &Point3<f64>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// Extreme points along `dir` as ((param, point), (param, point))
#[allow(clippy::type_complexity)]
fn span(points: &[Point3<f64>], dir: &Vector3<f64>) -> Option<((f64, Point3<f64>), (f64, Point3<f64>))> {
    if points.len() < 2 {
        return None;
    }
    let mut lo = (f64::INFINITY, points[0]);
    let mut hi = (f64::NEG_INFINITY, points[0]);
    for p in points {
        let s = dir.dot(&p.coords);
        if s < lo.0 {
            lo = (s, *p);
        }
        if s > hi.0 {
            hi = (s, *p);
        }
    }
    Some((lo, hi))
}

/// Whether segment (p, q) runs along one edge of the triangle
fn on_boundary(tri: &[Point3<f64>; 3], p: &Point3<f64>, q: &Point3<f64>, eps: f64) -> bool {
    (0..3).any(|k| {
        let (s, e) = (&tri[k], &tri[(k + 1) % 3]);
        point_segment_distance(p, s, e).0 <= eps && point_segment_distance(q, s, e).0 <= eps
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plane(t: &[Point3<f64>; 3]) -> Plane {
        Plane::from_triangle(&t[0], &t[1], &t[2]).unwrap()
    }

    fn contact(a: [Point3<f64>; 3], b: [Point3<f64>; 3]) -> TriangleContact {
        intersect_triangles(&a, &plane(&a), &b, &plane(&b), 1e-9)
    }

    fn flat() -> [Point3<f64>; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn test_crossing_segment() {
        let upright = [
            Point3::new(0.5, -1.0, -1.0),
            Point3::new(0.5, 3.0, -1.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        match contact(flat(), upright) {
            TriangleContact::Segment(p, q) => {
                let (lo, hi) = if p.y < q.y { (p, q) } else { (q, p) };
                assert_relative_eq!(lo, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
                assert_relative_eq!(hi.x, 0.5, epsilon = 1e-12);
                assert_relative_eq!(hi.z, 0.0, epsilon = 1e-12);
                // Clipped to the hypotenuse of the flat triangle
                assert!(hi.y < 1.5 + 1e-12);
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn test_separated_triangles() {
        let above = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.5),
            Point3::new(0.0, 1.0, 1.0),
        ];
        assert_eq!(contact(flat(), above), TriangleContact::None);
    }

    #[test]
    fn test_coplanar() {
        let other = [
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(3.0, 0.5, 0.0),
            Point3::new(0.5, 3.0, 0.0),
        ];
        assert_eq!(contact(flat(), other), TriangleContact::Coplanar);
    }

    #[test]
    fn test_vertex_touch_is_not_a_segment() {
        let touching = [
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(1.0, 0.5, 1.0),
            Point3::new(0.5, 1.0, 1.0),
        ];
        assert_eq!(contact(flat(), touching), TriangleContact::None);
    }

    #[test]
    fn test_shared_edge_is_not_a_segment() {
        // Folded neighbour sharing the edge x = 0
        let neighbour = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        ];
        assert_eq!(contact(flat(), neighbour), TriangleContact::None);
    }

    #[test]
    fn test_edge_crossing_is_order_independent() {
        let p = Point3::new(0.1, 0.3, -0.7);
        let q = Point3::new(0.9, -0.2, 0.4);
        let a = edge_crossing(&p, -0.7, &q, 0.4);
        let b = edge_crossing(&q, 0.4, &p, -0.7);
        assert_eq!(a, b);
    }
}
