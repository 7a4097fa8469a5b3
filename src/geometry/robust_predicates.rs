// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tolerance-aware geometric predicates
//!
//! Every predicate takes the absolute tolerance `eps` of the current
//! operation instead of a global constant.

use nalgebra::{Point3, Vector3};

/// Barycentric coordinates closer than this to zero make a ray hit ambiguous
pub const BARYCENTRIC_GUARD: f64 = 1e-9;

/// Supporting plane `normal · x = offset` with a unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    /// Plane through a triangle, `None` when the triangle is degenerate
    pub fn from_triangle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(1e-300)?;
        Some(Self {
            normal,
            offset: normal.dot(&a.coords),
        })
    }

    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.offset
    }
}

/// Distance snapped to exactly zero inside the tolerance band
pub fn snap(distance: f64, eps: f64) -> f64 {
    if distance.abs() <= eps {
        0.0
    } else {
        distance
    }
}

/// Compute triangle area
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Smallest height of a triangle; zero for collapsed triangles
pub fn triangle_min_height(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let longest = (b - a).norm().max((c - b).norm()).max((a - c).norm());
    if longest <= 0.0 {
        return 0.0;
    }
    2.0 * triangle_area(a, b, c) / longest
}

/// Distance from `p` to segment `ab`, and the segment parameter of the foot
pub fn point_segment_distance(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> (f64, f64) {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= 0.0 {
        return ((p - a).norm(), 0.0);
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    ((p - (a + ab * t)).norm(), t)
}

/// Closed point-in-triangle test for a point (nearly) in the triangle's plane,
/// widened by `eps` in distance units
pub fn point_in_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    normal: &Vector3<f64>,
    eps: f64,
) -> bool {
    [(a, b), (b, c), (c, a)].iter().all(|(s, e)| {
        let edge = *e - *s;
        let len = edge.norm();
        if len <= 0.0 {
            return true;
        }
        // Signed distance of p to the edge line, positive on the inner side
        normal.cross(&edge).dot(&(p - *s)) / len >= -eps
    })
}

/// Outcome of a ray/triangle test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayHit {
    Miss,
    Hit(f64),
    /// Grazes an edge or vertex, or runs inside the triangle's plane
    Ambiguous,
}

/// Möller–Trumbore ray/triangle intersection.
///
/// Hits at `t <= eps` are ignored so a ray leaving a surface does not count
/// that surface.
pub fn ray_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    eps: f64,
) -> RayHit {
    let e1 = b - a;
    let e2 = c - a;
    let pvec = dir.cross(&e2);
    let det = e1.dot(&pvec);

    let normal = e1.cross(&e2);
    let normal_len = normal.norm();
    if normal_len <= 0.0 {
        return RayHit::Miss;
    }

    // Parallel to the plane: ambiguous only if the ray lies in it
    if det.abs() <= 1e-12 * normal_len {
        let distance = normal.dot(&(origin - a)) / normal_len;
        if distance.abs() <= eps && point_in_triangle(origin, a, b, c, &(normal / normal_len), eps)
        {
            return RayHit::Ambiguous;
        }
        if distance.abs() <= eps {
            // In-plane ray: ambiguous if it crosses the triangle at all
            return if ray_crosses_in_plane(origin, dir, a, b, c) {
                RayHit::Ambiguous
            } else {
                RayHit::Miss
            };
        }
        return RayHit::Miss;
    }

    let inv_det = 1.0 / det;
    let tvec = origin - a;
    let u = tvec.dot(&pvec) * inv_det;
    let qvec = tvec.cross(&e1);
    let v = dir.dot(&qvec) * inv_det;
    let t = e2.dot(&qvec) * inv_det;

    if t <= eps {
        return RayHit::Miss;
    }

    let w = 1.0 - u - v;
    if u < -BARYCENTRIC_GUARD || v < -BARYCENTRIC_GUARD || w < -BARYCENTRIC_GUARD {
        return RayHit::Miss;
    }
    if u < BARYCENTRIC_GUARD || v < BARYCENTRIC_GUARD || w < BARYCENTRIC_GUARD {
        return RayHit::Ambiguous;
    }
    RayHit::Hit(t)
}

/// Whether an in-plane ray passes through any edge of the triangle
fn ray_crosses_in_plane(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> bool {
    let normal = (b - a).cross(&(c - a));
    let side = normal.cross(dir);
    [(a, b), (b, c), (c, a)].iter().any(|(s, e)| {
        let ds = side.dot(&(*s - origin));
        let de = side.dot(&(*e - origin));
        if ds * de > 0.0 {
            return false;
        }
        // Crossing point must be ahead of the origin
        let t = if (ds - de).abs() > 0.0 { ds / (ds - de) } else { 0.0 };
        let crossing = *s + (*e - *s) * t;
        dir.dot(&(crossing - origin)) >= 0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> [Point3<f64>; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_plane_distance_and_snap() {
        let [a, b, c] = tri();
        let plane = Plane::from_triangle(&a, &b, &c).unwrap();
        assert_eq!(plane.signed_distance(&Point3::new(0.2, 0.2, 1.0)), 1.0);
        assert_eq!(plane.signed_distance(&Point3::new(0.2, 0.2, -1.0)), -1.0);
        assert_eq!(snap(plane.signed_distance(&Point3::new(5.0, 5.0, 1e-12)), 1e-9), 0.0);
        assert_eq!(snap(0.5, 1e-9), 0.5);
    }

    #[test]
    fn test_degenerate_plane() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 1.0, 1.0);
        let c = Point3::new(2.0, 2.0, 2.0);
        assert!(Plane::from_triangle(&a, &b, &c).is_none());
        assert_eq!(triangle_min_height(&a, &b, &c), 0.0);
    }

    #[test]
    fn test_ray_hit_and_miss() {
        let [a, b, c] = tri();
        let origin = Point3::new(0.25, 0.25, -1.0);
        match ray_triangle(&origin, &Vector3::z(), &a, &b, &c, 1e-9) {
            RayHit::Hit(t) => assert!((t - 1.0).abs() < 1e-12),
            other => panic!("expected hit, got {:?}", other),
        }
        assert_eq!(ray_triangle(&origin, &-Vector3::z(), &a, &b, &c, 1e-9), RayHit::Miss);
        let outside = Point3::new(2.0, 2.0, -1.0);
        assert_eq!(ray_triangle(&outside, &Vector3::z(), &a, &b, &c, 1e-9), RayHit::Miss);
    }

    #[test]
    fn test_ray_through_edge_is_ambiguous() {
        let [a, b, c] = tri();
        let origin = Point3::new(0.5, 0.0, -1.0);
        assert_eq!(ray_triangle(&origin, &Vector3::z(), &a, &b, &c, 1e-9), RayHit::Ambiguous);
    }

    #[test]
    fn test_in_plane_ray_is_ambiguous() {
        let [a, b, c] = tri();
        let origin = Point3::new(-1.0, 0.25, 0.0);
        assert_eq!(ray_triangle(&origin, &Vector3::x(), &a, &b, &c, 1e-9), RayHit::Ambiguous);
        let away = Point3::new(-1.0, 0.25, 0.0);
        assert_eq!(ray_triangle(&away, &-Vector3::x(), &a, &b, &c, 1e-9), RayHit::Miss);
    }

    #[test]
    fn test_point_in_triangle_with_tolerance() {
        let [a, b, c] = tri();
        let n = Vector3::z();
        assert!(point_in_triangle(&Point3::new(0.2, 0.2, 0.0), &a, &b, &c, &n, 1e-9));
        assert!(point_in_triangle(&Point3::new(0.5, -1e-10, 0.0), &a, &b, &c, &n, 1e-9));
        assert!(!point_in_triangle(&Point3::new(0.5, -1e-3, 0.0), &a, &b, &c, &n, 1e-9));
    }
}
