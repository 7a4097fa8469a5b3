// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar projection and ear-clipping triangulation

use nalgebra::{Point2, Point3, Vector3};

/// Orthonormal frame of a plane; `u × v = normal`, so counter-clockwise
/// loops around `normal` stay counter-clockwise in 2D
#[derive(Debug, Clone, Copy)]
pub struct PlaneBasis {
    pub origin: Point3<f64>,
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl PlaneBasis {
    /// Build a frame from any (non-zero) normal
    pub fn new(origin: Point3<f64>, normal: &Vector3<f64>) -> Option<Self> {
        let normal = normal.try_normalize(1e-300)?;
        // Pick the world axis least aligned with the normal
        let abs = normal.map(|c| c.abs());
        let axis = if abs.x <= abs.y && abs.x <= abs.z {
            Vector3::x()
        } else if abs.y <= abs.z {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let u = axis.cross(&normal).normalize();
        let v = normal.cross(&u);
        Some(Self {
            origin,
            u,
            v,
            normal,
        })
    }

    pub fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        let d = point - self.origin;
        Point2::new(d.dot(&self.u), d.dot(&self.v))
    }
}

/// Newell normal of a polygon loop; its length is twice the polygon area
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = points.len();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Twice the signed area of triangle (a, b, c); positive when counter-clockwise
pub fn cross2(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Height of `c` above the line through `a` and `b` (signed)
fn height(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    let len = (b - a).norm();
    if len < 1e-300 {
        return (c - a).norm();
    }
    cross2(a, b, c) / len
}

/// Closed point-in-triangle test widened by `tolerance`
fn in_triangle(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, tolerance: f64) -> bool {
    height(a, b, p) >= -tolerance && height(b, c, p) >= -tolerance && height(c, a, p) >= -tolerance
}

/// Ear-clip a simple counter-clockwise polygon.
///
/// Vertices within `tolerance` of the line through their neighbours are never
/// clipped as ears, so collinear boundary points survive as triangle corners.
/// Returned triangles index into `points` and keep counter-clockwise order.
pub fn ear_clip(points: &[Point2<f64>], tolerance: f64) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let mut ring: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while ring.len() > 3 {
        let len = ring.len();
        let mut ear = None;

        for k in 0..len {
            let prev = ring[(k + len - 1) % len];
            let cur = ring[k];
            let next = ring[(k + 1) % len];
            let (a, b, c) = (&points[prev], &points[cur], &points[next]);

            // Reflex or flat corner
            if height(c, a, b) <= tolerance {
                continue;
            }

            let blocked = ring.iter().any(|&other| {
                other != prev
                    && other != cur
                    && other != next
                    && in_triangle(&points[other], a, b, c, tolerance)
            });
            if !blocked {
                ear = Some(k);
                break;
            }
        }

        // Numerically stuck: take the most convex corner
        let k = ear.unwrap_or_else(|| {
            (0..len)
                .max_by(|&i, &j| {
                    let ci = corner_turn(points, &ring, i);
                    let cj = corner_turn(points, &ring, j);
                    ci.total_cmp(&cj)
                })
                .unwrap_or(0)
        });

        let prev = ring[(k + len - 1) % len];
        let next = ring[(k + 1) % len];
        triangles.push([prev, ring[k], next]);
        ring.remove(k);
    }

    triangles.push([ring[0], ring[1], ring[2]]);
    triangles
}

fn corner_turn(points: &[Point2<f64>], ring: &[usize], k: usize) -> f64 {
    let len = ring.len();
    cross2(
        &points[ring[(k + len - 1) % len]],
        &points[ring[k]],
        &points[ring[(k + 1) % len]],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_of(points: &[Point2<f64>], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| cross2(&points[t[0]], &points[t[1]], &points[t[2]]) / 2.0)
            .sum()
    }

    #[test]
    fn test_square() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let tris = ear_clip(&pts, 1e-9);
        assert_eq!(tris.len(), 2);
        assert!((area_of(&pts, &tris) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_concave_polygon() {
        // L-shape
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let tris = ear_clip(&pts, 1e-9);
        assert_eq!(tris.len(), 4);
        assert!((area_of(&pts, &tris) - 3.0).abs() < 1e-12);
        for t in &tris {
            assert!(cross2(&pts[t[0]], &pts[t[1]], &pts[t[2]]) > 0.0);
        }
    }

    #[test]
    fn test_collinear_points_are_kept() {
        // Triangle with a midpoint on its base
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let tris = ear_clip(&pts, 1e-9);
        assert_eq!(tris.len(), 2);
        assert!(tris.iter().all(|t| t.contains(&1)));
        for t in &tris {
            assert!(cross2(&pts[t[0]], &pts[t[1]], &pts[t[2]]) > 1e-6);
        }
    }

    #[test]
    fn test_basis_is_right_handed() {
        let normal = Vector3::new(0.3, -0.2, 0.9);
        let basis = PlaneBasis::new(Point3::origin(), &normal).unwrap();
        assert!((basis.u.cross(&basis.v) - basis.normal).norm() < 1e-12);
    }

    #[test]
    fn test_newell_normal_area() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 3.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ];
        let n = newell_normal(&pts);
        assert!((n.z - 12.0).abs() < 1e-12);
    }
}
