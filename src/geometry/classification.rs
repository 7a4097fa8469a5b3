// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Piece classification against the other solid
//!
//! A piece is first tested for lying on the other surface; otherwise a ray
//! from its centroid counts surface crossings. Rays that graze an edge or run
//! inside a face are retried along the next direction of a seeded sequence.

use super::robust_predicates::{point_in_triangle, ray_triangle, RayHit};
use super::solid::Solid;
use super::triangle_splitting::Piece;
use super::BoundingBox;
use crate::error::{CsgError, CsgResult};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Two faces are parallel when their normals' dot product exceeds this
const PARALLEL_DOT: f64 = 1.0 - 1e-6;

/// Position of a piece relative to the other solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Inside,
    Outside,
    /// On the other surface with agreeing outward normal
    CoplanarSame,
    /// On the other surface with opposite outward normal
    CoplanarOpposite,
}

/// Classification of every piece plus the number of ray retries spent
#[derive(Debug, Clone, Default)]
pub struct ClassifiedPieces {
    pub tags: Vec<Classification>,
    pub retries: usize,
}

/// Classify `pieces` against `other`, in parallel and in input order
pub fn classify_pieces(
    pieces: &[Piece],
    other: &Solid,
    eps: f64,
    max_retries: usize,
    seed: u64,
) -> CsgResult<ClassifiedPieces> {
    let results: Vec<(Classification, usize)> = pieces
        .par_iter()
        .map(|piece| classify_point(&piece.centroid, &piece.normal, other, eps, max_retries, seed))
        .collect::<CsgResult<_>>()?;

    let retries = results.iter().map(|(_, r)| r).sum();
    if retries > 0 {
        debug!(operand = %other.operand, retries, "classification rays retried");
    }
    Ok(ClassifiedPieces {
        tags: results.into_iter().map(|(c, _)| c).collect(),
        retries,
    })
}

/// Classify one point carrying the outward normal of its surface
pub fn classify_point(
    point: &Point3<f64>,
    normal: &Vector3<f64>,
    other: &Solid,
    eps: f64,
    max_retries: usize,
    seed: u64,
) -> CsgResult<(Classification, usize)> {
    if let Some(coplanar) = coplanar_classification(point, normal, other, eps) {
        return Ok((coplanar, 0));
    }

    let mut directions = RayDirections::new(seed);
    for attempt in 0..=max_retries {
        let dir = directions.next_direction();
        if let Some(crossings) = count_crossings(point, &dir, other, eps) {
            let class = if crossings % 2 == 1 {
                Classification::Inside
            } else {
                Classification::Outside
            };
            return Ok((class, attempt));
        }
    }

    warn!(
        x = point.x,
        y = point.y,
        z = point.z,
        max_retries,
        "no unambiguous classification ray"
    );
    Err(CsgError::numeric(
        "classification",
        format!(
            "every ray from ({:.6}, {:.6}, {:.6}) grazed the surface after {} retries",
            point.x, point.y, point.z, max_retries
        ),
    ))
}

/// Coplanar-same/opposite when the point lies inside a parallel face of `other`
fn coplanar_classification(
    point: &Point3<f64>,
    normal: &Vector3<f64>,
    other: &Solid,
    eps: f64,
) -> Option<Classification> {
    let query = BoundingBox::new(*point, *point).expanded(eps);
    other.bvh.query_box(&query).into_iter().find_map(|index| {
        let triangle = &other.triangles[index];
        let dot = triangle.plane.normal.dot(normal);
        if dot.abs() <= PARALLEL_DOT || triangle.plane.signed_distance(point).abs() > eps {
            return None;
        }
        let [a, b, c] = triangle.corners();
        if !point_in_triangle(point, &a, &b, &c, &triangle.plane.normal, eps) {
            return None;
        }
        Some(if dot > 0.0 {
            Classification::CoplanarSame
        } else {
            Classification::CoplanarOpposite
        })
    })
}

/// Number of surface crossings along the ray, `None` when ambiguous
fn count_crossings(origin: &Point3<f64>, dir: &Vector3<f64>, other: &Solid, eps: f64) -> Option<usize> {
    let mut crossings = 0;
    for index in other.bvh.query_ray(origin, dir, eps) {
        let [a, b, c] = other.triangles[index].corners();
        match ray_triangle(origin, dir, &a, &b, &c, eps) {
            RayHit::Hit(_) => crossings += 1,
            RayHit::Miss => {}
            RayHit::Ambiguous => return None,
        }
    }
    Some(crossings)
}

/// +X first, then seeded pseudo-random unit vectors
struct RayDirections {
    rng: StdRng,
    first: bool,
}

impl RayDirections {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            first: true,
        }
    }

    fn next_direction(&mut self) -> Vector3<f64> {
        if std::mem::take(&mut self.first) {
            return Vector3::x();
        }
        loop {
            let v = Vector3::new(
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
            );
            let norm = v.norm();
            // Rejection sampling keeps the directions uniform on the sphere
            if norm > 0.1 && norm <= 1.0 {
                return v / norm;
            }
        }
    }
}
