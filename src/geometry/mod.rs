// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and the boolean pipeline stages

pub mod analytics;
mod bbox;
pub mod boolean;
pub mod bvh;
pub mod classification;
mod mesh;
pub mod mesh_reconstruction;
pub mod mesh_utils;
mod primitives;
pub mod robust_predicates;
pub mod solid;
pub mod triangle_intersection;
pub mod triangle_splitting;
pub mod triangulation;

pub use analytics::GeometryStats;
pub use bbox::BoundingBox;
pub use boolean::BooleanOp;
pub use bvh::{BVHNode, BVH};
pub use classification::Classification;
pub use mesh::{Mesh, MeshBuffers, Polygon, Vertex};
pub use primitives::Primitive;
