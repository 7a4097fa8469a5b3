// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean evaluation engine
//!
//! Orchestrates operand preparation, intersection, re-triangulation,
//! classification, selection and reconstruction for one boolean call. Every
//! intermediate structure is owned by the call and dropped when it returns.

use crate::config::EngineConfig;
use crate::error::{CsgError, CsgResult, Operand};
use crate::geometry::boolean::{collect_selected, SelectedTriangle};
use crate::geometry::classification::classify_pieces;
use crate::geometry::mesh_reconstruction::reconstruct_mesh;
use crate::geometry::solid::Solid;
use crate::geometry::triangle_intersection::compute_intersections;
use crate::geometry::triangle_splitting::split_solid;
use crate::geometry::{BooleanOp, Mesh};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Wall time spent per stage
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageTimings {
    pub prepare: Duration,
    pub intersect: Duration,
    pub split: Duration,
    pub classify: Duration,
    pub assemble: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.prepare + self.intersect + self.split + self.classify + self.assemble
    }
}

/// Counters and timings of one evaluation
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub op: BooleanOp,
    /// Absolute tolerance used for this call
    pub epsilon: f64,
    /// Bounding boxes were disjoint and no narrow phase ran
    pub fast_path: bool,
    pub triangles_a: usize,
    pub triangles_b: usize,
    pub candidate_pairs: usize,
    pub intersection_segments: usize,
    pub coplanar_contacts: usize,
    pub split_triangles: usize,
    pub pieces_a: usize,
    pub pieces_b: usize,
    pub slivers_dropped: usize,
    pub classification_retries: usize,
    pub selected_triangles: usize,
    pub welded_vertices: usize,
    pub tjunctions_repaired: usize,
    pub output_triangles: usize,
    pub timings: StageTimings,
}

impl EvaluationReport {
    pub fn new(op: BooleanOp, epsilon: f64) -> Self {
        Self {
            op,
            epsilon,
            fast_path: false,
            triangles_a: 0,
            triangles_b: 0,
            candidate_pairs: 0,
            intersection_segments: 0,
            coplanar_contacts: 0,
            split_triangles: 0,
            pieces_a: 0,
            pieces_b: 0,
            slivers_dropped: 0,
            classification_retries: 0,
            selected_triangles: 0,
            welded_vertices: 0,
            tjunctions_repaired: 0,
            output_triangles: 0,
            timings: StageTimings::default(),
        }
    }

    /// Pretty print the report
    pub fn print(&self) {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║              EVALUATION REPORT                           ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║ Operation:       {:>12}                            ║", self.op.to_string());
        println!("║ Epsilon:         {:>12.3e}                            ║", self.epsilon);
        println!(
            "║ Fast path:       {:>12}                            ║",
            if self.fast_path { "Yes" } else { "No" }
        );
        println!("║                                                          ║");
        println!("║ Input triangles: {:>6} / {:<6}                         ║", self.triangles_a, self.triangles_b);
        println!("║ Candidate pairs: {:>12}                            ║", self.candidate_pairs);
        println!("║ Segments:        {:>12}                            ║", self.intersection_segments);
        println!("║ Coplanar pairs:  {:>12}                            ║", self.coplanar_contacts);
        println!("║ Split triangles: {:>12}                            ║", self.split_triangles);
        println!("║ Pieces:          {:>6} / {:<6}                         ║", self.pieces_a, self.pieces_b);
        println!("║ Slivers dropped: {:>12}                            ║", self.slivers_dropped);
        println!("║ Ray retries:     {:>12}                            ║", self.classification_retries);
        println!("║ T-junctions:     {:>12}                            ║", self.tjunctions_repaired);
        println!("║ Output:          {:>12} triangles                  ║", self.output_triangles);
        println!("║                                                          ║");
        println!("║ Prepare:         {:>10.3} ms                          ║", ms(self.timings.prepare));
        println!("║ Intersect:       {:>10.3} ms                          ║", ms(self.timings.intersect));
        println!("║ Split:           {:>10.3} ms                          ║", ms(self.timings.split));
        println!("║ Classify:        {:>10.3} ms                          ║", ms(self.timings.classify));
        println!("║ Assemble:        {:>10.3} ms                          ║", ms(self.timings.assemble));
        println!("║ Total:           {:>10.3} ms                          ║", ms(self.timings.total()));
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

/// Boolean evaluation engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate `a op b`. Inputs are never modified.
    pub fn evaluate(&self, a: &Mesh, b: &Mesh, op: BooleanOp) -> CsgResult<Mesh> {
        self.evaluate_with_report(a, b, op).map(|(mesh, _)| mesh)
    }

    /// Evaluate and return stage counters alongside the mesh
    #[instrument(skip_all, fields(op = %op))]
    pub fn evaluate_with_report(&self, a: &Mesh, b: &Mesh, op: BooleanOp) -> CsgResult<(Mesh, EvaluationReport)> {
        let diagonal = a.bounding_box().union(&b.bounding_box()).diagonal();
        let eps = self.config.epsilon_for(diagonal);
        let mut report = EvaluationReport::new(op, eps);
        let leaf_size = self.config.bvh_leaf_size;

        let start = Instant::now();
        let (solid_a, solid_b) = rayon::join(
            || Solid::prepare(a, Operand::A, eps, leaf_size),
            || Solid::prepare(b, Operand::B, eps, leaf_size),
        );
        let (solid_a, solid_b) = (solid_a?, solid_b?);
        report.triangles_a = solid_a.len();
        report.triangles_b = solid_b.len();

        if !solid_a.bbox.expanded(eps).intersects(&solid_b.bbox) {
            report.fast_path = true;
            report.timings.prepare = start.elapsed();
            debug!("bounding boxes are disjoint");
            let mesh = match op {
                BooleanOp::Union => {
                    let mut merged = a.clone();
                    merged.merge(b);
                    merged.triangulate()
                }
                BooleanOp::Subtract => a.triangulate(),
                BooleanOp::Intersect => return Err(CsgError::DegenerateResult { op }),
            };
            report.output_triangles = mesh.triangle_count();
            return Ok((mesh, report));
        }

        if self.config.check_self_intersection {
            let (check_a, check_b) = rayon::join(
                || solid_a.check_self_intersection(eps),
                || solid_b.check_self_intersection(eps),
            );
            check_a?;
            check_b?;
        }
        report.timings.prepare = start.elapsed();

        let start = Instant::now();
        let intersections = compute_intersections(&solid_a, &solid_b, eps);
        let (cuts_a, cuts_b) = intersections.cuts(&solid_a, &solid_b);
        report.candidate_pairs = intersections.candidate_pairs;
        report.intersection_segments = intersections.segments.len();
        report.coplanar_contacts = intersections.coplanar.len();
        report.timings.intersect = start.elapsed();
        debug!(
            candidates = report.candidate_pairs,
            segments = report.intersection_segments,
            coplanar = report.coplanar_contacts,
            "intersection stage"
        );

        let start = Instant::now();
        let (split_a, split_b) = rayon::join(
            || split_solid(&solid_a, &cuts_a, eps),
            || split_solid(&solid_b, &cuts_b, eps),
        );
        report.split_triangles = split_a.split_triangles + split_b.split_triangles;
        report.slivers_dropped = split_a.slivers_dropped + split_b.slivers_dropped;
        report.pieces_a = split_a.pieces.len();
        report.pieces_b = split_b.pieces.len();
        report.timings.split = start.elapsed();

        let start = Instant::now();
        let retries = self.config.max_classification_retries;
        let seed = self.config.ray_seed;
        let (classes_a, classes_b) = rayon::join(
            || classify_pieces(&split_a.pieces, &solid_b, eps, retries, seed),
            || classify_pieces(&split_b.pieces, &solid_a, eps, retries, seed),
        );
        let (classes_a, classes_b) = (classes_a?, classes_b?);
        report.classification_retries = classes_a.retries + classes_b.retries;
        report.timings.classify = start.elapsed();

        let start = Instant::now();
        let mut selected: Vec<SelectedTriangle> = Vec::new();
        collect_selected(op, Operand::A, &split_a.pieces, &classes_a.tags, &mut selected);
        collect_selected(op, Operand::B, &split_b.pieces, &classes_b.tags, &mut selected);
        report.selected_triangles = selected.len();
        if selected.is_empty() {
            return Err(CsgError::DegenerateResult { op });
        }

        let (mesh, stats) = reconstruct_mesh(&selected, eps);
        report.welded_vertices = stats.welded_vertices;
        report.tjunctions_repaired = stats.tjunctions_repaired;
        report.output_triangles = mesh.polygon_count();
        report.timings.assemble = start.elapsed();
        if mesh.is_empty() {
            return Err(CsgError::DegenerateResult { op });
        }

        info!(
            triangles = report.output_triangles,
            slivers = report.slivers_dropped,
            elapsed_ms = report.timings.total().as_secs_f64() * 1000.0,
            "boolean evaluation finished"
        );
        Ok((mesh, report))
    }
}

/// Evaluate `a op b` with the default configuration
pub fn evaluate(a: &Mesh, b: &Mesh, op: BooleanOp) -> CsgResult<Mesh> {
    Engine::default().evaluate(a, b, op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_cube_at(x: f64, y: f64, z: f64) -> Mesh {
        Primitive::cube(1.0).to_mesh().translated(Vector3::new(x, y, z))
    }

    #[test]
    fn test_overlapping_cubes() {
        let a = unit_cube_at(0.0, 0.0, 0.0);
        let b = unit_cube_at(0.5, 0.25, 0.125);
        let engine = Engine::default();

        let (union, report) = engine.evaluate_with_report(&a, &b, BooleanOp::Union).unwrap();
        assert!(!report.fast_path);
        assert!(report.intersection_segments > 0);
        let overlap = 0.5 * 0.75 * 0.875;
        assert_relative_eq!(union.volume(), 2.0 - overlap, epsilon = 1e-9);

        let inter = engine.evaluate(&a, &b, BooleanOp::Intersect).unwrap();
        assert_relative_eq!(inter.volume(), overlap, epsilon = 1e-9);

        let diff = engine.evaluate(&a, &b, BooleanOp::Subtract).unwrap();
        assert_relative_eq!(diff.volume(), 1.0 - overlap, epsilon = 1e-9);
    }

    #[test]
    fn test_disjoint_fast_path() {
        let a = unit_cube_at(0.0, 0.0, 0.0);
        let b = unit_cube_at(3.0, 0.0, 0.0);
        let engine = Engine::default();

        let (union, report) = engine.evaluate_with_report(&a, &b, BooleanOp::Union).unwrap();
        assert!(report.fast_path);
        assert_eq!(report.candidate_pairs, 0);
        assert_eq!(report.output_triangles, 24);
        assert!(union.polygons.iter().all(|p| p.len() == 3));
        assert_relative_eq!(union.volume(), 2.0, epsilon = 1e-12);

        let diff = engine.evaluate(&a, &b, BooleanOp::Subtract).unwrap();
        assert_eq!(diff.vertices, a.vertices);
        assert_eq!(diff.polygons, a.triangulate().polygons);

        let err = engine.evaluate(&a, &b, BooleanOp::Intersect).unwrap_err();
        assert!(err.is_degenerate_result());
    }

    #[test]
    fn test_open_input_is_rejected() {
        let a = unit_cube_at(0.0, 0.0, 0.0);
        let mut b = unit_cube_at(0.5, 0.0, 0.0);
        b.polygons.truncate(5);
        let err = evaluate(&a, &b, BooleanOp::Union).unwrap_err();
        assert!(matches!(err, CsgError::IllDefinedInput { operand: Operand::B, .. }));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let a = unit_cube_at(0.0, 0.0, 0.0);
        let b = unit_cube_at(0.5, 0.5, 0.5);
        let (a_before, b_before) = (a.clone(), b.clone());
        evaluate(&a, &b, BooleanOp::Subtract).unwrap();
        assert_eq!(a.vertices, a_before.vertices);
        assert_eq!(b.polygons, b_before.polygons);
    }
}
