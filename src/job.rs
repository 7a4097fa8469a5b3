// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Background evaluation with completion delivery
//!
//! A host (UI loop, CLI spinner) starts an evaluation on the rayon pool and
//! polls or blocks on the returned handle. Dropping the handle abandons the
//! result.

use crate::engine::{Engine, EvaluationReport};
use crate::error::CsgError;
use crate::geometry::{BooleanOp, Mesh};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Finished evaluation
pub type EvaluationOutcome = (Mesh, EvaluationReport);

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Csg(#[from] CsgError),

    #[error("evaluation worker exited without delivering a result")]
    Disconnected,
}

/// Handle to an evaluation running in the background
pub struct EvaluationHandle {
    receiver: Receiver<Result<EvaluationOutcome, CsgError>>,
}

impl EvaluationHandle {
    /// Result if the evaluation has finished, without blocking
    pub fn try_result(&self) -> Option<Result<EvaluationOutcome, JobError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result.map_err(JobError::from)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(JobError::Disconnected)),
        }
    }

    /// Block until the evaluation finishes
    pub fn wait(self) -> Result<EvaluationOutcome, JobError> {
        match self.receiver.recv() {
            Ok(result) => result.map_err(JobError::from),
            Err(_) => Err(JobError::Disconnected),
        }
    }

    /// Block for at most `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<EvaluationOutcome, JobError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result.map_err(JobError::from)),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(JobError::Disconnected)),
        }
    }
}

/// Start `a op b` on the rayon pool. The meshes are moved into the job.
pub fn spawn_evaluation(engine: Engine, a: Mesh, b: Mesh, op: BooleanOp) -> EvaluationHandle {
    let (sender, receiver) = mpsc::channel();
    rayon::spawn(move || {
        let result = engine.evaluate_with_report(&a, &b, op);
        // The host may have dropped the handle
        if sender.send(result).is_err() {
            debug!(op = %op, "evaluation result abandoned");
        }
    });
    EvaluationHandle { receiver }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    #[test]
    fn test_background_evaluation() {
        let a = Primitive::cube(1.0).to_mesh();
        let b = a.translated(Vector3::new(0.5, 0.5, 0.5));
        let handle = spawn_evaluation(Engine::default(), a, b, BooleanOp::Union);
        let (mesh, report) = handle.wait().unwrap();
        assert!(!mesh.is_empty());
        assert_eq!(report.op, BooleanOp::Union);
    }

    #[test]
    fn test_errors_are_delivered() {
        let a = Primitive::cube(1.0).to_mesh();
        let b = a.translated(Vector3::new(5.0, 0.0, 0.0));
        let handle = spawn_evaluation(Engine::default(), a, b, BooleanOp::Intersect);
        let result = loop {
            if let Some(result) = handle.wait_timeout(Duration::from_millis(10)) {
                break result;
            }
        };
        assert!(matches!(result, Err(JobError::Csg(CsgError::DegenerateResult { .. }))));
    }

    #[test]
    fn test_try_result_eventually_ready() {
        let a = Primitive::cube(1.0).to_mesh();
        let handle = spawn_evaluation(Engine::default(), a.clone(), a, BooleanOp::Intersect);
        let result = loop {
            match handle.try_result() {
                Some(result) => break result,
                None => std::thread::sleep(Duration::from_millis(1)),
            }
        };
        assert!(result.is_ok());
    }
}
