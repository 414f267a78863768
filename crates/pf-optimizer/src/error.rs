//! Error types for control-valve optimization.

use pf_core::PfError;
use pf_model::ModelError;
use pf_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Downstream pressure exceeds upstream pressure ({downstream} Pa > {upstream} Pa)")]
    Infeasible { upstream: f64, downstream: f64 },

    #[error("Valve optimization requires {what}")]
    MissingBoundary { what: &'static str },

    #[error("Optimizer setup error: {what}")]
    Setup { what: String },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type OptimizerResult<T> = Result<T, OptimizerError>;

impl From<OptimizerError> for PfError {
    fn from(e: OptimizerError) -> Self {
        match e {
            OptimizerError::Solver(inner) => inner.into(),
            other => PfError::InvalidArg {
                what: other.to_string(),
            },
        }
    }
}
