//! Error types for network solving.

use pf_calc::CalcError;
use pf_core::PfError;
use pf_graph::GraphError;
use pf_model::ModelError;
use thiserror::Error;

/// Errors that can occur while solving a network or a system of networks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("missing required input: {what}")]
    MissingInput { what: String },

    #[error("Negative pressure {pressure} Pa computed at node '{node}' (section '{section}')")]
    NegativePressure {
        section: String,
        node: String,
        pressure: f64,
    },

    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        SolverError::MissingInput { what: what.into() }
    }

    pub(crate) fn setup(what: impl Into<String>) -> Self {
        SolverError::ProblemSetup { what: what.into() }
    }
}

impl From<SolverError> for PfError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Calc(inner) => inner.into(),
            other => PfError::InvalidArg {
                what: other.to_string(),
            },
        }
    }
}
