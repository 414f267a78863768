//! Validation errors for model construction.

use pf_core::PfError;
use pf_graph::GraphError;
use thiserror::Error;

/// Errors raised while constructing or querying model objects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Missing required input: {what}")]
    Missing { what: String },

    #[error("Unknown {what}: '{value}'")]
    UnknownVariant { what: &'static str, value: String },

    #[error("Topology error: {0}")]
    Graph(#[from] GraphError),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ModelError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<ModelError> for PfError {
    fn from(e: ModelError) -> Self {
        PfError::InvalidArg {
            what: e.to_string(),
        }
    }
}

/// Accept a strictly positive, finite value.
pub(crate) fn positive(field: &'static str, v: f64) -> ModelResult<f64> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(ModelError::invalid(field, format!("must be positive (got {v})")))
    }
}

/// Accept `None`, or a strictly positive finite value.
pub(crate) fn positive_opt(field: &'static str, v: Option<f64>) -> ModelResult<Option<f64>> {
    v.map(|x| positive(field, x)).transpose()
}

pub(crate) fn non_negative(field: &'static str, v: f64) -> ModelResult<f64> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(ModelError::invalid(field, format!("must be non-negative (got {v})")))
    }
}
