//! Error types for loss calculations.

use pf_core::PfError;
use pf_model::ModelError;
use thiserror::Error;

/// Errors raised by calculators and compressible-flow solvers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("missing required input: {what}")]
    MissingInput { what: String },

    #[error("missing required gas-flow inputs: {fields}")]
    MissingGasInputs { fields: String },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: String },

    #[error("{message}")]
    Infeasible { message: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Numeric(#[from] PfError),
}

pub type CalcResult<T> = Result<T, CalcError>;

impl CalcError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        CalcError::MissingInput { what: what.into() }
    }

    pub(crate) fn non_physical(what: impl Into<String>) -> Self {
        CalcError::NonPhysical { what: what.into() }
    }

    pub(crate) fn infeasible(message: impl Into<String>) -> Self {
        CalcError::Infeasible {
            message: message.into(),
        }
    }
}

impl From<CalcError> for PfError {
    fn from(e: CalcError) -> Self {
        match e {
            CalcError::Numeric(inner) => inner,
            other => PfError::InvalidArg {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let err = CalcError::MissingGasInputs {
            fields: "pipe_diameter".into(),
        };
        assert_eq!(err.to_string(), "missing required gas-flow inputs: pipe_diameter");
        assert_eq!(
            CalcError::missing("boundary_temperature").to_string(),
            "missing required input: boundary_temperature"
        );
    }

    #[test]
    fn numeric_errors_pass_through() {
        let inner = PfError::ConvergenceFailed {
            what: "brent",
            iterations: 3,
        };
        let pf: PfError = CalcError::Numeric(inner.clone()).into();
        assert_eq!(pf, inner);
    }
}
