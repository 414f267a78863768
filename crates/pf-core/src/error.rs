use thiserror::Error;

pub type PfResult<T> = Result<T, PfError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PfError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Root not bracketed for {what}: f(a)={fa}, f(b)={fb}")]
    NotBracketed { what: &'static str, fa: f64, fb: f64 },

    #[error("Convergence failed for {what} after {iterations} iterations")]
    ConvergenceFailed {
        what: &'static str,
        iterations: usize,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
