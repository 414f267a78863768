//! pf-core: stable foundation for pipeflow.
//!
//! Contains:
//! - units (uom quantity aliases, constructors, physical constants)
//! - numeric (finite guards, snapshot rounding)
//! - roots (bisection and Brent bracketing solvers)
//! - ids (compact ids for topology nodes and edges)
//! - error (shared error type)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod roots;
pub mod units;

pub use error::{PfError, PfResult};
pub use ids::{EdgeId, Id, NodeId};
pub use numeric::{ensure_finite, round_to};
pub use roots::{BisectConfig, Root, bisect, brent};
