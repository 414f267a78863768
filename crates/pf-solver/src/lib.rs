//! pf-solver: steady-state network solvers.
//!
//! [`NetworkSolver`] walks one network's sections in topological order,
//! carrying the local inlet pressure from section to section.
//! [`NetworkSystemSolver`] coordinates several networks that share boundary
//! nodes through damped fixed-point iteration.

pub mod error;
pub mod flows;
pub mod network;
pub mod system;

pub use error::{SolverError, SolverResult};
pub use flows::assign_design_flows;
pub use network::{NetworkSolver, NetworkSolverConfig};
pub use system::NetworkSystemSolver;
