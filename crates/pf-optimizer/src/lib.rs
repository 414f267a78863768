//! pf-optimizer: control-valve tuning.
//!
//! - [`optimize_control_valves`]: one pass, each adjustable valve takes the
//!   pressure left between its upstream and downstream subnetworks
//! - [`advanced_optimize_control_valves`]: damped successive substitution for
//!   branched networks where one pass does not settle
//! - [`NetworkSystemOptimizer`]: per-bundle dispatch on `OptimizerSettings`

pub mod error;
pub mod report;
pub mod system;
pub mod valves;

pub use error::{OptimizerError, OptimizerResult};
pub use report::{BundleOptimization, OptimizationReport, ValveAdjustment};
pub use system::NetworkSystemOptimizer;
pub use valves::{advanced_optimize_control_valves, optimize_control_valves};
