//! pf-model: physical data model for pipeflow.
//!
//! Provides:
//! - `Fluid` with its density law
//! - Equipment records (`ControlValve`, `Orifice`, `Fitting`)
//! - `PipeSection` with validated geometry and solver-owned outputs
//! - `Network` with derived topology, and `NetworkSystem` of bundles joined at
//!   shared nodes
//! - Result snapshots for serialization and regression comparison
//!
//! Every type is validated at construction; solvers only mutate the public
//! output fields.

pub mod components;
pub mod error;
pub mod fluid;
pub mod network;
pub mod outputs;
pub mod results;
pub mod section;
pub mod system;

pub use components::{ControlValve, Fitting, FittingStyle, FittingType, Orifice, OrificeTaps};
pub use error::{ModelError, ModelResult};
pub use fluid::{Fluid, FluidSpec, Phase};
pub use network::{FlowAssignment, FlowDirection, GasFlowModel, Network, NetworkSpec};
pub use outputs::{
    CalculationOutput, FittingBreakdown, FlowScheme, GasFlowOutcome, OrificeSizing,
    PressureDropDetails, ResultSummary, Rounded, SNAPSHOT_DECIMALS, StatePoint, ValveSizing,
};
pub use pf_graph::DeclaredEdge;
pub use results::{BundleResult, NetworkResult, NetworkSystemResult, SectionResult};
pub use section::{DEFAULT_ROUGHNESS, FrictionFactorType, PipeSection, PipeSectionSpec};
pub use system::{
    NetworkBundle, NetworkSystem, OptimizerMethod, OptimizerSettings, SharedNodeGroup,
    SharedNodeMember, SystemSolverSettings,
};
