//! Optimizer reports.

use serde::{Deserialize, Serialize};

/// Outcome for one adjustable valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValveAdjustment {
    pub section_id: String,
    pub inlet_node: String,
    pub outlet_node: String,
    /// Pressure the upstream subnetwork delivers at the valve inlet, Pa.
    pub available_pressure: f64,
    /// Pressure the downstream subnetwork needs at the valve outlet, Pa.
    pub required_pressure: f64,
    /// Pressure drop assigned to the valve, Pa.
    pub pressure_drop: f64,
    /// The required pressure exceeded the available one and the drop was clamped to zero.
    pub clamped: bool,
    /// `|outlet pressure of a full forward solve - required pressure|`, Pa.
    pub residual: f64,
}

/// Result of tuning the adjustable valves of one network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub network: String,
    pub valves: Vec<ValveAdjustment>,
    /// Minimum residual over valves before tuning.
    pub baseline_residual: f64,
    /// Minimum residual over valves after tuning.
    pub residual: f64,
    /// Largest residual over valves after tuning.
    pub worst_residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl OptimizationReport {
    pub fn valve(&self, section_id: &str) -> Option<&ValveAdjustment> {
        self.valves.iter().find(|v| v.section_id == section_id)
    }
}

/// Report for one bundle of a system; `None` when its optimizer is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleOptimization {
    pub bundle_id: String,
    pub report: Option<OptimizationReport>,
}
