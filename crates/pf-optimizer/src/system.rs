//! Per-bundle optimizer dispatch for a network system.

use pf_model::{NetworkSystem, OptimizerMethod};
use pf_solver::NetworkSolver;

use crate::error::OptimizerResult;
use crate::report::BundleOptimization;
use crate::valves::{advanced_optimize_control_valves, optimize_control_valves};

/// Tunes the valves of every bundle according to its own settings.
///
/// Run before [`pf_solver::NetworkSystemSolver`] so the coordinated solve sees
/// the tuned drops.
#[derive(Debug, Clone, Default)]
pub struct NetworkSystemOptimizer {
    solver: NetworkSolver,
}

impl NetworkSystemOptimizer {
    pub fn new(solver: NetworkSolver) -> Self {
        Self { solver }
    }

    pub fn optimize(&self, system: &mut NetworkSystem) -> OptimizerResult<Vec<BundleOptimization>> {
        let mut reports = Vec::with_capacity(system.bundles.len());
        for bundle in &mut system.bundles {
            let report = match &bundle.optimizer {
                Some(settings) if settings.enabled => Some(match settings.method {
                    OptimizerMethod::SinglePass => optimize_control_valves(&mut bundle.network, &self.solver)?,
                    OptimizerMethod::Advanced => {
                        advanced_optimize_control_valves(&mut bundle.network, &self.solver, settings)?
                    }
                }),
                _ => {
                    tracing::debug!(bundle = bundle.id.as_str(), "valve optimizer disabled");
                    None
                }
            };
            reports.push(BundleOptimization {
                bundle_id: bundle.id.clone(),
                report,
            });
        }
        Ok(reports)
    }
}
