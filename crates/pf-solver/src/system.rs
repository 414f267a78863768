//! Fixed-point coordination of networks joined at shared nodes.

use std::collections::BTreeMap;

use pf_model::{
    BundleResult, Network, NetworkResult, NetworkSystem, NetworkSystemResult, SharedNodeGroup,
};

use crate::error::{SolverError, SolverResult};
use crate::network::NetworkSolver;

/// Solves every bundle of a [`NetworkSystem`] until shared nodes agree.
///
/// Each pass solves a clone of every bundle's network with the previous
/// canonical pressures pinned on the non-leader members of each group, then
/// under-relaxes each canonical pressure towards its leader's fresh solution.
/// Running out of iterations is not an error: the last state is returned with
/// `converged = false`.
#[derive(Debug, Clone, Default)]
pub struct NetworkSystemSolver {
    solver: NetworkSolver,
}

struct Pass {
    bundle_id: String,
    network: Network,
    result: NetworkResult,
}

impl NetworkSystemSolver {
    pub fn new(solver: NetworkSolver) -> Self {
        Self { solver }
    }

    pub fn solve(&self, system: &mut NetworkSystem) -> SolverResult<NetworkSystemResult> {
        let settings = system.settings().clone();
        let groups = system.groups().to_vec();
        let mut canonical: BTreeMap<String, f64> = BTreeMap::new();
        let mut passes = Vec::new();
        let mut iterations = 0;
        let mut max_residual = 0.0;
        let mut converged = false;

        for iteration in 1..=settings.max_iterations.max(1) {
            iterations = iteration;
            passes = self.solve_bundles(system, &groups, &canonical)?;

            max_residual = 0.0f64;
            for group in &groups {
                let leader_pressure = solved_pressure(&passes, group, 0)?;
                let next = match canonical.get(&group.id) {
                    Some(&old) => {
                        max_residual = max_residual.max((leader_pressure - old).abs());
                        old + settings.relaxation * (leader_pressure - old)
                    }
                    None => {
                        // nothing pinned yet: measure how far the members disagree
                        for i in 1..group.members.len() {
                            let follower = solved_pressure(&passes, group, i)?;
                            let mismatch = follower - (leader_pressure + group.pressure_bias);
                            max_residual = max_residual.max(mismatch.abs());
                        }
                        leader_pressure
                    }
                };
                canonical.insert(group.id.clone(), next);
            }
            tracing::debug!(iteration, max_residual, "network system pass");

            if max_residual <= settings.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                iterations,
                max_residual,
                tolerance = settings.tolerance,
                "network system did not converge; returning best-effort state"
            );
        }

        let mut bundles = Vec::with_capacity(passes.len());
        for pass in passes {
            if let Some(bundle) = system.bundle_mut(&pass.bundle_id) {
                bundle.network = pass.network;
            }
            bundles.push(BundleResult {
                network: pass.result.network.clone(),
                bundle_id: pass.bundle_id,
                result: pass.result,
            });
        }

        Ok(NetworkSystemResult {
            bundles,
            shared_node_pressures: canonical,
            iterations,
            converged,
            max_residual,
        })
    }

    fn solve_bundles(
        &self,
        system: &NetworkSystem,
        groups: &[SharedNodeGroup],
        canonical: &BTreeMap<String, f64>,
    ) -> SolverResult<Vec<Pass>> {
        let mut passes = Vec::with_capacity(system.bundles.len());
        for bundle in &system.bundles {
            let mut network = bundle.network.clone();
            for group in groups {
                let Some(&p) = canonical.get(&group.id) else {
                    continue;
                };
                for member in group.followers().iter().filter(|m| m.bundle_id == bundle.id) {
                    network.set_node_pressure_override(&member.node_id, p + group.pressure_bias)?;
                }
            }
            let result = self.solver.solve(&mut network)?;
            passes.push(Pass {
                bundle_id: bundle.id.clone(),
                network,
                result,
            });
        }
        Ok(passes)
    }
}

fn solved_pressure(passes: &[Pass], group: &SharedNodeGroup, member: usize) -> SolverResult<f64> {
    let m = group
        .members
        .get(member)
        .ok_or_else(|| SolverError::setup(format!("shared node group '{}' has no members", group.id)))?;
    passes
        .iter()
        .find(|p| p.bundle_id == m.bundle_id)
        .and_then(|p| p.result.node_pressure(&m.node_id))
        .ok_or_else(|| {
            SolverError::setup(format!(
                "node '{}' of bundle '{}' has no solved pressure",
                m.node_id, m.bundle_id
            ))
        })
}
