//! Control-valve tuning against the network's boundary pressures.
//!
//! Each adjustable valve splits the network in two: the sections feeding its
//! inlet, solved forward from the upstream boundary, and the sections fed by
//! its outlet, solved backward from the downstream boundary. The valve takes
//! up whatever pressure is left between the two.

use pf_core::EdgeId;
use pf_model::{FlowDirection, Network, OptimizerSettings};
use pf_solver::NetworkSolver;

use crate::error::{OptimizerError, OptimizerResult};
use crate::report::{OptimizationReport, ValveAdjustment};

struct ValveSite {
    index: usize,
    section_id: String,
    inlet_node: String,
    outlet_node: String,
    upstream: Vec<usize>,
    downstream: Vec<usize>,
}

/// Pressures at one valve seen by the two halves of the network.
#[derive(Clone, Copy)]
struct Split {
    available: f64,
    required: f64,
}

fn boundaries(network: &Network) -> OptimizerResult<(f64, f64)> {
    let (Some(up), Some(down)) = (network.upstream_pressure(), network.downstream_pressure()) else {
        return Err(OptimizerError::MissingBoundary {
            what: "both upstream_pressure and downstream_pressure",
        });
    };
    if down > up {
        return Err(OptimizerError::Infeasible {
            upstream: up,
            downstream: down,
        });
    }
    Ok((up, down))
}

fn section_indices(network: &Network, edges: impl IntoIterator<Item = EdgeId>) -> Vec<usize> {
    let topology = network.topology();
    let mut indices: Vec<usize> = edges
        .into_iter()
        .filter_map(|e| topology.edge(e).map(|edge| edge.section_index))
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn adjustable_sites(network: &Network) -> OptimizerResult<Vec<ValveSite>> {
    let topology = network.topology();
    let mut sites = Vec::new();
    for (index, section) in network.sections().iter().enumerate() {
        if !section.control_valve().is_some_and(|v| v.adjustable) {
            continue;
        }
        let (inlet, outlet) = network.section_nodes(index).ok_or_else(|| OptimizerError::Setup {
            what: format!("valve section '{}' is not in the topology", section.id()),
        })?;
        let (Some(inlet_id), Some(outlet_id)) = (topology.node_id(inlet), topology.node_id(outlet)) else {
            return Err(OptimizerError::Setup {
                what: format!("valve section '{}' has unresolved nodes", section.id()),
            });
        };
        let upstream = section_indices(
            network,
            topology
                .start_nodes()
                .into_iter()
                .flat_map(|s| topology.edges_on_paths(s, inlet_id)),
        );
        let downstream = section_indices(
            network,
            topology
                .end_nodes()
                .into_iter()
                .flat_map(|e| topology.edges_on_paths(outlet_id, e)),
        );
        sites.push(ValveSite {
            index,
            section_id: section.id().to_string(),
            inlet_node: inlet.to_string(),
            outlet_node: outlet.to_string(),
            upstream,
            downstream,
        });
    }
    Ok(sites)
}

fn solved_node(result: &pf_model::NetworkResult, node: &str) -> OptimizerResult<f64> {
    result.node_pressure(node).ok_or_else(|| OptimizerError::Setup {
        what: format!("node '{node}' has no solved pressure"),
    })
}

fn split_at(
    trial: &Network,
    solver: &NetworkSolver,
    site: &ValveSite,
    (up, down): (f64, f64),
) -> OptimizerResult<Split> {
    let available = if site.upstream.is_empty() {
        trial.node_pressure_override(&site.inlet_node).unwrap_or(up)
    } else {
        let name = format!("{}::upstream::{}", trial.name(), site.section_id);
        let mut sub = trial.subnetwork(&name, &site.upstream, Some(up), None, FlowDirection::Forward)?;
        solved_node(&solver.solve(&mut sub)?, &site.inlet_node)?
    };
    let required = if site.downstream.is_empty() {
        trial.node_pressure_override(&site.outlet_node).unwrap_or(down)
    } else {
        let name = format!("{}::downstream::{}", trial.name(), site.section_id);
        let mut sub = trial.subnetwork(&name, &site.downstream, None, Some(down), FlowDirection::Backward)?;
        solved_node(&solver.solve(&mut sub)?, &site.outlet_node)?
    };
    Ok(Split { available, required })
}

/// Per-valve `|P_outlet(full forward solve) - P_required|`.
fn residuals(
    trial: &Network,
    solver: &NetworkSolver,
    sites: &[ValveSite],
    bounds: (f64, f64),
) -> OptimizerResult<Vec<f64>> {
    let all: Vec<usize> = (0..trial.sections().len()).collect();
    let name = format!("{}::forward", trial.name());
    let mut full = trial.subnetwork(&name, &all, Some(bounds.0), Some(bounds.1), FlowDirection::Forward)?;
    let forward = solver.solve(&mut full)?;
    sites
        .iter()
        .map(|site| {
            let outlet = solved_node(&forward, &site.outlet_node)?;
            let required = split_at(trial, solver, site, bounds)?.required;
            Ok((outlet - required).abs())
        })
        .collect()
}

fn clamp_drop(site: &ValveSite, split: Split, drop: f64) -> (f64, bool) {
    if drop >= 0.0 {
        return (drop, false);
    }
    tracing::warn!(
        valve = site.section_id.as_str(),
        available = split.available,
        required = split.required,
        "required pressure exceeds available pressure; valve drop clamped to zero"
    );
    (0.0, true)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

fn prepare(network: &Network, solver: &NetworkSolver) -> OptimizerResult<((f64, f64), Network, Vec<ValveSite>)> {
    let bounds = boundaries(network)?;
    let mut trial = network.clone();
    solver.assign_design_flows(&mut trial)?;
    let sites = adjustable_sites(&trial)?;
    Ok((bounds, trial, sites))
}

fn finish(
    network: &mut Network,
    sites: &[ValveSite],
    mut valves: Vec<ValveAdjustment>,
    residual: Vec<f64>,
) -> OptimizerResult<Vec<ValveAdjustment>> {
    for ((site, valve), r) in sites.iter().zip(valves.iter_mut()).zip(residual) {
        network.sections_mut()[site.index].set_control_valve_pressure_drop(valve.pressure_drop)?;
        valve.residual = r;
    }
    Ok(valves)
}

fn adjustment(site: &ValveSite, split: Split, pressure_drop: f64, clamped: bool) -> ValveAdjustment {
    ValveAdjustment {
        section_id: site.section_id.clone(),
        inlet_node: site.inlet_node.clone(),
        outlet_node: site.outlet_node.clone(),
        available_pressure: split.available,
        required_pressure: split.required,
        pressure_drop,
        clamped,
        residual: 0.0,
    }
}

/// Single pass over the adjustable valves, in section order.
///
/// Design flows are assigned on a copy; only the valves' `pressure_drop` is
/// written back to `network`. Valves tuned earlier in the pass are seen by the
/// ones after them.
pub fn optimize_control_valves(network: &mut Network, solver: &NetworkSolver) -> OptimizerResult<OptimizationReport> {
    let (bounds, mut trial, sites) = prepare(network, solver)?;
    if sites.is_empty() {
        return Ok(OptimizationReport {
            network: network.name().to_string(),
            converged: true,
            ..OptimizationReport::default()
        });
    }
    let baseline = residuals(&trial, solver, &sites, bounds)?;

    let mut valves = Vec::with_capacity(sites.len());
    for site in &sites {
        let split = split_at(&trial, solver, site, bounds)?;
        let (dp, clamped) = clamp_drop(site, split, split.available - split.required);
        trial.sections_mut()[site.index].set_control_valve_pressure_drop(dp)?;
        valves.push(adjustment(site, split, dp, clamped));
    }

    let after = residuals(&trial, solver, &sites, bounds)?;
    let report = OptimizationReport {
        network: network.name().to_string(),
        baseline_residual: min_of(&baseline),
        residual: min_of(&after),
        worst_residual: max_of(&after),
        iterations: 1,
        converged: true,
        valves: finish(network, &sites, valves, after)?,
    };
    tracing::debug!(
        network = network.name(),
        baseline = report.baseline_residual,
        residual = report.residual,
        "control valves tuned"
    );
    Ok(report)
}

/// Damped successive substitution over all adjustable valves.
///
/// Every iteration moves each valve's drop a fraction `damping` towards its
/// single-pass target, then re-measures the residuals. Stops once the worst
/// residual is within `tolerance` or improves by less than
/// `stagnation_tolerance`.
pub fn advanced_optimize_control_valves(
    network: &mut Network,
    solver: &NetworkSolver,
    settings: &OptimizerSettings,
) -> OptimizerResult<OptimizationReport> {
    settings.validate()?;
    let (bounds, mut trial, sites) = prepare(network, solver)?;
    if sites.is_empty() {
        return Ok(OptimizationReport {
            network: network.name().to_string(),
            converged: true,
            ..OptimizationReport::default()
        });
    }
    let baseline = residuals(&trial, solver, &sites, bounds)?;
    let mut drops: Vec<f64> = sites
        .iter()
        .map(|s| {
            trial.sections()[s.index]
                .control_valve()
                .and_then(|v| v.pressure_drop)
                .unwrap_or(0.0)
        })
        .collect();

    let mut previous_worst = max_of(&baseline);
    let mut valves = Vec::new();
    let mut after = baseline.clone();
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 1..=settings.max_iterations {
        iterations = iteration;
        valves.clear();
        for (site, drop) in sites.iter().zip(drops.iter_mut()) {
            let split = split_at(&trial, solver, site, bounds)?;
            let target = split.available - split.required;
            let (dp, clamped) = clamp_drop(site, split, *drop + settings.damping * (target - *drop));
            *drop = dp;
            trial.sections_mut()[site.index].set_control_valve_pressure_drop(dp)?;
            valves.push(adjustment(site, split, dp, clamped));
        }

        after = residuals(&trial, solver, &sites, bounds)?;
        let worst = max_of(&after);
        tracing::debug!(iteration, worst, "valve substitution pass");
        if worst <= settings.tolerance {
            converged = true;
            break;
        }
        if previous_worst - worst < settings.stagnation_tolerance {
            tracing::debug!(iteration, worst, "valve substitution stagnated");
            break;
        }
        previous_worst = worst;
    }

    Ok(OptimizationReport {
        network: network.name().to_string(),
        baseline_residual: min_of(&baseline),
        residual: min_of(&after),
        worst_residual: max_of(&after),
        iterations,
        converged,
        valves: finish(network, &sites, valves, after)?,
    })
}
