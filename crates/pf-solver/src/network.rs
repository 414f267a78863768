//! Topological pressure walk over a single network.

use std::collections::BTreeMap;

use pf_calc::common::area;
use pf_calc::{CalcContext, GasFlowCalculator, evaluate_section};
use pf_core::units::constants::G0_MPS2;
use pf_core::{EdgeId, NodeId};
use pf_graph::{TopologyEdge, TopologyGraph, TopologyWarning};
use pf_model::{
    CalculationOutput, FlowDirection, Fluid, GasFlowModel, Network, NetworkResult, PipeSection,
    ResultSummary, SectionResult, StatePoint,
};

use crate::error::{SolverError, SolverResult};
use crate::flows;

/// Network solver configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkSolverConfig {
    /// Gravitational acceleration, m/s².
    pub gravity: f64,
    /// Iteration cap for the inlet pressure of a section walked backward.
    pub backward_max_iterations: usize,
    /// Convergence tolerance for that iteration, Pa.
    pub backward_tolerance: f64,
}

impl Default for NetworkSolverConfig {
    fn default() -> Self {
        Self {
            gravity: G0_MPS2,
            backward_max_iterations: 10,
            backward_tolerance: 1e-3,
        }
    }
}

/// Solves one network by walking its sections in topological order.
///
/// Forward networks start from the upstream pressure and subtract each
/// section's loss; backward networks start from the downstream pressure and
/// add it. Section fields are mutated in place; clone the network first for
/// trial solves.
#[derive(Debug, Clone, Default)]
pub struct NetworkSolver {
    config: NetworkSolverConfig,
}

#[derive(Clone, Copy)]
enum Merge {
    /// Forward merges keep the most restrictive incoming branch.
    Min,
    /// Backward splits keep the largest requirement.
    Max,
}

struct NodeStates {
    pressure: Vec<Option<f64>>,
    temperature: Vec<Option<f64>>,
    pinned: Vec<bool>,
}

impl NodeStates {
    fn new(count: usize) -> Self {
        Self {
            pressure: vec![None; count],
            temperature: vec![None; count],
            pinned: vec![false; count],
        }
    }

    fn seed(&mut self, id: NodeId, pressure: f64, temperature: f64) {
        self.pressure[id.slot()] = Some(pressure);
        self.temperature[id.slot()] = Some(temperature);
    }

    fn pin(&mut self, id: NodeId, pressure: f64) {
        self.pressure[id.slot()] = Some(pressure);
        self.pinned[id.slot()] = true;
    }

    fn get(&self, id: NodeId) -> Option<(f64, Option<f64>)> {
        self.pressure[id.slot()].map(|p| (p, self.temperature[id.slot()]))
    }

    fn merge(&mut self, id: NodeId, pressure: f64, temperature: f64, rule: Merge) {
        let slot = id.slot();
        if self.pinned[slot] {
            self.temperature[slot].get_or_insert(temperature);
            return;
        }
        let replace = match (self.pressure[slot], rule) {
            (None, _) => true,
            (Some(old), Merge::Min) => pressure < old,
            (Some(old), Merge::Max) => pressure > old,
        };
        if replace {
            self.pressure[slot] = Some(pressure);
            self.temperature[slot] = Some(temperature);
        }
    }
}

impl NetworkSolver {
    pub fn new(config: NetworkSolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NetworkSolverConfig {
        &self.config
    }

    /// See [`flows::assign_design_flows`].
    pub fn assign_design_flows(&self, network: &mut Network) -> SolverResult<()> {
        flows::assign_design_flows(network)
    }

    /// Solve `network` in place and return a snapshot of the result.
    pub fn solve(&self, network: &mut Network) -> SolverResult<NetworkResult> {
        let temperature = network
            .boundary_temperature()
            .ok_or_else(|| SolverError::missing("boundary_temperature"))?;
        self.assign_design_flows(network)?;

        let topology = network.topology().clone();
        let entry = topology.detect_start_nodes();
        let order = topology.topological_edges()?;
        let mut nodes = NodeStates::new(topology.nodes().len());

        match network.resolved_direction() {
            FlowDirection::Backward => {
                self.walk_backward(network, &topology, &order, temperature, &mut nodes)?
            }
            _ => self.walk_forward(network, &topology, &order, temperature, &mut nodes)?,
        }

        Ok(collect(network, &topology, &order, &nodes, entry.warning))
    }

    fn walk_forward(
        &self,
        network: &mut Network,
        topology: &TopologyGraph,
        order: &[EdgeId],
        temperature: f64,
        nodes: &mut NodeStates,
    ) -> SolverResult<()> {
        let upstream = network
            .upstream_pressure()
            .ok_or_else(|| SolverError::missing("upstream_pressure"))?;
        for id in topology.start_nodes() {
            nodes.seed(id, upstream, temperature);
        }
        for edge in topology.edges() {
            let hint = network.sections()[edge.section_index].spec().boundary_pressure;
            if let (0, Some(p)) = (topology.indegree(edge.from), hint) {
                nodes.seed(edge.from, p, temperature);
            }
        }
        pin_overrides(network, topology, nodes);

        let fluid = network.fluid().clone();
        let model = network.gas_flow_model();
        let ctx = CalcContext::new(&fluid).with_gravity(self.config.gravity);
        let gas = GasFlowCalculator::forward(model);

        for edge in ordered_edges(topology, order) {
            let (p_in, t_known) = nodes
                .get(edge.from)
                .ok_or_else(|| unreached(topology, edge.from))?;
            let t_in = t_known.unwrap_or(temperature);
            let section = &mut network.sections_mut()[edge.section_index];
            section.pressure = Some(p_in);
            section.temperature = Some(t_in);
            let loss = evaluate_section(section, &ctx, &gas)?;

            let p_out = p_in - loss;
            if p_out < 0.0 {
                return Err(SolverError::NegativePressure {
                    section: section.id().to_string(),
                    node: topology.node_name(edge.to).to_string(),
                    pressure: p_out,
                });
            }
            let t_out = far_end_temperature(&fluid, model, section, t_in, FlowDirection::Forward);
            section.result_summary = ResultSummary {
                inlet: state_point(&fluid, section, p_in, t_in),
                outlet: state_point(&fluid, section, p_out, t_out),
            };
            nodes.merge(edge.to, p_out, t_out, Merge::Min);
        }
        Ok(())
    }

    fn walk_backward(
        &self,
        network: &mut Network,
        topology: &TopologyGraph,
        order: &[EdgeId],
        temperature: f64,
        nodes: &mut NodeStates,
    ) -> SolverResult<()> {
        let downstream = network
            .downstream_pressure()
            .ok_or_else(|| SolverError::missing("downstream_pressure"))?;
        for id in topology.end_nodes() {
            nodes.seed(id, downstream, temperature);
        }
        for edge in topology.edges() {
            let hint = network.sections()[edge.section_index].spec().boundary_pressure;
            if let (0, Some(p)) = (topology.outdegree(edge.to), hint) {
                nodes.seed(edge.to, p, temperature);
            }
        }
        pin_overrides(network, topology, nodes);

        let fluid = network.fluid().clone();
        let model = network.gas_flow_model();
        let ctx = CalcContext::new(&fluid).with_gravity(self.config.gravity);

        let mut edges = ordered_edges(topology, order);
        edges.reverse();
        for edge in edges {
            let (p_out, t_known) = nodes
                .get(edge.to)
                .ok_or_else(|| unreached(topology, edge.to))?;
            let t_out = t_known.unwrap_or(temperature);
            let section = &mut network.sections_mut()[edge.section_index];
            let gas = GasFlowCalculator::backward(model, p_out);

            let mut p_in = p_out + declared_loss(section);
            let mut settled = false;
            for iteration in 1..=self.config.backward_max_iterations {
                section.pressure = Some(p_in);
                section.temperature = Some(t_out);
                let loss = evaluate_section(section, &ctx, &gas)?;
                let next = p_out + loss;
                let change = (next - p_in).abs();
                p_in = next;
                tracing::debug!(section = section.id(), iteration, change, "backward inlet update");
                if change <= self.config.backward_tolerance {
                    settled = true;
                    break;
                }
            }
            if !settled {
                tracing::warn!(
                    section = section.id(),
                    iterations = self.config.backward_max_iterations,
                    "backward inlet pressure did not settle"
                );
            }
            if p_in < 0.0 {
                return Err(SolverError::NegativePressure {
                    section: section.id().to_string(),
                    node: topology.node_name(edge.from).to_string(),
                    pressure: p_in,
                });
            }
            section.pressure = Some(p_in);
            let t_in = far_end_temperature(&fluid, model, section, t_out, FlowDirection::Backward);
            section.temperature = Some(t_in);
            section.result_summary = ResultSummary {
                inlet: state_point(&fluid, section, p_in, t_in),
                outlet: state_point(&fluid, section, p_out, t_out),
            };
            nodes.merge(edge.from, p_in, t_in, Merge::Max);
        }
        Ok(())
    }
}

fn ordered_edges(topology: &TopologyGraph, order: &[EdgeId]) -> Vec<TopologyEdge> {
    order.iter().filter_map(|&e| topology.edge(e).cloned()).collect()
}

fn pin_overrides(network: &Network, topology: &TopologyGraph, nodes: &mut NodeStates) {
    for (name, &p) in network.node_pressure_overrides() {
        if let Some(id) = topology.node_id(name) {
            nodes.pin(id, p);
        }
    }
}

fn unreached(topology: &TopologyGraph, node: NodeId) -> SolverError {
    SolverError::setup(format!(
        "no boundary pressure reaches node '{}'",
        topology.node_name(node)
    ))
}

/// Loss the section declares outright, used to seed the backward iteration.
fn declared_loss(section: &PipeSection) -> f64 {
    let spec = section.spec();
    let valve = spec.control_valve.as_ref().and_then(|v| v.pressure_drop);
    let orifice = spec.orifice.as_ref().and_then(|o| o.pressure_drop);
    let fixed = if section.has_component() {
        None
    } else {
        spec.user_specified_fixed_loss
    };
    [valve, orifice, fixed].into_iter().flatten().sum()
}

/// Temperature at the far end of a section from the known end.
///
/// Only adiabatic gas flow changes temperature: stagnation temperature is
/// conserved between the Mach numbers reported by the gas solver.
fn far_end_temperature(
    fluid: &Fluid,
    model: GasFlowModel,
    section: &PipeSection,
    known: f64,
    direction: FlowDirection,
) -> f64 {
    let (Some(k), Some(outcome), GasFlowModel::Adiabatic) = (
        fluid.specific_heat_ratio(),
        section.calculation_output.gas_flow.as_ref(),
        model,
    ) else {
        return known;
    };
    let (Some(m_in), Some(m_out)) = (outcome.inlet_mach, outcome.outlet_mach) else {
        return known;
    };
    let ratio = |m: f64| 1.0 + 0.5 * (k - 1.0) * m * m;
    match direction {
        FlowDirection::Backward => known * ratio(m_out) / ratio(m_in),
        _ => known * ratio(m_in) / ratio(m_out),
    }
}

fn state_point(fluid: &Fluid, section: &PipeSection, pressure: f64, temperature: f64) -> StatePoint {
    let density = fluid.density_at(temperature, pressure).ok().filter(|rho| *rho > 0.0);
    let velocity = match (density, section.flow_diameter(), section.mass_flow_rate) {
        (Some(rho), Some(d), Some(m)) => Some(m / (rho * area(d))),
        _ => None,
    };
    let mach_number = if fluid.is_gas() {
        velocity.zip(fluid.sonic_velocity(temperature).ok()).map(|(v, a)| v / a)
    } else {
        None
    };
    StatePoint {
        pressure: Some(pressure),
        temperature: Some(temperature),
        density,
        velocity,
        mach_number,
    }
}

fn collect(
    network: &mut Network,
    topology: &TopologyGraph,
    order: &[EdgeId],
    nodes: &NodeStates,
    warning: Option<TopologyWarning>,
) -> NetworkResult {
    let mut aggregate = CalculationOutput::default();
    if let Some(w) = warning {
        aggregate.note(w.to_string());
    }
    let edges = ordered_edges(topology, order);
    for edge in &edges {
        let section = &network.sections()[edge.section_index];
        aggregate
            .pressure_drop
            .accumulate(&section.calculation_output.pressure_drop);
        for note in &section.calculation_output.notes {
            aggregate.note(format!("{}: {note}", section.id()));
        }
    }

    let summary = ResultSummary {
        inlet: edges
            .first()
            .map(|e| network.sections()[e.section_index].result_summary.inlet.clone())
            .unwrap_or_default(),
        outlet: edges
            .last()
            .map(|e| network.sections()[e.section_index].result_summary.outlet.clone())
            .unwrap_or_default(),
    };

    let sections = (0..network.sections().len())
        .filter_map(|i| {
            let (start, end) = network.section_nodes(i)?;
            Some(SectionResult::from_section(&network.sections()[i], start, end))
        })
        .collect();

    let node_pressures: BTreeMap<String, f64> = topology
        .nodes()
        .iter()
        .filter_map(|n| nodes.pressure[n.id.slot()].map(|p| (n.name.clone(), p)))
        .collect();

    network.calculation_output = aggregate.clone();
    network.result_summary = summary.clone();

    NetworkResult {
        network: network.name().to_string(),
        sections,
        aggregate,
        summary,
        node_pressures,
    }
}
