//! A single fluid network: sections, boundaries and derived topology.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use pf_graph::{DeclaredEdge, SectionEndpoints, TopologyGraph, infer_topology};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, non_negative, positive, positive_opt};
use crate::fluid::Fluid;
use crate::outputs::{CalculationOutput, ResultSummary};
use crate::section::PipeSection;

/// Which boundary pressure drives the walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    /// Forward when an upstream pressure is known, otherwise backward.
    #[default]
    Auto,
    Forward,
    Backward,
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlowDirection::Auto => "auto",
            FlowDirection::Forward => "forward",
            FlowDirection::Backward => "backward",
        })
    }
}

impl FromStr for FlowDirection {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(FlowDirection::Auto),
            "forward" => Ok(FlowDirection::Forward),
            "backward" => Ok(FlowDirection::Backward),
            _ => Err(ModelError::UnknownVariant {
                what: "flow direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Compressible-flow model for gas sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasFlowModel {
    #[default]
    Isothermal,
    Adiabatic,
}

impl FromStr for GasFlowModel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isothermal" => Ok(GasFlowModel::Isothermal),
            "adiabatic" | "fanno" => Ok(GasFlowModel::Adiabatic),
            _ => Err(ModelError::UnknownVariant {
                what: "gas flow model",
                value: s.to_string(),
            }),
        }
    }
}

/// How section mass flows are obtained before a solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAssignment {
    /// Distribute the design flow along the topology.
    #[default]
    Design,
    /// Keep the flows already on the sections.
    Preassigned,
}

/// Construction input for [`Network`].
#[derive(Debug, Clone)]
pub struct NetworkSpec {
    pub name: String,
    pub fluid: Fluid,
    pub sections: Vec<PipeSection>,
    pub upstream_pressure: Option<f64>,
    pub downstream_pressure: Option<f64>,
    pub boundary_temperature: Option<f64>,
    pub mass_flow_rate: f64,
    /// Percent added to the design flow.
    pub design_margin: Option<f64>,
    pub direction: FlowDirection,
    pub gas_flow_model: GasFlowModel,
    pub flow_assignment: FlowAssignment,
    pub declared_edges: Vec<DeclaredEdge>,
}

impl NetworkSpec {
    /// A spec with no boundaries, zero flow and default options.
    pub fn new(name: &str, fluid: Fluid, sections: Vec<PipeSection>) -> Self {
        Self {
            name: name.to_string(),
            fluid,
            sections,
            upstream_pressure: None,
            downstream_pressure: None,
            boundary_temperature: None,
            mass_flow_rate: 0.0,
            design_margin: None,
            direction: FlowDirection::Auto,
            gas_flow_model: GasFlowModel::Isothermal,
            flow_assignment: FlowAssignment::Design,
            declared_edges: Vec::new(),
        }
    }
}

/// Validated network with its derived topology.
#[derive(Debug, Clone)]
pub struct Network {
    name: String,
    fluid: Fluid,
    sections: Vec<PipeSection>,
    upstream_pressure: Option<f64>,
    downstream_pressure: Option<f64>,
    boundary_temperature: Option<f64>,
    mass_flow_rate: f64,
    design_margin: Option<f64>,
    direction: FlowDirection,
    gas_flow_model: GasFlowModel,
    flow_assignment: FlowAssignment,
    declared_edges: Vec<DeclaredEdge>,
    topology: TopologyGraph,
    node_pressure_overrides: BTreeMap<String, f64>,
    pub calculation_output: CalculationOutput,
    pub result_summary: ResultSummary,
}

impl Network {
    pub fn new(spec: NetworkSpec) -> ModelResult<Self> {
        if spec.sections.is_empty() {
            return Err(ModelError::Missing {
                what: format!("sections for network '{}'", spec.name),
            });
        }
        for (i, section) in spec.sections.iter().enumerate() {
            if spec.sections[..i].iter().any(|s| s.id() == section.id()) {
                return Err(pf_graph::GraphError::DuplicateSection {
                    section: section.id().to_string(),
                }
                .into());
            }
        }
        positive_opt("upstream_pressure", spec.upstream_pressure)?;
        positive_opt("downstream_pressure", spec.downstream_pressure)?;
        positive_opt("boundary_temperature", spec.boundary_temperature)?;
        non_negative("mass_flow_rate", spec.mass_flow_rate)?;
        if let Some(margin) = spec.design_margin {
            if !margin.is_finite() || margin <= -100.0 {
                return Err(ModelError::invalid(
                    "design_margin",
                    format!("must be a finite percentage above -100 (got {margin})"),
                ));
            }
        }
        match (spec.direction, spec.upstream_pressure, spec.downstream_pressure) {
            (_, None, None) => {
                return Err(ModelError::Missing {
                    what: "upstream_pressure or downstream_pressure".into(),
                });
            }
            (FlowDirection::Forward, None, _) => {
                return Err(ModelError::invalid(
                    "direction",
                    "forward flow requires an upstream_pressure",
                ));
            }
            (FlowDirection::Backward, _, None) => {
                return Err(ModelError::invalid(
                    "direction",
                    "backward flow requires a downstream_pressure",
                ));
            }
            _ => {}
        }

        let endpoints: Vec<SectionEndpoints<'_>> = spec
            .sections
            .iter()
            .map(|s| SectionEndpoints {
                id: s.id(),
                start_node: s.spec().start_node.as_deref(),
                end_node: s.spec().end_node.as_deref(),
            })
            .collect();
        let topology = infer_topology(&endpoints, &spec.declared_edges)?;

        Ok(Self {
            name: spec.name,
            fluid: spec.fluid,
            sections: spec.sections,
            upstream_pressure: spec.upstream_pressure,
            downstream_pressure: spec.downstream_pressure,
            boundary_temperature: spec.boundary_temperature,
            mass_flow_rate: spec.mass_flow_rate,
            design_margin: spec.design_margin,
            direction: spec.direction,
            gas_flow_model: spec.gas_flow_model,
            flow_assignment: spec.flow_assignment,
            declared_edges: spec.declared_edges,
            topology,
            node_pressure_overrides: BTreeMap::new(),
            calculation_output: CalculationOutput::default(),
            result_summary: ResultSummary::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fluid(&self) -> &Fluid {
        &self.fluid
    }

    pub fn sections(&self) -> &[PipeSection] {
        &self.sections
    }

    /// Mutable access to the sections; the list itself is fixed.
    pub fn sections_mut(&mut self) -> &mut [PipeSection] {
        &mut self.sections
    }

    pub fn section_index(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id() == id)
    }

    pub fn section(&self, id: &str) -> Option<&PipeSection> {
        self.sections.iter().find(|s| s.id() == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut PipeSection> {
        self.sections.iter_mut().find(|s| s.id() == id)
    }

    pub fn upstream_pressure(&self) -> Option<f64> {
        self.upstream_pressure
    }

    pub fn downstream_pressure(&self) -> Option<f64> {
        self.downstream_pressure
    }

    pub fn boundary_temperature(&self) -> Option<f64> {
        self.boundary_temperature
    }

    pub fn mass_flow_rate(&self) -> f64 {
        self.mass_flow_rate
    }

    pub fn design_margin(&self) -> Option<f64> {
        self.design_margin
    }

    pub fn direction(&self) -> FlowDirection {
        self.direction
    }

    /// Direction with `Auto` resolved against the declared boundaries.
    pub fn resolved_direction(&self) -> FlowDirection {
        match self.direction {
            FlowDirection::Auto if self.upstream_pressure.is_some() => FlowDirection::Forward,
            FlowDirection::Auto => FlowDirection::Backward,
            other => other,
        }
    }

    pub fn gas_flow_model(&self) -> GasFlowModel {
        self.gas_flow_model
    }

    pub fn flow_assignment(&self) -> FlowAssignment {
        self.flow_assignment
    }

    pub fn declared_edges(&self) -> &[DeclaredEdge] {
        &self.declared_edges
    }

    pub fn topology(&self) -> &TopologyGraph {
        &self.topology
    }

    /// Design flow including the margin, kg/s.
    pub fn design_mass_flow(&self) -> f64 {
        self.mass_flow_rate * (1.0 + self.design_margin.unwrap_or(0.0) / 100.0)
    }

    /// Resolved (start, end) node names of the section at `index`.
    pub fn section_nodes(&self, index: usize) -> Option<(&str, &str)> {
        self.topology
            .edges()
            .iter()
            .find(|e| e.section_index == index)
            .map(|e| (self.topology.node_name(e.from), self.topology.node_name(e.to)))
    }

    pub fn node_pressure_overrides(&self) -> &BTreeMap<String, f64> {
        &self.node_pressure_overrides
    }

    pub fn node_pressure_override(&self, node: &str) -> Option<f64> {
        self.node_pressure_overrides.get(node).copied()
    }

    /// Pin the pressure of a node for subsequent solves.
    pub fn set_node_pressure_override(&mut self, node: &str, pressure: f64) -> ModelResult<()> {
        self.topology.require_node(node)?;
        let pressure = positive("node pressure override", pressure)?;
        self.node_pressure_overrides.insert(node.to_string(), pressure);
        Ok(())
    }

    pub fn clear_node_pressure_overrides(&mut self) {
        self.node_pressure_overrides.clear();
    }

    /// Trial network over a subset of sections.
    ///
    /// Sections are deep-copied with their resolved node ids pinned, so the
    /// subnetwork's nodes keep the names they have here. Flows already on the
    /// sections are kept and overrides on surviving nodes carry over.
    pub fn subnetwork(
        &self,
        name: &str,
        section_indices: &[usize],
        upstream_pressure: Option<f64>,
        downstream_pressure: Option<f64>,
        direction: FlowDirection,
    ) -> ModelResult<Network> {
        let mut sections = Vec::with_capacity(section_indices.len());
        for &index in section_indices {
            let section = self.sections.get(index).ok_or_else(|| {
                ModelError::invalid("section index", format!("{index} is out of range"))
            })?;
            let (start, end) = self.section_nodes(index).ok_or_else(|| {
                ModelError::invalid("section index", format!("{index} has no topology edge"))
            })?;
            let mut copy = section.clone().with_endpoints(start, end);
            copy.reset_outputs();
            sections.push(copy);
        }

        let mut sub = Network::new(NetworkSpec {
            name: name.to_string(),
            fluid: self.fluid.clone(),
            sections,
            upstream_pressure,
            downstream_pressure,
            boundary_temperature: self.boundary_temperature,
            mass_flow_rate: self.mass_flow_rate,
            design_margin: self.design_margin,
            direction,
            gas_flow_model: self.gas_flow_model,
            flow_assignment: FlowAssignment::Preassigned,
            declared_edges: Vec::new(),
        })?;
        for (node, &p) in &self.node_pressure_overrides {
            if sub.topology.node_id(node).is_some() {
                sub.node_pressure_overrides.insert(node.clone(), p);
            }
        }
        Ok(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::PipeSectionSpec;

    fn water() -> Fluid {
        Fluid::liquid("water", 998.2, 1e-3).unwrap()
    }

    fn section(id: &str, start: Option<&str>, end: Option<&str>) -> PipeSection {
        PipeSection::new(PipeSectionSpec {
            id: id.into(),
            start_node: start.map(str::to_string),
            end_node: end.map(str::to_string),
            length: 10.0,
            pipe_diameter: Some(0.1),
            ..PipeSectionSpec::default()
        })
        .unwrap()
    }

    fn chain() -> Network {
        Network::new(NetworkSpec {
            upstream_pressure: Some(3e5),
            mass_flow_rate: 2.0,
            design_margin: Some(10.0),
            ..NetworkSpec::new(
                "chain",
                water(),
                vec![
                    section("s1", Some("A"), None),
                    section("s2", None, None),
                    section("s3", None, Some("D")),
                ],
            )
        })
        .unwrap()
    }

    #[test]
    fn requires_a_boundary_pressure() {
        let err = Network::new(NetworkSpec::new("n", water(), vec![section("s", None, None)]))
            .unwrap_err();
        assert!(err.to_string().contains("upstream_pressure"));
    }

    #[test]
    fn direction_must_match_boundaries() {
        let spec = NetworkSpec {
            downstream_pressure: Some(1e5),
            direction: FlowDirection::Forward,
            ..NetworkSpec::new("n", water(), vec![section("s", None, None)])
        };
        assert!(Network::new(spec).is_err());
    }

    #[test]
    fn rejects_negative_flow() {
        let spec = NetworkSpec {
            upstream_pressure: Some(1e5),
            mass_flow_rate: -1.0,
            ..NetworkSpec::new("n", water(), vec![section("s", None, None)])
        };
        assert!(Network::new(spec).is_err());
    }

    #[test]
    fn topology_chains_sections() {
        let net = chain();
        assert_eq!(net.section_nodes(0), Some(("A", "s1_end")));
        assert_eq!(net.section_nodes(1), Some(("s1_end", "s2_end")));
        assert_eq!(net.section_nodes(2), Some(("s2_end", "D")));
        assert_eq!(net.resolved_direction(), FlowDirection::Forward);
        assert!((net.design_mass_flow() - 2.2).abs() < 1e-12);
    }

    #[test]
    fn subnetwork_preserves_node_names() {
        let mut net = chain();
        net.set_node_pressure_override("s2_end", 2e5).unwrap();
        let sub = net
            .subnetwork("tail", &[1, 2], None, Some(1e5), FlowDirection::Backward)
            .unwrap();
        assert_eq!(sub.section_nodes(0), Some(("s1_end", "s2_end")));
        assert_eq!(sub.section_nodes(1), Some(("s2_end", "D")));
        assert_eq!(sub.flow_assignment(), FlowAssignment::Preassigned);
        assert_eq!(sub.node_pressure_override("s2_end"), Some(2e5));
        assert!(sub.subnetwork("bad", &[7], None, Some(1e5), FlowDirection::Auto).is_err());
    }

    #[test]
    fn overrides_need_known_nodes() {
        let mut net = chain();
        assert!(net.set_node_pressure_override("nowhere", 1e5).is_err());
        assert!(net.set_node_pressure_override("A", -5.0).is_err());
    }

    #[test]
    fn enums_parse() {
        assert_eq!("Backward".parse::<FlowDirection>().unwrap(), FlowDirection::Backward);
        assert_eq!("fanno".parse::<GasFlowModel>().unwrap(), GasFlowModel::Adiabatic);
        assert!("sideways".parse::<FlowDirection>().is_err());
    }
}
