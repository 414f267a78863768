//! Design-flow distribution along the topology.

use pf_model::{FlowAssignment, FlowDirection, Network};

use crate::error::{SolverError, SolverResult};

/// Place a mass flow on every section of `network`.
///
/// Root nodes (start nodes forward, end nodes backward) carry the design flow
/// `mass_flow_rate * (1 + design_margin / 100)`. A section carries the flow of
/// the node feeding it times its `flow_splitting_factor`; a node carries the
/// sum of the section flows arriving at it. Preassigned networks keep their
/// section flows, which must all be present.
pub fn assign_design_flows(network: &mut Network) -> SolverResult<()> {
    if network.flow_assignment() == FlowAssignment::Preassigned {
        for section in network.sections() {
            match section.mass_flow_rate {
                Some(m) if m.is_finite() && m >= 0.0 => {}
                Some(m) => {
                    return Err(SolverError::missing(format!(
                        "non-negative mass_flow_rate for section '{}' (got {m})",
                        section.id()
                    )));
                }
                None => {
                    return Err(SolverError::missing(format!(
                        "mass_flow_rate for section '{}'",
                        section.id()
                    )));
                }
            }
        }
        return Ok(());
    }

    let base = network.design_mass_flow();
    let topology = network.topology().clone();
    let order = topology.topological_edges()?;
    let mut node_flow = vec![0.0; topology.nodes().len()];

    match network.resolved_direction() {
        FlowDirection::Backward => {
            for id in topology.end_nodes() {
                node_flow[id.slot()] = base;
            }
            for &eid in order.iter().rev() {
                let Some(edge) = topology.edge(eid) else { continue };
                let section = &mut network.sections_mut()[edge.section_index];
                let flow = node_flow[edge.to.slot()] * section.spec().flow_splitting_factor;
                section.mass_flow_rate = Some(flow);
                node_flow[edge.from.slot()] += flow;
            }
        }
        _ => {
            for id in topology.start_nodes() {
                node_flow[id.slot()] = base;
            }
            for &eid in &order {
                let Some(edge) = topology.edge(eid) else { continue };
                let section = &mut network.sections_mut()[edge.section_index];
                let flow = node_flow[edge.from.slot()] * section.spec().flow_splitting_factor;
                section.mass_flow_rate = Some(flow);
                node_flow[edge.to.slot()] += flow;
            }
        }
    }
    tracing::debug!(network = network.name(), base, "design flows assigned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_model::{Fluid, NetworkSpec, PipeSection, PipeSectionSpec};

    fn section(id: &str, start: &str, end: &str, split: f64) -> PipeSection {
        PipeSection::new(PipeSectionSpec {
            id: id.into(),
            start_node: Some(start.into()),
            end_node: Some(end.into()),
            length: 10.0,
            pipe_diameter: Some(0.1),
            flow_splitting_factor: split,
            ..PipeSectionSpec::default()
        })
        .unwrap()
    }

    fn tee(direction: FlowDirection) -> Network {
        Network::new(NetworkSpec {
            upstream_pressure: Some(5e5),
            downstream_pressure: Some(1e5),
            mass_flow_rate: 10.0,
            design_margin: Some(20.0),
            direction,
            ..NetworkSpec::new(
                "tee",
                Fluid::liquid("water", 998.2, 1e-3).unwrap(),
                vec![
                    section("main", "A", "B", 1.0),
                    section("left", "B", "C", 0.25),
                    section("right", "B", "D", 0.75),
                ],
            )
        })
        .unwrap()
    }

    fn flow(net: &Network, id: &str) -> f64 {
        net.section(id).and_then(|s| s.mass_flow_rate).unwrap()
    }

    #[test]
    fn forward_split_follows_factors() {
        let mut net = tee(FlowDirection::Forward);
        assign_design_flows(&mut net).unwrap();
        assert!((flow(&net, "main") - 12.0).abs() < 1e-12);
        assert!((flow(&net, "left") - 3.0).abs() < 1e-12);
        assert!((flow(&net, "right") - 9.0).abs() < 1e-12);
    }

    #[test]
    fn backward_roots_are_end_nodes() {
        let mut net = tee(FlowDirection::Backward);
        assign_design_flows(&mut net).unwrap();
        // each outlet carries the design flow scaled by its factor; the header sums them
        assert!((flow(&net, "left") - 3.0).abs() < 1e-12);
        assert!((flow(&net, "right") - 9.0).abs() < 1e-12);
        assert!((flow(&net, "main") - 12.0).abs() < 1e-12);
    }

    #[test]
    fn preassigned_requires_every_flow() {
        let net = tee(FlowDirection::Forward);
        let mut sub = net
            .subnetwork("sub", &[0, 1], Some(5e5), None, FlowDirection::Forward)
            .unwrap();
        let err = assign_design_flows(&mut sub).unwrap_err();
        assert!(err.to_string().contains("mass_flow_rate for section 'main'"));
    }
}
