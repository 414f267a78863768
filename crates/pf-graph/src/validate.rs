//! Topology validation logic.

use std::collections::HashSet;

use pf_core::{EdgeId, NodeId};

use crate::error::{GraphError, GraphResult};
use crate::graph::{TopologyEdge, TopologyNode};

/// Validate references, self loops and section uniqueness.
pub(crate) fn validate_structure(nodes: &[TopologyNode], edges: &[TopologyEdge]) -> GraphResult<()> {
    let mut sections = HashSet::new();
    for edge in edges {
        for node in [edge.from, edge.to] {
            if node.slot() >= nodes.len() {
                return Err(GraphError::InvalidNodeRef { edge: edge.id, node });
            }
        }
        if edge.from == edge.to {
            return Err(GraphError::SelfLoop {
                section: edge.section_id.clone(),
                node: nodes[edge.from.slot()].name.clone(),
            });
        }
        if !sections.insert(edge.section_id.as_str()) {
            return Err(GraphError::DuplicateSection {
                section: edge.section_id.clone(),
            });
        }
    }
    Ok(())
}

/// Validate one compact adjacency table against the edge endpoints.
pub(crate) fn validate_adjacency<F>(
    nodes: &[TopologyNode],
    edges: &[TopologyEdge],
    offsets: &[usize],
    flat: &[EdgeId],
    endpoint: F,
) -> GraphResult<()>
where
    F: Fn(&TopologyEdge) -> NodeId,
{
    if offsets.len() != nodes.len() + 1 || flat.len() != edges.len() {
        return Err(GraphError::InconsistentAdjacency {
            edge: EdgeId::from_index(0),
            node: nodes.first().map_or(NodeId::from_index(0), |n| n.id),
        });
    }

    let mut seen = HashSet::new();
    for node in nodes {
        let idx = node.id.slot();
        for &eid in &flat[offsets[idx]..offsets[idx + 1]] {
            let touches = edges.get(eid.slot()).is_some_and(|e| endpoint(e) == node.id);
            if !touches || !seen.insert(eid) {
                return Err(GraphError::InconsistentAdjacency { edge: eid, node: node.id });
            }
        }
    }
    Ok(())
}
