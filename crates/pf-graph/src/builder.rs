//! Incremental topology builder.

use std::collections::HashMap;

use pf_core::{EdgeId, NodeId};

use crate::error::GraphResult;
use crate::graph::{TopologyEdge, TopologyGraph, TopologyNode};
use crate::validate;

/// Builder for constructing a topology incrementally.
///
/// Node names are interned on first use; call `build()` to validate and
/// freeze the result into an immutable `TopologyGraph`.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<TopologyNode>,
    edges: Vec<TopologyEdge>,
    names: HashMap<String, NodeId>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of the named node, adding it if needed.
    pub fn node(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(TopologyNode {
            id,
            name: name.to_string(),
        });
        self.names.insert(name.to_string(), id);
        id
    }

    /// Add a section edge between two named nodes.
    pub fn add_edge(
        &mut self,
        section_id: impl Into<String>,
        section_index: usize,
        from: &str,
        to: &str,
    ) -> EdgeId {
        let from = self.node(from);
        let to = self.node(to);
        let id = EdgeId::from_index(self.edges.len() as u32);
        self.edges.push(TopologyEdge {
            id,
            section_id: section_id.into(),
            section_index,
            from,
            to,
        });
        id
    }

    /// Build and validate the topology.
    pub fn build(self) -> GraphResult<TopologyGraph> {
        validate::validate_structure(&self.nodes, &self.edges)?;

        let (out_offsets, out_edges) = Self::build_adjacency(&self.nodes, &self.edges, |e| e.from);
        let (in_offsets, in_edges) = Self::build_adjacency(&self.nodes, &self.edges, |e| e.to);

        validate::validate_adjacency(&self.nodes, &self.edges, &out_offsets, &out_edges, |e| e.from)?;
        validate::validate_adjacency(&self.nodes, &self.edges, &in_offsets, &in_edges, |e| e.to)?;

        Ok(TopologyGraph {
            nodes: self.nodes,
            edges: self.edges,
            names: self.names,
            out_offsets,
            out_edges,
            in_offsets,
            in_edges,
        })
    }

    /// Compact adjacency: for each node, the edges whose `endpoint` is that node.
    fn build_adjacency<F>(
        nodes: &[TopologyNode],
        edges: &[TopologyEdge],
        endpoint: F,
    ) -> (Vec<usize>, Vec<EdgeId>)
    where
        F: Fn(&TopologyEdge) -> NodeId,
    {
        let mut per_node: Vec<Vec<EdgeId>> = vec![Vec::new(); nodes.len()];
        for edge in edges {
            per_node[endpoint(edge).slot()].push(edge.id);
        }

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut flat = Vec::with_capacity(edges.len());
        offsets.push(0);
        for list in per_node {
            flat.extend(list);
            offsets.push(flat.len());
        }
        (offsets, flat)
    }
}
