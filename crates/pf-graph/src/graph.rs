//! Core topology data structures and queries.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use pf_core::{EdgeId, NodeId};

use crate::error::{GraphError, GraphResult};

/// A named junction between sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyNode {
    pub id: NodeId,
    pub name: String,
}

/// A directed edge carrying one pipe section from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEdge {
    pub id: EdgeId,
    pub section_id: String,
    /// Position of the section in the owning network's section list.
    pub section_index: usize,
    pub from: NodeId,
    pub to: NodeId,
}

/// Ambiguity found while looking for the network entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyWarning {
    /// More than one node has no incoming edge.
    Branching { nodes: Vec<String> },
    /// Every node has an incoming edge (the graph is cyclic).
    NoStartNode,
}

impl fmt::Display for TopologyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyWarning::Branching { nodes } => write!(
                f,
                "branching topology: {} start nodes ({})",
                nodes.len(),
                nodes.join(", ")
            ),
            TopologyWarning::NoStartNode => {
                write!(f, "no start node: every node has an incoming section")
            }
        }
    }
}

/// Start nodes plus any ambiguity detected while finding them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartNodes {
    pub nodes: Vec<NodeId>,
    pub warning: Option<TopologyWarning>,
}

/// Validated, immutable directed multigraph of sections.
///
/// Adjacency is stored compactly: node i's outgoing edges are
/// `out_edges[out_offsets[i]..out_offsets[i + 1]]`, likewise for incoming.
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    pub(crate) nodes: Vec<TopologyNode>,
    pub(crate) edges: Vec<TopologyEdge>,
    pub(crate) names: HashMap<String, NodeId>,
    pub(crate) out_offsets: Vec<usize>,
    pub(crate) out_edges: Vec<EdgeId>,
    pub(crate) in_offsets: Vec<usize>,
    pub(crate) in_edges: Vec<EdgeId>,
}

impl TopologyGraph {
    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TopologyEdge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&TopologyNode> {
        self.nodes.get(id.slot())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&TopologyEdge> {
        self.edges.get(id.slot())
    }

    /// Look up a node by name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Look up a node by name, failing with [`GraphError::UnknownNode`].
    pub fn require_node(&self, name: &str) -> GraphResult<NodeId> {
        self.node_id(name).ok_or_else(|| GraphError::UnknownNode {
            name: name.to_string(),
        })
    }

    /// Name of a node; empty for an out-of-range id.
    pub fn node_name(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| n.name.as_str())
    }

    /// The edge carrying a given section.
    pub fn edge_for_section(&self, section_id: &str) -> Option<&TopologyEdge> {
        self.edges.iter().find(|e| e.section_id == section_id)
    }

    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        let idx = node.slot();
        if idx >= self.nodes.len() {
            return &[];
        }
        &self.out_edges[self.out_offsets[idx]..self.out_offsets[idx + 1]]
    }

    pub fn in_edges(&self, node: NodeId) -> &[EdgeId] {
        let idx = node.slot();
        if idx >= self.nodes.len() {
            return &[];
        }
        &self.in_edges[self.in_offsets[idx]..self.in_offsets[idx + 1]]
    }

    pub fn indegree(&self, node: NodeId) -> usize {
        self.in_edges(node).len()
    }

    pub fn outdegree(&self, node: NodeId) -> usize {
        self.out_edges(node).len()
    }

    /// Nodes with no incoming edge, in id order.
    pub fn start_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&id| self.indegree(id) == 0)
            .collect()
    }

    /// Nodes with no outgoing edge, in id order.
    pub fn end_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&id| self.outdegree(id) == 0)
            .collect()
    }

    /// Start nodes, logging and reporting branching or missing entry points.
    pub fn detect_start_nodes(&self) -> StartNodes {
        let nodes = self.start_nodes();
        let warning = match nodes.len() {
            0 if !self.nodes.is_empty() => Some(TopologyWarning::NoStartNode),
            0 | 1 => None,
            _ => Some(TopologyWarning::Branching {
                nodes: nodes.iter().map(|&id| self.node_name(id).to_string()).collect(),
            }),
        };
        if let Some(w) = &warning {
            tracing::warn!(warning = %w, "ambiguous network entry");
        }
        StartNodes { nodes, warning }
    }

    /// Mask of nodes reachable from `start` following edge direction.
    pub fn reachable_from(&self, start: NodeId) -> Vec<bool> {
        self.flood(start, move |id| self.out_edges(id), |e| e.to)
    }

    /// Mask of nodes from which `target` can be reached.
    pub fn can_reach(&self, target: NodeId) -> Vec<bool> {
        self.flood(target, move |id| self.in_edges(id), |e| e.from)
    }

    fn flood<'g, A, N>(&'g self, seed: NodeId, adjacent: A, next: N) -> Vec<bool>
    where
        A: Fn(NodeId) -> &'g [EdgeId],
        N: Fn(&TopologyEdge) -> NodeId,
    {
        let mut seen = vec![false; self.nodes.len()];
        if seed.slot() >= seen.len() {
            return seen;
        }
        let mut stack = vec![seed];
        seen[seed.slot()] = true;
        while let Some(id) = stack.pop() {
            for &eid in adjacent(id) {
                let n = next(&self.edges[eid.slot()]);
                if !seen[n.slot()] {
                    seen[n.slot()] = true;
                    stack.push(n);
                }
            }
        }
        seen
    }

    /// Edges lying on at least one directed path from `from` to `to`, in id order.
    pub fn edges_on_paths(&self, from: NodeId, to: NodeId) -> Vec<EdgeId> {
        let forward = self.reachable_from(from);
        let backward = self.can_reach(to);
        if forward.is_empty() || !forward.get(to.slot()).copied().unwrap_or(false) {
            return Vec::new();
        }
        self.edges
            .iter()
            .filter(|e| forward[e.from.slot()] && backward[e.to.slot()])
            .map(|e| e.id)
            .collect()
    }

    /// Edges in topological order (Kahn, lowest node id first).
    ///
    /// All edges entering a node are listed before any edge leaving it.
    pub fn topological_edges(&self) -> GraphResult<Vec<EdgeId>> {
        let mut remaining: Vec<usize> = self.nodes.iter().map(|n| self.indegree(n.id)).collect();
        let mut ready: BinaryHeap<Reverse<NodeId>> = self
            .nodes
            .iter()
            .filter(|n| remaining[n.id.slot()] == 0)
            .map(|n| Reverse(n.id))
            .collect();

        let mut order = Vec::with_capacity(self.edges.len());
        let mut visited = 0;
        while let Some(Reverse(id)) = ready.pop() {
            visited += 1;
            for &eid in self.out_edges(id) {
                order.push(eid);
                let to = self.edges[eid.slot()].to;
                remaining[to.slot()] -= 1;
                if remaining[to.slot()] == 0 {
                    ready.push(Reverse(to));
                }
            }
        }

        if visited < self.nodes.len() {
            let stuck = self
                .nodes
                .iter()
                .find(|n| remaining[n.id.slot()] > 0)
                .map_or_else(String::new, |n| n.name.clone());
            return Err(GraphError::Cycle { node: stuck });
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::TopologyBuilder;

    #[test]
    fn degrees_and_terminals() {
        let mut b = TopologyBuilder::new();
        b.add_edge("s1", 0, "A", "B");
        b.add_edge("s2", 1, "B", "C");
        b.add_edge("s3", 2, "B", "D");
        let g = b.build().unwrap();

        let node_b = g.node_id("B").unwrap();
        assert_eq!(g.indegree(node_b), 1);
        assert_eq!(g.outdegree(node_b), 2);
        assert_eq!(g.start_nodes(), vec![g.node_id("A").unwrap()]);
        assert_eq!(g.end_nodes().len(), 2);
    }

    #[test]
    fn edges_on_paths_excludes_side_branch() {
        let mut b = TopologyBuilder::new();
        b.add_edge("s1", 0, "A", "B");
        b.add_edge("s2", 1, "B", "C");
        b.add_edge("s3", 2, "B", "D");
        let g = b.build().unwrap();

        let a = g.node_id("A").unwrap();
        let c = g.node_id("C").unwrap();
        let ids: Vec<&str> = g
            .edges_on_paths(a, c)
            .into_iter()
            .map(|e| g.edge(e).unwrap().section_id.as_str())
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn edges_on_paths_empty_when_unreachable() {
        let mut b = TopologyBuilder::new();
        b.add_edge("s1", 0, "A", "B");
        b.add_edge("s2", 1, "C", "D");
        let g = b.build().unwrap();
        let a = g.node_id("A").unwrap();
        let d = g.node_id("D").unwrap();
        assert!(g.edges_on_paths(a, d).is_empty());
    }
}
