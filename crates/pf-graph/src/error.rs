//! Topology-specific error types.

use pf_core::{EdgeId, NodeId, PfError};
use thiserror::Error;

/// Topology construction and validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Edge {edge} refers to non-existent node {node}")]
    InvalidNodeRef { edge: EdgeId, node: NodeId },

    #[error("Section '{section}' starts and ends on node '{node}'")]
    SelfLoop { section: String, node: String },

    #[error("Section '{section}' appears more than once in the topology")]
    DuplicateSection { section: String },

    /// A declared edge names a section that is not part of the network.
    #[error("Declared edge refers to unknown section '{section}'")]
    UnknownSection { section: String },

    #[error("Node '{name}' is not part of the topology")]
    UnknownNode { name: String },

    /// Adjacency list is inconsistent with the edge endpoints.
    #[error("Edge {edge} in node {node}'s adjacency list but doesn't touch that node")]
    InconsistentAdjacency { edge: EdgeId, node: NodeId },

    #[error("Network topology contains a cycle through node '{node}'")]
    Cycle { node: String },
}

pub type GraphResult<T> = Result<T, GraphError>;

impl From<GraphError> for PfError {
    fn from(err: GraphError) -> Self {
        PfError::Invariant {
            what: err.to_string(),
        }
    }
}
