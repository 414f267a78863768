//! pf-graph: topology layer for pipeflow.
//!
//! Provides:
//! - Directed multigraph of named nodes and section edges
//! - Incremental builder with validation
//! - Node-id inference for series-chained section lists
//! - `NodeUnion` for merging shared nodes across networks
//!
//! # Example
//!
//! ```
//! use pf_graph::{SectionEndpoints, infer_topology};
//!
//! let sections = [
//!     SectionEndpoints { id: "s1", start_node: Some("inlet"), end_node: None },
//!     SectionEndpoints { id: "s2", start_node: None, end_node: Some("outlet") },
//! ];
//! let graph = infer_topology(&sections, &[]).unwrap();
//!
//! assert_eq!(graph.nodes().len(), 3);
//! assert_eq!(graph.edges().len(), 2);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod infer;
pub mod union;
pub(crate) mod validate;

pub use builder::TopologyBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{StartNodes, TopologyEdge, TopologyGraph, TopologyNode, TopologyWarning};
pub use infer::{DeclaredEdge, ResolvedEndpoints, SectionEndpoints, infer_topology, resolve_endpoints};
pub use union::NodeUnion;
