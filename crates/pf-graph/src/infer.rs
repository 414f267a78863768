//! Node-id inference from section declarations.
//!
//! Sections may name their endpoints explicitly, or leave them out and rely
//! on series chaining. The strategy here is a pure function over the section
//! list and any declared edges, so it can be exercised without a network.

use std::collections::HashMap;

use crate::builder::TopologyBuilder;
use crate::error::{GraphError, GraphResult};
use crate::graph::TopologyGraph;

/// What a section says about its own endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionEndpoints<'a> {
    pub id: &'a str,
    pub start_node: Option<&'a str>,
    pub end_node: Option<&'a str>,
}

/// An explicit connection for a section, overriding its own node ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredEdge {
    pub section_id: String,
    pub from: String,
    pub to: String,
}

/// Final endpoints of one section after inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    pub section_id: String,
    pub start: String,
    pub end: String,
}

/// Resolve every section's endpoints.
///
/// Precedence: declared edge, then the section's own ids, then chaining. A
/// missing start takes the previous section's end (`{id}_start` for the
/// first); a missing end takes the next section's explicit start, else
/// `{id}_end`.
pub fn resolve_endpoints(
    sections: &[SectionEndpoints<'_>],
    declared: &[DeclaredEdge],
) -> GraphResult<Vec<ResolvedEndpoints>> {
    let mut overrides: HashMap<&str, &DeclaredEdge> = HashMap::new();
    for edge in declared {
        if !sections.iter().any(|s| s.id == edge.section_id) {
            return Err(GraphError::UnknownSection {
                section: edge.section_id.clone(),
            });
        }
        overrides.insert(edge.section_id.as_str(), edge);
    }

    let explicit: Vec<(Option<&str>, Option<&str>)> = sections
        .iter()
        .map(|s| match overrides.get(s.id) {
            Some(edge) => (Some(edge.from.as_str()), Some(edge.to.as_str())),
            None => (s.start_node, s.end_node),
        })
        .collect();

    let mut resolved: Vec<ResolvedEndpoints> = Vec::with_capacity(sections.len());
    for (i, section) in sections.iter().enumerate() {
        let (start, end) = explicit[i];
        let start = match (start, resolved.last()) {
            (Some(name), _) => name.to_string(),
            (None, Some(prev)) => prev.end.clone(),
            (None, None) => format!("{}_start", section.id),
        };
        let end = match (end, explicit.get(i + 1).and_then(|next| next.0)) {
            (Some(name), _) => name.to_string(),
            (None, Some(next_start)) => next_start.to_string(),
            (None, None) => format!("{}_end", section.id),
        };
        resolved.push(ResolvedEndpoints {
            section_id: section.id.to_string(),
            start,
            end,
        });
    }
    Ok(resolved)
}

/// Build the topology for a section list.
pub fn infer_topology(
    sections: &[SectionEndpoints<'_>],
    declared: &[DeclaredEdge],
) -> GraphResult<TopologyGraph> {
    let resolved = resolve_endpoints(sections, declared)?;
    let mut builder = TopologyBuilder::new();
    for (index, r) in resolved.iter().enumerate() {
        builder.add_edge(r.section_id.clone(), index, &r.start, &r.end);
    }
    builder.build()
}
