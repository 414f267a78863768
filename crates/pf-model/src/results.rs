//! Per-run result snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::outputs::{CalculationOutput, ResultSummary, Rounded, round, round_opt};
use crate::section::PipeSection;

/// Snapshot of one solved section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionResult {
    pub section_id: String,
    pub start_node: String,
    pub end_node: String,
    pub mass_flow_rate: Option<f64>,
    pub fitting_k: Option<f64>,
    pub pipe_length_k: Option<f64>,
    pub total_k: Option<f64>,
    pub equivalent_length: Option<f64>,
    pub calculation_output: CalculationOutput,
    pub summary: ResultSummary,
}

impl SectionResult {
    pub fn from_section(section: &PipeSection, start_node: &str, end_node: &str) -> Self {
        Self {
            section_id: section.id().to_string(),
            start_node: start_node.to_string(),
            end_node: end_node.to_string(),
            mass_flow_rate: section.mass_flow_rate,
            fitting_k: section.fitting_k,
            pipe_length_k: section.pipe_length_k,
            total_k: section.total_k,
            equivalent_length: section.equivalent_length,
            calculation_output: section.calculation_output.clone(),
            summary: section.result_summary.clone(),
        }
    }
}

impl Rounded for SectionResult {
    fn rounded(&self) -> Self {
        Self {
            section_id: self.section_id.clone(),
            start_node: self.start_node.clone(),
            end_node: self.end_node.clone(),
            mass_flow_rate: round_opt(self.mass_flow_rate),
            fitting_k: round_opt(self.fitting_k),
            pipe_length_k: round_opt(self.pipe_length_k),
            total_k: round_opt(self.total_k),
            equivalent_length: round_opt(self.equivalent_length),
            calculation_output: self.calculation_output.rounded(),
            summary: self.summary.rounded(),
        }
    }
}

fn round_map(map: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    map.iter().map(|(k, &v)| (k.clone(), round(v))).collect()
}

/// Snapshot of one solved network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkResult {
    pub network: String,
    pub sections: Vec<SectionResult>,
    pub aggregate: CalculationOutput,
    pub summary: ResultSummary,
    pub node_pressures: BTreeMap<String, f64>,
}

impl NetworkResult {
    pub fn section(&self, id: &str) -> Option<&SectionResult> {
        self.sections.iter().find(|s| s.section_id == id)
    }

    pub fn node_pressure(&self, node: &str) -> Option<f64> {
        self.node_pressures.get(node).copied()
    }
}

impl Rounded for NetworkResult {
    fn rounded(&self) -> Self {
        Self {
            network: self.network.clone(),
            sections: self.sections.iter().map(Rounded::rounded).collect(),
            aggregate: self.aggregate.rounded(),
            summary: self.summary.rounded(),
            node_pressures: round_map(&self.node_pressures),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleResult {
    pub bundle_id: String,
    pub network: String,
    pub result: NetworkResult,
}

/// Snapshot of a coordinated multi-network solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSystemResult {
    pub bundles: Vec<BundleResult>,
    /// Canonical pressure per shared node group id.
    pub shared_node_pressures: BTreeMap<String, f64>,
    pub iterations: usize,
    pub converged: bool,
    pub max_residual: f64,
}

impl NetworkSystemResult {
    pub fn bundle(&self, id: &str) -> Option<&BundleResult> {
        self.bundles.iter().find(|b| b.bundle_id == id)
    }
}

impl Rounded for NetworkSystemResult {
    fn rounded(&self) -> Self {
        Self {
            bundles: self
                .bundles
                .iter()
                .map(|b| BundleResult {
                    bundle_id: b.bundle_id.clone(),
                    network: b.network.clone(),
                    result: b.result.rounded(),
                })
                .collect(),
            shared_node_pressures: round_map(&self.shared_node_pressures),
            iterations: self.iterations,
            converged: self.converged,
            max_residual: round(self.max_residual),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::StatePoint;

    #[test]
    fn rounded_snapshot_is_deterministic() {
        let mut result = NetworkResult {
            network: "n".into(),
            ..NetworkResult::default()
        };
        result.node_pressures.insert("A".into(), 1.000_000_000_3);
        result.summary.inlet = StatePoint {
            pressure: Some(2.000_000_000_49),
            ..StatePoint::default()
        };
        let a = serde_json::to_value(result.rounded()).unwrap();
        result.node_pressures.insert("A".into(), 1.000_000_000_1);
        let b = serde_json::to_value(result.rounded()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["node_pressures"]["A"], serde_json::json!(1.0));
    }
}
