//! Multi-network systems joined at shared boundary nodes.

use std::collections::HashSet;
use std::str::FromStr;

use pf_graph::NodeUnion;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, positive};
use crate::network::Network;

/// Control-valve tuning strategy for one bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerMethod {
    #[default]
    SinglePass,
    Advanced,
}

impl FromStr for OptimizerMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single_pass" | "single-pass" | "simple" => Ok(OptimizerMethod::SinglePass),
            "advanced" | "iterative" => Ok(OptimizerMethod::Advanced),
            _ => Err(ModelError::UnknownVariant {
                what: "optimizer method",
                value: s.to_string(),
            }),
        }
    }
}

/// Declarative optimizer settings attached to a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub method: OptimizerMethod,
    /// Fraction of each correction applied per iteration.
    pub damping: f64,
    pub max_iterations: usize,
    /// Worst valve residual accepted as converged, Pa.
    pub tolerance: f64,
    /// Minimum improvement per iteration before giving up, Pa.
    pub stagnation_tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            method: OptimizerMethod::SinglePass,
            damping: 0.6,
            max_iterations: 30,
            tolerance: 1.0,
            stagnation_tolerance: 0.1,
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> ModelResult<()> {
        let damping = positive("optimizer.damping", self.damping)?;
        if damping > 1.0 {
            return Err(ModelError::invalid("optimizer.damping", "must not exceed 1"));
        }
        if self.max_iterations == 0 {
            return Err(ModelError::invalid("optimizer.max_iterations", "must be at least 1"));
        }
        positive("optimizer.tolerance", self.tolerance)?;
        positive("optimizer.stagnation_tolerance", self.stagnation_tolerance)?;
        Ok(())
    }
}

/// Damped fixed-point settings for the system solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSolverSettings {
    pub max_iterations: usize,
    /// Largest shared-node residual accepted as converged, Pa.
    pub tolerance: f64,
    /// Under-relaxation factor in (0, 1].
    pub relaxation: f64,
}

impl Default for SystemSolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 4,
            tolerance: 1.0,
            relaxation: 0.7,
        }
    }
}

impl SystemSolverSettings {
    pub fn validate(&self) -> ModelResult<()> {
        if self.max_iterations == 0 {
            return Err(ModelError::invalid("system.max_iterations", "must be at least 1"));
        }
        positive("system.tolerance", self.tolerance)?;
        let relaxation = positive("system.relaxation", self.relaxation)?;
        if relaxation > 1.0 {
            return Err(ModelError::invalid("system.relaxation", "must not exceed 1"));
        }
        Ok(())
    }
}

/// A network taking part in a system.
#[derive(Debug, Clone)]
pub struct NetworkBundle {
    pub id: String,
    pub network: Network,
    pub optimizer: Option<OptimizerSettings>,
}

impl NetworkBundle {
    pub fn new(id: &str, network: Network) -> Self {
        Self {
            id: id.to_string(),
            network,
            optimizer: None,
        }
    }

    pub fn with_optimizer(mut self, settings: OptimizerSettings) -> Self {
        self.optimizer = Some(settings);
        self
    }
}

/// One node of one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedNodeMember {
    pub bundle_id: String,
    pub node_id: String,
}

impl SharedNodeMember {
    pub fn new(bundle_id: &str, node_id: &str) -> Self {
        Self {
            bundle_id: bundle_id.to_string(),
            node_id: node_id.to_string(),
        }
    }

    fn key(&self) -> String {
        format!("{}::{}", self.bundle_id, self.node_id)
    }
}

/// Nodes in different bundles that must carry one pressure.
///
/// The first member leads: its solved pressure becomes the canonical value,
/// which is imposed on every other member plus `pressure_bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedNodeGroup {
    pub id: String,
    pub members: Vec<SharedNodeMember>,
    #[serde(default)]
    pub pressure_bias: f64,
}

impl SharedNodeGroup {
    pub fn new(id: &str, members: Vec<SharedNodeMember>) -> Self {
        Self {
            id: id.to_string(),
            members,
            pressure_bias: 0.0,
        }
    }

    pub fn leader(&self) -> Option<&SharedNodeMember> {
        self.members.first()
    }

    pub fn followers(&self) -> &[SharedNodeMember] {
        self.members.get(1..).unwrap_or(&[])
    }
}

/// Validated set of bundles and merged shared-node groups.
#[derive(Debug, Clone)]
pub struct NetworkSystem {
    pub bundles: Vec<NetworkBundle>,
    groups: Vec<SharedNodeGroup>,
    settings: SystemSolverSettings,
}

impl NetworkSystem {
    pub fn new(
        bundles: Vec<NetworkBundle>,
        groups: Vec<SharedNodeGroup>,
        settings: SystemSolverSettings,
    ) -> ModelResult<Self> {
        settings.validate()?;

        let mut seen = HashSet::new();
        for bundle in &bundles {
            if !seen.insert(bundle.id.as_str()) {
                return Err(ModelError::invalid(
                    "bundle id",
                    format!("'{}' is declared more than once", bundle.id),
                ));
            }
            if let Some(opt) = &bundle.optimizer {
                opt.validate()?;
            }
        }

        for group in &groups {
            if group.members.is_empty() {
                return Err(ModelError::Missing {
                    what: format!("members for shared node group '{}'", group.id),
                });
            }
            if !group.pressure_bias.is_finite() {
                return Err(ModelError::invalid("pressure_bias", "must be finite"));
            }
            for member in &group.members {
                let bundle = bundles
                    .iter()
                    .find(|b| b.id == member.bundle_id)
                    .ok_or_else(|| {
                        ModelError::invalid(
                            "shared node",
                            format!(
                                "group '{}' references unknown bundle '{}'",
                                group.id, member.bundle_id
                            ),
                        )
                    })?;
                bundle.network.topology().require_node(&member.node_id)?;
            }
        }

        let groups = merge_groups(groups);
        Ok(Self {
            bundles,
            groups,
            settings,
        })
    }

    pub fn groups(&self) -> &[SharedNodeGroup] {
        &self.groups
    }

    pub fn settings(&self) -> &SystemSolverSettings {
        &self.settings
    }

    pub fn bundle(&self, id: &str) -> Option<&NetworkBundle> {
        self.bundles.iter().find(|b| b.id == id)
    }

    pub fn bundle_mut(&mut self, id: &str) -> Option<&mut NetworkBundle> {
        self.bundles.iter_mut().find(|b| b.id == id)
    }
}

/// Merge groups sharing a member. The earliest group of each merged set
/// keeps its id, bias and leader; members are deduplicated in order.
fn merge_groups(groups: Vec<SharedNodeGroup>) -> Vec<SharedNodeGroup> {
    let mut union = NodeUnion::new();
    for group in &groups {
        let keys: Vec<String> = group.members.iter().map(SharedNodeMember::key).collect();
        if let Some((first, rest)) = keys.split_first() {
            union.insert(first);
            for key in rest {
                union.union(first, key);
            }
        }
    }

    let mut merged: Vec<(String, SharedNodeGroup)> = Vec::new();
    for group in groups {
        let Some(leader) = group.leader() else {
            continue;
        };
        let root = union.find(&leader.key());
        match merged.iter_mut().find(|(r, _)| *r == root) {
            Some((_, target)) => {
                for member in group.members {
                    if !target.members.contains(&member) {
                        target.members.push(member);
                    }
                }
            }
            None => {
                let mut group = group;
                let mut unique: Vec<SharedNodeMember> = Vec::with_capacity(group.members.len());
                for member in group.members.drain(..) {
                    if !unique.contains(&member) {
                        unique.push(member);
                    }
                }
                group.members = unique;
                merged.push((root, group));
            }
        }
    }
    merged.into_iter().map(|(_, g)| g).collect()
}
