// SPDX-License-Identifier: MIT

//! Dependency bookkeeping shared by the validator, the executor and `plan`

use super::types::WorkflowDefinition;
use std::collections::{HashMap, HashSet};

/// node_id -> parent node_ids, in edge declaration order without duplicates
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    parents: HashMap<String, Vec<String>>,
}

impl DependencyMap {
    pub fn from_definition(def: &WorkflowDefinition) -> Self {
        let mut parents: HashMap<String, Vec<String>> = def
            .nodes
            .iter()
            .map(|n| (n.node_id.clone(), Vec::new()))
            .collect();

        for edge in &def.edges {
            let entry = parents.entry(edge.to.clone()).or_default();
            if !entry.contains(&edge.from) {
                entry.push(edge.from.clone());
            }
        }

        Self { parents }
    }

    /// Parents of `node_id` (empty for start nodes and unknown ids)
    pub fn parents(&self, node_id: &str) -> &[String] {
        self.parents.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether every parent of `node_id` has completed
    pub fn dependencies_satisfied(&self, node_id: &str, completed: &HashSet<String>) -> bool {
        self.parents(node_id).iter().all(|p| completed.contains(p))
    }

    /// Nodes not yet completed whose parents have all completed, in node
    /// declaration order
    pub fn ready_set<'a>(
        &self,
        def: &'a WorkflowDefinition,
        completed: &HashSet<String>,
    ) -> Vec<&'a str> {
        def.nodes
            .iter()
            .map(|n| n.node_id.as_str())
            .filter(|id| !completed.contains(*id))
            .filter(|id| self.dependencies_satisfied(id, completed))
            .collect()
    }
}

/// Ids of nodes that no other node depends on
pub fn terminal_nodes(def: &WorkflowDefinition) -> Vec<&str> {
    let with_children: HashSet<&str> = def.edges.iter().map(|e| e.from.as_str()).collect();
    def.nodes
        .iter()
        .map(|n| n.node_id.as_str())
        .filter(|id| !with_children.contains(id))
        .collect()
}

/// The waves a fully successful run would execute.
///
/// Stops early if no node becomes ready, so an invalid (cyclic) definition
/// yields a partial plan rather than looping.
pub fn execution_waves(def: &WorkflowDefinition) -> Vec<Vec<String>> {
    let deps = DependencyMap::from_definition(def);
    let mut completed: HashSet<String> = HashSet::new();
    let mut waves = Vec::new();

    while completed.len() < def.nodes.len() {
        let wave: Vec<String> = deps
            .ready_set(def, &completed)
            .into_iter()
            .map(str::to_string)
            .collect();
        if wave.is_empty() {
            break;
        }
        completed.extend(wave.iter().cloned());
        waves.push(wave);
    }

    waves
}
