// SPDX-License-Identifier: MIT

//! Workflow definition types
//!
//! A workflow is an immutable DAG: nodes bound to agents, and edges where
//! `to` waits for `from` to complete.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-node timeout (one hour)
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(3600);

fn default_timeout() -> Duration {
    DEFAULT_NODE_TIMEOUT
}

/// Top-level workflow definition
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WorkflowDefinition {
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowDefinition {
    pub fn new(workflow_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            name: name.into(),
            description: String::new(),
            nodes: vec![],
            edges: vec![],
        }
    }

    /// Add a node (builder style)
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add an edge `from -> to` (builder style)
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }
}

/// A node in the workflow graph, bound to exactly one agent
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Node {
    pub node_id: String,
    pub agent_id: String,
    /// Label for this node's output when it feeds a convergence node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Execution bound, in seconds in YAML/JSON
    #[serde(default = "default_timeout", with = "timeout_secs")]
    pub timeout: Duration,
}

impl Node {
    pub fn new(node_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            agent_id: agent_id.into(),
            branch_name: None,
            timeout: DEFAULT_NODE_TIMEOUT,
        }
    }

    pub fn with_branch_name(mut self, branch_name: impl Into<String>) -> Self {
        self.branch_name = Some(branch_name.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Branch name, falling back to the node id
    pub fn branch_name(&self) -> &str {
        self.branch_name.as_deref().unwrap_or(&self.node_id)
    }
}

/// `to` depends on `from` completing first
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// (De)serialize a `Duration` as (possibly fractional) seconds
mod timeout_secs {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if secs <= 0.0 {
            return Err(de::Error::custom(format!(
                "timeout must be a positive number of seconds, got {}",
                secs
            )));
        }
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}
