// SPDX-License-Identifier: MIT

//! Typed error handling for kinetic-orchestrator
//!
//! Errors are split by the phase that raises them:
//! - [`ValidationError`] - static problems found before any execution state exists
//! - [`ExecutionError`] - failures during a run (scheduler invariants, node failures)
//! - [`NodeError`] - a single node failed or exceeded its timeout
//!
//! [`WorkflowError`] is what the executor hands back to callers, and
//! [`KineticError`] wraps it together with application-level failures.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for kinetic-orchestrator
#[derive(Debug, Error)]
pub enum KineticError {
    /// Configuration errors (missing env vars, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workflow validation or execution errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Agent runner errors
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl KineticError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Everything a workflow run can fail with
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The agent directory failed for a reason other than "not found"
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl WorkflowError {
    /// The node-scoped error behind this failure, if any
    pub fn node_error(&self) -> Option<&NodeError> {
        match self {
            WorkflowError::Execution(ExecutionError::Node(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<NodeError> for WorkflowError {
    fn from(err: NodeError) -> Self {
        Self::Execution(ExecutionError::Node(err))
    }
}

/// Structural or semantic problem with a workflow definition.
///
/// Raised only before a run starts. Validation is fail-fast, so each error
/// describes the first violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workflow must contain at least one node")]
    EmptyWorkflow,

    #[error("duplicate node ids: {}", .0.join(", "))]
    DuplicateNodes(Vec<String>),

    #[error("edge {from} -> {to} references unknown node '{missing}'")]
    UnknownNode {
        edge: usize,
        from: String,
        to: String,
        missing: String,
    },

    #[error("self-loop on node '{node}'")]
    SelfLoop { edge: usize, node: String },

    #[error("cycle detected among nodes: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("workflow graph is disconnected, unreachable nodes: {}", .0.join(", "))]
    Disconnected(Vec<String>),

    #[error("agent '{agent_id}' referenced by node '{node_id}' not found")]
    AgentNotFound { node_id: String, agent_id: String },
}

impl ValidationError {
    /// Human-readable message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Path of the offending field in the workflow definition
    pub fn field(&self) -> Option<String> {
        match self {
            ValidationError::EmptyWorkflow | ValidationError::DuplicateNodes(_) => {
                Some("nodes".to_string())
            }
            ValidationError::UnknownNode {
                edge, from, missing, ..
            } => {
                let side = if from == missing { "from" } else { "to" };
                Some(format!("edges[{}].{}", edge, side))
            }
            ValidationError::SelfLoop { edge, .. } => Some(format!("edges[{}]", edge)),
            ValidationError::Cycle(_) | ValidationError::Disconnected(_) => {
                Some("edges".to_string())
            }
            ValidationError::AgentNotFound { node_id, .. } => {
                Some(format!("nodes[{}].agent_id", node_id))
            }
        }
    }
}

/// Failure during a workflow run
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// No node is ready but the run is not complete. Validation should make
    /// this unreachable.
    #[error("deadlock: no runnable nodes, still pending: {}", .pending.join(", "))]
    Deadlock { pending: Vec<String> },

    #[error(transparent)]
    Node(#[from] NodeError),
}

/// A single node failed
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node '{node_id}' (agent '{agent_id}') failed: {message}")]
    Failed {
        node_id: String,
        agent_id: String,
        message: String,
        /// Diagnostic payload, usually the raw agent result
        context: Value,
    },

    #[error("node '{node_id}' (agent '{agent_id}') execution exceeded timeout of {timeout:?}")]
    Timeout {
        node_id: String,
        agent_id: String,
        timeout: Duration,
    },
}

impl NodeError {
    pub fn node_id(&self) -> &str {
        match self {
            NodeError::Failed { node_id, .. } | NodeError::Timeout { node_id, .. } => node_id,
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            NodeError::Failed { agent_id, .. } | NodeError::Timeout { agent_id, .. } => agent_id,
        }
    }

    /// Diagnostic context attached to the failure
    pub fn context(&self) -> Option<&Value> {
        match self {
            NodeError::Failed { context, .. } if !context.is_null() => Some(context),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NodeError::Timeout { .. })
    }
}

/// Agent directory lookup failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("agent '{0}' not found")]
    NotFound(String),

    #[error("agent directory unavailable: {0}")]
    Unavailable(String),
}

/// Agent runner failure (the call itself broke, as opposed to the agent
/// reporting an error status)
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent runner request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from agent runner: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for AgentError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for AgentError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_field_paths() {
        let err = ValidationError::UnknownNode {
            edge: 2,
            from: "a".to_string(),
            to: "ghost".to_string(),
            missing: "ghost".to_string(),
        };
        assert_eq!(err.field().as_deref(), Some("edges[2].to"));

        let err = ValidationError::AgentNotFound {
            node_id: "recon".to_string(),
            agent_id: "scanner".to_string(),
        };
        assert_eq!(err.field().as_deref(), Some("nodes[recon].agent_id"));
        assert!(err.message().contains("scanner"));
    }

    #[test]
    fn test_node_error_accessors() {
        let err = NodeError::Timeout {
            node_id: "slow".to_string(),
            agent_id: "sleeper".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(err.node_id(), "slow");
        assert_eq!(err.agent_id(), "sleeper");
        assert!(err.is_timeout());
        assert!(err.context().is_none());
        assert!(err.to_string().contains("exceeded timeout"));

        let err = NodeError::Failed {
            node_id: "n".to_string(),
            agent_id: "a".to_string(),
            message: "boom".to_string(),
            context: json!({"status": "error"}),
        };
        assert_eq!(err.context(), Some(&json!({"status": "error"})));
    }

    #[test]
    fn test_workflow_error_exposes_node_error() {
        let err: WorkflowError = NodeError::Failed {
            node_id: "n".to_string(),
            agent_id: "a".to_string(),
            message: "boom".to_string(),
            context: Value::Null,
        }
        .into();
        assert_eq!(err.node_error().map(|e| e.node_id()), Some("n"));

        let err: WorkflowError = ExecutionError::Deadlock {
            pending: vec!["x".to_string()],
        }
        .into();
        assert!(err.node_error().is_none());
    }
}
