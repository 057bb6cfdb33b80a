// SPDX-License-Identifier: MIT

//! Agent module - the contract between the orchestrator and agent execution
//!
//! How an agent reasons or calls tools is not the orchestrator's business.
//! It only needs:
//! - `AgentDefinition` - what an agent directory hands back
//! - `AgentResult` - the normalized outcome of one agent run
//! - `AgentRunner` - something that can run a definition against a task
//!
//! `HttpAgentRunner` delegates runs to a remote agent-runner service.

mod http;

pub use http::HttpAgentRunner;

use crate::adk::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Context passed alongside a task, keyed by branch name
pub type TaskContext = BTreeMap<String, String>;

/// Agent definition as stored in an agent directory
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AgentDefinition {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    /// Model name, provider-specific; the runner decides the default
    pub model: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    pub max_iterations: Option<u32>,
    /// Free-form runner parameters
    pub parameters: Option<HashMap<String, serde_json::Value>>,
}

impl AgentDefinition {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            description: String::new(),
            instructions: String::new(),
            model: None,
            tools: vec![],
            max_iterations: None,
            parameters: None,
        }
    }
}

/// Terminal status reported by an agent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Completed,
    Error,
}

/// Normalized result of one agent run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentResult {
    pub status: AgentStatus,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub iterations: u32,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResult {
    /// A successful result carrying `answer`
    pub fn completed(answer: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Completed,
            answer: answer.into(),
            iterations: 1,
            tools_used: vec![],
            error: None,
        }
    }

    /// A result where the agent itself reported a failure
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Error,
            answer: String::new(),
            iterations: 0,
            tools_used: vec![],
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Completed
    }
}

/// Runs a single agent against a task.
///
/// Callers may drop the returned future at any point (the executor does so
/// on timeout); implementations must treat that as cancellation.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(
        &self,
        agent: &AgentDefinition,
        task: &str,
        context: Option<&TaskContext>,
    ) -> Result<AgentResult, AgentError>;
}
