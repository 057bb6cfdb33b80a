// SPDX-License-Identifier: MIT

//! Per-run execution state

use super::graph::terminal_nodes;
use super::types::WorkflowDefinition;
use crate::adk::agent::AgentResult;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Mutable state of one workflow run.
///
/// Only the executor mutates it, through [`mark_completed`](Self::mark_completed)
/// and [`finalize`](Self::finalize).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub workflow_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Audit session, absent when the audit backend is unavailable
    pub history_session_id: Option<String>,
    /// Seed input for start nodes
    pub initial_message: Option<String>,
    node_results: HashMap<String, AgentResult>,
    completed_nodes: HashSet<String>,
}

impl ExecutionContext {
    pub fn new(workflow_id: impl Into<String>, initial_message: Option<String>) -> Self {
        let started_at = Utc::now();
        Self {
            execution_id: new_execution_id(started_at),
            workflow_id: workflow_id.into(),
            started_at,
            completed_at: None,
            history_session_id: None,
            initial_message,
            node_results: HashMap::new(),
            completed_nodes: HashSet::new(),
        }
    }

    /// Record a node's successful result. Repeated calls for the same node
    /// keep the first result.
    pub fn mark_completed(&mut self, node_id: &str, result: AgentResult) {
        if !self.completed_nodes.insert(node_id.to_string()) {
            log::debug!("Node {} already marked completed, ignoring", node_id);
            return;
        }
        self.node_results.insert(node_id.to_string(), result);
    }

    /// Stamp the completion time. Only the first call has an effect.
    pub fn finalize(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn is_completed(&self, node_id: &str) -> bool {
        self.completed_nodes.contains(node_id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed_nodes.len()
    }

    pub fn completed_nodes(&self) -> &HashSet<String> {
        &self.completed_nodes
    }

    pub fn result(&self, node_id: &str) -> Option<&AgentResult> {
        self.node_results.get(node_id)
    }

    pub fn node_results(&self) -> &HashMap<String, AgentResult> {
        &self.node_results
    }

    /// Wall-clock duration, once finalized
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    /// Results of nodes nothing depends on, in declaration order
    pub fn terminal_results<'a>(
        &'a self,
        def: &'a WorkflowDefinition,
    ) -> Vec<(&'a str, &'a AgentResult)> {
        terminal_nodes(def)
            .into_iter()
            .filter_map(|id| self.result(id).map(|r| (id, r)))
            .collect()
    }
}

/// Time-ordered, globally unique run id
fn new_execution_id(started_at: DateTime<Utc>) -> String {
    format!(
        "exec-{}-{}",
        started_at.format("%Y%m%dT%H%M%S%3f"),
        Uuid::new_v4().simple()
    )
}
