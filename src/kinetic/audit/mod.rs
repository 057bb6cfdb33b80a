// SPDX-License-Identifier: MIT

//! Best-effort audit logging for workflow runs
//!
//! Every method on [`AuditLogger`] is infallible: implementations swallow
//! their own failures, so the scheduler never handles logging errors. A
//! logger is opened per run through an [`AuditBackend`], which keeps the
//! "disabled for this run" state from leaking into later runs.

mod http;

pub use http::{HttpAuditBackend, HttpAuditLogger};

use crate::adk::agent::{AgentResult, AgentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Final status of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Completed,
    Failed,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Sink for node and workflow lifecycle events.
///
/// All methods are no-ops when `session_id` is `None` or the logger has
/// disabled itself.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Open a session for a run. Returns `None` (and disables the logger)
    /// when the backend cannot be reached.
    async fn create_session(&self, workflow_id: &str, name: &str) -> Option<String>;

    async fn log_node_start(&self, session_id: Option<&str>, node_id: &str, agent_id: &str);

    async fn log_node_complete(
        &self,
        session_id: Option<&str>,
        node_id: &str,
        agent_id: &str,
        result: &AgentResult,
    );

    async fn log_workflow_complete(
        &self,
        session_id: Option<&str>,
        workflow_id: &str,
        status: WorkflowStatus,
        result: Option<&Value>,
    );

    async fn log_error(
        &self,
        session_id: Option<&str>,
        node_id: &str,
        agent_id: &str,
        error: &str,
        context: Option<&Value>,
    );

    /// Release transport resources. Later calls become no-ops.
    async fn close(&self);
}

/// Hands out one [`AuditLogger`] per workflow run
pub trait AuditBackend: Send + Sync {
    fn open_logger(&self) -> Arc<dyn AuditLogger>;
}

/// Logger that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn create_session(&self, _workflow_id: &str, _name: &str) -> Option<String> {
        None
    }

    async fn log_node_start(&self, _session_id: Option<&str>, _node_id: &str, _agent_id: &str) {}

    async fn log_node_complete(
        &self,
        _session_id: Option<&str>,
        _node_id: &str,
        _agent_id: &str,
        _result: &AgentResult,
    ) {
    }

    async fn log_workflow_complete(
        &self,
        _session_id: Option<&str>,
        _workflow_id: &str,
        _status: WorkflowStatus,
        _result: Option<&Value>,
    ) {
    }

    async fn log_error(
        &self,
        _session_id: Option<&str>,
        _node_id: &str,
        _agent_id: &str,
        _error: &str,
        _context: Option<&Value>,
    ) {
    }

    async fn close(&self) {}
}

/// Backend used when no audit service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditBackend;

impl AuditBackend for NoopAuditBackend {
    fn open_logger(&self) -> Arc<dyn AuditLogger> {
        Arc::new(NoopAuditLogger)
    }
}

/// Wire format of a single audit event
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AuditEvent<'a> {
    NodeStart {
        node_id: &'a str,
        agent_id: &'a str,
    },
    NodeComplete {
        node_id: &'a str,
        agent_id: &'a str,
        status: AgentStatus,
        iterations: u32,
        tools_used: &'a [String],
        tool_count: usize,
    },
    WorkflowComplete {
        workflow_id: &'a str,
        status: WorkflowStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<&'a Value>,
    },
    Error {
        node_id: &'a str,
        agent_id: &'a str,
        error: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<&'a Value>,
    },
}

impl AuditEvent<'_> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            AuditEvent::NodeStart { .. } => "node_start",
            AuditEvent::NodeComplete { .. } => "node_complete",
            AuditEvent::WorkflowComplete { .. } => "workflow_complete",
            AuditEvent::Error { .. } => "error",
        }
    }
}

/// An event stamped with the time it was emitted
#[derive(Debug, Serialize)]
pub(crate) struct TimestampedEvent<'a> {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent<'a>,
}

impl<'a> TimestampedEvent<'a> {
    pub(crate) fn now(event: AuditEvent<'a>) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
