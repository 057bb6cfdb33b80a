// SPDX-License-Identifier: MIT

//! HTTP audit backend

use super::{AuditBackend, AuditEvent, AuditLogger, TimestampedEvent, WorkflowStatus};
use crate::adk::agent::AgentResult;
use crate::adk::error::KineticError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SessionCreated {
    session_id: String,
}

/// Audit backend that posts events to an HTTP history service.
///
/// The underlying client (and its connection pool) is shared by every
/// logger this backend opens.
#[derive(Clone)]
pub struct HttpAuditBackend {
    client: Client,
    base_url: String,
}

impl HttpAuditBackend {
    /// Create a backend whose requests give up after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, KineticError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl AuditBackend for HttpAuditBackend {
    fn open_logger(&self) -> Arc<dyn AuditLogger> {
        Arc::new(HttpAuditLogger {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            disabled: AtomicBool::new(false),
        })
    }
}

/// Per-run HTTP audit logger
pub struct HttpAuditLogger {
    client: Client,
    base_url: String,
    disabled: AtomicBool,
}

impl HttpAuditLogger {
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    fn disable(&self) {
        self.disabled.store(true, Ordering::Release);
    }

    async fn post_event(&self, session_id: Option<&str>, event: AuditEvent<'_>) {
        let Some(session_id) = session_id else {
            return;
        };
        if self.is_disabled() {
            return;
        }

        let kind = event.kind();
        let url = format!("{}/sessions/{}/events", self.base_url, session_id);
        let sent = self
            .client
            .post(url)
            .json(&TimestampedEvent::now(event))
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        if let Err(e) = sent {
            log::warn!("Dropped '{}' audit event for session {}: {}", kind, session_id, e);
        }
    }
}

#[async_trait]
impl AuditLogger for HttpAuditLogger {
    async fn create_session(&self, workflow_id: &str, name: &str) -> Option<String> {
        if self.is_disabled() {
            return None;
        }

        let url = format!("{}/sessions", self.base_url);
        let body = json!({ "workflow_id": workflow_id, "name": name });

        let created = async {
            self.client
                .post(url)
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json::<SessionCreated>()
                .await
        }
        .await;

        match created {
            Ok(created) => {
                log::debug!(
                    "Opened audit session {} for workflow {}",
                    created.session_id,
                    workflow_id
                );
                Some(created.session_id)
            }
            Err(e) => {
                log::warn!(
                    "Audit backend {} unavailable, audit logging disabled for this run: {}",
                    self.base_url,
                    e
                );
                self.disable();
                None
            }
        }
    }

    async fn log_node_start(&self, session_id: Option<&str>, node_id: &str, agent_id: &str) {
        self.post_event(session_id, AuditEvent::NodeStart { node_id, agent_id })
            .await;
    }

    async fn log_node_complete(
        &self,
        session_id: Option<&str>,
        node_id: &str,
        agent_id: &str,
        result: &AgentResult,
    ) {
        self.post_event(
            session_id,
            AuditEvent::NodeComplete {
                node_id,
                agent_id,
                status: result.status,
                iterations: result.iterations,
                tools_used: &result.tools_used,
                tool_count: result.tools_used.len(),
            },
        )
        .await;
    }

    async fn log_workflow_complete(
        &self,
        session_id: Option<&str>,
        workflow_id: &str,
        status: WorkflowStatus,
        result: Option<&Value>,
    ) {
        self.post_event(
            session_id,
            AuditEvent::WorkflowComplete {
                workflow_id,
                status,
                result,
            },
        )
        .await;
    }

    async fn log_error(
        &self,
        session_id: Option<&str>,
        node_id: &str,
        agent_id: &str,
        error: &str,
        context: Option<&Value>,
    ) {
        self.post_event(
            session_id,
            AuditEvent::Error {
                node_id,
                agent_id,
                error,
                context,
            },
        )
        .await;
    }

    async fn close(&self) {
        self.disable();
    }
}
