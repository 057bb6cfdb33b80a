// SPDX-License-Identifier: MIT

//! Wave-based workflow executor
//!
//! A run validates the definition, then repeatedly executes the ready set
//! (nodes whose parents have all completed) as one concurrent wave. Every
//! wave is drained completely before failures are looked at; the first
//! failure to settle aborts the run.

use super::context::ExecutionContext;
use super::graph::DependencyMap;
use super::types::{Node, WorkflowDefinition};
use super::validator::DagValidator;
use crate::adk::agent::{AgentResult, AgentRunner, TaskContext};
use crate::adk::error::{ExecutionError, NodeError, WorkflowError};
use crate::kinetic::audit::{AuditBackend, AuditLogger, NoopAuditBackend, WorkflowStatus};
use crate::kinetic::directory::AgentDirectory;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::time::timeout;

/// Task handed to convergence nodes
pub const SYNTHESIS_TASK: &str = "Synthesize the results";

/// Input prepared for one node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInput {
    pub task: String,
    pub context: Option<TaskContext>,
}

/// Build a node's input from its parents' recorded outputs.
///
/// - no parents: the run's initial message
/// - one parent: that parent's answer
/// - several parents: [`SYNTHESIS_TASK`] plus the parents' answers keyed by
///   branch name
pub fn prepare_input(
    def: &WorkflowDefinition,
    parents: &[String],
    ctx: &ExecutionContext,
) -> NodeInput {
    let answer_of = |node_id: &str| {
        ctx.result(node_id)
            .map(|r| r.answer.clone())
            .unwrap_or_default()
    };

    match parents {
        [] => NodeInput {
            task: ctx.initial_message.clone().unwrap_or_default(),
            context: None,
        },
        [parent] => NodeInput {
            task: answer_of(parent),
            context: None,
        },
        _ => {
            let mut context = TaskContext::new();
            for parent in parents {
                let branch = def
                    .get_node(parent)
                    .map(|n| n.branch_name().to_string())
                    .unwrap_or_else(|| parent.clone());
                if context.insert(branch.clone(), answer_of(parent)).is_some() {
                    log::warn!(
                        "Branch name '{}' used by several parents, keeping the output of '{}'",
                        branch,
                        parent
                    );
                }
            }
            NodeInput {
                task: SYNTHESIS_TASK.to_string(),
                context: Some(context),
            }
        }
    }
}

/// Runs workflow definitions against injected collaborators
pub struct WorkflowExecutor {
    directory: Arc<dyn AgentDirectory>,
    runner: Arc<dyn AgentRunner>,
    audit: Arc<dyn AuditBackend>,
}

impl WorkflowExecutor {
    /// Create an executor with audit logging disabled
    pub fn new(directory: Arc<dyn AgentDirectory>, runner: Arc<dyn AgentRunner>) -> Self {
        Self {
            directory,
            runner,
            audit: Arc::new(NoopAuditBackend),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditBackend>) -> Self {
        self.audit = audit;
        self
    }

    /// Validate and run `def`, seeding start nodes with `initial_message`.
    ///
    /// Returns the finalized context on success. Validation failures are
    /// returned before any execution state or audit session exists.
    pub async fn execute(
        &self,
        def: &WorkflowDefinition,
        initial_message: Option<String>,
    ) -> Result<ExecutionContext, WorkflowError> {
        DagValidator::validate(def)?;
        DagValidator::validate_agents_exist(def, self.directory.as_ref()).await?;

        let audit = self.audit.open_logger();
        let mut context = ExecutionContext::new(&def.workflow_id, initial_message);
        context.history_session_id = audit.create_session(&def.workflow_id, &def.name).await;
        let session_id = context.history_session_id.clone();
        let session = session_id.as_deref();

        log::info!(
            "Starting workflow '{}' ({} nodes), execution {}",
            def.workflow_id,
            def.nodes.len(),
            context.execution_id
        );

        let deps = DependencyMap::from_definition(def);
        let state = RwLock::new(context);
        let outcome = self
            .run_waves(def, &deps, &state, audit.as_ref(), session)
            .await;
        let mut context = state.into_inner();

        match &outcome {
            Ok(()) => {
                let summary = run_summary(def, &context);
                audit
                    .log_workflow_complete(
                        session,
                        &def.workflow_id,
                        WorkflowStatus::Completed,
                        Some(&summary),
                    )
                    .await;
            }
            Err(e) => {
                if let ExecutionError::Node(node_err) = e {
                    audit
                        .log_error(
                            session,
                            node_err.node_id(),
                            node_err.agent_id(),
                            &node_err.to_string(),
                            node_err.context(),
                        )
                        .await;
                }
                audit
                    .log_workflow_complete(session, &def.workflow_id, WorkflowStatus::Failed, None)
                    .await;
            }
        }

        context.finalize();
        audit.close().await;

        match outcome {
            Ok(()) => {
                log::info!(
                    "Workflow '{}' completed, execution {} took {:?}",
                    def.workflow_id,
                    context.execution_id,
                    context.duration()
                );
                Ok(context)
            }
            Err(e) => {
                log::error!(
                    "Workflow '{}' failed, execution {}: {}",
                    def.workflow_id,
                    context.execution_id,
                    e
                );
                Err(e.into())
            }
        }
    }

    async fn run_waves(
        &self,
        def: &WorkflowDefinition,
        deps: &DependencyMap,
        state: &RwLock<ExecutionContext>,
        audit: &dyn AuditLogger,
        session: Option<&str>,
    ) -> Result<(), ExecutionError> {
        let mut wave = 0;

        loop {
            let ready: Vec<&Node> = {
                let ctx = state.read().await;
                if ctx.completed_count() >= def.nodes.len() {
                    return Ok(());
                }

                let ready = deps.ready_set(def, ctx.completed_nodes());
                if ready.is_empty() {
                    let pending: Vec<String> = def
                        .nodes
                        .iter()
                        .filter(|n| !ctx.is_completed(&n.node_id))
                        .map(|n| n.node_id.clone())
                        .collect();
                    log::error!("No runnable nodes left, pending: {:?}", pending);
                    return Err(ExecutionError::Deadlock { pending });
                }

                ready
                    .into_iter()
                    .filter_map(|id| def.get_node(id))
                    .collect()
            };

            wave += 1;
            log::info!(
                "Wave {}: executing {} nodes: {:?}",
                wave,
                ready.len(),
                ready.iter().map(|n| n.node_id.as_str()).collect::<Vec<_>>()
            );

            let mut units: FuturesUnordered<_> = ready
                .iter()
                .map(|node| {
                    self.execute_node(def, node, deps.parents(&node.node_id), state, audit, session)
                })
                .collect();

            // Drain the whole wave before deciding anything
            let mut first_failure: Option<NodeError> = None;
            while let Some(outcome) = units.next().await {
                if let Err(e) = outcome {
                    if let Some(extra) = keep_first_failure(&mut first_failure, e) {
                        log::warn!("Wave {}: discarding additional failure: {}", wave, extra);
                    }
                }
            }

            if let Some(err) = first_failure {
                return Err(err.into());
            }
        }
    }

    async fn execute_node(
        &self,
        def: &WorkflowDefinition,
        node: &Node,
        parents: &[String],
        state: &RwLock<ExecutionContext>,
        audit: &dyn AuditLogger,
        session: Option<&str>,
    ) -> Result<(), NodeError> {
        let failed = |message: String, context: Value| NodeError::Failed {
            node_id: node.node_id.clone(),
            agent_id: node.agent_id.clone(),
            message,
            context,
        };

        audit
            .log_node_start(session, &node.node_id, &node.agent_id)
            .await;

        let agent = self
            .directory
            .get_agent(&node.agent_id)
            .await
            .map_err(|e| failed(e.to_string(), Value::Null))?;

        let input = {
            let ctx = state.read().await;
            prepare_input(def, parents, &ctx)
        };

        log::debug!(
            "Executing node {} with agent {} ({} parents, timeout {:?})",
            node.node_id,
            node.agent_id,
            parents.len(),
            node.timeout
        );

        let started = Instant::now();
        let call = self
            .runner
            .run(&agent, &input.task, input.context.as_ref());

        // On timeout the runner future is dropped, which cancels the call
        let result: AgentResult = match timeout(node.timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return Err(failed(e.to_string(), Value::Null)),
            Err(_) => {
                return Err(NodeError::Timeout {
                    node_id: node.node_id.clone(),
                    agent_id: node.agent_id.clone(),
                    timeout: node.timeout,
                })
            }
        };

        if !result.is_success() {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "agent reported an error".to_string());
            let raw = serde_json::to_value(&result).unwrap_or(Value::Null);
            return Err(failed(message, raw));
        }

        log::info!(
            "Node {} completed in {:?} ({} iterations, {} tools)",
            node.node_id,
            started.elapsed(),
            result.iterations,
            result.tools_used.len()
        );

        audit
            .log_node_complete(session, &node.node_id, &node.agent_id, &result)
            .await;
        state.write().await.mark_completed(&node.node_id, result);

        Ok(())
    }
}

/// Keep the first failure of a wave. Later failures are handed back to the
/// caller untouched.
fn keep_first_failure(first: &mut Option<NodeError>, err: NodeError) -> Option<NodeError> {
    if first.is_some() {
        return Some(err);
    }
    log::error!("{}", err);
    *first = Some(err);
    None
}

/// Payload attached to the workflow-complete audit event
fn run_summary(def: &WorkflowDefinition, ctx: &ExecutionContext) -> Value {
    let outputs: serde_json::Map<String, Value> = ctx
        .terminal_results(def)
        .into_iter()
        .map(|(id, r)| (id.to_string(), Value::String(r.answer.clone())))
        .collect();

    json!({
        "execution_id": ctx.execution_id,
        "completed_nodes": ctx.completed_count(),
        "outputs": outputs,
    })
}
