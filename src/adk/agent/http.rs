// SPDX-License-Identifier: MIT

//! HTTP Agent Runner - delegates agent runs to a remote runner service

use super::{AgentDefinition, AgentResult, AgentRunner, TaskContext};
use crate::adk::error::AgentError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Body sent to `<base_url>/run`
#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    agent: &'a AgentDefinition,
    task: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a TaskContext>,
}

/// Agent runner backed by an HTTP service.
///
/// No client-side timeout is set; the executor bounds every call and drops
/// the request future when a node times out, which aborts the request.
pub struct HttpAgentRunner {
    client: Client,
    base_url: String,
}

impl HttpAgentRunner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn run_url(&self) -> String {
        format!("{}/run", self.base_url)
    }
}

#[async_trait]
impl AgentRunner for HttpAgentRunner {
    async fn run(
        &self,
        agent: &AgentDefinition,
        task: &str,
        context: Option<&TaskContext>,
    ) -> Result<AgentResult, AgentError> {
        let body = RunRequest {
            agent,
            task,
            context,
        };

        log::debug!("Dispatching agent '{}' to {}", agent.agent_id, self.run_url());

        let resp = self.client.post(self.run_url()).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(AgentError::InvalidResponse(format!(
                "runner returned {}: {}",
                status, text
            )));
        }

        let result: AgentResult = resp
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        log::debug!(
            "Agent '{}' finished with status {:?} after {} iterations",
            agent.agent_id,
            result.status,
            result.iterations
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::agent::AgentStatus;
    use serde_json::json;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_run_url_trims_trailing_slash() {
        let runner = HttpAgentRunner::new("http://localhost:8080/");
        assert_eq!(runner.run_url(), "http://localhost:8080/run");
    }

    #[test]
    fn test_run_request_shape() {
        let agent = AgentDefinition::new("writer", "Writer");
        let mut context = TaskContext::new();
        context.insert("recon".to_string(), "ports 22, 80".to_string());

        let body = serde_json::to_value(RunRequest {
            agent: &agent,
            task: "Synthesize the results",
            context: Some(&context),
        })
        .unwrap();

        assert_eq!(body["agent"]["agent_id"], "writer");
        assert_eq!(body["task"], "Synthesize the results");
        assert_eq!(body["context"]["recon"], "ports 22, 80");

        let body = serde_json::to_value(RunRequest {
            agent: &agent,
            task: "hi",
            context: None,
        })
        .unwrap();
        assert!(body.get("context").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_runner_is_an_error() {
        let runner = HttpAgentRunner::new("http://127.0.0.1:1");
        let agent = AgentDefinition::new("writer", "Writer");
        let result = runner.run(&agent, "hi", None).await;
        assert!(matches!(result, Err(AgentError::Http(_))));
    }

    #[tokio::test]
    async fn test_run_decodes_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(body_partial_json(json!({
                "agent": {"agent_id": "scanner"},
                "task": "scan example.com",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "answer": "22/tcp open",
                "iterations": 3,
                "tools_used": ["nmap"],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let runner = HttpAgentRunner::new(server.uri());
        let agent = AgentDefinition::new("scanner", "Scanner");
        let result = runner.run(&agent, "scan example.com", None).await.unwrap();

        assert_eq!(result.status, AgentStatus::Completed);
        assert_eq!(result.answer, "22/tcp open");
        assert_eq!(result.iterations, 3);
        assert_eq!(result.tools_used, vec!["nmap"]);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_error_status_code_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(500).set_body_string("runner overloaded"))
            .mount(&server)
            .await;

        let runner = HttpAgentRunner::new(server.uri());
        let agent = AgentDefinition::new("scanner", "Scanner");

        match runner.run(&agent, "hi", None).await {
            Err(AgentError::InvalidResponse(message)) => {
                assert!(message.starts_with("runner returned 500"));
                assert!(message.contains("runner overloaded"));
            }
            other => panic!("expected invalid response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let runner = HttpAgentRunner::new(server.uri());
        let agent = AgentDefinition::new("scanner", "Scanner");
        let result = runner.run(&agent, "hi", None).await;

        assert!(matches!(result, Err(AgentError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_dropped_call_is_abandoned_promptly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "completed", "answer": "late"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let runner = HttpAgentRunner::new(server.uri());
        let agent = AgentDefinition::new("scanner", "Scanner");

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(Duration::from_millis(200), runner.run(&agent, "hi", None)).await;

        assert!(outcome.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
        // The request reached the runner before it was dropped
        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 1);
    }
}
