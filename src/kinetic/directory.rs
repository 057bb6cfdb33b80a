// SPDX-License-Identifier: MIT

//! Agent directory - resolves agent ids to definitions

use crate::adk::agent::AgentDefinition;
use crate::adk::error::{DirectoryError, KineticError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Lookup of agent definitions by id.
///
/// `NotFound` must only be returned when the agent genuinely does not exist;
/// validation turns it into a user-facing error, while any other failure is
/// reported as a directory problem.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentDefinition, DirectoryError>;
}

/// In-memory agent directory
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<RwLock<HashMap<String, AgentDefinition>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, agent: AgentDefinition) {
        let mut agents = self.agents.write().await;
        agents.insert(agent.agent_id.clone(), agent);
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Register every `*.yaml` / `*.yml` agent definition found in `dir`.
    ///
    /// Files that fail to parse are skipped. Returns how many agents were
    /// registered.
    pub async fn load_dir<P: AsRef<Path>>(&self, dir: P) -> Result<usize, KineticError> {
        let dir = dir.as_ref();
        let mut entries = fs::read_dir(dir).await?;
        let mut loaded = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
            {
                continue;
            }

            let content = fs::read_to_string(&path).await?;
            match serde_yaml::from_str::<AgentDefinition>(&content) {
                Ok(agent) => {
                    log::debug!("Loaded agent '{}' from {}", agent.agent_id, path.display());
                    self.register(agent).await;
                    loaded += 1;
                }
                Err(e) => log::warn!("Skipping agent file {}: {}", path.display(), e),
            }
        }

        log::info!("Loaded {} agents from {}", loaded, dir.display());
        Ok(loaded)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentDirectory for AgentRegistry {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentDefinition, DirectoryError> {
        let agents = self.agents.read().await;
        agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(agent_id.to_string()))
    }
}
