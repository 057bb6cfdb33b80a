// SPDX-License-Identifier: MIT

//! Engine configuration read from environment variables

use crate::adk::error::KineticError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_AGENTS_DIR: &str = "agents";
const DEFAULT_AUDIT_TIMEOUT_MS: u64 = 2000;

/// Runtime configuration for the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory holding agent YAML definitions
    pub agents_dir: PathBuf,
    /// Base URL of the agent runner service
    pub runner_url: Option<String>,
    /// Base URL of the audit backend; audit logging is off when unset
    pub audit_url: Option<String>,
    /// Per-request timeout for audit calls
    pub audit_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agents_dir: PathBuf::from(DEFAULT_AGENTS_DIR),
            runner_url: None,
            audit_url: None,
            audit_timeout: Duration::from_millis(DEFAULT_AUDIT_TIMEOUT_MS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, KineticError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, KineticError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let agents_dir = non_empty("KINETIC_AGENTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENTS_DIR));

        let audit_timeout = match non_empty("KINETIC_AUDIT_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    KineticError::config(format!(
                        "KINETIC_AUDIT_TIMEOUT_MS must be a number of milliseconds, got '{}'",
                        raw
                    ))
                })?;
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_AUDIT_TIMEOUT_MS),
        };

        Ok(Self {
            agents_dir,
            runner_url: non_empty("KINETIC_RUNNER_URL"),
            audit_url: non_empty("KINETIC_AUDIT_URL"),
            audit_timeout,
        })
    }
}
