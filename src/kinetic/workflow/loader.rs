// SPDX-License-Identifier: MIT

//! YAML workflow files
//!
//! Only deserialization happens here; structural checks are the validator's
//! job, so a file can load fine and still be rejected before it runs.

use super::types::WorkflowDefinition;
use crate::adk::error::KineticError;
use std::fs;
use std::path::Path;

/// Reads [`WorkflowDefinition`]s from YAML
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse the workflow file at `path`
    pub fn load_workflow<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition, KineticError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let def = Self::parse_yaml(&content)?;
        log::debug!(
            "Loaded workflow '{}' from {} ({} nodes, {} edges)",
            def.workflow_id,
            path.display(),
            def.nodes.len(),
            def.edges.len()
        );
        Ok(def)
    }

    pub fn parse_yaml(content: &str) -> Result<WorkflowDefinition, KineticError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetic::workflow::types::Edge;
    use std::time::Duration;

    #[test]
    fn test_parse_convergent_workflow() {
        let yaml = r#"
workflow_id: pentest-001
name: Pentest
description: "Recon then report"

nodes:
  - node_id: ports
    agent_id: scanner
    branch_name: recon
    timeout: 600
  - node_id: web
    agent_id: crawler
  - node_id: report
    agent_id: writer

edges:
  - from: ports
    to: report
  - from: web
    to: report
"#;
        let def = WorkflowLoader::parse_yaml(yaml).unwrap();
        assert_eq!(def.workflow_id, "pentest-001");
        assert_eq!(def.nodes.len(), 3);
        assert_eq!(def.nodes[0].branch_name(), "recon");
        assert_eq!(def.nodes[0].timeout, Duration::from_secs(600));
        assert_eq!(def.nodes[1].branch_name(), "web");
        assert_eq!(def.edges[1], Edge::new("web", "report"));
    }

    #[test]
    fn test_parse_minimal_workflow() {
        let yaml = r#"
workflow_id: solo
name: Solo
nodes:
  - node_id: only
    agent_id: helper
"#;
        let def = WorkflowLoader::parse_yaml(yaml).unwrap();
        assert!(def.description.is_empty());
        assert!(def.edges.is_empty());
    }

    #[test]
    fn test_missing_workflow_id_is_yaml_error() {
        let result = WorkflowLoader::parse_yaml("name: Nameless\n");
        assert!(matches!(result, Err(KineticError::Yaml(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = WorkflowLoader::new().load_workflow("does/not/exist.yaml");
        assert!(matches!(result, Err(KineticError::Io(_))));
    }
}
