// SPDX-License-Identifier: MIT

//! Static validation of workflow definitions
//!
//! Structural checks run in a fixed order and stop at the first violation:
//! 1. at least one node
//! 2. unique node ids
//! 3. edges only reference existing nodes
//! 4. no self-loops
//! 5. acyclic (Kahn's topological sort)
//! 6. a single connected component (when there are edges)
//!
//! Agent existence is checked separately since it needs the agent directory.

use super::types::WorkflowDefinition;
use crate::adk::error::{DirectoryError, ValidationError, WorkflowError};
use crate::kinetic::directory::AgentDirectory;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

type Adjacency<'a> = HashMap<&'a str, Vec<&'a str>>;

/// Validator for workflow DAGs
pub struct DagValidator;

impl DagValidator {
    /// Check the structure of `def` and return its topological order
    pub fn validate(def: &WorkflowDefinition) -> Result<Vec<String>, ValidationError> {
        if def.nodes.is_empty() {
            return Err(ValidationError::EmptyWorkflow);
        }

        check_unique_ids(def)?;
        check_edge_references(def)?;
        let order = topological_sort(def)?;
        check_connected(def)?;

        log::debug!(
            "Workflow '{}' is a valid DAG, order: {:?}",
            def.workflow_id,
            order
        );
        Ok(order)
    }

    /// Resolve every node's agent through `directory`.
    ///
    /// "Not found" becomes a validation error tagged with the node; any
    /// other directory failure is passed through as-is.
    pub async fn validate_agents_exist(
        def: &WorkflowDefinition,
        directory: &dyn AgentDirectory,
    ) -> Result<(), WorkflowError> {
        let lookups = def
            .nodes
            .iter()
            .map(|node| async move { (node, directory.get_agent(&node.agent_id).await) });

        for (node, lookup) in join_all(lookups).await {
            match lookup {
                Ok(_) => {}
                Err(DirectoryError::NotFound(_)) => {
                    return Err(ValidationError::AgentNotFound {
                        node_id: node.node_id.clone(),
                        agent_id: node.agent_id.clone(),
                    }
                    .into());
                }
                Err(e) => return Err(WorkflowError::Directory(e)),
            }
        }

        Ok(())
    }
}

fn check_unique_ids(def: &WorkflowDefinition) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let duplicates: BTreeSet<&str> = def
        .nodes
        .iter()
        .map(|n| n.node_id.as_str())
        .filter(|id| !seen.insert(*id))
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::DuplicateNodes(
            duplicates.into_iter().map(str::to_string).collect(),
        ))
    }
}

fn check_edge_references(def: &WorkflowDefinition) -> Result<(), ValidationError> {
    let ids: HashSet<&str> = def.nodes.iter().map(|n| n.node_id.as_str()).collect();

    for (i, edge) in def.edges.iter().enumerate() {
        for endpoint in [&edge.from, &edge.to] {
            if !ids.contains(endpoint.as_str()) {
                return Err(ValidationError::UnknownNode {
                    edge: i,
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Kahn's algorithm. Also rejects self-loops while building the adjacency.
fn topological_sort(def: &WorkflowDefinition) -> Result<Vec<String>, ValidationError> {
    let mut adjacency: Adjacency = def
        .nodes
        .iter()
        .map(|n| (n.node_id.as_str(), Vec::new()))
        .collect();
    let mut in_degree: HashMap<&str, usize> =
        def.nodes.iter().map(|n| (n.node_id.as_str(), 0)).collect();

    for (i, edge) in def.edges.iter().enumerate() {
        if edge.from == edge.to {
            return Err(ValidationError::SelfLoop {
                edge: i,
                node: edge.from.clone(),
            });
        }
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
        *in_degree.entry(edge.to.as_str()).or_default() += 1;
    }

    let mut queue: VecDeque<&str> = def
        .nodes
        .iter()
        .map(|n| n.node_id.as_str())
        .filter(|id| in_degree.get(id).copied().unwrap_or(0) == 0)
        .collect();

    if queue.is_empty() {
        // Every node has an incoming edge
        let all: Vec<&str> = def.nodes.iter().map(|n| n.node_id.as_str()).collect();
        return Err(ValidationError::Cycle(cycle_members(&all, &adjacency)));
    }

    let mut order = Vec::with_capacity(def.nodes.len());
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        visited.insert(id);

        for &next in adjacency.get(id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if order.len() < def.nodes.len() {
        let residue: Vec<&str> = def
            .nodes
            .iter()
            .map(|n| n.node_id.as_str())
            .filter(|id| !visited.contains(id))
            .collect();

        let blocked = residue
            .iter()
            .any(|id| in_degree.get(id).copied().unwrap_or(0) > 0);

        if blocked {
            return Err(ValidationError::Cycle(cycle_members(&residue, &adjacency)));
        }

        let mut unreached: Vec<String> = residue.into_iter().map(str::to_string).collect();
        unreached.sort();
        return Err(ValidationError::Disconnected(unreached));
    }

    Ok(order)
}

/// Narrow a set of unresolved nodes down to those on (or between) cycles by
/// repeatedly peeling off nodes with no successor left in the set.
fn cycle_members(candidates: &[&str], adjacency: &Adjacency) -> Vec<String> {
    let mut remaining: HashSet<&str> = candidates.iter().copied().collect();

    loop {
        let sinks: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|id| {
                !adjacency
                    .get(id)
                    .is_some_and(|succ| succ.iter().any(|s| remaining.contains(s)))
            })
            .collect();

        if sinks.is_empty() {
            break;
        }
        for sink in sinks {
            remaining.remove(sink);
        }
    }

    let mut members: Vec<String> = remaining.into_iter().map(str::to_string).collect();
    members.sort();
    members
}

/// Undirected BFS from the first node; every node must be reached
fn check_connected(def: &WorkflowDefinition) -> Result<(), ValidationError> {
    if def.edges.is_empty() || def.nodes.len() <= 1 {
        return Ok(());
    }

    let mut neighbours: Adjacency = HashMap::new();
    for edge in &def.edges {
        neighbours
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
        neighbours
            .entry(edge.to.as_str())
            .or_default()
            .push(edge.from.as_str());
    }

    let start = def.nodes[0].node_id.as_str();
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut queue: VecDeque<&str> = VecDeque::from([start]);

    while let Some(id) = queue.pop_front() {
        for &next in neighbours.get(id).map(Vec::as_slice).unwrap_or(&[]) {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let mut unreached: Vec<String> = def
        .nodes
        .iter()
        .map(|n| n.node_id.as_str())
        .filter(|id| !visited.contains(id))
        .map(str::to_string)
        .collect();

    if unreached.is_empty() {
        Ok(())
    } else {
        unreached.sort();
        Err(ValidationError::Disconnected(unreached))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::agent::AgentDefinition;
    use crate::kinetic::directory::AgentRegistry;
    use crate::kinetic::workflow::types::Node;
    use async_trait::async_trait;

    fn workflow(nodes: &[&str], edges: &[(&str, &str)]) -> WorkflowDefinition {
        let mut def = WorkflowDefinition::new("wf", "Test");
        for id in nodes {
            def = def.node(Node::new(*id, format!("agent-{}", id)));
        }
        for (from, to) in edges {
            def = def.edge(*from, *to);
        }
        def
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    #[test]
    fn test_empty_workflow() {
        let err = DagValidator::validate(&workflow(&[], &[])).unwrap_err();
        assert_eq!(err, ValidationError::EmptyWorkflow);
        assert_eq!(err.field().as_deref(), Some("nodes"));
    }

    #[test]
    fn test_duplicate_node_ids() {
        let def = workflow(&["a", "b", "a", "c", "b"], &[]);
        let err = DagValidator::validate(&def).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateNodes(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_unknown_edge_reference() {
        let def = workflow(&["a", "b"], &[("a", "b"), ("b", "ghost")]);
        let err = DagValidator::validate(&def).unwrap_err();
        assert!(matches!(
            &err,
            ValidationError::UnknownNode { edge: 1, missing, .. } if missing == "ghost"
        ));
        assert_eq!(err.field().as_deref(), Some("edges[1].to"));
    }

    #[test]
    fn test_self_loop_rejected() {
        // The rest of the graph is a perfectly fine chain
        let def = workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "a")]);
        let err = DagValidator::validate(&def).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SelfLoop {
                edge: 2,
                node: "a".to_string()
            }
        );
    }

    #[test]
    fn test_three_node_cycle() {
        let def = workflow(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let err = DagValidator::validate(&def).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Cycle(vec!["A".to_string(), "B".to_string(), "C".to_string()])
        );
    }

    #[test]
    fn test_cycle_behind_a_root_names_only_cycle_nodes() {
        let def = workflow(
            &["root", "x", "y", "after"],
            &[("root", "x"), ("x", "y"), ("y", "x"), ("y", "after")],
        );
        let err = DagValidator::validate(&def).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Cycle(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn test_disconnected_chains() {
        let def = workflow(&["A", "B", "C", "D"], &[("A", "B"), ("C", "D")]);
        let err = DagValidator::validate(&def).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Disconnected(vec!["C".to_string(), "D".to_string()])
        );
    }

    #[test]
    fn test_isolated_node_next_to_chain() {
        let def = workflow(&["A", "B", "lonely"], &[("A", "B")]);
        let err = DagValidator::validate(&def).unwrap_err();
        assert_eq!(err, ValidationError::Disconnected(vec!["lonely".to_string()]));
    }

    #[test]
    fn test_single_node_is_valid() {
        let order = DagValidator::validate(&workflow(&["only"], &[])).unwrap();
        assert_eq!(order, vec!["only"]);
    }

    #[test]
    fn test_edgeless_fan_out_is_valid() {
        let order = DagValidator::validate(&workflow(&["a", "b"], &[])).unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let edges = [
            ("fetch", "parse"),
            ("fetch", "scan"),
            ("parse", "report"),
            ("scan", "report"),
            ("seed", "scan"),
        ];
        let def = workflow(&["report", "scan", "parse", "fetch", "seed"], &edges);
        let order = DagValidator::validate(&def).unwrap();

        assert_eq!(order.len(), 5);
        for (from, to) in edges {
            assert!(
                position(&order, from) < position(&order, to),
                "{} should come before {} in {:?}",
                from,
                to,
                order
            );
        }
    }

    #[test]
    fn test_validation_is_idempotent() {
        let def = workflow(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let first = DagValidator::validate(&def).unwrap();
        let second = DagValidator::validate(&def).unwrap();
        assert_eq!(first, second);

        let bad = workflow(&["A", "B"], &[("A", "B"), ("B", "A")]);
        assert_eq!(
            DagValidator::validate(&bad).unwrap_err(),
            DagValidator::validate(&bad).unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_agents_exist() {
        let registry = AgentRegistry::new();
        registry
            .register(AgentDefinition::new("agent-a", "A"))
            .await;
        registry
            .register(AgentDefinition::new("agent-b", "B"))
            .await;

        let def = workflow(&["a", "b"], &[("a", "b")]);
        assert!(DagValidator::validate_agents_exist(&def, &registry)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_agent_is_validation_error() {
        let registry = AgentRegistry::new();
        registry
            .register(AgentDefinition::new("agent-a", "A"))
            .await;

        let def = workflow(&["a", "b"], &[("a", "b")]);
        let err = DagValidator::validate_agents_exist(&def, &registry)
            .await
            .unwrap_err();

        match err {
            WorkflowError::Validation(e) => {
                assert_eq!(e.field().as_deref(), Some("nodes[b].agent_id"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl AgentDirectory for BrokenDirectory {
        async fn get_agent(&self, _agent_id: &str) -> Result<AgentDefinition, DirectoryError> {
            Err(DirectoryError::Unavailable("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_directory_outage_is_not_a_validation_error() {
        let def = workflow(&["a"], &[]);
        let err = DagValidator::validate_agents_exist(&def, &BrokenDirectory)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Directory(_)));
    }
}
