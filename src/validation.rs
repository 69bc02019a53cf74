use crate::graph::GraphModel;
use crate::node::{NodeConfig, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Validation severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,    // Blue - informational
    Warning, // Yellow - potential issue
    Error,   // Red - blocks a test run
}

/// Validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
    pub affected_nodes: Vec<NodeId>,
    pub issue_type: ValidationIssueType,
}

/// Types of validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssueType {
    NoStartNode,
    NoEndNode,
    UnconnectedInput,
    Unreachable,
    IncompleteConfig,
}

/// Complete validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Issues of one severity, in discovery order
    pub fn with_severity(&self, severity: ValidationSeverity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect()
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.with_severity(ValidationSeverity::Error)
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.with_severity(ValidationSeverity::Warning)
    }

    pub fn info(&self) -> Vec<&ValidationIssue> {
        self.with_severity(ValidationSeverity::Info)
    }

    /// A test run may start only when this holds
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

/// Pre-run checks for workflow graphs.
///
/// The graph itself already rejects dangling, mistyped and cyclic
/// connections; these checks cover what a structurally sound graph can
/// still get wrong.
pub struct Validator;

impl Validator {
    pub fn validate(graph: &GraphModel) -> ValidationResult {
        let mut result = ValidationResult::new();
        if graph.node_count() == 0 {
            return result;
        }

        let starts: Vec<NodeId> = graph.start_nodes().iter().map(|n| n.id.clone()).collect();
        if starts.is_empty() {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Error,
                message: "No start node. The workflow cannot begin.".to_string(),
                affected_nodes: vec![],
                issue_type: ValidationIssueType::NoStartNode,
            });
        }

        if !graph.nodes_back_to_front().any(|n| n.kind == NodeKind::End) {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Warning,
                message: "No end node. Results will not be collected.".to_string(),
                affected_nodes: vec![],
                issue_type: ValidationIssueType::NoEndNode,
            });
        }

        for node in graph.nodes_back_to_front() {
            let open: Vec<&str> = node
                .inputs
                .iter()
                .filter(|port| graph.incoming_for_port(&node.id, &port.id).is_none())
                .map(|port| port.name.as_str())
                .collect();
            if !open.is_empty() {
                result.add_issue(ValidationIssue {
                    severity: ValidationSeverity::Warning,
                    message: format!("'{}' has unconnected inputs: {}", node.name, open.join(", ")),
                    affected_nodes: vec![node.id.clone()],
                    issue_type: ValidationIssueType::UnconnectedInput,
                });
            }

            if let Some(missing) = Self::missing_setting(&node.config) {
                result.add_issue(ValidationIssue {
                    severity: ValidationSeverity::Warning,
                    message: format!("'{}' has no {}", node.name, missing),
                    affected_nodes: vec![node.id.clone()],
                    issue_type: ValidationIssueType::IncompleteConfig,
                });
            }
        }

        if !starts.is_empty() {
            let unreachable = Self::find_unreachable(graph, &starts);
            if !unreachable.is_empty() {
                result.add_issue(ValidationIssue {
                    severity: ValidationSeverity::Info,
                    message: format!(
                        "{} node(s) are unreachable from every start node and will not run.",
                        unreachable.len()
                    ),
                    affected_nodes: unreachable,
                    issue_type: ValidationIssueType::Unreachable,
                });
            }
        }

        result
    }

    /// Nodes no start node reaches, in z-order
    fn find_unreachable(graph: &GraphModel, starts: &[NodeId]) -> Vec<NodeId> {
        let mut reachable = HashSet::new();
        let mut stack: Vec<&str> = starts.iter().map(String::as_str).collect();

        while let Some(id) = stack.pop() {
            if !reachable.insert(id.to_string()) {
                continue;
            }
            for connection in graph.outgoing(id) {
                stack.push(connection.to_node_id.as_str());
            }
        }

        graph
            .nodes_back_to_front()
            .filter(|n| !reachable.contains(&n.id))
            .map(|n| n.id.clone())
            .collect()
    }

    /// The one setting each kind cannot run without
    fn missing_setting(config: &NodeConfig) -> Option<&'static str> {
        match config {
            NodeConfig::Agent(agent) if agent.prompt.trim().is_empty() => Some("prompt"),
            NodeConfig::Condition(condition) if condition.expression.trim().is_empty() => {
                Some("condition expression")
            }
            NodeConfig::Webhook(webhook) if webhook.url.trim().is_empty() => Some("webhook URL"),
            _ => None,
        }
    }
}

/// Extension trait for GraphModel to add validation
pub trait ValidatedGraph {
    fn validate(&self) -> ValidationResult;

    /// Highest severity per affected node, for canvas badges
    fn nodes_with_issues(&self, result: &ValidationResult) -> HashMap<NodeId, ValidationSeverity>;
}

impl ValidatedGraph for GraphModel {
    fn validate(&self) -> ValidationResult {
        Validator::validate(self)
    }

    fn nodes_with_issues(&self, result: &ValidationResult) -> HashMap<NodeId, ValidationSeverity> {
        let mut nodes = HashMap::new();

        for issue in &result.issues {
            for node_id in &issue.affected_nodes {
                nodes
                    .entry(node_id.clone())
                    .and_modify(|severity| {
                        if issue.severity > *severity {
                            *severity = issue.severity;
                        }
                    })
                    .or_insert(issue.severity);
            }
        }

        nodes
    }
}
