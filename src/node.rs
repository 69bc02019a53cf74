use crate::error::{GraphError, GraphResult};
use crate::geometry::{Point, Rectangle, Size, Vector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use ulid::Ulid;

pub type NodeId = String;
pub type PortId = String;

/// Default node footprint in world units
pub const DEFAULT_NODE_SIZE: Size = Size::new(180.0, 72.0);

/// Port id used by the single input slot of the built-in kinds
pub const INPUT_PORT_ID: &str = "in";

/// Port id used by the single output slot of the built-in kinds
pub const OUTPUT_PORT_ID: &str = "out";

/// A step in a workflow pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Opaque unique identifier
    pub id: NodeId,

    /// Node kind determines the port layout and config shape
    pub kind: NodeKind,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Top-left corner in world space
    pub position: Point,

    pub size: Size,

    /// Kind-specific settings, never interpreted by the editor
    pub config: NodeConfig,

    #[serde(default)]
    pub inputs: Vec<NodePort>,

    #[serde(default)]
    pub outputs: Vec<NodePort>,

    /// Execution status, purely a visualization flag
    #[serde(default)]
    pub status: NodeStatus,
}

impl WorkflowNode {
    /// Create a node of the given kind with its fixed port set
    pub fn new(kind: NodeKind, name: impl Into<String>, position: Point) -> Self {
        Self::with_id(Ulid::new().to_string(), kind, name, position)
    }

    /// Create a node with a specific ID (useful for testing and loading)
    pub fn with_id(
        id: impl Into<NodeId>,
        kind: NodeKind,
        name: impl Into<String>,
        position: Point,
    ) -> Self {
        let size = DEFAULT_NODE_SIZE;
        let (input_type, output_type) = kind.port_types();

        let inputs = input_type
            .map(|data_type| vec![NodePort::input(INPUT_PORT_ID, "Input", data_type)])
            .unwrap_or_default();
        let outputs = output_type
            .map(|data_type| vec![NodePort::output(OUTPUT_PORT_ID, "Output", data_type)])
            .unwrap_or_default();

        let mut node = Self {
            id: id.into(),
            kind,
            name: name.into(),
            description: kind.description().to_string(),
            position,
            size,
            config: kind.default_config(),
            inputs,
            outputs,
            status: NodeStatus::Idle,
        };
        node.layout_ports();
        node
    }

    /// Create a node whose world-space center sits at `center`
    pub fn centered_at(kind: NodeKind, name: impl Into<String>, center: Point) -> Self {
        Self::new(kind, name, center - DEFAULT_NODE_SIZE.half())
    }

    /// Change the node size, keeping the top-left corner and re-spacing ports
    pub fn resized(mut self, size: Size) -> Self {
        self.size = size;
        self.layout_ports();
        self
    }

    /// Create a node with an explicit port set.
    ///
    /// Port offsets are recomputed from the node size; the result is
    /// validated against the kind's port invariants.
    pub fn with_ports(
        id: impl Into<NodeId>,
        kind: NodeKind,
        name: impl Into<String>,
        position: Point,
        inputs: Vec<NodePort>,
        outputs: Vec<NodePort>,
    ) -> GraphResult<Self> {
        let mut node = Self::with_id(id, kind, name, position);
        node.inputs = inputs;
        node.outputs = outputs;
        node.layout_ports();
        node.validate()?;
        Ok(node)
    }

    /// Check the kind invariants: config variant, port counts and directions
    pub fn validate(&self) -> GraphResult<()> {
        if self.config.kind() != self.kind {
            return Err(GraphError::ConfigKindMismatch {
                expected: self.kind,
                found: self.config.kind(),
            });
        }

        let invalid = |reason: &str| GraphError::InvalidPorts {
            node_id: self.id.clone(),
            kind: self.kind,
            reason: reason.to_string(),
        };

        match self.kind {
            NodeKind::Start if !self.inputs.is_empty() => {
                return Err(invalid("start nodes cannot have inputs"));
            }
            NodeKind::End if !self.outputs.is_empty() => {
                return Err(invalid("end nodes cannot have outputs"));
            }
            _ => {}
        }

        if self.inputs.iter().any(|p| p.direction != PortDirection::Input) {
            return Err(invalid("input slot holds an output port"));
        }
        if self.outputs.iter().any(|p| p.direction != PortDirection::Output) {
            return Err(invalid("output slot holds an input port"));
        }

        let mut seen = HashSet::new();
        for port in self.ports() {
            if !seen.insert(port.id.as_str()) {
                return Err(invalid(&format!("duplicate port id {}", port.id)));
            }
        }

        Ok(())
    }

    /// Spread ports evenly down the left (inputs) and right (outputs) edges
    fn layout_ports(&mut self) {
        let size = self.size;
        let spread = |ports: &mut [NodePort], x: f32| {
            let count = ports.len() as f32;
            for (i, port) in ports.iter_mut().enumerate() {
                let y = size.height * (i as f32 + 1.0) / (count + 1.0);
                port.position = Vector::new(x, y);
            }
        };
        spread(&mut self.inputs, 0.0);
        spread(&mut self.outputs, size.width);
    }

    /// Iterate over all ports, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &NodePort> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Find a port by id
    pub fn port(&self, port_id: &str) -> Option<&NodePort> {
        self.ports().find(|p| p.id == port_id)
    }

    /// First output port, if the kind has one
    pub fn primary_output(&self) -> Option<&NodePort> {
        self.outputs.first()
    }

    /// World-space position of a port on this node
    pub fn port_position(&self, port: &NodePort) -> Point {
        self.position + port.position
    }

    /// World-space bounding box
    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_origin_size(self.position, self.size)
    }

    /// Apply a partial update; id, kind and ports are never touched
    pub fn apply_patch(&mut self, patch: NodePatch) -> GraphResult<()> {
        if let Some(config) = &patch.config {
            if config.kind() != self.kind {
                return Err(GraphError::ConfigKindMismatch {
                    expected: self.kind,
                    found: config.kind(),
                });
            }
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(config) = patch.config {
            self.config = config;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }

        Ok(())
    }
}

/// Partial update for a node's editable properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<NodeConfig>,
    pub position: Option<Point>,
}

impl NodePatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Node kind determines port layout and configuration shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    Agent,
    Condition,
    Action,
    Delay,
    Webhook,
    Loop,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Agent,
        NodeKind::Condition,
        NodeKind::Action,
        NodeKind::Delay,
        NodeKind::Webhook,
        NodeKind::Loop,
    ];

    /// Human-readable label for palettes and default node names
    pub fn display_name(self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::End => "End",
            NodeKind::Agent => "AI Agent",
            NodeKind::Condition => "Condition",
            NodeKind::Action => "Action",
            NodeKind::Delay => "Delay",
            NodeKind::Webhook => "Webhook",
            NodeKind::Loop => "Loop",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            NodeKind::Start => "Entry point of the workflow",
            NodeKind::End => "Final step of the workflow",
            NodeKind::Agent => "Run an AI agent on the incoming data",
            NodeKind::Condition => "Branch on an expression",
            NodeKind::Action => "Perform an operation",
            NodeKind::Delay => "Wait before continuing",
            NodeKind::Webhook => "Call an external HTTP endpoint",
            NodeKind::Loop => "Repeat for each item",
        }
    }

    /// Data types of the (input, output) slots; `None` means no port
    pub fn port_types(self) -> (Option<DataType>, Option<DataType>) {
        match self {
            NodeKind::Start => (None, Some(DataType::Any)),
            NodeKind::End => (Some(DataType::Any), None),
            NodeKind::Agent => (Some(DataType::Any), Some(DataType::String)),
            NodeKind::Condition => (Some(DataType::Any), Some(DataType::Boolean)),
            NodeKind::Action => (Some(DataType::Any), Some(DataType::Object)),
            NodeKind::Delay => (Some(DataType::Any), Some(DataType::Any)),
            NodeKind::Webhook => (Some(DataType::Object), Some(DataType::Object)),
            NodeKind::Loop => (Some(DataType::Object), Some(DataType::Any)),
        }
    }

    pub fn default_config(self) -> NodeConfig {
        match self {
            NodeKind::Start => NodeConfig::Start(StartConfig::default()),
            NodeKind::End => NodeConfig::End(EndConfig::default()),
            NodeKind::Agent => NodeConfig::Agent(AgentConfig::default()),
            NodeKind::Condition => NodeConfig::Condition(ConditionConfig::default()),
            NodeKind::Action => NodeConfig::Action(ActionConfig::default()),
            NodeKind::Delay => NodeConfig::Delay(DelayConfig::default()),
            NodeKind::Webhook => NodeConfig::Webhook(WebhookConfig::default()),
            NodeKind::Loop => NodeConfig::Loop(LoopConfig::default()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Agent => "agent",
            NodeKind::Condition => "condition",
            NodeKind::Action => "action",
            NodeKind::Delay => "delay",
            NodeKind::Webhook => "webhook",
            NodeKind::Loop => "loop",
        };
        f.write_str(name)
    }
}

/// A named, typed attachment point on a node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePort {
    pub id: PortId,
    pub direction: PortDirection,
    pub name: String,
    pub data_type: DataType,

    /// Offset from the owning node's top-left corner
    #[serde(default)]
    pub position: Vector,
}

impl NodePort {
    pub fn input(id: impl Into<PortId>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            direction: PortDirection::Input,
            name: name.into(),
            data_type,
            position: Vector::ZERO,
        }
    }

    pub fn output(id: impl Into<PortId>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            direction: PortDirection::Output,
            name: name.into(),
            data_type,
            position: Vector::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Type of data flowing through a port
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Any,
    String,
    Number,
    Boolean,
    File,
    Object,
}

impl DataType {
    /// Compatible iff either side is `any` or both are identical
    pub fn is_compatible_with(self, other: DataType) -> bool {
        self == DataType::Any || other == DataType::Any || self == other
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Any => "any",
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::File => "file",
            DataType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Execution status shown on each node
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

/// Kind-specific configuration, one record per node kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeConfig {
    Start(StartConfig),
    End(EndConfig),
    Agent(AgentConfig),
    Condition(ConditionConfig),
    Action(ActionConfig),
    Delay(DelayConfig),
    Webhook(WebhookConfig),
    Loop(LoopConfig),
}

impl NodeConfig {
    /// The node kind this record belongs to
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Start(_) => NodeKind::Start,
            NodeConfig::End(_) => NodeKind::End,
            NodeConfig::Agent(_) => NodeKind::Agent,
            NodeConfig::Condition(_) => NodeKind::Condition,
            NodeConfig::Action(_) => NodeKind::Action,
            NodeConfig::Delay(_) => NodeKind::Delay,
            NodeConfig::Webhook(_) => NodeKind::Webhook,
            NodeConfig::Loop(_) => NodeKind::Loop,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Manual,
    Schedule,
    Webhook,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StartConfig {
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EndConfig {
    /// Key under which the final result is published
    pub output_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    pub agent_id: Option<String>,
    pub prompt: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionConfig {
    pub expression: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionConfig {
    pub action: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayConfig {
    pub duration_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self { duration_ms: 1000 }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WebhookConfig {
    pub url: String,
    pub method: HttpMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LoopConfig {
    pub max_iterations: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_node_creation() {
        let node = WorkflowNode::new(NodeKind::Agent, "Translate", Point::new(10.0, 20.0));

        assert_eq!(node.kind, NodeKind::Agent);
        assert_eq!(node.name, "Translate");
        assert_eq!(node.position, Point::new(10.0, 20.0));
        assert_eq!(node.size, DEFAULT_NODE_SIZE);
        assert_eq!(node.status, NodeStatus::Idle);
        assert_eq!(node.inputs.len(), 1);
        assert_eq!(node.outputs.len(), 1);
        assert_eq!(node.outputs[0].data_type, DataType::String);
        assert!(node.validate().is_ok());
    }

    #[test]
    fn test_start_and_end_port_invariants() {
        let start = WorkflowNode::new(NodeKind::Start, "Start", Point::ZERO);
        assert!(start.inputs.is_empty());
        assert_eq!(start.outputs.len(), 1);

        let end = WorkflowNode::new(NodeKind::End, "End", Point::ZERO);
        assert_eq!(end.inputs.len(), 1);
        assert!(end.outputs.is_empty());

        for kind in NodeKind::ALL {
            let node = WorkflowNode::new(kind, kind.display_name(), Point::ZERO);
            assert!(node.validate().is_ok(), "{kind} failed validation");
        }
    }

    #[test]
    fn test_port_layout_on_edges() {
        let node = WorkflowNode::new(NodeKind::Action, "Act", Point::new(100.0, 100.0));
        let input = &node.inputs[0];
        let output = &node.outputs[0];

        assert_eq!(input.position, Vector::new(0.0, 36.0));
        assert_eq!(output.position, Vector::new(180.0, 36.0));
        assert_eq!(node.port_position(output), Point::new(280.0, 136.0));
    }

    #[test]
    fn test_centered_at() {
        let node = WorkflowNode::centered_at(NodeKind::Delay, "Wait", Point::new(200.0, 100.0));
        assert_eq!(node.bounds().center(), Point::new(200.0, 100.0));
    }

    #[test]
    fn test_with_ports_rejects_start_inputs() {
        let result = WorkflowNode::with_ports(
            "s",
            NodeKind::Start,
            "Start",
            Point::ZERO,
            vec![NodePort::input("in", "In", DataType::Any)],
            vec![],
        );
        assert_matches!(result, Err(GraphError::InvalidPorts { .. }));
    }

    #[test]
    fn test_with_ports_rejects_duplicate_port_ids() {
        let result = WorkflowNode::with_ports(
            "a",
            NodeKind::Action,
            "Act",
            Point::ZERO,
            vec![NodePort::input("p", "In", DataType::Any)],
            vec![NodePort::output("p", "Out", DataType::Any)],
        );
        assert_matches!(result, Err(GraphError::InvalidPorts { .. }));
    }

    #[test]
    fn test_config_mismatch_rejected() {
        let mut node = WorkflowNode::new(NodeKind::Delay, "Wait", Point::ZERO);
        let patch = NodePatch::default().with_config(NodeConfig::Loop(LoopConfig::default()));

        assert_matches!(
            node.apply_patch(patch),
            Err(GraphError::ConfigKindMismatch {
                expected: NodeKind::Delay,
                found: NodeKind::Loop
            })
        );
        assert_eq!(node.config, NodeConfig::Delay(DelayConfig::default()));
    }

    #[test]
    fn test_patch_leaves_identity_alone() {
        let mut node = WorkflowNode::new(NodeKind::Webhook, "Hook", Point::ZERO);
        let id = node.id.clone();
        let ports: Vec<_> = node.ports().cloned().collect();

        node.apply_patch(
            NodePatch::name("Notify")
                .with_description("Ping the CRM")
                .with_config(NodeConfig::Webhook(WebhookConfig {
                    url: "https://example.com/hook".to_string(),
                    method: HttpMethod::Put,
                })),
        )
        .unwrap();

        assert_eq!(node.id, id);
        assert_eq!(node.kind, NodeKind::Webhook);
        assert_eq!(node.name, "Notify");
        assert_eq!(node.description, "Ping the CRM");
        assert_eq!(node.ports().cloned().collect::<Vec<_>>(), ports);
    }

    #[test]
    fn test_data_type_compatibility() {
        assert!(DataType::Any.is_compatible_with(DataType::Number));
        assert!(DataType::Number.is_compatible_with(DataType::Any));
        assert!(DataType::File.is_compatible_with(DataType::File));
        assert!(!DataType::String.is_compatible_with(DataType::Number));
    }

    #[test]
    fn test_config_serialization_is_tagged() {
        let config = NodeConfig::Delay(DelayConfig { duration_ms: 250 });
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "delay", "durationMs": 250 }));

        let parsed: NodeConfig =
            serde_json::from_value(serde_json::json!({ "type": "loop" })).unwrap();
        assert_eq!(parsed, NodeConfig::Loop(LoopConfig::default()));
    }
}
