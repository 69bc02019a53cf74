// Workflow Graph Editor - Core Library

pub mod config;
pub mod connection;
pub mod demo;
pub mod error;
pub mod event;
pub mod geometry;
pub mod graph;
pub mod host;
pub mod interaction;
pub mod logging;
pub mod message;
pub mod node;
pub mod render;
pub mod serialization;
pub mod simulator;
pub mod ui;
pub mod validation;
pub mod viewport;

// Re-export main types for convenience
pub use config::EditorConfig;
pub use connection::{ConnectionId, WorkflowConnection};
pub use error::{ConnectionRejection, GraphError, GraphResult};
pub use event::{EventType, GraphEvent};
pub use geometry::{Point, Rectangle, Size, Vector};
pub use graph::GraphModel;
pub use host::{LocalHost, WorkflowHost};
pub use interaction::{ConnectionDraft, HitTarget, InteractionController, InteractionOutcome, ToolMode};
pub use message::{EditorMessage, MessageChannel, MessageSender};
pub use node::{
    DataType, NodeConfig, NodeId, NodeKind, NodePatch, NodePort, NodeStatus, PortDirection, PortId,
    WorkflowNode,
};
pub use render::{DrawCommand, DrawList, Layer, RedrawThrottle, RenderStyle, Scene};
pub use serialization::{load_graph, Workflow, WorkflowStore};
pub use simulator::{ExecutionSimulator, SimulationMode, SimulationState, StatusChange};
pub use ui::WorkflowEditorApp;
pub use validation::{ValidatedGraph, ValidationIssue, ValidationResult, ValidationSeverity, Validator};
pub use viewport::ViewportTransform;
