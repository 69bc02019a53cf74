//! Sample pipeline used by the `demo` command and as the editor's start page.

use crate::error::GraphResult;
use crate::geometry::Point;
use crate::graph::GraphModel;
use crate::node::{
    ActionConfig, AgentConfig, ConditionConfig, EndConfig, NodeConfig, NodeKind, NodePatch,
    WebhookConfig, WorkflowNode, INPUT_PORT_ID, OUTPUT_PORT_ID,
};

/// Translate, check, publish and notify
pub fn sample_pipeline() -> GraphResult<GraphModel> {
    let mut graph = GraphModel::new();

    let steps = [
        ("start", NodeKind::Start, "Document uploaded", None),
        (
            "translate",
            NodeKind::Agent,
            "Translate",
            Some(NodeConfig::Agent(AgentConfig {
                agent_id: Some("translator".to_string()),
                prompt: "Translate the document into the target language.".to_string(),
                model: None,
            })),
        ),
        (
            "review",
            NodeKind::Condition,
            "Quality check",
            Some(NodeConfig::Condition(ConditionConfig {
                expression: "score >= 0.8".to_string(),
            })),
        ),
        (
            "publish",
            NodeKind::Action,
            "Publish",
            Some(NodeConfig::Action(ActionConfig {
                action: "publish_document".to_string(),
                ..Default::default()
            })),
        ),
        (
            "notify",
            NodeKind::Webhook,
            "Notify customer",
            Some(NodeConfig::Webhook(WebhookConfig {
                url: "https://example.com/hooks/translated".to_string(),
                ..Default::default()
            })),
        ),
        (
            "end",
            NodeKind::End,
            "Done",
            Some(NodeConfig::End(EndConfig {
                output_key: Some("translation".to_string()),
            })),
        ),
    ];

    let mut previous: Option<&str> = None;
    for (column, (id, kind, name, config)) in steps.into_iter().enumerate() {
        let position = Point::new(60.0 + column as f32 * 240.0, 120.0 + (column % 2) as f32 * 60.0);
        graph.add_node(WorkflowNode::with_id(id, kind, name, position))?;
        if let Some(config) = config {
            graph.update_node(id, NodePatch::default().with_config(config))?;
        }
        if let Some(from) = previous {
            graph.connect(from, OUTPUT_PORT_ID, id, INPUT_PORT_ID)?;
        }
        previous = Some(id);
    }

    graph.clear_events();
    Ok(graph)
}
