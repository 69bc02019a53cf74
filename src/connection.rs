use crate::node::{NodeId, PortId};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub type ConnectionId = String;

/// Directed edge from an output port to an input port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConnection {
    pub id: ConnectionId,

    /// Source node (data flows FROM this node's output port)
    pub from_node_id: NodeId,
    pub from_port_id: PortId,

    /// Destination node (data flows TO this node's input port)
    pub to_node_id: NodeId,
    pub to_port_id: PortId,
}

impl WorkflowConnection {
    /// Create a new connection with a fresh id
    pub fn new(
        from_node_id: impl Into<NodeId>,
        from_port_id: impl Into<PortId>,
        to_node_id: impl Into<NodeId>,
        to_port_id: impl Into<PortId>,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            from_node_id: from_node_id.into(),
            from_port_id: from_port_id.into(),
            to_node_id: to_node_id.into(),
            to_port_id: to_port_id.into(),
        }
    }

    /// Check if this connection touches a given node
    pub fn involves(&self, node_id: &str) -> bool {
        self.from_node_id == node_id || self.to_node_id == node_id
    }

    /// Check if this connection starts from a given node
    pub fn starts_from(&self, node_id: &str) -> bool {
        self.from_node_id == node_id
    }

    /// Check if this connection ends at a given node
    pub fn ends_at(&self, node_id: &str) -> bool {
        self.to_node_id == node_id
    }

    /// Check if this connection targets a specific input port
    pub fn targets(&self, node_id: &str, port_id: &str) -> bool {
        self.to_node_id == node_id && self.to_port_id == port_id
    }
}
