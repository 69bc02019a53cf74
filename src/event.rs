use crate::connection::ConnectionId;
use crate::geometry::Point;
use crate::node::{NodeId, NodeKind, PortId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A graph event with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
}

impl GraphEvent {
    /// Create a new event with the current timestamp
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Create a new event with a specific timestamp
    pub fn with_timestamp(timestamp: DateTime<Utc>, event: EventType) -> Self {
        Self { timestamp, event }
    }
}

/// Structural changes recorded in the graph history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EventType {
    NodeAdded {
        id: NodeId,
        kind: NodeKind,
        position: Point,
    },

    /// A node was deleted together with every connection touching it
    NodeRemoved {
        id: NodeId,
        cascaded_connections: Vec<ConnectionId>,
    },

    NodeUpdated {
        id: NodeId,
        renamed: bool,
        moved: bool,
        reconfigured: bool,
    },

    Connected {
        id: ConnectionId,
        from: (NodeId, PortId),
        to: (NodeId, PortId),
    },

    Disconnected {
        id: ConnectionId,
    },
}
