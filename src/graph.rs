use crate::connection::{ConnectionId, WorkflowConnection};
use crate::error::{ConnectionRejection, GraphError, GraphResult};
use crate::event::{EventType, GraphEvent};
use crate::node::{NodeId, NodeKind, NodePatch, NodeStatus, PortDirection, WorkflowNode};
use crate::serialization::Workflow;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Canonical set of nodes and connections for one workflow
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    /// All nodes indexed by ID
    nodes: HashMap<NodeId, WorkflowNode>,

    /// Insertion order, bottom-most first; drives z-order
    z_order: Vec<NodeId>,

    /// Directed port-to-port connections
    connections: Vec<WorkflowConnection>,

    /// Event log for history tracking
    events: Vec<GraphEvent>,
}

impl GraphModel {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from its serialized shape.
    ///
    /// Every node is validated and every connection goes through the same
    /// checks as [`GraphModel::connect`]. Statuses are reset to idle.
    pub fn from_workflow(workflow: Workflow) -> GraphResult<Self> {
        let mut graph = Self::new();

        for mut node in workflow.nodes {
            node.status = NodeStatus::Idle;
            graph.add_node(node)?;
        }
        for connection in workflow.connections {
            graph.insert_connection(connection)?;
        }

        graph.clear_events();
        Ok(graph)
    }

    /// Snapshot of the graph in its serialized shape
    pub fn to_workflow(&self) -> Workflow {
        Workflow {
            nodes: self.nodes_back_to_front().cloned().collect(),
            connections: self.connections.clone(),
        }
    }

    // ========== Node Operations ==========

    /// Add a node; its id must be unique
    pub fn add_node(&mut self, node: WorkflowNode) -> GraphResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        node.validate()?;

        debug!(node_id = %node.id, kind = %node.kind, "node added");
        self.log_event(EventType::NodeAdded {
            id: node.id.clone(),
            kind: node.kind,
            position: node.position,
        });

        self.z_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Delete a node and every connection touching it.
    ///
    /// Deleting an absent id is a no-op and returns `None`.
    pub fn remove_node(&mut self, id: &str) -> Option<WorkflowNode> {
        let node = self.nodes.remove(id)?;
        self.z_order.retain(|n| n != id);

        let mut cascaded = Vec::new();
        self.connections.retain(|c| {
            if c.involves(id) {
                cascaded.push(c.id.clone());
                false
            } else {
                true
            }
        });

        debug!(node_id = %id, cascaded = cascaded.len(), "node removed");
        self.log_event(EventType::NodeRemoved {
            id: id.to_string(),
            cascaded_connections: cascaded,
        });

        Some(node)
    }

    /// Apply a partial update to a node's name, description, config or position.
    ///
    /// Back-to-back position-only updates of the same node share one history
    /// entry, so a drag logs a single move however many samples it takes.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> GraphResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownNodeOrPort(id.to_string()))?;

        let renamed = patch.name.is_some() || patch.description.is_some();
        let moved = patch.position.is_some();
        let reconfigured = patch.config.is_some();
        node.apply_patch(patch)?;

        let event = EventType::NodeUpdated {
            id: id.to_string(),
            renamed,
            moved,
            reconfigured,
        };
        let repeated_move = moved
            && !renamed
            && !reconfigured
            && self.events.last().is_some_and(|last| last.event == event);
        if repeated_move {
            self.events.pop();
        }
        self.log_event(event);
        Ok(())
    }

    /// Write a node's execution status
    pub fn set_status(&mut self, id: &str, status: NodeStatus) -> GraphResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownNodeOrPort(id.to_string()))?;
        node.status = status;
        Ok(())
    }

    /// Put every node back to idle
    pub fn reset_statuses(&mut self) {
        for node in self.nodes.values_mut() {
            node.status = NodeStatus::Idle;
        }
    }

    /// Get a node by ID
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.get(id)
    }

    /// Nodes in draw order (bottom-most first)
    pub fn nodes_back_to_front(&self) -> impl DoubleEndedIterator<Item = &WorkflowNode> {
        self.z_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Nodes in hit-test order (topmost first)
    pub fn nodes_front_to_back(&self) -> impl Iterator<Item = &WorkflowNode> {
        self.nodes_back_to_front().rev()
    }

    /// Nodes of kind `start`, in z-order
    pub fn start_nodes(&self) -> Vec<&WorkflowNode> {
        self.nodes_back_to_front()
            .filter(|n| n.kind == NodeKind::Start)
            .collect()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Count nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ========== Connection Operations ==========

    /// Connect an output port to an input port.
    ///
    /// Rejected when an endpoint is missing, directions are wrong, data types
    /// are incompatible, the input already has a connection, or the edge
    /// would close a cycle.
    pub fn connect(
        &mut self,
        from_node_id: &str,
        from_port_id: &str,
        to_node_id: &str,
        to_port_id: &str,
    ) -> GraphResult<ConnectionId> {
        let connection =
            WorkflowConnection::new(from_node_id, from_port_id, to_node_id, to_port_id);
        self.insert_connection(connection)
    }

    /// Validate and insert a connection that already carries an id
    fn insert_connection(&mut self, connection: WorkflowConnection) -> GraphResult<ConnectionId> {
        if let Err(rejection) = self.check_connection(&connection) {
            debug!(
                from = %connection.from_node_id,
                to = %connection.to_node_id,
                reason = %rejection,
                "connection rejected"
            );
            return Err(rejection.into());
        }

        let id = connection.id.clone();
        debug!(connection_id = %id, "connected");
        self.log_event(EventType::Connected {
            id: id.clone(),
            from: (
                connection.from_node_id.clone(),
                connection.from_port_id.clone(),
            ),
            to: (connection.to_node_id.clone(), connection.to_port_id.clone()),
        });
        self.connections.push(connection);
        Ok(id)
    }

    fn check_connection(&self, c: &WorkflowConnection) -> Result<(), ConnectionRejection> {
        if self.connection(&c.id).is_some() {
            return Err(ConnectionRejection::DuplicateId(c.id.clone()));
        }

        let missing = |node_id: &str, port_id: &str| ConnectionRejection::MissingEndpoint {
            node_id: node_id.to_string(),
            port_id: port_id.to_string(),
        };
        let source = self
            .nodes
            .get(&c.from_node_id)
            .and_then(|n| n.port(&c.from_port_id))
            .ok_or_else(|| missing(&c.from_node_id, &c.from_port_id))?;
        let target = self
            .nodes
            .get(&c.to_node_id)
            .and_then(|n| n.port(&c.to_port_id))
            .ok_or_else(|| missing(&c.to_node_id, &c.to_port_id))?;

        if source.direction != PortDirection::Output {
            return Err(ConnectionRejection::WrongDirection {
                port_id: source.id.clone(),
                expected: PortDirection::Output,
                actual: source.direction,
            });
        }
        if target.direction != PortDirection::Input {
            return Err(ConnectionRejection::WrongDirection {
                port_id: target.id.clone(),
                expected: PortDirection::Input,
                actual: target.direction,
            });
        }

        if !source.data_type.is_compatible_with(target.data_type) {
            return Err(ConnectionRejection::TypeMismatch {
                from: source.data_type,
                to: target.data_type,
            });
        }

        if self.incoming_for_port(&c.to_node_id, &c.to_port_id).is_some() {
            return Err(ConnectionRejection::InputOccupied {
                node_id: c.to_node_id.clone(),
                port_id: c.to_port_id.clone(),
            });
        }

        if self.reaches(&c.to_node_id, &c.from_node_id) {
            return Err(ConnectionRejection::Cycle {
                from_node_id: c.from_node_id.clone(),
                to_node_id: c.to_node_id.clone(),
            });
        }

        Ok(())
    }

    /// Remove a connection; absent ids are a no-op
    pub fn disconnect(&mut self, id: &str) -> Option<WorkflowConnection> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        let connection = self.connections.remove(index);

        debug!(connection_id = %id, "disconnected");
        self.log_event(EventType::Disconnected { id: id.to_string() });
        Some(connection)
    }

    /// Get a connection by id
    pub fn connection(&self, id: &str) -> Option<&WorkflowConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Get all connections
    pub fn connections(&self) -> &[WorkflowConnection] {
        &self.connections
    }

    /// Get all connections starting from a node
    pub fn outgoing(&self, node_id: &str) -> Vec<&WorkflowConnection> {
        self.connections
            .iter()
            .filter(|c| c.starts_from(node_id))
            .collect()
    }

    /// Get all connections ending at a node
    pub fn incoming(&self, node_id: &str) -> Vec<&WorkflowConnection> {
        self.connections
            .iter()
            .filter(|c| c.ends_at(node_id))
            .collect()
    }

    /// The connection feeding a given input port, if any
    pub fn incoming_for_port(&self, node_id: &str, port_id: &str) -> Option<&WorkflowConnection> {
        self.connections.iter().find(|c| c.targets(node_id, port_id))
    }

    /// Whether a directed path leads from `from` to `to` (a node reaches itself)
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            for c in self.connections.iter().filter(|c| c.starts_from(current)) {
                queue.push_back(c.to_node_id.as_str());
            }
        }

        false
    }

    /// Count connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ========== Event Logging ==========

    fn log_event(&mut self, event: EventType) {
        self.events.push(GraphEvent::new(event));
    }

    /// Get all events
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Clear event log
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}
