//! Pointer gesture handling for the canvas.
//!
//! The controller turns screen-space pointer sequences into graph and
//! viewport mutations. It owns the tool mode, the selection and the single
//! active gesture (node drag, viewport pan or connection draft).

use crate::connection::ConnectionId;
use crate::error::GraphError;
use crate::geometry::{Point, Size, Vector};
use crate::graph::GraphModel;
use crate::message::EditorMessage;
use crate::node::{
    NodeId, NodeKind, NodePatch, PortDirection, PortId, WorkflowNode, DEFAULT_NODE_SIZE,
};
use crate::viewport::ViewportTransform;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Active tool, chosen from the toolbar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolMode {
    #[default]
    Select,
    Pan,
    Connect,
}

/// What lies under a screen point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Port {
        node_id: NodeId,
        port_id: PortId,
        direction: PortDirection,
    },
    Node(NodeId),
    Canvas,
}

/// A connection being dragged out of an output port
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDraft {
    pub from_node_id: NodeId,
    pub from_port_id: PortId,
    /// Free end of the draft, world space
    pub pointer: Point,
}

impl ConnectionDraft {
    /// World position of the source port, if it still exists
    pub fn anchor(&self, graph: &GraphModel) -> Option<Point> {
        let node = graph.node(&self.from_node_id)?;
        let port = node.port(&self.from_port_id)?;
        Some(node.port_position(port))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    DragNode {
        node_id: NodeId,
        /// Pointer minus node origin, world space
        offset: Vector,
    },
    Pan {
        last: Point,
    },
    Connect(ConnectionDraft),
}

/// What a pointer event changed
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    Unchanged,
    ViewChanged,
    SelectionChanged,
    DraftChanged,
    NodeMoved(NodeId),
    NodeAdded(NodeId),
    NodesDeleted(Vec<NodeId>),
    Connected(ConnectionId),
    /// The draft was dropped; carries the rejection when a connect was attempted
    DraftDiscarded(Option<GraphError>),
}

impl InteractionOutcome {
    /// Whether the canvas needs repainting
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, InteractionOutcome::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: ToolMode,
    selection: BTreeSet<NodeId>,
    gesture: Gesture,
    /// Port radius in world units
    port_radius: f32,
    /// Extra pick tolerance around ports, screen pixels
    hit_slop: f32,
    /// Size given to nodes dropped from the palette
    node_size: Size,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(6.0, 4.0)
    }
}

impl InteractionController {
    pub fn new(port_radius: f32, hit_slop: f32) -> Self {
        Self {
            mode: ToolMode::Select,
            selection: BTreeSet::new(),
            gesture: Gesture::Idle,
            port_radius,
            hit_slop,
            node_size: DEFAULT_NODE_SIZE,
        }
    }

    pub fn with_node_size(mut self, node_size: Size) -> Self {
        self.node_size = node_size;
        self
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    /// Switch tools; any in-progress gesture is abandoned
    pub fn set_mode(&mut self, mode: ToolMode) {
        if self.mode != mode {
            trace!(?mode, "tool mode changed");
            self.cancel();
            self.mode = mode;
        }
    }

    pub fn selection(&self) -> &BTreeSet<NodeId> {
        &self.selection
    }

    /// Make `id` the sole selection; stale ids are ignored
    pub fn select(&mut self, graph: &GraphModel, id: &str) -> bool {
        if !graph.contains_node(id) {
            return false;
        }
        self.selection.clear();
        self.selection.insert(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn draft(&self) -> Option<&ConnectionDraft> {
        match &self.gesture {
            Gesture::Connect(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::DragNode { .. })
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    /// Abandon the active gesture without touching the graph
    pub fn cancel(&mut self) -> InteractionOutcome {
        match std::mem::take(&mut self.gesture) {
            Gesture::Connect(_) => InteractionOutcome::DraftDiscarded(None),
            Gesture::Idle => InteractionOutcome::Unchanged,
            _ => {
                trace!("gesture cancelled");
                InteractionOutcome::Unchanged
            }
        }
    }

    /// Find what lies under `screen`.
    ///
    /// Ports win over bodies; within each pass nodes are tested topmost first.
    pub fn hit_test(
        &self,
        graph: &GraphModel,
        viewport: &ViewportTransform,
        screen: Point,
    ) -> HitTarget {
        let world = viewport.screen_to_world(screen);
        let pick_radius = self.port_radius + self.hit_slop / viewport.zoom();

        for node in graph.nodes_front_to_back() {
            for port in node.ports() {
                if node.port_position(port).distance(world) <= pick_radius {
                    return HitTarget::Port {
                        node_id: node.id.clone(),
                        port_id: port.id.clone(),
                        direction: port.direction,
                    };
                }
            }
        }

        graph
            .nodes_front_to_back()
            .find(|node| node.bounds().contains_point(world))
            .map_or(HitTarget::Canvas, |node| HitTarget::Node(node.id.clone()))
    }

    pub fn pointer_down(
        &mut self,
        graph: &GraphModel,
        viewport: &ViewportTransform,
        screen: Point,
    ) -> InteractionOutcome {
        // Only one gesture may be live at a time
        self.cancel();
        self.prune_selection(graph);

        if self.mode == ToolMode::Pan {
            trace!(?screen, "pan started");
            self.gesture = Gesture::Pan { last: screen };
            return InteractionOutcome::Unchanged;
        }

        let world = viewport.screen_to_world(screen);
        let hit = self.hit_test(graph, viewport, screen);
        trace!(?hit, mode = ?self.mode, "pointer down");

        match hit {
            HitTarget::Port {
                node_id,
                port_id,
                direction: PortDirection::Output,
            } => {
                self.start_draft(node_id, port_id, world);
                InteractionOutcome::DraftChanged
            }
            HitTarget::Port { node_id, .. } | HitTarget::Node(node_id) => {
                self.press_node(graph, node_id, world)
            }
            HitTarget::Canvas => {
                if self.selection.is_empty() {
                    InteractionOutcome::Unchanged
                } else {
                    self.selection.clear();
                    InteractionOutcome::SelectionChanged
                }
            }
        }
    }

    fn press_node(&mut self, graph: &GraphModel, node_id: NodeId, world: Point) -> InteractionOutcome {
        let Some(node) = graph.node(&node_id) else {
            return InteractionOutcome::Unchanged;
        };

        if self.mode == ToolMode::Connect {
            return match node.primary_output() {
                Some(port) => {
                    let port_id = port.id.clone();
                    self.start_draft(node_id, port_id, world);
                    InteractionOutcome::DraftChanged
                }
                None => InteractionOutcome::Unchanged,
            };
        }

        let offset = world - node.position;
        trace!(node_id = %node_id, "drag started");
        self.selection.clear();
        self.selection.insert(node_id.clone());
        self.gesture = Gesture::DragNode { node_id, offset };
        InteractionOutcome::SelectionChanged
    }

    fn start_draft(&mut self, from_node_id: NodeId, from_port_id: PortId, pointer: Point) {
        trace!(node_id = %from_node_id, port_id = %from_port_id, "connection draft started");
        self.gesture = Gesture::Connect(ConnectionDraft {
            from_node_id,
            from_port_id,
            pointer,
        });
    }

    pub fn pointer_move(
        &mut self,
        graph: &mut GraphModel,
        viewport: &mut ViewportTransform,
        screen: Point,
    ) -> InteractionOutcome {
        let world = viewport.screen_to_world(screen);

        match &mut self.gesture {
            Gesture::Idle => InteractionOutcome::Unchanged,
            Gesture::DragNode { node_id, offset } => {
                let node_id = node_id.clone();
                let position = world - *offset;
                match graph.update_node(&node_id, NodePatch::position(position)) {
                    Ok(()) => InteractionOutcome::NodeMoved(node_id),
                    Err(_) => {
                        // Node vanished mid-drag
                        self.gesture = Gesture::Idle;
                        InteractionOutcome::Unchanged
                    }
                }
            }
            Gesture::Pan { last } => {
                let delta = screen - *last;
                *last = screen;
                viewport.pan_by(delta);
                InteractionOutcome::ViewChanged
            }
            Gesture::Connect(draft) => {
                if draft.anchor(graph).is_none() {
                    self.gesture = Gesture::Idle;
                    return InteractionOutcome::DraftDiscarded(None);
                }
                draft.pointer = world;
                InteractionOutcome::DraftChanged
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        graph: &mut GraphModel,
        viewport: &ViewportTransform,
        screen: Point,
    ) -> InteractionOutcome {
        match std::mem::take(&mut self.gesture) {
            Gesture::Connect(draft) => {
                let HitTarget::Port {
                    node_id,
                    port_id,
                    direction: PortDirection::Input,
                } = self.hit_test(graph, viewport, screen)
                else {
                    trace!("connection draft discarded");
                    return InteractionOutcome::DraftDiscarded(None);
                };

                match graph.connect(&draft.from_node_id, &draft.from_port_id, &node_id, &port_id) {
                    Ok(id) => InteractionOutcome::Connected(id),
                    Err(err) => {
                        debug!(error = %err, "connection rejected");
                        InteractionOutcome::DraftDiscarded(Some(err))
                    }
                }
            }
            Gesture::DragNode { node_id, .. } => {
                trace!(node_id = %node_id, "drag ended");
                InteractionOutcome::Unchanged
            }
            Gesture::Pan { .. } | Gesture::Idle => InteractionOutcome::Unchanged,
        }
    }

    /// Add a node of `kind` centered on a world position
    pub fn palette_drop(
        &mut self,
        graph: &mut GraphModel,
        kind: NodeKind,
        world: Point,
    ) -> InteractionOutcome {
        if !world.is_finite() {
            return InteractionOutcome::Unchanged;
        }
        let node = WorkflowNode::new(kind, kind.display_name(), world - self.node_size.half())
            .resized(self.node_size);
        let id = node.id.clone();

        match graph.add_node(node) {
            Ok(()) => {
                self.selection.clear();
                self.selection.insert(id.clone());
                InteractionOutcome::NodeAdded(id)
            }
            Err(err) => {
                debug!(error = %err, "palette drop rejected");
                InteractionOutcome::Unchanged
            }
        }
    }

    /// Palette drop at a screen position
    pub fn palette_drop_at_screen(
        &mut self,
        graph: &mut GraphModel,
        viewport: &ViewportTransform,
        kind: NodeKind,
        screen: Point,
    ) -> InteractionOutcome {
        self.palette_drop(graph, kind, viewport.screen_to_world(screen))
    }

    /// Apply a typed message addressed to the controller.
    ///
    /// Status updates belong to the simulator and are ignored here.
    pub fn handle_message(
        &mut self,
        graph: &mut GraphModel,
        message: &EditorMessage,
    ) -> InteractionOutcome {
        match message {
            EditorMessage::PaletteDrop {
                node_kind,
                world_position,
            } => self.palette_drop(graph, *node_kind, *world_position),
            EditorMessage::StatusUpdate { .. } => InteractionOutcome::Unchanged,
        }
    }

    /// Delete every selected node, cascading their connections
    pub fn delete_selection(&mut self, graph: &mut GraphModel) -> InteractionOutcome {
        if self.selection.is_empty() {
            return InteractionOutcome::Unchanged;
        }

        let removed: Vec<NodeId> = std::mem::take(&mut self.selection)
            .into_iter()
            .filter(|id| graph.remove_node(id).is_some())
            .collect();

        let gesture_orphaned = match &self.gesture {
            Gesture::DragNode { node_id, .. } => !graph.contains_node(node_id),
            Gesture::Connect(draft) => !graph.contains_node(&draft.from_node_id),
            _ => false,
        };
        if gesture_orphaned {
            self.gesture = Gesture::Idle;
        }

        InteractionOutcome::NodesDeleted(removed)
    }

    fn prune_selection(&mut self, graph: &GraphModel) {
        self.selection.retain(|id| graph.contains_node(id));
    }
}
