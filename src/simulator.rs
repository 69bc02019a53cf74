//! Status-transition walk that approximates a pipeline run.
//!
//! Nothing is executed here. The simulator walks the graph breadth-first from
//! every start node and moves node statuses `idle -> running -> completed`
//! (or `error` when an external executor says so). A node starts only once
//! every upstream node feeding its inputs has completed.

use crate::graph::GraphModel;
use crate::message::EditorMessage;
use crate::node::{NodeConfig, NodeId, NodeStatus, WorkflowNode};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info};

/// How running nodes finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    /// A running node completes after this long (delay nodes use their own duration)
    Timed(Duration),
    /// Nodes complete or fail only through reported status updates
    External,
}

impl Default for SimulationMode {
    fn default() -> Self {
        SimulationMode::Timed(Duration::from_millis(500))
    }
}

/// Simulator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationState {
    #[default]
    Idle,
    Running,
    Finished,
}

/// One status transition produced by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub node_id: NodeId,
    pub from: NodeStatus,
    pub to: NodeStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionSimulator {
    mode: SimulationMode,
    state: SimulationState,

    /// Nodes reachable from a start node, in breadth-first order
    walk: Vec<NodeId>,
    in_walk: HashSet<NodeId>,

    /// Elapsed time of each running node
    running: HashMap<NodeId, Duration>,

    /// Every transition of the current run
    history: Vec<StatusChange>,
}

impl ExecutionSimulator {
    pub fn new(mode: SimulationMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SimulationMode) {
        self.mode = mode;
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SimulationState::Running
    }

    /// True once a run has nothing running and nothing left to start
    pub fn is_finished(&self) -> bool {
        self.state == SimulationState::Finished
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Begin a new run.
    ///
    /// Any run in flight is abandoned and every node is reset to idle first.
    pub fn start(&mut self, graph: &mut GraphModel) -> Vec<StatusChange> {
        self.clear();
        graph.reset_statuses();

        self.walk = breadth_first(graph);
        self.in_walk = self.walk.iter().cloned().collect();
        self.state = SimulationState::Running;
        info!(nodes = self.walk.len(), mode = ?self.mode, "simulation started");

        let mut changes = Vec::new();
        self.advance(graph, &mut changes);
        changes
    }

    /// Abandon the run and put every node back to idle
    pub fn stop(&mut self, graph: &mut GraphModel) {
        if self.state == SimulationState::Running {
            info!("simulation stopped");
        }
        self.clear();
        graph.reset_statuses();
    }

    /// Advance time by `dt`
    pub fn tick(&mut self, graph: &mut GraphModel, dt: Duration) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        if self.state != SimulationState::Running {
            return changes;
        }

        for elapsed in self.running.values_mut() {
            *elapsed += dt;
        }

        if let SimulationMode::Timed(step) = self.mode {
            let due: Vec<NodeId> = self
                .walk
                .iter()
                .filter(|id| {
                    self.running.get(*id).is_some_and(|elapsed| {
                        graph
                            .node(id)
                            .is_some_and(|node| *elapsed >= run_time(node, step))
                    })
                })
                .cloned()
                .collect();

            for id in due {
                self.transition(graph, &id, NodeStatus::Completed, &mut changes);
            }
        }

        self.advance(graph, &mut changes);
        changes
    }

    /// Apply a status reported by an external executor.
    ///
    /// Only a running node may complete or fail, and only a node whose
    /// upstream nodes have all completed may start. Any other report, or a
    /// report for a node outside the current run or no longer in the graph,
    /// is discarded.
    pub fn report(
        &mut self,
        graph: &mut GraphModel,
        node_id: &str,
        status: NodeStatus,
    ) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        let current = graph.node(node_id).map(|n| n.status);
        let allowed = match status {
            NodeStatus::Idle => false,
            NodeStatus::Running => is_ready(graph, node_id),
            NodeStatus::Completed | NodeStatus::Error => current == Some(NodeStatus::Running),
        };
        if self.state != SimulationState::Running || !self.in_walk.contains(node_id) || !allowed {
            debug!(node_id, ?status, ?current, "status report discarded");
            return changes;
        }

        self.transition(graph, node_id, status, &mut changes);
        self.advance(graph, &mut changes);
        changes
    }

    /// Route a typed message; only status updates concern the simulator
    pub fn handle_message(
        &mut self,
        graph: &mut GraphModel,
        message: &EditorMessage,
    ) -> Vec<StatusChange> {
        match message {
            EditorMessage::StatusUpdate { node_id, status } => self.report(graph, node_id, *status),
            EditorMessage::PaletteDrop { .. } => Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.state = SimulationState::Idle;
        self.walk.clear();
        self.in_walk.clear();
        self.running.clear();
        self.history.clear();
    }

    /// Write a status through the graph; stale ids drop out of the run
    fn transition(
        &mut self,
        graph: &mut GraphModel,
        node_id: &str,
        to: NodeStatus,
        changes: &mut Vec<StatusChange>,
    ) {
        let Some(from) = graph.node(node_id).map(|n| n.status) else {
            debug!(node_id, "status update for deleted node discarded");
            self.running.remove(node_id);
            return;
        };
        if from == to || graph.set_status(node_id, to).is_err() {
            return;
        }

        if to == NodeStatus::Running {
            self.running.insert(node_id.to_string(), Duration::ZERO);
        } else {
            self.running.remove(node_id);
        }

        let change = StatusChange {
            node_id: node_id.to_string(),
            from,
            to,
        };
        self.history.push(change.clone());
        changes.push(change);
    }

    /// Start every idle node whose upstream nodes have all completed
    fn advance(&mut self, graph: &mut GraphModel, changes: &mut Vec<StatusChange>) {
        let ready: Vec<NodeId> = self
            .walk
            .iter()
            .filter(|id| is_ready(graph, id))
            .cloned()
            .collect();

        for id in &ready {
            self.transition(graph, id, NodeStatus::Running, changes);
        }

        if self.running.is_empty() && ready.is_empty() {
            self.state = SimulationState::Finished;
            let failed = self
                .walk
                .iter()
                .filter(|id| graph.node(id).is_some_and(|n| n.status == NodeStatus::Error))
                .count();
            info!(steps = self.history.len(), failed, "simulation finished");
        }
    }
}

fn run_time(node: &WorkflowNode, step: Duration) -> Duration {
    match &node.config {
        NodeConfig::Delay(delay) => Duration::from_millis(delay.duration_ms),
        _ => step,
    }
}

fn is_ready(graph: &GraphModel, id: &str) -> bool {
    let Some(node) = graph.node(id) else {
        return false;
    };
    node.status == NodeStatus::Idle
        && graph.incoming(id).iter().all(|c| {
            graph
                .node(&c.from_node_id)
                .is_some_and(|upstream| upstream.status == NodeStatus::Completed)
        })
}

/// Nodes reachable from any start node, breadth-first
fn breadth_first(graph: &GraphModel) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut queue: VecDeque<NodeId> = graph.start_nodes().iter().map(|n| n.id.clone()).collect();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        for connection in graph.outgoing(&id) {
            if !visited.contains(&connection.to_node_id) {
                queue.push_back(connection.to_node_id.clone());
            }
        }
        order.push(id);
    }

    order
}
