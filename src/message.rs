//! Typed messages flowing into the editor from the host and the palette.

use crate::geometry::Point;
use crate::node::{NodeId, NodeKind, NodeStatus};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// A single event for the editor loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EditorMessage {
    /// Execution status reported for one node
    #[serde(rename_all = "camelCase")]
    StatusUpdate { node_id: NodeId, status: NodeStatus },

    /// A node template dropped onto the canvas
    #[serde(rename_all = "camelCase")]
    PaletteDrop {
        node_kind: NodeKind,
        world_position: Point,
    },
}

/// Sending half handed to hosts; cheap to clone and `Send`
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: Sender<EditorMessage>,
}

impl MessageSender {
    /// Queue a message. Returns false once the editor side is gone.
    pub fn send(&self, message: EditorMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn status_update(&self, node_id: impl Into<NodeId>, status: NodeStatus) -> bool {
        self.send(EditorMessage::StatusUpdate {
            node_id: node_id.into(),
            status,
        })
    }
}

/// Single inbound queue drained once per frame by the editor loop
#[derive(Debug)]
pub struct MessageChannel {
    tx: Sender<EditorMessage>,
    rx: Receiver<EditorMessage>,
}

impl MessageChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> MessageSender {
        MessageSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every message queued so far without blocking
    pub fn drain(&self) -> Vec<EditorMessage> {
        self.rx.try_iter().collect()
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}
