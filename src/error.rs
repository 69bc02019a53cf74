use crate::node::{DataType, NodeKind, PortDirection};
use thiserror::Error;

/// Errors raised by graph operations.
///
/// All of these are local and recoverable: the editor drops the attempted
/// operation and carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("a node with id {0} already exists")]
    DuplicateNode(String),

    #[error("invalid connection: {0}")]
    InvalidConnection(#[from] ConnectionRejection),

    #[error("unknown node or port: {0}")]
    UnknownNodeOrPort(String),

    #[error("config for {found} does not match node kind {expected}")]
    ConfigKindMismatch { expected: NodeKind, found: NodeKind },

    #[error("invalid port layout on {kind} node {node_id}: {reason}")]
    InvalidPorts {
        node_id: String,
        kind: NodeKind,
        reason: String,
    },
}

/// Why a connect attempt was refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectionRejection {
    #[error("endpoint {node_id}/{port_id} does not exist")]
    MissingEndpoint { node_id: String, port_id: String },

    #[error("port {port_id} is an {actual} port, expected {expected}")]
    WrongDirection {
        port_id: String,
        expected: PortDirection,
        actual: PortDirection,
    },

    #[error("cannot connect {from} output to {to} input")]
    TypeMismatch { from: DataType, to: DataType },

    #[error("input {node_id}/{port_id} already has an incoming connection")]
    InputOccupied { node_id: String, port_id: String },

    #[error("connection {from_node_id} -> {to_node_id} would create a cycle")]
    Cycle {
        from_node_id: String,
        to_node_id: String,
    },

    #[error("a connection with id {0} already exists")]
    DuplicateId(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
