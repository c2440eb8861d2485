//! Error Types
//!
//! Every fallible engine operation returns a [`GraphError`]. Node hooks return
//! a [`NodeError`], which the scheduler converts into
//! [`GraphError::NodeExecution`] at the node boundary so that one failing node
//! never aborts a tick or a trigger cascade.

use thiserror::Error;

use crate::graph::{LinkId, NodeId, SlotDirection, SlotRef, SlotType};

/// Result alias used throughout the crate.
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type returned by node hooks.
pub type HookResult = Result<(), NodeError>;

/// The hook a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// `on_execute`, run by the pull pass.
    Execute,
    /// `on_action`, run when a linked event fires.
    Action,
    /// `on_added`, run once the node is in the graph.
    Added,
    /// `on_start`, run when the graph starts or a node joins a live graph.
    Start,
    /// `on_stop`, run when the graph stops or a node leaves a live graph.
    Stop,
    /// `on_pause`
    Pause,
    /// `on_unpause`
    Unpause,
    /// `on_removed`, the last hook a node sees.
    Removed,
    /// `on_configure`, run after a document load restored the node.
    Configure,
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Hook::Execute => "on_execute",
            Hook::Action => "on_action",
            Hook::Added => "on_added",
            Hook::Start => "on_start",
            Hook::Stop => "on_stop",
            Hook::Pause => "on_pause",
            Hook::Unpause => "on_unpause",
            Hook::Removed => "on_removed",
            Hook::Configure => "on_configure",
        };
        f.write_str(name)
    }
}

/// Errors produced by the graph, the scheduler and the document loader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("unknown node type '{0}'")]
    UnknownType(String),

    #[error("cannot connect {origin_type} output of node {origin} to {target_type} input of node {target}")]
    SlotTypeMismatch {
        origin: NodeId,
        origin_type: SlotType,
        target: NodeId,
        target_type: SlotType,
    },

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("link {0} not found")]
    LinkNotFound(LinkId),

    #[error("node {node} has no {direction} slot {slot}")]
    SlotNotFound {
        node: NodeId,
        direction: SlotDirection,
        slot: SlotRef,
    },

    #[error("node {node} failed in {hook}: {message}")]
    NodeExecution {
        node: NodeId,
        hook: Hook,
        message: String,
    },

    #[error("failed to restore node {node}: {message}")]
    Serialization { node: NodeId, message: String },

    #[error("trigger cascade from node {node} exceeded the depth limit of {limit}")]
    CascadeDepthExceeded { node: NodeId, limit: usize },

    #[error("node {0} is already running a hook and cannot be re-entered")]
    ReentrantHook(NodeId),

    #[error("output slot {slot} of node {node} is an event slot and carries no value")]
    EventSlotValue { node: NodeId, slot: usize },

    #[error("time step must be finite and non-negative, got {0}")]
    InvalidTimeStep(f64),

    #[error("malformed graph document: {0}")]
    MalformedDocument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no {0} ids left to assign")]
    IdsExhausted(&'static str),
}

impl GraphError {
    /// The node a per-node failure is attributed to, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            GraphError::NodeNotFound(node)
            | GraphError::ReentrantHook(node)
            | GraphError::SlotNotFound { node, .. }
            | GraphError::NodeExecution { node, .. }
            | GraphError::Serialization { node, .. }
            | GraphError::CascadeDepthExceeded { node, .. }
            | GraphError::EventSlotValue { node, .. } => Some(*node),
            GraphError::SlotTypeMismatch { target, .. } => Some(*target),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::MalformedDocument(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for GraphError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        GraphError::MalformedDocument(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for GraphError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        GraphError::MalformedDocument(err.to_string())
    }
}

/// Failure raised from inside a node hook.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{0}")]
    Failed(String),

    #[error("missing input '{0}'")]
    MissingInput(String),

    #[error("invalid property '{name}': {reason}")]
    InvalidProperty { name: String, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl NodeError {
    /// Shorthand for a free-form failure.
    pub fn msg(message: impl Into<String>) -> Self {
        NodeError::Failed(message.into())
    }
}
