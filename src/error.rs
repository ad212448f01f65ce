//! Error taxonomy for the node-graph core.
//!
//! Topology and registration errors are returned to the control thread and
//! leave the graph untouched. Render-time violations never unwind through the
//! audio callback; they travel back as engine events and are converted into
//! [`GraphError::RealtimeViolation`] on the control side.

use std::time::Duration;

use thiserror::Error;

use crate::dsp::{PinDirection, PinKind};
use crate::engine::rt_guard::ViolationKind;
use crate::graph::NodeId;

/// Errors produced by the registry, topology, scheduler and engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// No node type with this class name has been registered.
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// The node id does not refer to a live node in the graph.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node's vertex interface has no pin with this name.
    #[error("node {node} has no {direction} pin named '{pin}'")]
    UnknownPin {
        node: NodeId,
        pin: String,
        direction: PinDirection,
    },

    /// Pin data kinds differ, or the operation is not valid for this kind.
    #[error("type mismatch: expected {expected} pin, found {found}")]
    TypeMismatch { expected: PinKind, found: PinKind },

    /// The edge would close an audio-rate cycle.
    #[error("edge {from} -> {to} would close a cycle")]
    CycleDetected { from: NodeId, to: NodeId },

    /// The destination input already has a source.
    #[error("input '{pin}' on node {node} already has a source")]
    PinAlreadyBound { node: NodeId, pin: String },

    /// An input has no connection and no default at plan-compile time.
    #[error("required input '{pin}' on node {node} is unbound")]
    UnboundRequiredInput { node: NodeId, pin: String },

    /// A node broke the realtime contract while processing.
    #[error("node {node} violated the realtime contract: {kind}")]
    RealtimeViolation { node: NodeId, kind: ViolationKind },

    /// A node type was registered twice with different interfaces.
    #[error("node type '{0}' is already registered with a different interface")]
    InterfaceConflict(String),

    /// A vertex interface failed validation.
    #[error("invalid vertex interface for '{class}': {reason}")]
    InvalidInterface { class: String, reason: String },

    /// Disconnect was requested for an input that has no source.
    #[error("input '{pin}' on node {node} is not connected")]
    NotConnected { node: NodeId, pin: String },

    /// The node arena has no free slots.
    #[error("graph is full ({0} nodes)")]
    GraphFull(usize),

    /// The control-to-render queue cannot take the edit right now.
    #[error("engine command queue is full")]
    QueueFull,

    /// The engine has already been shut down.
    #[error("engine has been shut down")]
    ShutDown,

    /// The render thread did not acknowledge shutdown in time.
    #[error("render thread did not acknowledge shutdown within {0:?}")]
    ShutdownTimeout(Duration),

    /// The engine configuration is unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
