//! Engine Commands and Events
//!
//! Defines the messages that flow between the control thread and the render
//! thread. Commands are applied by the render thread at block boundaries only.

use std::sync::Arc;

use super::plan::ExecutionPlan;
use super::rt_guard::ViolationKind;
use super::slot::NodeSlot;
use crate::dsp::PinValue;
use crate::graph::NodeId;

/// Commands sent from the control thread to the render thread.
pub enum EngineCommand {
    /// Place a fully initialized node in its arena slot.
    InsertNode(Box<NodeSlot>),

    /// Swap in a new execution plan. Every node it references has already
    /// been inserted.
    PublishPlan(Arc<ExecutionPlan>),

    /// Take a node out of the arena and hand it back for release.
    RemoveNode(NodeId),

    /// Change the value an unconnected scalar input reads.
    SetInput {
        node: NodeId,
        pin: usize,
        value: PinValue,
    },

    /// Fire an unconnected trigger input for the next block.
    FireTrigger {
        node: NodeId,
        pin: usize,
        frame: usize,
    },

    /// Reset every node's DSP state.
    ResetNodes,

    /// Stop rendering and hand every node back.
    Shutdown,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::InsertNode(slot) => f.debug_tuple("InsertNode").field(&slot.id()).finish(),
            EngineCommand::PublishPlan(plan) => f
                .debug_tuple("PublishPlan")
                .field(&plan.generation())
                .finish(),
            EngineCommand::RemoveNode(node) => f.debug_tuple("RemoveNode").field(node).finish(),
            EngineCommand::SetInput { node, pin, value } => f
                .debug_struct("SetInput")
                .field("node", node)
                .field("pin", pin)
                .field("value", value)
                .finish(),
            EngineCommand::FireTrigger { node, pin, frame } => f
                .debug_struct("FireTrigger")
                .field("node", node)
                .field("pin", pin)
                .field("frame", frame)
                .finish(),
            EngineCommand::ResetNodes => f.write_str("ResetNodes"),
            EngineCommand::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Events sent from the render thread to the control thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A plan became active at a block boundary.
    PlanInstalled { generation: u64 },

    /// A node broke the realtime contract and has been silenced.
    RealtimeViolation { node: NodeId, kind: ViolationKind },

    /// The render thread has stopped and returned all nodes.
    ShutdownComplete,
}

/// Allocations handed back so they are freed on the control thread.
pub enum Retired {
    Node(Box<NodeSlot>),
    Plan(Arc<ExecutionPlan>),
}
