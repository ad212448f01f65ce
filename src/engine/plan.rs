//! Execution plans.
//!
//! A plan is an immutable, index-only description of one block's work: which
//! arena slots to process, in what order, and where each input reads from.
//! Plans are built on the control thread and shared with the render thread
//! behind an `Arc`.

use crate::graph::NodeId;

/// Where a node input reads from during a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputBinding {
    /// Output `pin` of the node in arena slot `node`, written earlier in the
    /// same block.
    Connected { node: usize, pin: usize },
    /// The value written by a one-block-delayed tap in the previous block.
    Delayed,
    /// Nothing connected: the pin's literal, silence or latched trigger.
    Unbound,
}

/// One node to process.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanStep {
    pub node: NodeId,
    /// One binding per input pin, in interface order.
    pub inputs: Vec<InputBinding>,
}

/// A control-rate value copied between blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayTap {
    pub src: usize,
    pub src_pin: usize,
    pub dst: usize,
    pub dst_pin: usize,
}

/// An audio output returned to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputTap {
    pub node: usize,
    pub pin: usize,
}

/// Topologically ordered work for one graph build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionPlan {
    pub(crate) generation: u64,
    pub(crate) steps: Vec<PlanStep>,
    pub(crate) delay_taps: Vec<DelayTap>,
    pub(crate) outputs: Vec<OutputTap>,
}

impl ExecutionPlan {
    /// Monotonic build number, reported back when the plan is installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Node ids in execution order.
    pub fn node_order(&self) -> Vec<NodeId> {
        self.steps.iter().map(|step| step.node).collect()
    }

    pub fn delay_taps(&self) -> &[DelayTap] {
        &self.delay_taps
    }

    pub fn outputs(&self) -> &[OutputTap] {
        &self.outputs
    }

    /// Position of a node in the execution order.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.steps.iter().position(|step| step.node == node)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
