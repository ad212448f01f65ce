//! Node slots: a node instance plus every buffer it touches while rendering.
//!
//! Slots are built and initialized on the control thread, moved to the render
//! thread whole, and moved back for release. Nothing inside is resized once
//! the slot exists.

use crate::dsp::{InputState, Node, PinBuffer, VertexInterface};
use crate::graph::{NodeEntry, NodeId};

/// A node instance and its pre-allocated storage.
pub struct NodeSlot {
    id: NodeId,
    pub(crate) node: Box<dyn Node>,
    /// One buffer per output pin, audio buffers sized to the block length.
    pub(crate) outputs: Vec<PinBuffer>,
    pub(crate) inputs: InputState,
    /// Set once the node breaks the realtime contract.
    pub(crate) faulted: bool,
}

impl NodeSlot {
    /// Allocates storage for `node` and initializes it.
    pub fn new(
        id: NodeId,
        mut node: Box<dyn Node>,
        interface: &VertexInterface,
        sample_rate: f32,
        block_size: usize,
    ) -> Self {
        node.initialize(sample_rate, block_size);
        let outputs = interface
            .outputs()
            .iter()
            .map(|pin| PinBuffer::for_kind(pin.kind, block_size))
            .collect();
        Self {
            id,
            node,
            outputs,
            inputs: InputState::new(interface),
            faulted: false,
        }
    }

    /// Builds the slot for a topology entry, carrying over its input values.
    pub(crate) fn for_entry(entry: &NodeEntry, sample_rate: f32, block_size: usize) -> Self {
        let node = (entry.factory())();
        let mut slot = Self::new(entry.id(), node, entry.interface(), sample_rate, block_size);
        for (pin, value) in entry.literals().iter().enumerate() {
            if let Some(value) = value {
                slot.inputs.set_literal(pin, *value);
            }
        }
        slot
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn outputs(&self) -> &[PinBuffer] {
        &self.outputs
    }

    /// Silences the slot for the rest of the session.
    pub(crate) fn fault(&mut self) {
        self.faulted = true;
        for buffer in &mut self.outputs {
            buffer.silence();
        }
    }

    pub(crate) fn clear_triggers(&mut self) {
        for buffer in &mut self.outputs {
            buffer.clear_trigger();
        }
    }
}
