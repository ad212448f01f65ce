//! The core `Node` trait and node type metadata.
//!
//! Every processing algorithm sits behind one flat trait. Node types are
//! described by a [`NodeInfo`] plus a vertex interface and registered with a
//! factory, see [`crate::dsp::registry`].

use super::context::BlockContext;
use super::signal::{Inputs, Outputs};
use super::vertex::VertexInterface;

/// Category of a node type, used to organize node listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Signal generators (oscillators).
    Source,
    /// Amplitude and level processing.
    Dynamics,
    /// Time-varying modulation effects.
    Modulation,
    /// Event generators and event-driven shapers.
    Trigger,
    /// Routing and mixing helpers.
    Utility,
}

impl NodeCategory {
    /// Returns a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            NodeCategory::Source => "Source",
            NodeCategory::Dynamics => "Dynamics",
            NodeCategory::Modulation => "Modulation",
            NodeCategory::Trigger => "Trigger",
            NodeCategory::Utility => "Utility",
        }
    }
}

/// Static information about a node type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    /// Unique class name the registry is keyed by (e.g. "Tremolo").
    pub class_name: &'static str,
    /// Human-readable name.
    pub display_name: &'static str,
    /// A brief description of what the node does.
    pub description: &'static str,
    pub author: &'static str,
    pub category: NodeCategory,
    pub major_version: u16,
    pub minor_version: u16,
}

/// The contract every node instance implements.
///
/// # Realtime rules
///
/// `process` and `reset` run on the render thread. They must not allocate,
/// free, lock or perform I/O. A node that does is faulted by the engine: its
/// outputs read as silence for the rest of the session. Anything that needs
/// memory is set up in `Default`/`initialize`, which run on the control thread.
///
/// # Example
///
/// ```ignore
/// struct Invert;
///
/// impl Node for Invert {
///     fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}
///     fn reset(&mut self) {}
///
///     fn process(&mut self, _ctx: &BlockContext, inputs: &Inputs, outputs: &mut Outputs) {
///         let input = inputs.audio(0);
///         for (out, sample) in outputs.audio_mut(0).iter_mut().zip(input) {
///             *out = -sample;
///         }
///     }
/// }
/// ```
pub trait Node: Send + 'static {
    /// Prepares the node for rendering.
    ///
    /// Called once on the control thread before the node is handed to the
    /// render thread. Buffers sized from `block_size` belong here.
    fn initialize(&mut self, sample_rate: f32, block_size: usize);

    /// Clears internal state without reallocating.
    ///
    /// Called on transport jumps and explicit engine resets.
    fn reset(&mut self);

    /// Processes one block.
    ///
    /// Reads only `inputs` and `ctx`, writes every declared output.
    fn process(&mut self, ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>);
}

/// A node type that can describe and construct itself.
///
/// Implementors get registered with
/// [`NodeRegistry::register_class`](crate::dsp::NodeRegistry::register_class).
pub trait NodeClass: Node + Default {
    /// Metadata for this node type.
    const INFO: NodeInfo;

    /// The pins this node type exposes.
    fn interface() -> VertexInterface;
}
