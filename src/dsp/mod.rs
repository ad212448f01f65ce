//! DSP module
//!
//! Core node traits and types.
//! Defines the Node trait, pins, vertex interfaces, block context and the
//! node registry.

pub mod context;
pub mod node;
pub mod pin;
pub mod registry;
pub mod signal;
pub mod vertex;

pub use context::{BlockContext, GridBoundary, TransportState};
pub use node::{Node, NodeCategory, NodeClass, NodeInfo};
pub use pin::{PinDefault, PinDefinition, PinDirection, PinKind, PinValue};
pub use registry::{NodeDescriptor, NodeFactory, NodeRegistry};
pub use signal::{InputState, Inputs, Outputs, PinBuffer, Trigger};
pub use vertex::VertexInterface;
