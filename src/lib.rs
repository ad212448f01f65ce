//! Tempo Graph Library
//!
//! Real-time execution core for a graph of audio nodes.
//! Node types declare typed pins, a control thread edits and compiles the
//! graph, and a render thread runs the compiled plan once per block without
//! allocating or locking.

pub mod dsp;
pub mod engine;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod transport;

// Re-export commonly used types
pub use dsp::{
    BlockContext, Node, NodeClass, NodeInfo, NodeRegistry, PinKind, PinValue, TransportState,
    VertexInterface,
};
pub use engine::{create, EngineConfig, EngineEvent, GraphController, RenderEngine};
pub use error::{GraphError, Result};
pub use graph::NodeId;
pub use nodes::register_standard_nodes;
pub use transport::SteadyTransport;

/// Unit tests run with the allocation trap so realtime checks see real counts.
#[cfg(test)]
#[global_allocator]
static TEST_ALLOCATOR: engine::TrapAllocator = engine::TrapAllocator::system();
