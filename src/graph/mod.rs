//! Graph module
//!
//! Control-side topology: node arena, typed pin connections and the audio
//! outputs exposed to the host.

pub mod topology;

pub use topology::{Connection, Graph, GraphOutput, NodeEntry, NodeId};
