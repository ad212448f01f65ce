//! Engine module
//!
//! Planning and rendering of the node graph.
//! Handles plan compilation, control/render messaging, node slots, the
//! render loop and realtime instrumentation.

pub mod channels;
pub mod commands;
pub mod config;
pub mod controller;
pub mod plan;
pub mod render;
pub mod rt_guard;
pub mod scheduler;
pub mod slot;

pub use channels::{
    ControlHandle, EngineChannels, RenderHandle, DEFAULT_COMMAND_BUFFER_SIZE,
    DEFAULT_EVENT_BUFFER_SIZE,
};
pub use commands::{EngineCommand, EngineEvent, Retired};
pub use config::EngineConfig;
pub use controller::{create, GraphController};
pub use plan::{DelayTap, ExecutionPlan, InputBinding, OutputTap, PlanStep};
pub use render::{RenderEngine, RenderedOutputs};
pub use rt_guard::{TrapAllocator, TrapGuard, ViolationKind};
pub use slot::NodeSlot;
