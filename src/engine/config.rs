//! Engine configuration.
//!
//! Everything the render side pre-allocates is sized from this struct, so it
//! is fixed for the lifetime of an engine.

use serde::{Deserialize, Serialize};

use super::channels::{DEFAULT_COMMAND_BUFFER_SIZE, DEFAULT_EVENT_BUFFER_SIZE};
use crate::error::{GraphError, Result};

/// Largest block the engine accepts.
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Sizing and timing parameters for an engine instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Maximum frames per render call. Buffers are allocated at this size.
    pub block_size: usize,
    /// Maximum number of nodes in the graph.
    pub max_nodes: usize,
    /// Capacity of the control-to-render command queue.
    pub command_capacity: usize,
    /// Capacity of the render-to-control event queue.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 128,
            max_nodes: 256,
            command_capacity: DEFAULT_COMMAND_BUFFER_SIZE,
            event_capacity: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| GraphError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every field is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(GraphError::InvalidConfig(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(GraphError::InvalidConfig(format!(
                "block_size must be in 1..={}, got {}",
                MAX_BLOCK_SIZE, self.block_size
            )));
        }
        if self.max_nodes == 0 {
            return Err(GraphError::InvalidConfig("max_nodes must be non-zero".into()));
        }
        if self.command_capacity == 0 || self.event_capacity == 0 {
            return Err(GraphError::InvalidConfig(
                "queue capacities must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Capacity of the queue that carries retired nodes and plans back.
    ///
    /// Large enough for every node plus one plan per queued command.
    pub fn retire_capacity(&self) -> usize {
        self.max_nodes + self.command_capacity + 1
    }
}
