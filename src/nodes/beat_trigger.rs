//! Tempo-synced beat trigger node.

use crate::dsp::{
    BlockContext, Inputs, Node, NodeCategory, NodeClass, NodeInfo, Outputs, PinDefinition,
    PinKind, VertexInterface,
};

/// Fires on every grid step of the transport.
///
/// The grid has `Subdivision` steps per beat. Boundaries are located from
/// the block's own transport snapshot, so a boundary is reported exactly
/// once even when it falls on the edge between two blocks. Nothing fires
/// while the transport is stopped.
///
/// # Pins
///
/// **Inputs:**
/// - **Subdivision** (Int): Grid steps per beat. Default: 1.
/// - **Enabled** (Bool): Gate for the trigger output. Default: true.
///
/// **Outputs:**
/// - **On Beat** (Trigger): Fires at the frame of each grid step.
/// - **Beat Index** (Int): Index of the most recent grid step, -1 before the first.
pub struct BeatTrigger {
    last_index: i32,
}

impl BeatTrigger {
    const PIN_SUBDIVISION: usize = 0;
    const PIN_ENABLED: usize = 1;
    const PIN_ON_BEAT: usize = 0;
    const PIN_BEAT_INDEX: usize = 1;

    pub fn new() -> Self {
        Self { last_index: -1 }
    }
}

impl Default for BeatTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeClass for BeatTrigger {
    const INFO: NodeInfo = NodeInfo {
        class_name: "BeatTrigger",
        display_name: "Beat Trigger",
        description: "Fires a trigger on each beat subdivision of the transport.",
        author: "Chris",
        category: NodeCategory::Trigger,
        major_version: 1,
        minor_version: 0,
    };

    fn interface() -> VertexInterface {
        VertexInterface::new(
            vec![
                PinDefinition::int_input("Subdivision", "Grid steps per beat", 1),
                PinDefinition::bool_input("Enabled", "Gate for the trigger output", true),
            ],
            vec![
                PinDefinition::output("On Beat", "Fires on each grid step", PinKind::Trigger),
                PinDefinition::output("Beat Index", "Most recent grid step", PinKind::Int),
            ],
        )
    }
}

impl Node for BeatTrigger {
    fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {
        self.last_index = -1;
    }

    fn reset(&mut self) {
        self.last_index = -1;
    }

    fn process(&mut self, ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        let division = inputs.int(Self::PIN_SUBDIVISION).max(1) as u32;
        if let Some(boundary) = ctx.next_grid_boundary(division) {
            self.last_index = i32::try_from(boundary.index).unwrap_or(i32::MAX);
            if inputs.bool(Self::PIN_ENABLED) {
                outputs.fire(Self::PIN_ON_BEAT, boundary.offset);
            }
        }
        outputs.set_int(Self::PIN_BEAT_INDEX, self.last_index);
    }
}
