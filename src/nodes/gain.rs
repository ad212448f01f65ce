//! Gain node.
//!
//! Scales an audio signal by a level read once per block.

use crate::dsp::{
    BlockContext, Inputs, Node, NodeCategory, NodeClass, NodeInfo, Outputs, PinDefinition,
    PinKind, VertexInterface,
};

/// A mono gain stage.
///
/// # Pins
///
/// **Inputs:**
/// - **In Audio** (Audio): Signal to scale.
/// - **Gain Level** (Float): Linear gain. Default: 1.0.
///
/// **Outputs:**
/// - **Out Audio** (Audio): The scaled signal.
#[derive(Debug, Default)]
pub struct Gain;

impl Gain {
    /// Pin index constants for clarity.
    const PIN_IN: usize = 0;
    const PIN_LEVEL: usize = 1;
    const PIN_OUT: usize = 0;

    /// Creates a new gain node.
    pub fn new() -> Self {
        Self
    }
}

impl NodeClass for Gain {
    const INFO: NodeInfo = NodeInfo {
        class_name: "Gain",
        display_name: "Gain",
        description: "Scales audio by a linear gain level.",
        author: "Chris",
        category: NodeCategory::Dynamics,
        major_version: 1,
        minor_version: 0,
    };

    fn interface() -> VertexInterface {
        VertexInterface::new(
            vec![
                PinDefinition::audio_input("In Audio", "Audio input"),
                PinDefinition::float_input("Gain Level", "Linear gain", 1.0),
            ],
            vec![PinDefinition::output("Out Audio", "Scaled audio", PinKind::Audio)],
        )
    }
}

impl Node for Gain {
    fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}

    fn reset(&mut self) {}

    fn process(&mut self, _ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        let level = inputs.float(Self::PIN_LEVEL);
        let input = inputs.audio(Self::PIN_IN);
        let out = outputs.audio_mut(Self::PIN_OUT);
        for (out, &sample) in out.iter_mut().zip(input) {
            *out = sample * level;
        }
    }
}
