//! 4-input summing mixer node.
//!
//! The way to combine several signals into one input, since an input pin
//! accepts only one connection.

use crate::dsp::{
    BlockContext, Inputs, Node, NodeCategory, NodeClass, NodeInfo, Outputs, PinDefinition,
    PinKind, VertexInterface,
};

/// Sums up to four audio signals.
///
/// Plain addition with no scaling or clipping. Unconnected inputs
/// contribute silence.
///
/// # Pins
///
/// **Inputs:**
/// - **In 1** .. **In 4** (Audio)
///
/// **Outputs:**
/// - **Out** (Audio): The sum.
#[derive(Default)]
pub struct Mixer;

impl Mixer {
    /// Number of audio inputs.
    pub const CHANNELS: usize = 4;
    const PIN_OUT: usize = 0;

    pub fn new() -> Self {
        Self
    }
}

impl NodeClass for Mixer {
    const INFO: NodeInfo = NodeInfo {
        class_name: "Mixer",
        display_name: "Mixer",
        description: "Sums four audio inputs.",
        author: "Chris",
        category: NodeCategory::Utility,
        major_version: 1,
        minor_version: 0,
    };

    fn interface() -> VertexInterface {
        VertexInterface::new(
            vec![
                PinDefinition::audio_input("In 1", "First audio input"),
                PinDefinition::audio_input("In 2", "Second audio input"),
                PinDefinition::audio_input("In 3", "Third audio input"),
                PinDefinition::audio_input("In 4", "Fourth audio input"),
            ],
            vec![PinDefinition::output("Out", "Summed audio", PinKind::Audio)],
        )
    }
}

impl Node for Mixer {
    fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}

    fn reset(&mut self) {}

    fn process(&mut self, _ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        let out = outputs.audio_mut(Self::PIN_OUT);
        out.fill(0.0);
        for pin in 0..Self::CHANNELS {
            if !inputs.is_connected(pin) {
                continue;
            }
            for (out, &sample) in out.iter_mut().zip(inputs.audio(pin)) {
                *out += sample;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::bench::Bench;

    #[test]
    fn test_mixer_sums_connected_inputs() {
        let ctx = BlockContext::new(3, 48000.0);
        let mut mixer = Mixer::new();
        let mut bench = Bench::new(&mut mixer, &ctx);
        bench.feed_audio(0, &[0.5, 0.5, 0.5]);
        bench.feed_audio(2, &[0.25, -0.5, 1.0]);

        bench.run(&mut mixer, &ctx);
        assert_eq!(bench.audio(0), &[0.75, 0.0, 1.5]);
    }

    #[test]
    fn test_mixer_does_not_clip() {
        let ctx = BlockContext::new(1, 48000.0);
        let mut mixer = Mixer::new();
        let mut bench = Bench::new(&mut mixer, &ctx);
        for pin in 0..Mixer::CHANNELS {
            bench.feed_audio(pin, &[1.0]);
        }

        bench.run(&mut mixer, &ctx);
        assert_eq!(bench.audio(0), &[4.0]);
    }

    #[test]
    fn test_mixer_overwrites_previous_block() {
        let ctx = BlockContext::new(2, 48000.0);
        let mut mixer = Mixer::new();
        let mut bench = Bench::new(&mut mixer, &ctx);
        bench.feed_audio(1, &[1.0, 1.0]);
        bench.run(&mut mixer, &ctx);
        bench.run(&mut mixer, &ctx);
        assert_eq!(bench.audio(0), &[1.0, 1.0]);
    }
}
