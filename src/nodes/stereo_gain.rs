//! Stereo gain node.

use crate::dsp::{
    BlockContext, Inputs, Node, NodeCategory, NodeClass, NodeInfo, Outputs, PinDefinition,
    PinKind, VertexInterface,
};

/// Applies one gain level to a left/right pair.
///
/// # Pins
///
/// **Inputs:**
/// - **In Left** (Audio), **In Right** (Audio)
/// - **Gain Level** (Float): Linear gain for both channels. Default: 1.0.
///
/// **Outputs:**
/// - **Out Left** (Audio), **Out Right** (Audio)
#[derive(Debug, Default)]
pub struct StereoGain;

impl StereoGain {
    const PIN_IN_LEFT: usize = 0;
    const PIN_IN_RIGHT: usize = 1;
    const PIN_LEVEL: usize = 2;
    const PIN_OUT_LEFT: usize = 0;
    const PIN_OUT_RIGHT: usize = 1;

    pub fn new() -> Self {
        Self
    }
}

impl NodeClass for StereoGain {
    const INFO: NodeInfo = NodeInfo {
        class_name: "StereoGain",
        display_name: "Stereo Gain",
        description: "Scales a stereo pair by a linear gain level.",
        author: "Chris",
        category: NodeCategory::Dynamics,
        major_version: 1,
        minor_version: 0,
    };

    fn interface() -> VertexInterface {
        VertexInterface::new(
            vec![
                PinDefinition::audio_input("In Left", "Left audio input"),
                PinDefinition::audio_input("In Right", "Right audio input"),
                PinDefinition::float_input("Gain Level", "Linear gain", 1.0),
            ],
            vec![
                PinDefinition::output("Out Left", "Scaled left channel", PinKind::Audio),
                PinDefinition::output("Out Right", "Scaled right channel", PinKind::Audio),
            ],
        )
    }
}

impl Node for StereoGain {
    fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}

    fn reset(&mut self) {}

    fn process(&mut self, _ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        let level = inputs.float(Self::PIN_LEVEL);
        for (input, output) in [
            (Self::PIN_IN_LEFT, Self::PIN_OUT_LEFT),
            (Self::PIN_IN_RIGHT, Self::PIN_OUT_RIGHT),
        ] {
            let input = inputs.audio(input);
            for (out, &sample) in outputs.audio_mut(output).iter_mut().zip(input) {
                *out = sample * level;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::PinValue;
    use crate::nodes::bench::Bench;

    #[test]
    fn test_stereo_gain_scales_both_channels() {
        let ctx = BlockContext::new(3, 48000.0);
        let mut node = StereoGain::new();
        let mut bench = Bench::new(&mut node, &ctx);
        bench.feed_audio(0, &[1.0, 0.5, -1.0]);
        bench.feed_audio(1, &[-0.5, 0.0, 1.0]);
        bench.set(2, PinValue::Float(2.0));

        bench.run(&mut node, &ctx);
        assert_eq!(bench.audio(0), &[2.0, 1.0, -2.0]);
        assert_eq!(bench.audio(1), &[-1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_stereo_gain_single_channel_connected() {
        let ctx = BlockContext::new(2, 48000.0);
        let mut node = StereoGain::new();
        let mut bench = Bench::new(&mut node, &ctx);
        bench.feed_audio(0, &[0.25, 0.25]);

        bench.run(&mut node, &ctx);
        assert_eq!(bench.audio(0), &[0.25, 0.25]);
        assert_eq!(bench.audio(1), &[0.0, 0.0]);
    }

    #[test]
    fn test_stereo_gain_level_change_is_immediate() {
        let ctx = BlockContext::new(2, 48000.0);
        let mut node = StereoGain::new();
        let mut bench = Bench::new(&mut node, &ctx);
        bench.feed_audio(0, &[1.0, 1.0]);
        bench.feed_audio(1, &[-1.0, -1.0]);
        bench.run(&mut node, &ctx);

        bench.set(2, PinValue::Float(0.5));
        bench.run(&mut node, &ctx);
        assert_eq!(bench.audio(0), &[0.5, 0.5]);
        assert_eq!(bench.audio(1), &[-0.5, -0.5]);
    }
}
