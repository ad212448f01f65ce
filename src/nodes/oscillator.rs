//! Oscillator nodes.
//!
//! This module contains sound source nodes that generate audio waveforms.

use std::f32::consts::TAU;

use crate::dsp::{
    BlockContext, Inputs, Node, NodeCategory, NodeClass, NodeInfo, Outputs, PinDefinition,
    PinKind, VertexInterface,
};

/// A sine wave oscillator with phase reset.
///
/// # Pins
///
/// **Inputs:**
/// - **Frequency** (Float): Frequency in Hz. Default: 440.
/// - **Amplitude** (Float): Peak level. Default: 1.0.
/// - **Reset** (Trigger): Restarts the waveform at phase zero on the fired frame.
///
/// **Outputs:**
/// - **Out Audio** (Audio): The generated sine wave.
pub struct SineOscillator {
    /// Current phase accumulator (0.0 to 1.0).
    phase: f32,
}

impl SineOscillator {
    const PIN_FREQUENCY: usize = 0;
    const PIN_AMPLITUDE: usize = 1;
    const PIN_RESET: usize = 2;
    const PIN_OUT: usize = 0;

    /// Creates a new sine oscillator.
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }
}

impl Default for SineOscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeClass for SineOscillator {
    const INFO: NodeInfo = NodeInfo {
        class_name: "SineOscillator",
        display_name: "Sine Oscillator",
        description: "Generates a sine wave.",
        author: "Chris",
        category: NodeCategory::Source,
        major_version: 1,
        minor_version: 0,
    };

    fn interface() -> VertexInterface {
        VertexInterface::new(
            vec![
                PinDefinition::float_input("Frequency", "Frequency in Hz", 440.0),
                PinDefinition::float_input("Amplitude", "Peak level", 1.0),
                PinDefinition::trigger_input("Reset", "Restart at phase zero"),
            ],
            vec![PinDefinition::output("Out Audio", "Sine wave", PinKind::Audio)],
        )
    }
}

impl Node for SineOscillator {
    fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {
        self.phase = 0.0;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn process(&mut self, ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        let increment = ctx.cycles_per_sample(inputs.float(Self::PIN_FREQUENCY).max(0.0));
        let amplitude = inputs.float(Self::PIN_AMPLITUDE);
        let reset_at = inputs.trigger(Self::PIN_RESET).frame();

        let out = outputs.audio_mut(Self::PIN_OUT);
        for (i, sample) in out.iter_mut().enumerate() {
            if reset_at == Some(i) {
                self.phase = 0.0;
            }
            *sample = (self.phase * TAU).sin() * amplitude;

            // Advance phase with wraparound
            self.phase += increment;
            if self.phase >= 1.0 {
                self.phase -= self.phase.floor();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{PinValue, Trigger};
    use crate::nodes::bench::Bench;

    #[test]
    fn test_oscillator_info() {
        assert_eq!(SineOscillator::INFO.class_name, "SineOscillator");
        assert_eq!(SineOscillator::INFO.category, NodeCategory::Source);
        assert!(SineOscillator::interface().validate().is_ok());
    }

    #[test]
    fn test_oscillator_quarter_steps() {
        let ctx = BlockContext::new(4, 48000.0);
        let mut osc = SineOscillator::new();
        let mut bench = Bench::new(&mut osc, &ctx);
        bench.set(0, PinValue::Float(12000.0));
        bench.set(1, PinValue::Float(0.5));

        bench.run(&mut osc, &ctx);
        let out = bench.audio(0);
        let expected = [0.0, 0.5, 0.0, -0.5];
        for (a, e) in out.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{out:?}");
        }
    }

    #[test]
    fn test_oscillator_output_bounded() {
        let ctx = BlockContext::new(256, 48000.0);
        let mut osc = SineOscillator::new();
        let mut bench = Bench::new(&mut osc, &ctx);
        for _ in 0..10 {
            bench.run(&mut osc, &ctx);
            assert!(bench.audio(0).iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn test_oscillator_reset_trigger() {
        let ctx = BlockContext::new(8, 48000.0);
        let mut osc = SineOscillator::new();
        let mut bench = Bench::new(&mut osc, &ctx);
        bench.set(0, PinValue::Float(12000.0));
        bench.feed_trigger(2, Trigger::at(3));

        bench.run(&mut osc, &ctx);
        let out = bench.audio(0);
        // Phase is back at zero on frame 3, then steps a quarter cycle.
        assert!(out[3].abs() < 1e-5);
        assert!((out[4] - 1.0).abs() < 1e-5);
        assert!(out[2].abs() < 1e-5);
        assert!((out[1] - 1.0).abs() < 1e-5);
    }
}
