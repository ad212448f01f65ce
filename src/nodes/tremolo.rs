//! Tremolo node.
//!
//! Amplitude modulation by a sine LFO, optionally locked to the transport.

use std::f64::consts::TAU;

use crate::dsp::{
    BlockContext, Inputs, Node, NodeCategory, NodeClass, NodeInfo, Outputs, PinDefinition,
    PinKind, VertexInterface,
};

/// Applies tremolo to an audio signal.
///
/// Each sample is scaled by `(1 + lfo * depth) * makeup`, where `lfo` is a
/// sine in `[-1, 1]`. The LFO phase advances before it is read, so the
/// first sample after a reset is already one step in.
///
/// # Pins
///
/// **Inputs:**
/// - **In Audio** (Audio): Signal to modulate.
/// - **Rate** (Float): LFO rate in Hz, or cycles per beat when synced. Default: 1.0.
/// - **Depth** (Float): Modulation depth. Default: 1.0.
/// - **MakeupGain** (Float): Gain applied after modulation. Default: 1.0.
/// - **Sync** (Bool): Lock the LFO to the song position. Default: false.
///
/// **Outputs:**
/// - **Out Audio** (Audio): The modulated signal.
pub struct Tremolo {
    /// LFO phase in cycles, kept in `[0, 1)`.
    phase: f64,
    sample_rate: f32,
}

impl Tremolo {
    const PIN_IN: usize = 0;
    const PIN_RATE: usize = 1;
    const PIN_DEPTH: usize = 2;
    const PIN_MAKEUP: usize = 3;
    const PIN_SYNC: usize = 4;
    const PIN_OUT: usize = 0;

    pub fn new() -> Self {
        Self {
            phase: 0.0,
            sample_rate: 48000.0,
        }
    }

    /// Phase increment per sample for this block.
    ///
    /// When synced to a running transport, also realigns the phase with the
    /// song position at the start of the block.
    fn prepare_phase(&mut self, ctx: &BlockContext, rate: f64, sync: bool) -> f64 {
        match ctx.samples_per_beat().filter(|_| sync && ctx.transport.playing) {
            Some(samples_per_beat) => {
                let increment = rate / samples_per_beat;
                // Back off one step so the first advance lands on the block start.
                self.phase = (ctx.transport.song_beat() * rate - increment).rem_euclid(1.0);
                increment
            }
            None => rate / self.sample_rate as f64,
        }
    }
}

impl Default for Tremolo {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeClass for Tremolo {
    const INFO: NodeInfo = NodeInfo {
        class_name: "Tremolo",
        display_name: "Tremolo",
        description: "Applies tremolo effect to input audio.",
        author: "Chris",
        category: NodeCategory::Modulation,
        major_version: 1,
        minor_version: 0,
    };

    fn interface() -> VertexInterface {
        VertexInterface::new(
            vec![
                PinDefinition::audio_input("In Audio", "Audio input"),
                PinDefinition::float_input("Rate", "Tremolo rate, in Hz", 1.0),
                PinDefinition::float_input("Depth", "Tremolo depth", 1.0),
                PinDefinition::float_input("MakeupGain", "Gain applied after the tremolo", 1.0),
                PinDefinition::bool_input("Sync", "Interpret rate as cycles per beat", false),
            ],
            vec![PinDefinition::output("Out Audio", "Modulated audio", PinKind::Audio)],
        )
    }
}

impl Node for Tremolo {
    fn initialize(&mut self, sample_rate: f32, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn process(&mut self, ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        let rate = inputs.float(Self::PIN_RATE).max(0.0) as f64;
        let depth = inputs.float(Self::PIN_DEPTH);
        let makeup = inputs.float(Self::PIN_MAKEUP);
        let increment = self.prepare_phase(ctx, rate, inputs.bool(Self::PIN_SYNC));

        let input = inputs.audio(Self::PIN_IN);
        let out = outputs.audio_mut(Self::PIN_OUT);
        for (out, &sample) in out.iter_mut().zip(input) {
            self.phase = (self.phase + increment).fract();
            let lfo = (self.phase * TAU).sin() as f32;
            *out = sample * (1.0 + lfo * depth) * makeup;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{PinValue, TransportState};
    use crate::nodes::bench::Bench;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_tremolo_interface_defaults() {
        let interface = Tremolo::interface();
        assert!(interface.validate().is_ok());
        assert_eq!(interface.inputs()[1].default_value(), Some(PinValue::Float(1.0)));
        assert_eq!(interface.inputs()[4].default_value(), Some(PinValue::Bool(false)));
    }

    #[test]
    fn test_tremolo_quarter_cycle_steps() {
        let ctx = BlockContext::new(4, 48000.0);
        let mut node = Tremolo::new();
        let mut bench = Bench::new(&mut node, &ctx);
        bench.feed_audio(0, &[1.0; 4]);
        bench.set(1, PinValue::Float(12000.0));

        bench.run(&mut node, &ctx);
        // Phase advances 0.25 per sample: sin at 90, 180, 270, 360 degrees.
        assert_close(bench.audio(0), &[2.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_tremolo_zero_depth_applies_makeup() {
        let ctx = BlockContext::new(3, 48000.0);
        let mut node = Tremolo::new();
        let mut bench = Bench::new(&mut node, &ctx);
        bench.feed_audio(0, &[0.5, -0.5, 1.0]);
        bench.set(2, PinValue::Float(0.0));
        bench.set(3, PinValue::Float(2.0));

        bench.run(&mut node, &ctx);
        assert_close(bench.audio(0), &[1.0, -1.0, 2.0]);
    }

    #[test]
    fn test_tremolo_reset_restarts_phase() {
        let ctx = BlockContext::new(2, 48000.0);
        let mut node = Tremolo::new();
        let mut bench = Bench::new(&mut node, &ctx);
        bench.feed_audio(0, &[1.0; 2]);
        bench.set(1, PinValue::Float(12000.0));

        bench.run(&mut node, &ctx);
        let first = bench.audio(0).to_vec();
        node.reset();
        bench.run(&mut node, &ctx);
        assert_close(bench.audio(0), &first);
    }

    #[test]
    fn test_tremolo_sync_follows_song_position() {
        // 120 BPM at 48 kHz: 24000 samples per beat.
        let transport = TransportState {
            beat: 0.25,
            ..TransportState::playing_at(120.0)
        };
        let ctx = BlockContext::with_transport(1, 48000.0, transport);
        let mut node = Tremolo::new();
        let mut bench = Bench::new(&mut node, &ctx);
        bench.feed_audio(0, &[1.0]);
        bench.set(4, PinValue::Bool(true));

        bench.run(&mut node, &ctx);
        // One cycle per beat, a quarter beat in: LFO at its peak.
        assert_close(bench.audio(0), &[2.0]);
    }
}
