//! Decay envelope node.
//!
//! A percussive envelope: jumps to full level on a trigger and decays
//! exponentially toward silence.

use crate::dsp::{
    BlockContext, Inputs, Node, NodeCategory, NodeClass, NodeInfo, Outputs, PinDefinition,
    PinKind, VertexInterface,
};

/// Level treated as silence; the envelope reaches it after `Decay` seconds.
const FLOOR: f32 = 0.001;

/// Minimum decay time in seconds.
const MIN_DECAY: f32 = 0.001;

/// A one-shot exponential decay envelope.
///
/// # Pins
///
/// **Inputs:**
/// - **Trigger** (Trigger): Restarts the envelope at full level on the fired frame.
/// - **Decay** (Float): Seconds to fall to -60 dB. Default: 0.25.
///
/// **Outputs:**
/// - **Out Audio** (Audio): Envelope level in `[0, 1]`.
/// - **Fired** (Bool): True if the envelope restarted during this block.
pub struct DecayEnvelope {
    level: f32,
    sample_rate: f32,
}

impl DecayEnvelope {
    const PIN_TRIGGER: usize = 0;
    const PIN_DECAY: usize = 1;
    const PIN_OUT: usize = 0;
    const PIN_FIRED: usize = 1;

    pub fn new() -> Self {
        Self {
            level: 0.0,
            sample_rate: 48000.0,
        }
    }

    /// Per-sample multiplier that reaches [`FLOOR`] after `decay` seconds.
    fn coefficient(&self, decay: f32) -> f32 {
        let samples = decay.max(MIN_DECAY) * self.sample_rate;
        FLOOR.powf(1.0 / samples)
    }
}

impl Default for DecayEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeClass for DecayEnvelope {
    const INFO: NodeInfo = NodeInfo {
        class_name: "DecayEnvelope",
        display_name: "Decay Envelope",
        description: "Exponential decay envelope restarted by a trigger.",
        author: "Chris",
        category: NodeCategory::Trigger,
        major_version: 1,
        minor_version: 0,
    };

    fn interface() -> VertexInterface {
        VertexInterface::new(
            vec![
                PinDefinition::trigger_input("Trigger", "Restart the envelope"),
                PinDefinition::float_input("Decay", "Decay time in seconds", 0.25),
            ],
            vec![
                PinDefinition::output("Out Audio", "Envelope level", PinKind::Audio),
                PinDefinition::output("Fired", "Restarted during this block", PinKind::Bool),
            ],
        )
    }
}

impl Node for DecayEnvelope {
    fn initialize(&mut self, sample_rate: f32, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.level = 0.0;
    }

    fn reset(&mut self) {
        self.level = 0.0;
    }

    fn process(&mut self, _ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        let coefficient = self.coefficient(inputs.float(Self::PIN_DECAY));
        let fired_at = inputs.trigger(Self::PIN_TRIGGER).frame();

        let out = outputs.audio_mut(Self::PIN_OUT);
        for (i, sample) in out.iter_mut().enumerate() {
            if fired_at == Some(i) {
                self.level = 1.0;
            }
            *sample = self.level;
            self.level *= coefficient;
            if self.level < FLOOR {
                self.level = 0.0;
            }
        }
        outputs.set_bool(Self::PIN_FIRED, fired_at.is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{PinValue, Trigger};
    use crate::nodes::bench::Bench;

    #[test]
    fn test_idle_until_triggered() {
        let ctx = BlockContext::new(16, 48000.0);
        let mut env = DecayEnvelope::new();
        let mut bench = Bench::new(&mut env, &ctx);
        bench.run(&mut env, &ctx);
        assert!(bench.audio(0).iter().all(|&s| s == 0.0));
        assert_eq!(bench.value(1), PinValue::Bool(false));
    }

    #[test]
    fn test_trigger_starts_at_fired_frame() {
        let ctx = BlockContext::new(16, 48000.0);
        let mut env = DecayEnvelope::new();
        let mut bench = Bench::new(&mut env, &ctx);
        bench.feed_trigger(0, Trigger::at(5));
        bench.run(&mut env, &ctx);

        let out = bench.audio(0);
        assert!(out[..5].iter().all(|&s| s == 0.0));
        assert_eq!(out[5], 1.0);
        assert!(out[6] < 1.0 && out[6] > 0.99);
        assert!(out[5..].windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(bench.value(1), PinValue::Bool(true));
    }

    #[test]
    fn test_decays_to_silence() {
        // 10 ms decay at 1 kHz is 10 samples.
        let ctx = BlockContext::new(32, 1000.0);
        let mut env = DecayEnvelope::new();
        let mut bench = Bench::new(&mut env, &ctx);
        bench.set(1, PinValue::Float(0.01));
        bench.feed_trigger(0, Trigger::at(0));
        bench.run(&mut env, &ctx);

        let out = bench.audio(0);
        assert_eq!(out[0], 1.0);
        assert!(out[12..].iter().all(|&s| s == 0.0), "{out:?}");
    }
}
