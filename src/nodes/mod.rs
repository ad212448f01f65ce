//! Nodes module
//!
//! Built-in node types.
//! Includes gain stages, a tremolo, a mixer, an oscillator, a tempo-synced
//! beat trigger and a decay envelope.

pub mod beat_trigger;
pub mod envelope;
pub mod gain;
pub mod mixer;
pub mod oscillator;
pub mod stereo_gain;
pub mod tremolo;

// Re-export commonly used types
pub use beat_trigger::BeatTrigger;
pub use envelope::DecayEnvelope;
pub use gain::Gain;
pub use mixer::Mixer;
pub use oscillator::SineOscillator;
pub use stereo_gain::StereoGain;
pub use tremolo::Tremolo;

use crate::dsp::NodeRegistry;
use crate::error::Result;

/// Registers every built-in node type.
pub fn register_standard_nodes(registry: &mut NodeRegistry) -> Result<()> {
    registry.register_class::<Gain>()?;
    registry.register_class::<StereoGain>()?;
    registry.register_class::<Tremolo>()?;
    registry.register_class::<Mixer>()?;
    registry.register_class::<SineOscillator>()?;
    registry.register_class::<BeatTrigger>()?;
    registry.register_class::<DecayEnvelope>()?;
    Ok(())
}
