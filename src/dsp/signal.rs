//! Signal storage and the input/output views handed to nodes.
//!
//! All storage here is allocated when a node slot is built on the control
//! thread. During rendering the views only borrow it.

use super::pin::{PinKind, PinValue};
use super::vertex::VertexInterface;
use crate::engine::plan::InputBinding;
use crate::engine::slot::NodeSlot;

/// An edge-latched event.
///
/// A trigger fires at most once per block; the frame records where in the
/// block it fired. Trigger outputs are cleared at the start of every block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Trigger {
    frame: Option<u32>,
}

impl Trigger {
    /// A trigger that has not fired.
    pub const IDLE: Trigger = Trigger { frame: None };

    /// A trigger that fired at `frame`.
    pub fn at(frame: usize) -> Self {
        Self {
            frame: Some(frame as u32),
        }
    }

    /// Returns true if the trigger fired in this block.
    pub fn is_fired(&self) -> bool {
        self.frame.is_some()
    }

    /// Frame offset at which the trigger fired.
    pub fn frame(&self) -> Option<usize> {
        self.frame.map(|f| f as usize)
    }

    /// Fires the trigger. A second fire in the same block keeps the earlier frame.
    pub fn fire(&mut self, frame: usize) {
        let frame = frame as u32;
        self.frame = Some(self.frame.map_or(frame, |f| f.min(frame)));
    }

    /// Returns the trigger to idle.
    pub fn clear(&mut self) {
        self.frame = None;
    }
}

/// Storage behind one output pin.
#[derive(Clone, Debug, PartialEq)]
pub enum PinBuffer {
    /// Fixed-size sample buffer, sized to the engine's block length.
    Audio(Box<[f32]>),
    Trigger(Trigger),
    Value(PinValue),
}

impl PinBuffer {
    /// Allocates storage for a pin of the given kind.
    pub(crate) fn for_kind(kind: PinKind, block_size: usize) -> Self {
        match kind {
            PinKind::Audio => PinBuffer::Audio(vec![0.0; block_size].into_boxed_slice()),
            PinKind::Trigger => PinBuffer::Trigger(Trigger::IDLE),
            scalar => PinBuffer::Value(PinValue::zero(scalar).unwrap_or(PinValue::Float(0.0))),
        }
    }

    /// Resets the buffer to silence, idle or zero without reallocating.
    pub(crate) fn silence(&mut self) {
        match self {
            PinBuffer::Audio(samples) => samples.fill(0.0),
            PinBuffer::Trigger(trigger) => trigger.clear(),
            PinBuffer::Value(value) => {
                if let Some(zero) = PinValue::zero(value.kind()) {
                    *value = zero;
                }
            }
        }
    }

    /// Clears trigger storage; other kinds keep their contents.
    pub(crate) fn clear_trigger(&mut self) {
        if let PinBuffer::Trigger(trigger) = self {
            trigger.clear();
        }
    }

    pub(crate) fn value(&self) -> Option<PinValue> {
        match self {
            PinBuffer::Value(value) => Some(*value),
            _ => None,
        }
    }
}

/// Per-instance state behind unconnected and delayed inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct InputState {
    /// Value read by an unconnected scalar input.
    literals: Vec<Option<PinValue>>,
    /// Value written by a one-block-delayed tap in the previous block.
    delayed: Vec<Option<PinValue>>,
    /// Trigger fired into an unconnected trigger input from the control thread.
    latched: Vec<Trigger>,
}

impl InputState {
    /// Builds state for an interface, seeding scalars with their defaults.
    pub(crate) fn new(interface: &VertexInterface) -> Self {
        let literals: Vec<Option<PinValue>> = interface
            .inputs()
            .iter()
            .map(|pin| pin.default_value().or_else(|| PinValue::zero(pin.kind)))
            .collect();
        Self {
            delayed: literals.clone(),
            literals,
            latched: vec![Trigger::IDLE; interface.inputs().len()],
        }
    }

    /// Replaces the literal of a scalar input. Returns false on a kind mismatch.
    pub(crate) fn set_literal(&mut self, pin: usize, value: PinValue) -> bool {
        match self.literals.get_mut(pin) {
            Some(Some(current)) if current.kind() == value.kind() => {
                *current = value;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_delayed(&mut self, pin: usize, value: PinValue) {
        if let Some(Some(current)) = self.delayed.get_mut(pin) {
            if current.kind() == value.kind() {
                *current = value;
            }
        }
    }

    /// Latches a trigger for the next processed block.
    pub(crate) fn latch(&mut self, pin: usize, frame: usize) {
        if let Some(trigger) = self.latched.get_mut(pin) {
            trigger.fire(frame);
        }
    }

    pub(crate) fn clear_latched(&mut self) {
        for trigger in &mut self.latched {
            trigger.clear();
        }
    }
}

/// Read-only view of a node's inputs for one block.
///
/// Connected inputs borrow the producer's output buffers directly, so a
/// fanned-out output is shared by all of its consumers without copying.
pub struct Inputs<'a> {
    bindings: &'a [InputBinding],
    slots: &'a [Option<Box<NodeSlot>>],
    state: &'a InputState,
    silence: &'a [f32],
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(
        bindings: &'a [InputBinding],
        slots: &'a [Option<Box<NodeSlot>>],
        state: &'a InputState,
        silence: &'a [f32],
    ) -> Self {
        Self {
            bindings,
            slots,
            state,
            silence,
        }
    }

    /// Number of frames in the current block.
    pub fn frames(&self) -> usize {
        self.silence.len()
    }

    /// Returns true if the input is fed by another node.
    pub fn is_connected(&self, pin: usize) -> bool {
        matches!(self.bindings.get(pin), Some(InputBinding::Connected { .. }))
    }

    fn upstream(&self, pin: usize) -> Option<&'a PinBuffer> {
        match self.bindings.get(pin) {
            Some(&InputBinding::Connected { node, pin }) => self
                .slots
                .get(node)
                .and_then(|slot| slot.as_deref())
                .and_then(|slot| slot.outputs.get(pin)),
            _ => None,
        }
    }

    /// Audio samples for an input; silence when unconnected.
    pub fn audio(&self, pin: usize) -> &'a [f32] {
        match self.upstream(pin) {
            Some(PinBuffer::Audio(samples)) => &samples[..self.frames()],
            _ => self.silence,
        }
    }

    /// Trigger state for an input.
    pub fn trigger(&self, pin: usize) -> Trigger {
        match self.upstream(pin) {
            Some(PinBuffer::Trigger(trigger)) => *trigger,
            Some(_) => Trigger::IDLE,
            None => self.state.latched.get(pin).copied().unwrap_or_default(),
        }
    }

    /// Current value of a scalar input.
    pub fn value(&self, pin: usize) -> Option<PinValue> {
        match self.bindings.get(pin) {
            Some(InputBinding::Connected { .. }) => self.upstream(pin).and_then(PinBuffer::value),
            Some(InputBinding::Delayed) => self.state.delayed.get(pin).copied().flatten(),
            _ => self.state.literals.get(pin).copied().flatten(),
        }
    }

    pub fn float(&self, pin: usize) -> f32 {
        self.value(pin).and_then(|v| v.as_float()).unwrap_or(0.0)
    }

    pub fn int(&self, pin: usize) -> i32 {
        self.value(pin).and_then(|v| v.as_int()).unwrap_or(0)
    }

    pub fn bool(&self, pin: usize) -> bool {
        self.value(pin).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn enum_index(&self, pin: usize) -> u32 {
        self.value(pin).and_then(|v| v.as_enum()).unwrap_or(0)
    }
}

/// Mutable view of a node's own output buffers for one block.
pub struct Outputs<'a> {
    buffers: &'a mut [PinBuffer],
    frames: usize,
}

impl<'a> Outputs<'a> {
    pub(crate) fn new(buffers: &'a mut [PinBuffer], frames: usize) -> Self {
        Self { buffers, frames }
    }

    /// Number of frames to write.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Audio buffer of an output, trimmed to the block length.
    ///
    /// Returns an empty slice if the pin is not an audio output.
    pub fn audio_mut(&mut self, pin: usize) -> &mut [f32] {
        match self.buffers.get_mut(pin) {
            Some(PinBuffer::Audio(samples)) => &mut samples[..self.frames],
            _ => &mut [],
        }
    }

    /// Fires a trigger output at a frame offset within this block.
    pub fn fire(&mut self, pin: usize, frame: usize) {
        if let Some(PinBuffer::Trigger(trigger)) = self.buffers.get_mut(pin) {
            trigger.fire(frame.min(self.frames.saturating_sub(1)));
        }
    }

    /// Writes a scalar output. Values of the wrong kind are ignored.
    pub fn set(&mut self, pin: usize, value: PinValue) {
        if let Some(PinBuffer::Value(current)) = self.buffers.get_mut(pin) {
            if current.kind() == value.kind() {
                *current = value;
            }
        }
    }

    pub fn set_float(&mut self, pin: usize, value: f32) {
        self.set(pin, PinValue::Float(value));
    }

    pub fn set_int(&mut self, pin: usize, value: i32) {
        self.set(pin, PinValue::Int(value));
    }

    pub fn set_bool(&mut self, pin: usize, value: bool) {
        self.set(pin, PinValue::Bool(value));
    }

    pub fn set_enum(&mut self, pin: usize, value: u32) {
        self.set(pin, PinValue::Enum(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::pin::PinDefinition;

    #[test]
    fn test_trigger_keeps_earliest_frame() {
        let mut t = Trigger::IDLE;
        assert!(!t.is_fired());
        t.fire(40);
        t.fire(12);
        t.fire(90);
        assert_eq!(t.frame(), Some(12));
        t.clear();
        assert_eq!(t, Trigger::IDLE);
    }

    #[test]
    fn test_buffer_for_kind() {
        match PinBuffer::for_kind(PinKind::Audio, 64) {
            PinBuffer::Audio(samples) => assert_eq!(samples.len(), 64),
            other => panic!("unexpected buffer {:?}", other),
        }
        assert_eq!(
            PinBuffer::for_kind(PinKind::Bool, 64),
            PinBuffer::Value(PinValue::Bool(false))
        );
    }

    #[test]
    fn test_silence_resets_contents() {
        let mut audio = PinBuffer::Audio(vec![0.5; 4].into_boxed_slice());
        audio.silence();
        assert_eq!(audio, PinBuffer::Audio(vec![0.0; 4].into_boxed_slice()));

        let mut value = PinBuffer::Value(PinValue::Int(7));
        value.silence();
        assert_eq!(value, PinBuffer::Value(PinValue::Int(0)));
    }

    #[test]
    fn test_unconnected_inputs_read_defaults() {
        let iface = VertexInterface::new(
            vec![
                PinDefinition::audio_input("In", "audio"),
                PinDefinition::float_input("Level", "level", 0.25),
                PinDefinition::trigger_input("Go", "go"),
            ],
            vec![],
        );
        let mut state = InputState::new(&iface);
        let silence = [0.0f32; 8];
        let bindings = [InputBinding::Unbound; 3];
        let slots: Vec<Option<Box<NodeSlot>>> = Vec::new();

        {
            let inputs = Inputs::new(&bindings, &slots, &state, &silence);
            assert_eq!(inputs.audio(0), &silence[..]);
            assert_eq!(inputs.float(1), 0.25);
            assert!(!inputs.trigger(2).is_fired());
        }

        assert!(state.set_literal(1, PinValue::Float(0.75)));
        assert!(!state.set_literal(1, PinValue::Bool(true)));
        state.latch(2, 3);
        let inputs = Inputs::new(&bindings, &slots, &state, &silence);
        assert_eq!(inputs.float(1), 0.75);
        assert_eq!(inputs.trigger(2).frame(), Some(3));
    }

    #[test]
    fn test_outputs_write_by_kind() {
        let mut buffers = vec![
            PinBuffer::for_kind(PinKind::Audio, 16),
            PinBuffer::for_kind(PinKind::Trigger, 16),
            PinBuffer::for_kind(PinKind::Float, 16),
        ];
        let mut outputs = Outputs::new(&mut buffers, 8);
        assert_eq!(outputs.audio_mut(0).len(), 8);
        assert!(outputs.audio_mut(1).is_empty());
        outputs.fire(1, 100);
        outputs.set_float(2, 2.0);
        outputs.set_bool(2, true);

        assert_eq!(buffers[1], PinBuffer::Trigger(Trigger::at(7)));
        assert_eq!(buffers[2], PinBuffer::Value(PinValue::Float(2.0)));
    }
}
