//! Pin definitions for node vertex interfaces.
//!
//! Pins are the typed connection points on nodes. Every pin carries a data
//! kind, a direction and, for inputs, an optional default used when nothing
//! is connected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of data carried by a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinKind {
    /// A block of audio samples.
    Audio,
    /// An edge-latched event, active for exactly one block.
    Trigger,
    /// A control-rate floating point value.
    Float,
    /// A control-rate integer value.
    Int,
    /// A control-rate boolean value.
    Bool,
    /// A control-rate enumeration index.
    Enum,
}

impl PinKind {
    /// Returns a human-readable name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            PinKind::Audio => "Audio",
            PinKind::Trigger => "Trigger",
            PinKind::Float => "Float",
            PinKind::Int => "Int",
            PinKind::Bool => "Bool",
            PinKind::Enum => "Enum",
        }
    }

    /// Returns true for kinds that hold a single value per block.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            PinKind::Float | PinKind::Int | PinKind::Bool | PinKind::Enum
        )
    }
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a pin on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinDirection {
    /// An input pin that receives data.
    Input,
    /// An output pin that produces data.
    Output,
}

impl PinDirection {
    /// Returns a human-readable name for the pin direction.
    pub fn name(&self) -> &'static str {
        match self {
            PinDirection::Input => "input",
            PinDirection::Output => "output",
        }
    }
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A control-rate value held by a scalar pin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PinValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Enum(u32),
}

impl PinValue {
    /// The pin kind this value belongs to.
    pub fn kind(&self) -> PinKind {
        match self {
            PinValue::Float(_) => PinKind::Float,
            PinValue::Int(_) => PinKind::Int,
            PinValue::Bool(_) => PinKind::Bool,
            PinValue::Enum(_) => PinKind::Enum,
        }
    }

    /// The zero value for a scalar kind, `None` for audio and trigger.
    pub fn zero(kind: PinKind) -> Option<Self> {
        match kind {
            PinKind::Float => Some(PinValue::Float(0.0)),
            PinKind::Int => Some(PinValue::Int(0)),
            PinKind::Bool => Some(PinValue::Bool(false)),
            PinKind::Enum => Some(PinValue::Enum(0)),
            PinKind::Audio | PinKind::Trigger => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            PinValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            PinValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PinValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<u32> {
        match *self {
            PinValue::Enum(v) => Some(v),
            _ => None,
        }
    }
}

/// What an input reads when nothing is connected to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PinDefault {
    /// Audio input reads a block of zeros.
    Silence,
    /// Trigger input never fires unless fired from the control thread.
    Idle,
    /// Scalar input reads this value.
    Value(PinValue),
}

/// Definition of a pin on a node type.
///
/// Pin names are unique per direction within a vertex interface and are the
/// handle used by the topology edit interface.
#[derive(Clone, Debug, PartialEq)]
pub struct PinDefinition {
    /// Name of the pin, unique among pins of the same direction.
    pub name: &'static str,
    /// Short description shown to graph authors.
    pub description: &'static str,
    /// Whether this is an input or output pin.
    pub direction: PinDirection,
    /// The kind of data this pin carries.
    pub kind: PinKind,
    /// Fallback for unconnected inputs. `None` marks a required input.
    /// Always `None` for outputs.
    pub default: Option<PinDefault>,
}

impl PinDefinition {
    /// Creates an audio input that reads silence when unconnected.
    pub fn audio_input(name: &'static str, description: &'static str) -> Self {
        Self::input(name, description, PinKind::Audio, Some(PinDefault::Silence))
    }

    /// Creates a trigger input that stays idle when unconnected.
    pub fn trigger_input(name: &'static str, description: &'static str) -> Self {
        Self::input(name, description, PinKind::Trigger, Some(PinDefault::Idle))
    }

    /// Creates a float input with a default value.
    pub fn float_input(name: &'static str, description: &'static str, default: f32) -> Self {
        Self::scalar_input(name, description, PinValue::Float(default))
    }

    /// Creates an integer input with a default value.
    pub fn int_input(name: &'static str, description: &'static str, default: i32) -> Self {
        Self::scalar_input(name, description, PinValue::Int(default))
    }

    /// Creates a boolean input with a default value.
    pub fn bool_input(name: &'static str, description: &'static str, default: bool) -> Self {
        Self::scalar_input(name, description, PinValue::Bool(default))
    }

    /// Creates an enum input with a default index.
    pub fn enum_input(name: &'static str, description: &'static str, default: u32) -> Self {
        Self::scalar_input(name, description, PinValue::Enum(default))
    }

    /// Creates an input that must be connected (or given a value) before the
    /// graph can be planned.
    pub fn required_input(name: &'static str, description: &'static str, kind: PinKind) -> Self {
        Self::input(name, description, kind, None)
    }

    /// Creates an output pin.
    pub fn output(name: &'static str, description: &'static str, kind: PinKind) -> Self {
        Self {
            name,
            description,
            direction: PinDirection::Output,
            kind,
            default: None,
        }
    }

    fn scalar_input(name: &'static str, description: &'static str, value: PinValue) -> Self {
        Self::input(name, description, value.kind(), Some(PinDefault::Value(value)))
    }

    fn input(
        name: &'static str,
        description: &'static str,
        kind: PinKind,
        default: Option<PinDefault>,
    ) -> Self {
        Self {
            name,
            description,
            direction: PinDirection::Input,
            kind,
            default,
        }
    }

    /// Returns true if this is an input pin.
    pub fn is_input(&self) -> bool {
        self.direction == PinDirection::Input
    }

    /// Returns true if this is an output pin.
    pub fn is_output(&self) -> bool {
        self.direction == PinDirection::Output
    }

    /// Returns true if an unconnected input has nothing to read.
    pub fn is_required(&self) -> bool {
        self.is_input() && self.default.is_none()
    }

    /// The value an unconnected scalar input starts with.
    pub fn default_value(&self) -> Option<PinValue> {
        match self.default {
            Some(PinDefault::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Checks that the default agrees with the pin kind and direction.
    pub(crate) fn check_default(&self) -> Result<(), String> {
        match (self.direction, self.kind, self.default) {
            (PinDirection::Output, _, None) => Ok(()),
            (PinDirection::Output, _, Some(_)) => {
                Err(format!("output '{}' cannot carry a default", self.name))
            }
            (PinDirection::Input, _, None) => Ok(()),
            (PinDirection::Input, PinKind::Audio, Some(PinDefault::Silence)) => Ok(()),
            (PinDirection::Input, PinKind::Trigger, Some(PinDefault::Idle)) => Ok(()),
            (PinDirection::Input, kind, Some(PinDefault::Value(value))) if value.kind() == kind => {
                Ok(())
            }
            (PinDirection::Input, kind, Some(default)) => Err(format!(
                "input '{}' of kind {} has incompatible default {:?}",
                self.name, kind, default
            )),
        }
    }
}
