//! Vertex interfaces: the typed pin contract of a node type.

use std::collections::HashSet;

use super::pin::{PinDefinition, PinDirection};

/// Ordered input and output pins of a node type.
///
/// Owned by the node type's descriptor and shared read-only across every
/// instance of that type. Pin order fixes the indices nodes use in `process`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct VertexInterface {
    inputs: Vec<PinDefinition>,
    outputs: Vec<PinDefinition>,
}

impl VertexInterface {
    /// Creates an interface from input and output pin lists.
    ///
    /// The interface is checked when it is registered, see [`validate`](Self::validate).
    pub fn new(inputs: Vec<PinDefinition>, outputs: Vec<PinDefinition>) -> Self {
        Self { inputs, outputs }
    }

    /// Input pins in declaration order.
    pub fn inputs(&self) -> &[PinDefinition] {
        &self.inputs
    }

    /// Output pins in declaration order.
    pub fn outputs(&self) -> &[PinDefinition] {
        &self.outputs
    }

    /// Index of the input pin with this name.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|pin| pin.name == name)
    }

    /// Index of the output pin with this name.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|pin| pin.name == name)
    }

    /// Looks up a pin by direction and name.
    pub fn pin(&self, direction: PinDirection, name: &str) -> Option<(usize, &PinDefinition)> {
        let pins = match direction {
            PinDirection::Input => &self.inputs,
            PinDirection::Output => &self.outputs,
        };
        pins.iter().enumerate().find(|(_, pin)| pin.name == name)
    }

    /// Checks pin names, directions and defaults.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for (pins, direction) in [
            (&self.inputs, PinDirection::Input),
            (&self.outputs, PinDirection::Output),
        ] {
            let mut seen = HashSet::new();
            for pin in pins {
                if pin.direction != direction {
                    return Err(format!(
                        "pin '{}' is declared as {} but listed with {}s",
                        pin.name, pin.direction, direction
                    ));
                }
                if pin.name.is_empty() {
                    return Err("pin names cannot be empty".to_string());
                }
                if !seen.insert(pin.name) {
                    return Err(format!("duplicate {} pin '{}'", direction, pin.name));
                }
                pin.check_default()?;
            }
        }
        Ok(())
    }
}
