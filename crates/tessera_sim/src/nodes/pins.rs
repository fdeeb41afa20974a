//! Sources, sinks and plain wires.

use crate::behavior::{NodeBehavior, OutputTiming, Slot};
use tessera_common::BitState;

/// A value driven by the testbench.
///
/// Reset restores the power-on value; evaluate leaves whatever was poked.
pub struct InputPin {
    initial: Option<BitState>,
}

impl InputPin {
    /// Creates a pin with an optional power-on value.
    pub fn new(initial: Option<BitState>) -> Self {
        Self { initial }
    }
}

impl NodeBehavior for InputPin {
    fn output_timing(&self) -> OutputTiming {
        OutputTiming::Registered
    }

    fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
        match &self.initial {
            Some(value) => outputs[0].write(state, value),
            None => outputs[0].set_undefined(state),
        }
    }

    fn evaluate(&self, _state: &mut BitState, _internal: &[Slot], _inputs: &[Slot], _outputs: &[Slot]) {}
}

/// A named observation point. Its input already shares the driver's storage.
pub struct OutputPin;

impl NodeBehavior for OutputPin {
    fn reset(&self, _state: &mut BitState, _internal: &[Slot], _outputs: &[Slot]) {}

    fn evaluate(&self, _state: &mut BitState, _internal: &[Slot], _inputs: &[Slot], _outputs: &[Slot]) {}
}

/// A fixed value, written once at reset.
pub struct ConstantDriver {
    value: BitState,
}

impl ConstantDriver {
    /// Drives `value`.
    pub fn new(value: BitState) -> Self {
        Self { value }
    }
}

impl NodeBehavior for ConstantDriver {
    fn output_timing(&self) -> OutputTiming {
        OutputTiming::Registered
    }

    fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
        outputs[0].write(state, &self.value);
    }

    fn evaluate(&self, _state: &mut BitState, _internal: &[Slot], _inputs: &[Slot], _outputs: &[Slot]) {}
}

/// Forwards input 0 to output 0.
///
/// The allocator normally places the output on the driver's storage, leaving
/// nothing to do; the copy only runs when the two were laid out apart.
pub struct Forward;

impl NodeBehavior for Forward {
    fn forwarded_input(&self, output: u32) -> Option<u32> {
        (output == 0).then_some(0)
    }

    fn reset(&self, _state: &mut BitState, _internal: &[Slot], _outputs: &[Slot]) {}

    fn evaluate(&self, state: &mut BitState, _internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        outputs[0].copy_from(state, inputs[0]);
    }
}
