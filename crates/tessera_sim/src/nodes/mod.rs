//! Built-in behaviors for every [`NodeKind`].
//!
//! All of them follow the conservative rule for undefined bits: an output bit
//! is defined only if every input bit that could influence it is defined.

mod arith;
mod compare;
mod logic;
mod memory;
mod mux;
mod pins;
mod register;
mod rewire;

pub use arith::Arithmetic;
pub use compare::Comparator;
pub use logic::LogicGate;
pub use memory::Memory;
pub use mux::Multiplexer;
pub use pins::{ConstantDriver, Forward, InputPin, OutputPin};
pub use register::Register;
pub use rewire::Rewire;

use crate::behavior::NodeBehavior;
use tessera_ir::{Circuit, MemoryInput, NodeId, NodeKind, RegisterInput};

/// Builds the behavior of one node from its kind, its connectivity and the
/// reset policy of the clock bound to it.
pub fn behavior_for(circuit: &Circuit, id: NodeId) -> Box<dyn NodeBehavior> {
    let node = circuit.node(id);
    let reset_policy = node
        .clock(0)
        .map(|clock| circuit.clock(clock).reset)
        .unwrap_or_default();
    match &node.kind {
        NodeKind::Input { initial, .. } => Box::new(InputPin::new(initial.clone())),
        NodeKind::Output { .. } => Box::new(OutputPin),
        NodeKind::Constant { value, .. } => Box::new(ConstantDriver::new(value.clone())),
        NodeKind::Signal { .. } => Box::new(Forward),
        NodeKind::Logic { op, .. } => Box::new(LogicGate::new(*op)),
        NodeKind::Arithmetic { op, .. } => Box::new(Arithmetic::new(*op)),
        NodeKind::Compare { op, .. } => Box::new(Comparator::new(*op)),
        NodeKind::Multiplexer { .. } => Box::new(Multiplexer),
        NodeKind::Rewire { sources, .. } => Box::new(Rewire::new(sources.clone())),
        NodeKind::Register { width, reset_value } => Box::new(Register::new(
            *width as usize,
            reset_value.clone(),
            reset_policy,
            node.driver(RegisterInput::Enable.index()).is_some(),
            node.driver(RegisterInput::Reset.index()).is_some(),
        )),
        NodeKind::Memory(cfg) => Box::new(Memory::new(
            cfg.clone(),
            node.driver(MemoryInput::WriteEnable.index()).is_some(),
        )),
    }
}
