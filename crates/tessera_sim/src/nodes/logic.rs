//! Bitwise logic gates.

use crate::behavior::{NodeBehavior, Slot};
use tessera_common::bit_state::chunks;
use tessera_common::BitState;
use tessera_ir::LogicOp;

/// Bitwise gate. Each output bit is defined iff the operand bits in the same
/// position are.
pub struct LogicGate {
    op: LogicOp,
}

impl LogicGate {
    /// Creates a gate.
    pub fn new(op: LogicOp) -> Self {
        Self { op }
    }

    fn apply(&self, a: u64, b: u64) -> u64 {
        match self.op {
            LogicOp::And => a & b,
            LogicOp::Nand => !(a & b),
            LogicOp::Or => a | b,
            LogicOp::Nor => !(a | b),
            LogicOp::Xor => a ^ b,
            LogicOp::Xnor => !(a ^ b),
            LogicOp::Not => !a,
        }
    }
}

impl NodeBehavior for LogicGate {
    fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
        outputs[0].set_undefined(state);
    }

    fn evaluate(&self, state: &mut BitState, _internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        let out = outputs[0];
        for (at, n) in chunks(out.width) {
            let (av, ad) = inputs[0].get_pair(state, at, n);
            let (bv, bd) = match inputs.get(1) {
                Some(b) => b.get_pair(state, at, n),
                None => (0, u64::MAX),
            };
            let defined = ad & bd;
            out.set_pair(state, at, n, (self.apply(av, bv), defined));
        }
    }
}
