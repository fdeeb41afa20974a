//! Equality and ordering comparisons.

use crate::behavior::{NodeBehavior, Slot};
use std::cmp::Ordering;
use tessera_common::bit_state::chunks;
use tessera_common::{BitState, Plane};
use tessera_ir::CompareOp;

/// Unsigned comparison producing one bit.
pub struct Comparator {
    op: CompareOp,
}

impl Comparator {
    /// Creates a comparator.
    pub fn new(op: CompareOp) -> Self {
        Self { op }
    }
}

/// Compares two equal-width slots as unsigned integers, most significant
/// chunk first.
fn compare_unsigned(state: &BitState, a: Slot, b: Slot) -> Ordering {
    let all: Vec<_> = chunks(a.width).collect();
    for &(at, n) in all.iter().rev() {
        let x = a.get(state, Plane::Value, at, n);
        let y = b.get(state, Plane::Value, at, n);
        if x != y {
            return x.cmp(&y);
        }
    }
    Ordering::Equal
}

impl NodeBehavior for Comparator {
    fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
        outputs[0].set_undefined(state);
    }

    fn evaluate(&self, state: &mut BitState, _internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        let (a, b) = (inputs[0], inputs[1]);
        if !a.all_defined(state) || !b.all_defined(state) {
            outputs[0].set_undefined(state);
            return;
        }
        let ord = compare_unsigned(state, a, b);
        let result = match self.op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Neq => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Leq => ord != Ordering::Greater,
            CompareOp::Geq => ord != Ordering::Less,
        };
        outputs[0].set_pair(state, 0, 1, (result as u64, 1));
    }
}
