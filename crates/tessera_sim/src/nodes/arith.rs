//! Add, subtract and multiply nodes.

use crate::behavior::{NodeBehavior, Slot};
use tessera_common::bit_state::chunks;
use tessera_common::{bit_mask, BitState, Plane};
use tessera_ir::ArithOp;

/// Wrapping integer arithmetic.
///
/// Carries let any input bit influence every higher output bit, so a single
/// undefined operand bit makes the whole result undefined.
pub struct Arithmetic {
    op: ArithOp,
}

impl Arithmetic {
    /// Creates an arithmetic unit.
    pub fn new(op: ArithOp) -> Self {
        Self { op }
    }
}

impl NodeBehavior for Arithmetic {
    fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
        outputs[0].set_undefined(state);
    }

    fn evaluate(&self, state: &mut BitState, _internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        let (a, b, out) = (inputs[0], inputs[1], outputs[0]);
        if !a.all_defined(state) || !b.all_defined(state) {
            out.set_undefined(state);
            return;
        }
        match self.op {
            ArithOp::Add | ArithOp::Sub => {
                let subtract = self.op == ArithOp::Sub;
                // a - b == a + !b + 1
                let mut carry = subtract as u64;
                for (at, n) in chunks(out.width) {
                    let x = a.get(state, Plane::Value, at, n);
                    let mut y = b.get(state, Plane::Value, at, n);
                    if subtract {
                        y = !y & bit_mask(n);
                    }
                    let (sum, c1) = x.overflowing_add(y);
                    let (sum, c2) = sum.overflowing_add(carry);
                    carry = if n == 64 {
                        (c1 | c2) as u64
                    } else {
                        sum >> n
                    };
                    out.set_pair(state, at, n, (sum & bit_mask(n), bit_mask(n)));
                }
            }
            ArithOp::Mul => {
                let n = out.width;
                let x = a.get(state, Plane::Value, 0, n);
                let y = b.get(state, Plane::Value, 0, n);
                out.set_pair(state, 0, n, (x.wrapping_mul(y) & bit_mask(n), bit_mask(n)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::bench::Bench;

    fn run(op: ArithOp, a: &BitState, b: &BitState) -> BitState {
        let unit = Arithmetic::new(op);
        let w = a.len();
        let mut bench = Bench::new(&unit, &[w, w], &[w]);
        bench.inputs[0].write(&mut bench.state, a);
        bench.inputs[1].write(&mut bench.state, b);
        bench.eval(&unit);
        bench.outputs[0].read(&bench.state)
    }

    fn u(v: u64, w: usize) -> BitState {
        BitState::from_u64(v, w)
    }

    #[test]
    fn narrow_add_sub_mul_wrap() {
        assert_eq!(run(ArithOp::Add, &u(200, 8), &u(100, 8)).to_u64(), Some(44));
        assert_eq!(run(ArithOp::Sub, &u(3, 8), &u(5, 8)).to_u64(), Some(254));
        assert_eq!(run(ArithOp::Mul, &u(16, 8), &u(17, 8)).to_u64(), Some(16));
        assert_eq!(run(ArithOp::Add, &u(u64::MAX, 64), &u(2, 64)).to_u64(), Some(1));
    }

    #[test]
    fn carry_crosses_words() {
        let mut a = BitState::with_len(100);
        a.fill(0, 100, tessera_common::Logic::Zero);
        a.fill(0, 64, tessera_common::Logic::One);
        let sum = run(ArithOp::Add, &a, &u(1, 100));
        // 2^64 - 1 + 1 = 2^64
        assert_eq!(sum.extract(Plane::Value, 0, 64), 0);
        assert_eq!(sum.extract(Plane::Value, 64, 36), 1);
        assert!(sum.is_fully_defined());

        let diff = run(ArithOp::Sub, &u(0, 100), &u(1, 100));
        assert_eq!(diff.to_string(), "1".repeat(100));
    }

    #[test]
    fn any_undefined_bit_poisons_result() {
        let a = BitState::from_binary_str("0000000X").unwrap();
        let out = run(ArithOp::Add, &a, &u(0, 8));
        assert_eq!(out.to_string(), "XXXXXXXX");
        let out = run(ArithOp::Mul, &u(0, 8), &a);
        assert!(out.is_fully_undefined());
    }
}
