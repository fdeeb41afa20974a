//! Slices, concatenations and extensions built from bit ranges.

use crate::behavior::{NodeBehavior, Slot};
use tessera_common::BitState;
use tessera_ir::RewireSource;

/// Assembles its output from input bit ranges and constants, least
/// significant piece first. Covers slicing, concatenation and extension.
pub struct Rewire {
    sources: Vec<RewireSource>,
}

impl Rewire {
    /// Creates a rewire node.
    pub fn new(sources: Vec<RewireSource>) -> Self {
        Self { sources }
    }
}

impl NodeBehavior for Rewire {
    fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
        outputs[0].set_undefined(state);
    }

    fn evaluate(&self, state: &mut BitState, _internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        let mut at = 0;
        for source in &self.sources {
            let width = source.width() as usize;
            let dst = outputs[0].sub(at, width);
            match source {
                RewireSource::Input { input, offset, .. } => {
                    let src = inputs[*input as usize].sub(*offset as usize, width);
                    dst.copy_from(state, src);
                }
                RewireSource::Constant(bits) => dst.write(state, bits),
            }
            at += width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::bench::Bench;

    #[test]
    fn slice_concat_and_extend() {
        // out = { 2'b00, b[3:0], a[7:6] }
        let rw = Rewire::new(vec![
            RewireSource::Input {
                input: 0,
                offset: 6,
                width: 2,
            },
            RewireSource::Input {
                input: 1,
                offset: 0,
                width: 4,
            },
            RewireSource::Constant(BitState::from_u64(0, 2)),
        ]);
        let mut b = Bench::new(&rw, &[8, 4], &[8]);
        b.poke(0, "10000000");
        b.poke(1, "X011");
        b.eval(&rw);
        assert_eq!(b.peek(0), "00X01110");
    }
}
