//! N-way multiplexer.

use crate::behavior::{NodeBehavior, Slot};
use tessera_common::BitState;

/// Selects data input `sel` (port `sel + 1`).
///
/// An undefined selector makes the whole output undefined, even where every
/// data input agrees. A selector past the last data input does the same.
pub struct Multiplexer;

impl NodeBehavior for Multiplexer {
    fn reset(&self, state: &mut BitState, _internal: &[Slot], outputs: &[Slot]) {
        outputs[0].set_undefined(state);
    }

    fn evaluate(&self, state: &mut BitState, _internal: &[Slot], inputs: &[Slot], outputs: &[Slot]) {
        let (select, data) = (inputs[0], &inputs[1..]);
        let chosen = select
            .read_u64(state)
            .and_then(|sel| usize::try_from(sel).ok())
            .and_then(|sel| data.get(sel));
        match chosen {
            Some(src) => outputs[0].copy_from(state, *src),
            None => outputs[0].set_undefined(state),
        }
    }
}
