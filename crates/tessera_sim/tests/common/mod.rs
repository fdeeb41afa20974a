//! Circuit building blocks shared by the scenario tests.

#![allow(dead_code)]

use tessera_common::{BitState, Frequency};
use tessera_ir::{
    ArithOp, Circuit, ClockId, ClockSpec, ConnectionType, Interpretation, NodeId, NodeKind,
    RegisterInput,
};

pub fn mhz(n: u64) -> Frequency {
    Frequency::from_hz(n * 1_000_000)
}

pub fn input(c: &mut Circuit, name: &str, width: u32) -> NodeId {
    c.add_node(
        name,
        NodeKind::Input {
            ty: ConnectionType::unsigned(width),
            initial: None,
        },
    )
}

pub fn constant(c: &mut Circuit, name: &str, value: u64, width: u32) -> NodeId {
    c.add_node(
        name,
        NodeKind::Constant {
            value: BitState::from_u64(value, width as usize),
            interpretation: Interpretation::Unsigned,
        },
    )
}

/// A register clocked by `clk` with the given reset value. Only the clock is
/// wired.
pub fn register(c: &mut Circuit, name: &str, width: u32, reset: Option<u64>, clk: ClockId) -> NodeId {
    let q = c.add_node(
        name,
        NodeKind::Register {
            width,
            reset_value: reset.map(|v| BitState::from_u64(v, width as usize)),
        },
    );
    c.attach_clock(q, 0, clk).unwrap();
    q
}

/// `q <= q + 1`, reset to 0. Returns the register and the adder.
pub fn counter(c: &mut Circuit, name: &str, width: u32, clk: ClockId) -> (NodeId, NodeId) {
    let q = register(c, name, width, Some(0), clk);
    let one = constant(c, &format!("{name}_one"), 1, width);
    let inc = c.add_node(
        &format!("{name}_inc"),
        NodeKind::Arithmetic {
            op: ArithOp::Add,
            width,
        },
    );
    c.connect(q, inc, 0).unwrap();
    c.connect(one, inc, 1).unwrap();
    c.connect(inc, q, RegisterInput::Data.index()).unwrap();
    (q, inc)
}

pub fn clock(c: &mut Circuit, name: &str, frequency: Frequency) -> ClockId {
    c.add_clock(name, ClockSpec::new(frequency))
}

pub fn bits(s: &str) -> BitState {
    BitState::from_binary_str(s).unwrap()
}
