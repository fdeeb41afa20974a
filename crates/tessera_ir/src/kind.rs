//! Node kinds and their port layouts.
//!
//! Port indices are dense `u32`s. Kinds with named ports expose them through
//! small enums ([`RegisterInput`], [`MemoryInput`]) so callers never hard-code
//! magic numbers.

use crate::connection::{ConnectionType, Interpretation};
use serde::{Deserialize, Serialize};
use tessera_common::BitState;

/// Bitwise logic operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum LogicOp {
    /// `a & b`
    And,
    /// `!(a & b)`
    Nand,
    /// `a | b`
    Or,
    /// `!(a | b)`
    Nor,
    /// `a ^ b`
    Xor,
    /// `!(a ^ b)`
    Xnor,
    /// `!a`, the only unary operation.
    Not,
}

impl LogicOp {
    /// Number of operands.
    pub fn arity(self) -> u32 {
        if self == LogicOp::Not {
            1
        } else {
            2
        }
    }
}

/// Modular integer arithmetic on equal-width operands.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ArithOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication, limited to 64-bit operands.
    Mul,
}

/// Unsigned comparisons producing a boolean.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum CompareOp {
    /// `a == b`
    Eq,
    /// `a != b`
    Neq,
    /// `a < b`
    Lt,
    /// `a > b`
    Gt,
    /// `a <= b`
    Leq,
    /// `a >= b`
    Geq,
}

/// Inputs of a [`NodeKind::Register`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u32)]
pub enum RegisterInput {
    /// Value latched on the next active edge.
    Data = 0,
    /// Latch enable; an unconnected enable means always enabled.
    Enable = 1,
    /// Reset request, interpreted through the clock's reset policy.
    Reset = 2,
}

impl RegisterInput {
    /// Number of register inputs.
    pub const COUNT: u32 = 3;

    /// The port index of this input.
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Inputs of a [`NodeKind::Memory`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u32)]
pub enum MemoryInput {
    /// Write enable, 1 bit.
    WriteEnable = 0,
    /// Write address.
    WriteAddress = 1,
    /// Data written on the active edge.
    WriteData = 2,
    /// Read address.
    ReadAddress = 3,
}

impl MemoryInput {
    /// Number of memory inputs.
    pub const COUNT: u32 = 4;

    /// The port index of this input.
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// When a memory read becomes visible.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum ReadLatency {
    /// The read port follows the read address combinationally.
    #[default]
    Asynchronous,
    /// The read value is latched and appears after the active edge.
    Synchronous,
}

/// Shape and contents of a memory.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of words.
    pub depth: u32,
    /// Bits per word.
    pub width: u32,
    /// Bits of both address ports.
    pub address_width: u32,
    /// Read port latency.
    pub read: ReadLatency,
    /// Power-on contents, word 0 at bit 0. Undefined when absent.
    pub initial: Option<BitState>,
}

impl MemoryConfig {
    /// An asynchronous-read memory with the narrowest address that reaches
    /// every word.
    pub fn new(depth: u32, width: u32) -> Self {
        let address_width = (u32::BITS - depth.saturating_sub(1).leading_zeros()).max(1);
        Self {
            depth,
            width,
            address_width,
            read: ReadLatency::Asynchronous,
            initial: None,
        }
    }

    /// Sets the read latency.
    pub fn with_read(mut self, read: ReadLatency) -> Self {
        self.read = read;
        self
    }

    /// Sets the power-on contents.
    pub fn with_initial(mut self, initial: BitState) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Total number of storage bits.
    pub fn bits(&self) -> usize {
        self.depth as usize * self.width as usize
    }
}

/// One piece of a [`NodeKind::Rewire`] output, least significant first.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum RewireSource {
    /// `width` bits of input `input` starting at bit `offset`.
    Input {
        /// Input index.
        input: u32,
        /// First bit taken.
        offset: u32,
        /// Number of bits taken.
        width: u32,
    },
    /// Fixed bits, e.g. zero extension.
    Constant(BitState),
}

impl RewireSource {
    /// Number of output bits this piece produces.
    pub fn width(&self) -> u32 {
        match self {
            RewireSource::Input { width, .. } => *width,
            RewireSource::Constant(bits) => bits.len() as u32,
        }
    }
}

/// What a node does.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    /// Value poked by the testbench.
    Input {
        /// Output shape.
        ty: ConnectionType,
        /// Power-on value; undefined when absent.
        initial: Option<BitState>,
    },
    /// Named observation point with a single input.
    Output {
        /// Input width.
        width: u32,
    },
    /// Fixed value, possibly with undefined bits.
    Constant {
        /// The value driven.
        value: BitState,
        /// How the value is read.
        interpretation: Interpretation,
    },
    /// Pure forwarding of its single input.
    Signal {
        /// Shape of both input and output.
        ty: ConnectionType,
    },
    /// Bitwise logic.
    Logic {
        /// Operation.
        op: LogicOp,
        /// Operand and result width.
        width: u32,
    },
    /// Integer arithmetic.
    Arithmetic {
        /// Operation.
        op: ArithOp,
        /// Operand and result width.
        width: u32,
    },
    /// Unsigned comparison.
    Compare {
        /// Operation.
        op: CompareOp,
        /// Operand width.
        width: u32,
    },
    /// Selects one of `inputs` data inputs. Input 0 is the selector, data
    /// input `i` is port `i + 1`.
    Multiplexer {
        /// Data and output width.
        width: u32,
        /// Selector width.
        select_width: u32,
        /// Number of data inputs.
        inputs: u32,
    },
    /// Bit slicing and concatenation.
    Rewire {
        /// Width of each input.
        inputs: Vec<u32>,
        /// Output pieces, least significant first.
        sources: Vec<RewireSource>,
    },
    /// Clocked register with optional enable and reset.
    Register {
        /// Data width.
        width: u32,
        /// Value loaded on reset.
        reset_value: Option<BitState>,
    },
    /// Word-addressed memory with one write and one read port.
    Memory(MemoryConfig),
}

impl NodeKind {
    /// Short name of the kind, for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Input { .. } => "input",
            NodeKind::Output { .. } => "output",
            NodeKind::Constant { .. } => "constant",
            NodeKind::Signal { .. } => "signal",
            NodeKind::Logic { .. } => "logic",
            NodeKind::Arithmetic { .. } => "arithmetic",
            NodeKind::Compare { .. } => "compare",
            NodeKind::Multiplexer { .. } => "multiplexer",
            NodeKind::Rewire { .. } => "rewire",
            NodeKind::Register { .. } => "register",
            NodeKind::Memory(_) => "memory",
        }
    }

    /// Number of input ports.
    pub fn input_count(&self) -> u32 {
        match self {
            NodeKind::Input { .. } | NodeKind::Constant { .. } => 0,
            NodeKind::Output { .. } | NodeKind::Signal { .. } => 1,
            NodeKind::Logic { op, .. } => op.arity(),
            NodeKind::Arithmetic { .. } | NodeKind::Compare { .. } => 2,
            NodeKind::Multiplexer { inputs, .. } => inputs + 1,
            NodeKind::Rewire { inputs, .. } => inputs.len() as u32,
            NodeKind::Register { .. } => RegisterInput::COUNT,
            NodeKind::Memory(_) => MemoryInput::COUNT,
        }
    }

    /// Shapes of the output ports, in port order.
    pub fn output_types(&self) -> Vec<ConnectionType> {
        match self {
            NodeKind::Input { ty, .. } | NodeKind::Signal { ty } => vec![*ty],
            NodeKind::Output { .. } => Vec::new(),
            NodeKind::Constant {
                value,
                interpretation,
            } => vec![ConnectionType {
                interpretation: *interpretation,
                width: value.len() as u32,
            }],
            NodeKind::Logic { width, .. }
            | NodeKind::Multiplexer { width, .. }
            | NodeKind::Register { width, .. } => vec![ConnectionType::raw(*width)],
            NodeKind::Arithmetic { width, .. } => vec![ConnectionType::unsigned(*width)],
            NodeKind::Compare { .. } => vec![ConnectionType::bool()],
            NodeKind::Rewire { sources, .. } => {
                vec![ConnectionType::raw(sources.iter().map(RewireSource::width).sum())]
            }
            NodeKind::Memory(cfg) => vec![ConnectionType::raw(cfg.width)],
        }
    }

    /// Number of clock ports.
    pub fn clock_ports(&self) -> u32 {
        match self {
            NodeKind::Register { .. } | NodeKind::Memory(_) => 1,
            _ => 0,
        }
    }

    /// Width a driver of `input` must have.
    ///
    /// # Panics
    ///
    /// Panics if `input` is not a port of this kind.
    pub fn input_width(&self, input: u32) -> u32 {
        assert!(
            input < self.input_count(),
            "{} node has no input {input}",
            self.name()
        );
        match self {
            NodeKind::Output { width }
            | NodeKind::Logic { width, .. }
            | NodeKind::Arithmetic { width, .. }
            | NodeKind::Compare { width, .. } => *width,
            NodeKind::Signal { ty } => ty.width,
            NodeKind::Multiplexer {
                width,
                select_width,
                ..
            } => {
                if input == 0 {
                    *select_width
                } else {
                    *width
                }
            }
            NodeKind::Rewire { inputs, .. } => inputs[input as usize],
            NodeKind::Register { width, .. } => {
                if input == RegisterInput::Data.index() {
                    *width
                } else {
                    1
                }
            }
            NodeKind::Memory(cfg) => match input {
                0 => 1,
                1 | 3 => cfg.address_width,
                _ => cfg.width,
            },
            NodeKind::Input { .. } | NodeKind::Constant { .. } => 0,
        }
    }

    /// Returns true if `input` may be left without a driver.
    ///
    /// Register enable and reset are optional. A memory with no write enable
    /// driver never writes, so its whole write port may be left open.
    pub fn is_optional_input(&self, input: u32) -> bool {
        match self {
            NodeKind::Register { .. } => input != RegisterInput::Data.index(),
            NodeKind::Memory(_) => input != MemoryInput::ReadAddress.index(),
            _ => false,
        }
    }

    /// Checks the kind's own parameters. Returns a reason on failure.
    pub fn check(&self) -> Result<(), String> {
        match self {
            NodeKind::Input { ty, initial } => {
                ty.check()?;
                if !ty.is_connected() {
                    return Err("input must carry bits".to_string());
                }
                check_len("initial value", initial.as_ref(), ty.width as usize)
            }
            NodeKind::Output { width } => nonzero("width", *width),
            NodeKind::Constant {
                value,
                interpretation,
            } => ConnectionType {
                interpretation: *interpretation,
                width: value.len() as u32,
            }
            .check(),
            NodeKind::Signal { ty } => {
                ty.check()?;
                if !ty.is_connected() {
                    return Err("signal must carry bits".to_string());
                }
                Ok(())
            }
            NodeKind::Logic { width, .. } | NodeKind::Compare { width, .. } => {
                nonzero("width", *width)
            }
            NodeKind::Arithmetic { op, width } => {
                nonzero("width", *width)?;
                if *op == ArithOp::Mul && *width > 64 {
                    return Err(format!("multiplication limited to 64 bits, got {width}"));
                }
                Ok(())
            }
            NodeKind::Multiplexer {
                width,
                select_width,
                inputs,
            } => {
                nonzero("width", *width)?;
                nonzero("data input count", *inputs)?;
                if *select_width == 0 || *select_width > 32 {
                    return Err(format!("selector width {select_width} not in 1..=32"));
                }
                if *select_width < 32 && *inputs > 1u32 << select_width {
                    return Err(format!(
                        "{inputs} data inputs cannot be addressed by {select_width} selector bits"
                    ));
                }
                Ok(())
            }
            NodeKind::Rewire { inputs, sources } => {
                for (i, &w) in inputs.iter().enumerate() {
                    if w == 0 {
                        return Err(format!("input {i} has zero width"));
                    }
                }
                for source in sources {
                    if let RewireSource::Input {
                        input,
                        offset,
                        width,
                    } = source
                    {
                        let available = inputs.get(*input as usize).ok_or_else(|| {
                            format!("source refers to missing input {input}")
                        })?;
                        if *width == 0 || offset.saturating_add(*width) > *available {
                            return Err(format!(
                                "source bits {offset}+{width} outside input {input} of {available} bits"
                            ));
                        }
                    }
                }
                let total: u32 = sources.iter().map(RewireSource::width).sum();
                nonzero("output width", total)
            }
            NodeKind::Register { width, reset_value } => {
                nonzero("width", *width)?;
                check_len("reset value", reset_value.as_ref(), *width as usize)
            }
            NodeKind::Memory(cfg) => {
                nonzero("depth", cfg.depth)?;
                nonzero("width", cfg.width)?;
                if cfg.address_width == 0 || cfg.address_width > 64 {
                    return Err(format!(
                        "address width {} not in 1..=64",
                        cfg.address_width
                    ));
                }
                check_len("initial contents", cfg.initial.as_ref(), cfg.bits())
            }
        }
    }
}

fn nonzero(what: &str, value: u32) -> Result<(), String> {
    if value == 0 {
        Err(format!("{what} must be non-zero"))
    } else {
        Ok(())
    }
}

fn check_len(what: &str, value: Option<&BitState>, expected: usize) -> Result<(), String> {
    match value {
        Some(v) if v.len() != expected => Err(format!(
            "{what} has {} bits, expected {expected}",
            v.len()
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_counts() {
        let reg = NodeKind::Register {
            width: 8,
            reset_value: None,
        };
        assert_eq!(reg.input_count(), 3);
        assert_eq!(reg.clock_ports(), 1);
        assert_eq!(reg.input_width(RegisterInput::Data.index()), 8);
        assert_eq!(reg.input_width(RegisterInput::Reset.index()), 1);
        assert!(reg.is_optional_input(RegisterInput::Enable.index()));
        assert!(!reg.is_optional_input(RegisterInput::Data.index()));

        let mux = NodeKind::Multiplexer {
            width: 4,
            select_width: 2,
            inputs: 3,
        };
        assert_eq!(mux.input_count(), 4);
        assert_eq!(mux.input_width(0), 2);
        assert_eq!(mux.input_width(3), 4);
        assert_eq!(mux.clock_ports(), 0);
    }

    #[test]
    fn output_shapes() {
        let cmp = NodeKind::Compare {
            op: CompareOp::Lt,
            width: 16,
        };
        assert_eq!(cmp.output_types(), vec![ConnectionType::bool()]);
        let rewire = NodeKind::Rewire {
            inputs: vec![8],
            sources: vec![
                RewireSource::Input {
                    input: 0,
                    offset: 4,
                    width: 4,
                },
                RewireSource::Constant(BitState::from_u64(0, 12)),
            ],
        };
        assert_eq!(rewire.output_types(), vec![ConnectionType::raw(16)]);
        assert!(NodeKind::Output { width: 1 }.output_types().is_empty());
    }

    #[test]
    fn memory_address_width() {
        assert_eq!(MemoryConfig::new(1, 8).address_width, 1);
        assert_eq!(MemoryConfig::new(2, 8).address_width, 1);
        assert_eq!(MemoryConfig::new(5, 8).address_width, 3);
        assert_eq!(MemoryConfig::new(256, 8).address_width, 8);
        assert_eq!(MemoryConfig::new(257, 8).address_width, 9);
    }

    #[test]
    fn parameter_checks() {
        assert!(NodeKind::Arithmetic {
            op: ArithOp::Mul,
            width: 65
        }
        .check()
        .is_err());
        assert!(NodeKind::Multiplexer {
            width: 1,
            select_width: 1,
            inputs: 3
        }
        .check()
        .is_err());
        let reg = NodeKind::Register {
            width: 4,
            reset_value: Some(BitState::from_u64(0, 3)),
        };
        assert_eq!(
            reg.check().unwrap_err(),
            "reset value has 3 bits, expected 4"
        );
        let rewire = NodeKind::Rewire {
            inputs: vec![4],
            sources: vec![RewireSource::Input {
                input: 0,
                offset: 2,
                width: 3,
            }],
        };
        assert!(rewire.check().is_err());
        assert!(NodeKind::Memory(MemoryConfig::new(4, 8)).check().is_ok());
    }

    #[test]
    #[should_panic(expected = "no input 2")]
    fn input_width_out_of_range() {
        NodeKind::Logic {
            op: LogicOp::Not,
            width: 1,
        }
        .input_width(2);
    }
}
