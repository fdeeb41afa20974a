//! Shape descriptors for node outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the bits of a connection are meant to be read.
///
/// The simulator itself only moves bits; the interpretation matters to node
/// kinds that check their operands and to tools that display values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Interpretation {
    /// Plain bit vector.
    Raw,
    /// Single-bit truth value.
    Bool,
    /// Unsigned binary integer.
    Unsigned,
    /// Two's complement integer.
    Signed,
    /// Deliberately carries no bits.
    Unconnected,
}

/// Width and interpretation of one node output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ConnectionType {
    /// How the bits are read.
    pub interpretation: Interpretation,
    /// Number of bits.
    pub width: u32,
}

impl ConnectionType {
    /// A raw bit vector of `width` bits.
    pub fn raw(width: u32) -> Self {
        Self::new(Interpretation::Raw, width)
    }

    /// A single-bit boolean.
    pub fn bool() -> Self {
        Self::new(Interpretation::Bool, 1)
    }

    /// An unsigned integer of `width` bits.
    pub fn unsigned(width: u32) -> Self {
        Self::new(Interpretation::Unsigned, width)
    }

    /// A signed integer of `width` bits.
    pub fn signed(width: u32) -> Self {
        Self::new(Interpretation::Signed, width)
    }

    /// A zero-width placeholder output.
    pub fn unconnected() -> Self {
        Self::new(Interpretation::Unconnected, 0)
    }

    fn new(interpretation: Interpretation, width: u32) -> Self {
        Self {
            interpretation,
            width,
        }
    }

    /// Returns true unless this is an explicitly unconnected output.
    pub fn is_connected(&self) -> bool {
        self.interpretation != Interpretation::Unconnected
    }

    /// Checks the width against the interpretation. Returns a reason on
    /// failure.
    pub fn check(&self) -> Result<(), String> {
        match self.interpretation {
            Interpretation::Unconnected if self.width != 0 => {
                Err(format!("unconnected output declares {} bits", self.width))
            }
            Interpretation::Unconnected => Ok(()),
            Interpretation::Bool if self.width != 1 => {
                Err(format!("boolean output must be 1 bit, not {}", self.width))
            }
            _ if self.width == 0 => Err("zero-width output".to_string()),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.interpretation {
            Interpretation::Raw => write!(f, "Bits({})", self.width),
            Interpretation::Bool => write!(f, "Bool"),
            Interpretation::Unsigned => write!(f, "UInt({})", self.width),
            Interpretation::Signed => write!(f, "SInt({})", self.width),
            Interpretation::Unconnected => write!(f, "Unconnected"),
        }
    }
}
