//! Three-valued logic built from one VALUE bit and one DEFINED bit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single simulated bit as seen through both bit-planes.
///
/// - `Zero`: VALUE=0, DEFINED=1
/// - `One`: VALUE=1, DEFINED=1
/// - `Undefined`: DEFINED=0, whatever the VALUE plane holds
///
/// The operators are conservative: any undefined operand makes the result
/// undefined, even where a dominating operand would decide it (`0 & X` is
/// `X`). This matches how the simulator's combinational nodes treat
/// undefined input bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Known low.
    Zero = 0,
    /// Known high.
    One = 1,
    /// Value not known.
    Undefined = 2,
}

impl Logic {
    /// Builds a logic value from its VALUE and DEFINED plane bits.
    pub fn from_planes(value: bool, defined: bool) -> Self {
        match (value, defined) {
            (_, false) => Logic::Undefined,
            (false, true) => Logic::Zero,
            (true, true) => Logic::One,
        }
    }

    /// Returns the `(VALUE, DEFINED)` plane bits. Undefined maps to VALUE=0.
    pub fn to_planes(self) -> (bool, bool) {
        match self {
            Logic::Zero => (false, true),
            Logic::One => (true, true),
            Logic::Undefined => (false, false),
        }
    }

    /// Converts a boolean into a defined logic value.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Returns the boolean level if the value is defined.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::Undefined => None,
        }
    }

    /// Returns true unless the value is [`Logic::Undefined`].
    pub fn is_defined(self) -> bool {
        self != Logic::Undefined
    }

    /// Parses `'0'`, `'1'` and `'x'`/`'X'`/`'u'`/`'U'`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' | 'u' | 'U' => Some(Logic::Undefined),
            _ => None,
        }
    }

    fn combine(self, rhs: Self, op: impl Fn(bool, bool) -> bool) -> Self {
        match (self.to_bool(), rhs.to_bool()) {
            (Some(a), Some(b)) => Logic::from_bool(op(a, b)),
            _ => Logic::Undefined,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Zero => write!(f, "0"),
            Logic::One => write!(f, "1"),
            Logic::Undefined => write!(f, "X"),
        }
    }
}

impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.combine(rhs, |a, b| a & b)
    }
}

impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.combine(rhs, |a, b| a | b)
    }
}

impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        self.combine(rhs, |a, b| a ^ b)
    }
}

impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Logic::Zero => Logic::One,
            Logic::One => Logic::Zero,
            Logic::Undefined => Logic::Undefined,
        }
    }
}
