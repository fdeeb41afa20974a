//! Exact simulation time.
//!
//! Clock edges of unrelated frequencies rarely fall on a common integer
//! grid, so time is kept as an exact rational number of seconds. Two edges
//! compare equal only if they truly coincide.

use num::rational::Ratio;
use num::{CheckedMul, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tessera_common::frequency::parse_decimal;
use thiserror::Error;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u128 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u128 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u128 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u128 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u128 = 1_000_000_000_000_000;

/// A point in simulated time, in seconds since power-on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(Ratio<u128>);

impl SimTime {
    /// Power-on.
    pub fn zero() -> Self {
        Self(Ratio::zero())
    }

    /// An exact number of seconds.
    pub fn from_secs(secs: Ratio<u128>) -> Self {
        Self(secs)
    }

    /// A whole number of femtoseconds.
    pub fn from_fs(fs: u128) -> Self {
        Self(Ratio::new(fs, FS_PER_S))
    }

    /// A whole number of picoseconds.
    pub fn from_ps(ps: u64) -> Self {
        Self::from_fs(ps as u128 * FS_PER_PS)
    }

    /// A whole number of nanoseconds.
    pub fn from_ns(ns: u64) -> Self {
        Self::from_fs(ns as u128 * FS_PER_NS)
    }

    /// A whole number of microseconds.
    pub fn from_us(us: u64) -> Self {
        Self::from_fs(us as u128 * FS_PER_US)
    }

    /// The exact time in seconds.
    pub fn as_secs(&self) -> Ratio<u128> {
        self.0
    }

    /// The time in femtoseconds if it is a whole number of them.
    pub fn as_fs(&self) -> Option<u128> {
        let fs = self.0.checked_mul(&Ratio::from_integer(FS_PER_S))?;
        fs.is_integer().then(|| fs.to_integer())
    }

    /// The time in nanoseconds as a float, for display.
    pub fn as_ns_f64(&self) -> f64 {
        self.0.numer().to_f64().unwrap_or(f64::INFINITY) * 1e9
            / self.0.denom().to_f64().unwrap_or(f64::INFINITY)
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({self})")
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(fs) = self.as_fs() else {
            return write!(f, "{}/{} s", self.0.numer(), self.0.denom());
        };
        if fs == 0 {
            write!(f, "0 fs")
        } else if fs % FS_PER_S == 0 {
            write!(f, "{} s", fs / FS_PER_S)
        } else if fs % FS_PER_MS == 0 {
            write!(f, "{} ms", fs / FS_PER_MS)
        } else if fs % FS_PER_US == 0 {
            write!(f, "{} us", fs / FS_PER_US)
        } else if fs % FS_PER_NS == 0 {
            write!(f, "{} ns", fs / FS_PER_NS)
        } else if fs % FS_PER_PS == 0 {
            write!(f, "{} ps", fs / FS_PER_PS)
        } else {
            write!(f, "{fs} fs")
        }
    }
}

/// Error returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time: '{input}'")]
pub struct ParseTimeError {
    /// The rejected input.
    pub input: String,
}

const UNITS: [(&str, u128); 6] = [
    ("fs", 1),
    ("ps", FS_PER_PS),
    ("ns", FS_PER_NS),
    ("us", FS_PER_US),
    ("ms", FS_PER_MS),
    ("s", FS_PER_S),
];

impl FromStr for SimTime {
    type Err = ParseTimeError;

    /// Parses `"10us"`, `"2.5 ns"`, `"1s"`. A bare `"0"` is accepted; any
    /// other number needs a unit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseTimeError {
            input: s.to_string(),
        };
        if s == "0" {
            return Ok(Self::zero());
        }
        let lower = s.to_ascii_lowercase();
        let (number, fs_per_unit) = UNITS
            .iter()
            .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
            .ok_or_else(err)?;
        let value = parse_decimal(number.trim()).ok_or_else(err)?;
        let secs = value
            .checked_mul(&Ratio::new(fs_per_unit, FS_PER_S))
            .ok_or_else(err)?;
        Ok(Self(secs))
    }
}
