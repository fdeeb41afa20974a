//! Exact clock frequencies with unit parsing and display.

use num::rational::Ratio;
use num::{CheckedMul, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A positive clock frequency in Hertz, stored as an exact ratio.
///
/// Parses strings like `"50MHz"`, `"12.5 MHz"`, `"32768Hz"` and bare numbers
/// (Hertz). Keeping the value rational means derived clocks such as
/// `100MHz × 2 / 3` produce edge times without rounding drift.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Ratio<u64>", into = "Ratio<u64>")]
pub struct Frequency(Ratio<u64>);

/// Error returned when a serialized frequency is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frequency must be positive")]
pub struct ZeroFrequencyError;

impl TryFrom<Ratio<u64>> for Frequency {
    type Error = ZeroFrequencyError;

    fn try_from(hz: Ratio<u64>) -> Result<Self, Self::Error> {
        Self::from_ratio(*hz.numer(), *hz.denom()).ok_or(ZeroFrequencyError)
    }
}

impl From<Frequency> for Ratio<u64> {
    fn from(frequency: Frequency) -> Self {
        frequency.0
    }
}

impl Frequency {
    /// Creates a frequency from a whole number of Hertz.
    ///
    /// # Panics
    ///
    /// Panics if `hz` is zero.
    pub fn from_hz(hz: u64) -> Self {
        assert!(hz > 0, "frequency must be positive");
        Self(Ratio::from_integer(hz))
    }

    /// Creates a frequency of `numer / denom` Hertz. Returns `None` if either
    /// part is zero.
    pub fn from_ratio(numer: u64, denom: u64) -> Option<Self> {
        if numer == 0 || denom == 0 {
            return None;
        }
        Some(Self(Ratio::new(numer, denom)))
    }

    /// Returns the exact frequency in Hertz.
    pub fn hz(&self) -> Ratio<u64> {
        self.0
    }

    /// Returns the frequency in Hertz as a float, for display and logging.
    pub fn hz_f64(&self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }

    /// Returns `self × multiplier / divider`, or `None` if either factor is
    /// zero or the result does not fit.
    pub fn scaled(&self, multiplier: u64, divider: u64) -> Option<Self> {
        if multiplier == 0 || divider == 0 {
            return None;
        }
        let factor = Ratio::new(multiplier, divider);
        let numer = (*self.0.numer() as u128) * (*factor.numer() as u128);
        let denom = (*self.0.denom() as u128) * (*factor.denom() as u128);
        let exact = Ratio::new(numer, denom);
        Some(Self(Ratio::new(
            u64::try_from(*exact.numer()).ok()?,
            u64::try_from(*exact.denom()).ok()?,
        )))
    }

    /// Returns the period in seconds.
    pub fn period(&self) -> Ratio<u64> {
        self.0.recip()
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.hz_f64();
        if hz >= 1e9 {
            write!(f, "{}GHz", hz / 1e9)
        } else if hz >= 1e6 {
            write!(f, "{}MHz", hz / 1e6)
        } else if hz >= 1e3 {
            write!(f, "{}kHz", hz / 1e3)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The rejected input.
    pub input: String,
}

const UNITS: [(&str, u64); 4] = [
    ("ghz", 1_000_000_000),
    ("mhz", 1_000_000),
    ("khz", 1_000),
    ("hz", 1),
];

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();
        let (number, scale) = UNITS
            .iter()
            .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((lower.as_str(), 1));

        let value = parse_decimal(number.trim())
            .and_then(|v| v.checked_mul(&Ratio::from_integer(scale as u128)))
            .ok_or_else(err)?;
        if value.is_zero() {
            return Err(err());
        }
        let numer = u64::try_from(*value.numer()).map_err(|_| err())?;
        let denom = u64::try_from(*value.denom()).map_err(|_| err())?;
        Ok(Self(Ratio::new(numer, denom)))
    }
}

/// Parses an unsigned decimal such as `"12"`, `"12.5"` or `".25"` exactly.
///
/// Returns `None` for signs, exponents, empty input or more than 18
/// fractional digits.
pub fn parse_decimal(s: &str) -> Option<Ratio<u128>> {
    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) || frac.len() > 18 {
        return None;
    }
    let denom = 10u128.pow(frac.len() as u32);
    let int: u128 = if int.is_empty() { 0 } else { int.parse().ok()? };
    let frac: u128 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
    let numer = int.checked_mul(denom)?.checked_add(frac)?;
    Some(Ratio::new(numer, denom))
}
