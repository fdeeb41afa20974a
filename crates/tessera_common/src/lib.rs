//! Shared foundational types used across the Tessera simulation core.
//!
//! This crate provides the two-plane bit storage that holds every simulated
//! signal bit, the three-valued [`Logic`] scalar, exact rational clock
//! frequencies, state fingerprints, and interned node names.

#![warn(missing_docs)]

pub mod bit_state;
pub mod frequency;
pub mod hash;
pub mod ident;
pub mod logic;

pub use bit_state::{bit_mask, BitState, BitStateFormatError, Plane, WORD_BITS};
pub use frequency::{Frequency, ParseFrequencyError, ZeroFrequencyError};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use logic::Logic;
