//! Two-plane packed bit storage for simulated signal state.
//!
//! A [`BitState`] holds two parallel bit arrays of the same length: the VALUE
//! plane with the level of every bit and the DEFINED plane telling whether
//! that level is known. The simulator keeps all signal bits of a run in one
//! `BitState` and addresses it through bit offsets; small owned `BitState`s
//! double as constant values and port snapshots.
//!
//! Bit 0 is the least significant bit. Each plane packs 64 bits per `u64`
//! word. Bits past `len` in the last word are always zero so that equality
//! and hashing depend only on the logical contents.

use crate::hash::ContentHash;
use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of bits in one storage word.
pub const WORD_BITS: usize = 64;

/// Selects one of the two bit-planes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Plane {
    /// The level of each bit.
    Value = 0,
    /// Whether the level of each bit is known.
    Defined = 1,
}

impl Plane {
    /// Both planes, VALUE first.
    pub const ALL: [Plane; 2] = [Plane::Value, Plane::Defined];

    fn index(self) -> usize {
        self as usize
    }
}

/// Returns a mask with the low `len` bits set. `len` must not exceed 64.
pub fn bit_mask(len: usize) -> u64 {
    debug_assert!(len <= WORD_BITS, "mask length {len} exceeds word size");
    if len >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// Packed VALUE/DEFINED storage for an arbitrary number of bits.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBitState")]
pub struct BitState {
    len: usize,
    planes: [Vec<u64>; 2],
}

/// Serialized form of a [`BitState`], checked before use.
#[derive(Deserialize)]
struct RawBitState {
    len: usize,
    planes: [Vec<u64>; 2],
}

/// Error returned when serialized planes do not describe a valid
/// [`BitState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitStateFormatError {
    /// A plane does not hold exactly the words `len` needs.
    #[error("{plane:?} plane has {found} words, {len} bits need {expected}")]
    WordCount {
        /// The offending plane.
        plane: Plane,
        /// Declared length in bits.
        len: usize,
        /// Words required by `len`.
        expected: usize,
        /// Words present.
        found: usize,
    },
    /// Bits past `len` are set.
    #[error("{plane:?} plane has bits set past bit {len}")]
    DirtyTail {
        /// The offending plane.
        plane: Plane,
        /// Declared length in bits.
        len: usize,
    },
}

impl TryFrom<RawBitState> for BitState {
    type Error = BitStateFormatError;

    fn try_from(raw: RawBitState) -> Result<Self, Self::Error> {
        let len = raw.len;
        let expected = word_count(len);
        for plane in Plane::ALL {
            let words = &raw.planes[plane.index()];
            if words.len() != expected {
                return Err(BitStateFormatError::WordCount {
                    plane,
                    len,
                    expected,
                    found: words.len(),
                });
            }
            let tail = len % WORD_BITS;
            if let (Some(last), true) = (words.last(), tail != 0) {
                if last & !bit_mask(tail) != 0 {
                    return Err(BitStateFormatError::DirtyTail { plane, len });
                }
            }
        }
        Ok(Self {
            len,
            planes: raw.planes,
        })
    }
}

impl BitState {
    /// Creates an empty (zero-length) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state of `len` bits, all VALUE=0 and DEFINED=0.
    pub fn with_len(len: usize) -> Self {
        let words = word_count(len);
        Self {
            len,
            planes: [vec![0; words], vec![0; words]],
        }
    }

    /// Creates a fully undefined value of the given width.
    pub fn undefined(width: usize) -> Self {
        Self::with_len(width)
    }

    /// Creates a fully defined value from the low bits of `value`.
    ///
    /// Widths above 64 are zero-extended.
    pub fn from_u64(value: u64, width: usize) -> Self {
        let mut state = Self::with_len(width);
        let low = width.min(WORD_BITS);
        state.insert(Plane::Value, 0, low, value);
        state.set_range(Plane::Defined, 0, width);
        state
    }

    /// Creates a defined single-bit value.
    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(value as u64, 1)
    }

    /// Parses a string like `"10X1"`, most significant bit first.
    ///
    /// Accepts `0`, `1` and `x`/`X`/`u`/`U` for undefined bits; `_` is
    /// ignored as a digit separator.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let digits: Vec<char> = s.chars().filter(|&c| c != '_').collect();
        let mut state = Self::with_len(digits.len());
        for (i, c) in digits.iter().rev().enumerate() {
            state.set_logic(i, Logic::from_char(*c)?);
        }
        Some(state)
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the state holds no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the raw words of one plane.
    pub fn words(&self, plane: Plane) -> &[u64] {
        &self.planes[plane.index()]
    }

    /// Grows or truncates the state to `len` bits.
    ///
    /// Bits added by growing start with VALUE=0 and DEFINED=0.
    pub fn resize(&mut self, len: usize) {
        let words = word_count(len);
        for plane in &mut self.planes {
            plane.resize(words, 0);
        }
        // Growing exposes tail bits, which are kept zero.
        self.len = len;
        self.clear_tail();
    }

    /// Reads one bit of one plane.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn get(&self, plane: Plane, index: usize) -> bool {
        self.check_index(index);
        (self.planes[plane.index()][index / WORD_BITS] >> (index % WORD_BITS)) & 1 != 0
    }

    /// Writes one bit of one plane.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn set(&mut self, plane: Plane, index: usize, bit: bool) {
        self.check_index(index);
        let word = &mut self.planes[plane.index()][index / WORD_BITS];
        let mask = 1u64 << (index % WORD_BITS);
        if bit {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Reads one bit through both planes.
    pub fn logic(&self, index: usize) -> Logic {
        Logic::from_planes(self.get(Plane::Value, index), self.get(Plane::Defined, index))
    }

    /// Writes one bit through both planes.
    pub fn set_logic(&mut self, index: usize, value: Logic) {
        let (v, d) = value.to_planes();
        self.set(Plane::Value, index, v);
        self.set(Plane::Defined, index, d);
    }

    /// Sets `len` bits of one plane starting at `start`.
    pub fn set_range(&mut self, plane: Plane, start: usize, len: usize) {
        self.check_range(start, len);
        self.fill_plane(plane, start, len, true);
    }

    /// Clears `len` bits of one plane starting at `start`.
    pub fn clear_range(&mut self, plane: Plane, start: usize, len: usize) {
        self.check_range(start, len);
        self.fill_plane(plane, start, len, false);
    }

    /// Writes `value` to every bit of a range, both planes.
    pub fn fill(&mut self, start: usize, len: usize, value: Logic) {
        self.check_range(start, len);
        let (v, d) = value.to_planes();
        self.fill_plane(Plane::Value, start, len, v);
        self.fill_plane(Plane::Defined, start, len, d);
    }

    /// Reads up to 64 bits that lie within a single storage word.
    ///
    /// The caller guarantees `offset / 64 == (offset + len - 1) / 64`. This is
    /// only checked in debug builds; use [`extract`](Self::extract) when the
    /// range may cross a word boundary.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the state.
    pub fn extract_non_straddling(&self, plane: Plane, offset: usize, len: usize) -> u64 {
        self.check_range(offset, len);
        debug_assert!(
            !straddles(offset, len),
            "range {offset}+{len} straddles a word boundary"
        );
        if len == 0 {
            return 0;
        }
        (self.planes[plane.index()][offset / WORD_BITS] >> (offset % WORD_BITS)) & bit_mask(len)
    }

    /// Writes the low `len` bits of `value` into a range within one word.
    ///
    /// Same precondition as [`extract_non_straddling`](Self::extract_non_straddling).
    pub fn insert_non_straddling(&mut self, plane: Plane, offset: usize, len: usize, value: u64) {
        self.check_range(offset, len);
        debug_assert!(
            !straddles(offset, len),
            "range {offset}+{len} straddles a word boundary"
        );
        if len == 0 {
            return;
        }
        let shift = offset % WORD_BITS;
        let mask = bit_mask(len) << shift;
        let word = &mut self.planes[plane.index()][offset / WORD_BITS];
        *word = (*word & !mask) | ((value << shift) & mask);
    }

    /// Returns true if every bit in a range within one word is defined.
    pub fn all_defined_non_straddling(&self, offset: usize, len: usize) -> bool {
        self.extract_non_straddling(Plane::Defined, offset, len) == bit_mask(len)
    }

    /// Reads up to 64 bits starting at any offset.
    pub fn extract(&self, plane: Plane, offset: usize, len: usize) -> u64 {
        assert!(len <= WORD_BITS, "cannot extract {len} bits into one word");
        self.check_range(offset, len);
        if len == 0 {
            return 0;
        }
        let words = &self.planes[plane.index()];
        let word = offset / WORD_BITS;
        let shift = offset % WORD_BITS;
        let mut value = words[word] >> shift;
        let taken = WORD_BITS - shift;
        if taken < len {
            value |= words[word + 1] << taken;
        }
        value & bit_mask(len)
    }

    /// Writes the low `len` (≤ 64) bits of `value` starting at any offset.
    pub fn insert(&mut self, plane: Plane, offset: usize, len: usize, value: u64) {
        assert!(len <= WORD_BITS, "cannot insert {len} bits from one word");
        self.check_range(offset, len);
        if len == 0 {
            return;
        }
        let words = &mut self.planes[plane.index()];
        let word = offset / WORD_BITS;
        let shift = offset % WORD_BITS;
        let first = (WORD_BITS - shift).min(len);
        let mask = bit_mask(first) << shift;
        words[word] = (words[word] & !mask) | ((value << shift) & mask);
        if first < len {
            let rest = bit_mask(len - first);
            words[word + 1] = (words[word + 1] & !rest) | ((value >> first) & rest);
        }
    }

    /// Returns true if every bit of the range is defined.
    pub fn all_defined(&self, offset: usize, len: usize) -> bool {
        self.check_range(offset, len);
        chunks(len).all(|(at, n)| self.extract(Plane::Defined, offset + at, n) == bit_mask(n))
    }

    /// Copies `len` bits of both planes from `src` into `dst`.
    ///
    /// Offsets need not be word aligned.
    ///
    /// # Panics
    ///
    /// Panics if either range is out of bounds.
    pub fn copy_range(
        dst: &mut BitState,
        dst_offset: usize,
        src: &BitState,
        src_offset: usize,
        len: usize,
    ) {
        src.check_range(src_offset, len);
        dst.check_range(dst_offset, len);
        for (at, n) in chunks(len) {
            for plane in Plane::ALL {
                let bits = src.extract(plane, src_offset + at, n);
                dst.insert(plane, dst_offset + at, n, bits);
            }
        }
    }

    /// Copies `len` bits of both planes within this state.
    ///
    /// Overlapping ranges behave as if the source were first copied to a
    /// temporary, in either direction.
    pub fn copy_range_within(&mut self, dst_offset: usize, src_offset: usize, len: usize) {
        self.check_range(src_offset, len);
        self.check_range(dst_offset, len);
        if len == 0 || dst_offset == src_offset {
            return;
        }
        let count = len.div_ceil(WORD_BITS);
        if dst_offset < src_offset {
            // Each chunk is written below the source bits not yet read.
            for chunk in 0..count {
                self.copy_chunk_within(dst_offset, src_offset, len, chunk);
            }
        } else {
            for chunk in (0..count).rev() {
                self.copy_chunk_within(dst_offset, src_offset, len, chunk);
            }
        }
    }

    fn copy_chunk_within(&mut self, dst_offset: usize, src_offset: usize, len: usize, chunk: usize) {
        let at = chunk * WORD_BITS;
        let n = (len - at).min(WORD_BITS);
        for plane in Plane::ALL {
            let bits = self.extract(plane, src_offset + at, n);
            self.insert(plane, dst_offset + at, n, bits);
        }
    }

    /// Returns an owned copy of `len` bits starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> BitState {
        let mut out = BitState::with_len(len);
        BitState::copy_range(&mut out, 0, self, offset, len);
        out
    }

    /// Returns the value as an integer if it fits in 64 bits and every bit is
    /// defined.
    pub fn to_u64(&self) -> Option<u64> {
        if self.len > WORD_BITS || !self.all_defined(0, self.len) {
            return None;
        }
        Some(self.extract(Plane::Value, 0, self.len))
    }

    /// Returns true if every bit is defined.
    pub fn is_fully_defined(&self) -> bool {
        self.all_defined(0, self.len)
    }

    /// Returns true if no bit is defined.
    pub fn is_fully_undefined(&self) -> bool {
        self.planes[Plane::Defined.index()].iter().all(|&w| w == 0)
    }

    /// Hashes the length and both planes.
    pub fn fingerprint(&self) -> ContentHash {
        let len = [self.len as u64];
        ContentHash::from_words(
            len.iter()
                .chain(self.planes[0].iter())
                .chain(self.planes[1].iter())
                .copied(),
        )
    }

    fn fill_plane(&mut self, plane: Plane, start: usize, len: usize, bit: bool) {
        let words = &mut self.planes[plane.index()];
        let end = start + len;
        let mut pos = start;
        while pos < end {
            let shift = pos % WORD_BITS;
            let n = (WORD_BITS - shift).min(end - pos);
            let mask = bit_mask(n) << shift;
            if bit {
                words[pos / WORD_BITS] |= mask;
            } else {
                words[pos / WORD_BITS] &= !mask;
            }
            pos += n;
        }
    }

    fn clear_tail(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0 {
            let last = self.len / WORD_BITS;
            for plane in &mut self.planes {
                plane[last] &= bit_mask(rem);
            }
        }
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.len,
            "bit index {index} out of bounds for state of {} bits",
            self.len
        );
    }

    fn check_range(&self, offset: usize, len: usize) {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len),
            "bit range {offset}+{len} out of bounds for state of {} bits",
            self.len
        );
    }
}

impl fmt::Display for BitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.len).rev() {
            write!(f, "{}", self.logic(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitState({self})")
    }
}

/// Splits `len` bits into `(start, len)` chunks of at most one word each.
pub fn chunks(len: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..len)
        .step_by(WORD_BITS)
        .map(move |at| (at, (len - at).min(WORD_BITS)))
}

fn straddles(offset: usize, len: usize) -> bool {
    len > 0 && offset / WORD_BITS != (offset + len - 1) / WORD_BITS
}

fn word_count(len: usize) -> usize {
    len.div_ceil(WORD_BITS)
}
