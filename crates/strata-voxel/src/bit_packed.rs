//! Bit-packed array for storing fixed-width integer values in a compact `Vec<u64>`.
//!
//! Each element occupies exactly `bits` bits, for any width in `1..=32`. Elements
//! are packed back to back, so an element may straddle two adjacent `u64` words.
//! All straddle arithmetic lives here; callers only see `get` / `set`.

use serde::{Deserialize, Serialize};

/// Widest element the array can hold.
pub const MAX_BITS: u8 = 32;

/// A compact array where each element is stored using a fixed number of bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitPackedArray {
    /// Raw storage. Elements are packed into 64-bit words, low bits first.
    data: Vec<u64>,
    /// Bits per element (`1..=32`).
    bits: u8,
    /// Total number of logical elements.
    len: usize,
}

impl BitPackedArray {
    /// Creates a new array with `len` elements, all initialized to zero.
    ///
    /// The backing store holds exactly `ceil(len * bits / 64)` words.
    pub fn new(bits: u8, len: usize) -> Self {
        debug_assert!(
            (1..=MAX_BITS).contains(&bits),
            "bits must be in 1..={MAX_BITS}, got {bits}"
        );
        Self {
            data: vec![0u64; Self::words_for(bits, len)],
            bits,
            len,
        }
    }

    /// Creates a new array with every element set to `value`.
    pub fn filled(bits: u8, len: usize, value: u32) -> Self {
        let mut array = Self::new(bits, len);
        if value != 0 {
            for i in 0..len {
                array.set(i, value);
            }
        }
        array
    }

    /// Number of `u64` words needed for `len` elements of `bits` bits each.
    pub fn words_for(bits: u8, len: usize) -> usize {
        (len as u64 * u64::from(bits)).div_ceil(64) as usize
    }

    /// Returns the value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.len, "index {index} out of bounds (len {})", self.len);
        let (word, offset) = self.locate(index);
        let mask = self.mask();
        let mut value = self.data[word] >> offset;
        if offset + u32::from(self.bits) > 64 {
            value |= self.data[word + 1] << (64 - offset);
        }
        (value & mask) as u32
    }

    /// Sets the value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`. In debug builds, also panics if `value`
    /// does not fit in the current bit width.
    pub fn set(&mut self, index: usize, value: u32) {
        assert!(index < self.len, "index {index} out of bounds (len {})", self.len);
        debug_assert!(
            u64::from(value) <= self.mask(),
            "value {value} exceeds {}-bit capacity",
            self.bits
        );
        let (word, offset) = self.locate(index);
        let mask = self.mask();
        let value = u64::from(value) & mask;

        self.data[word] &= !(mask << offset);
        self.data[word] |= value << offset;

        if offset + u32::from(self.bits) > 64 {
            // The high part of the element spills into the next word.
            let low_bits = 64 - offset;
            self.data[word + 1] &= !(mask >> low_bits);
            self.data[word + 1] |= value >> low_bits;
        }
    }

    /// Returns a copy of this array re-encoded at a different bit width.
    ///
    /// Every element must fit in `new_bits`.
    pub fn with_bits(&self, new_bits: u8) -> Self {
        let mut resized = Self::new(new_bits, self.len);
        for i in 0..self.len {
            resized.set(i, self.get(i));
        }
        resized
    }

    /// Returns the number of bits per element.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Returns the number of logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of `u64` words in the backing store.
    pub fn word_count(&self) -> usize {
        self.data.len()
    }

    /// Returns the size of the backing storage in bytes (not counting struct overhead).
    pub fn storage_bytes(&self) -> usize {
        self.data.len() * 8
    }

    /// Returns a reference to the raw `u64` storage words.
    pub fn raw_data(&self) -> &[u64] {
        &self.data
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    /// Word index and bit offset of the first bit of element `index`.
    fn locate(&self, index: usize) -> (usize, u32) {
        let bit_index = index as u64 * u64::from(self.bits);
        ((bit_index / 64) as usize, (bit_index % 64) as u32)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
