// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Bit-packed counter array: `len` cells of `bits` bits each, stored in
//! `u64` words. Cells may straddle a word boundary.

/// Fixed-size array of narrow unsigned counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedArray {
    words: Box<[u64]>,
    len: usize,
    bits: u32,
    mask: u64,
}

impl PackedArray {
    /// Creates an array of `len` zeroed cells of `bits` bits each.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is not in `1..=64` or `len` is zero. Callers
    /// validate configuration before building storage.
    pub fn new(len: usize, bits: u32) -> Self {
        assert!((1..=64).contains(&bits), "cell width must be 1..=64 bits");
        assert!(len > 0, "cell count must be positive");

        let total_bits = len as u64 * u64::from(bits);
        let num_words = total_bits.div_ceil(64) as usize;
        let mask = if bits == 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };
        Self {
            words: vec![0u64; num_words].into_boxed_slice(),
            len,
            bits,
            mask,
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array has no cells. Construction forbids this.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cell width in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Largest value a cell can hold.
    pub fn max_value(&self) -> u64 {
        self.mask
    }

    /// Reads the cell at `index`.
    pub fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.len);

        let bit_pos = index as u64 * u64::from(self.bits);
        let word = (bit_pos / 64) as usize;
        let offset = (bit_pos % 64) as u32;

        if offset + self.bits <= 64 {
            (self.words[word] >> offset) & self.mask
        } else {
            // Cell straddles into the next word.
            let low = self.words[word] >> offset;
            let high = self.words[word + 1] << (64 - offset);
            (low | high) & self.mask
        }
    }

    /// Writes `value` into the cell at `index`.
    pub fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.len);
        debug_assert!(value <= self.mask);

        let bit_pos = index as u64 * u64::from(self.bits);
        let word = (bit_pos / 64) as usize;
        let offset = (bit_pos % 64) as u32;

        if offset + self.bits <= 64 {
            let cleared = self.words[word] & !(self.mask << offset);
            self.words[word] = cleared | (value << offset);
        } else {
            let low_bits = 64 - offset;
            let cleared_low = self.words[word] & !(self.mask << offset);
            self.words[word] = cleared_low | (value << offset);
            let cleared_high = self.words[word + 1] & !(self.mask >> low_bits);
            self.words[word + 1] = cleared_high | (value >> low_bits);
        }
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }

    /// Physical footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_cells_round_trip() {
        let mut arr = PackedArray::new(100, 4);
        assert_eq!(arr.max_value(), 15);
        for i in 0..100 {
            arr.set(i, (i as u64) % 16);
        }
        for i in 0..100 {
            assert_eq!(arr.get(i), (i as u64) % 16);
        }
    }

    #[test]
    fn straddling_cells_round_trip() {
        // 13-bit cells hit every word-boundary alignment over 64 cells.
        let mut arr = PackedArray::new(64, 13);
        for i in 0..64 {
            arr.set(i, (i as u64 * 97) & arr.max_value());
        }
        for i in 0..64 {
            assert_eq!(arr.get(i), (i as u64 * 97) & arr.max_value());
        }
    }

    #[test]
    fn full_width_cells() {
        let mut arr = PackedArray::new(3, 64);
        arr.set(1, u64::MAX);
        assert_eq!(arr.get(0), 0);
        assert_eq!(arr.get(1), u64::MAX);
        assert_eq!(arr.get(2), 0);
    }

    #[test]
    fn neighbors_are_untouched() {
        let mut arr = PackedArray::new(16, 7);
        arr.set(7, 0x55);
        arr.set(8, 0x2a);
        arr.set(7, 0);
        assert_eq!(arr.get(8), 0x2a);
        assert_eq!(arr.get(6), 0);
    }

    #[test]
    fn clear_resets_all_cells() {
        let mut arr = PackedArray::new(10, 5);
        for i in 0..10 {
            arr.set(i, 31);
        }
        arr.clear();
        for i in 0..10 {
            assert_eq!(arr.get(i), 0);
        }
    }

    #[test]
    fn size_rounds_up_to_words() {
        let arr = PackedArray::new(100, 4); // 400 bits -> 7 words
        assert_eq!(arr.size_bytes(), 56);
    }
}
