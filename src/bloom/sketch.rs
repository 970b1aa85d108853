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

use crate::error::Error;
use crate::flowkey::FlowKey;
use crate::hash::FlowHash;
use crate::sketch::Sketch;

const MIN_NUM_BITS: u64 = 64;
const MAX_NUM_BITS: u64 = (1u64 << 35) - 64;
const MAX_NUM_HASHES: u32 = 100;

/// A Bloom filter over fixed-width flow keys.
///
/// `d` hash positions per key in an `m`-bit array:
/// - No false negatives (inserted keys always report present)
/// - Tunable false positive rate via `m`, `d` and load
/// - Constant space
#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilter {
    hasher: FlowHash,
    key_len: usize,
    num_hashes: u32,
    capacity_bits: u64,
    num_bits_set: u64,
    /// Bit array packed into u64 words, length = ceil(capacity_bits / 64).
    bit_array: Vec<u64>,
}

impl BloomFilter {
    /// Creates a filter of `num_bits` bits probed by `num_hashes` hash
    /// functions, for keys of `key_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) if
    /// `num_bits` is outside `64..=2^35 - 64`, `num_hashes` is zero or
    /// above 100, or `key_len` is zero.
    pub fn new(num_bits: u64, num_hashes: u32, key_len: usize, seed: u32) -> Result<Self, Error> {
        if !(MIN_NUM_BITS..=MAX_NUM_BITS).contains(&num_bits) {
            return Err(Error::config_invalid("bit count out of range")
                .with_context("num_bits", num_bits)
                .with_context("min", MIN_NUM_BITS)
                .with_context("max", MAX_NUM_BITS));
        }
        if num_hashes == 0 || num_hashes > MAX_NUM_HASHES {
            return Err(Error::config_invalid("hash count out of range")
                .with_context("num_hashes", num_hashes)
                .with_context("max", MAX_NUM_HASHES));
        }
        if key_len == 0 {
            return Err(Error::config_invalid("key length must be positive"));
        }

        let num_words = num_bits.div_ceil(64) as usize;
        Ok(Self {
            hasher: FlowHash::with_seed(seed),
            key_len,
            num_hashes,
            capacity_bits: num_bits,
            num_bits_set: 0,
            bit_array: vec![0u64; num_words],
        })
    }

    /// Suggests the optimal bit count for `max_items` keys at the target
    /// false positive probability: `m = -n * ln(p) / ln(2)^2`, rounded up
    /// to a whole word.
    pub fn suggest_num_bits(max_items: u64, fpp: f64) -> u64 {
        let n = max_items as f64;
        let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let bits = (-n * fpp.ln() / ln2_squared).ceil() as u64;
        let bits = bits.div_ceil(64) * 64;
        bits.clamp(MIN_NUM_BITS, MAX_NUM_BITS)
    }

    /// Suggests the optimal hash count for `max_items` keys in `num_bits`
    /// bits: `k = (m / n) * ln(2)`.
    pub fn suggest_num_hashes(max_items: u64, num_bits: u64) -> u32 {
        let k = (num_bits as f64 / max_items as f64 * std::f64::consts::LN_2).round();
        (k as u32).clamp(1, MAX_NUM_HASHES)
    }

    /// Inserts a key. After insertion `contains` always reports true.
    pub fn insert(&mut self, key: &FlowKey) -> Result<(), Error> {
        self.check_key(key)?;
        let (h1, h2) = self.hasher.hash_pair(key.as_bytes());
        self.set_bits(h1, h2);
        Ok(())
    }

    /// Tests whether a key is possibly in the set.
    ///
    /// `true` means possibly inserted (or a false positive); `false` means
    /// definitely never inserted.
    pub fn contains(&self, key: &FlowKey) -> Result<bool, Error> {
        self.check_key(key)?;
        if self.is_filter_empty() {
            return Ok(false);
        }
        let (h1, h2) = self.hasher.hash_pair(key.as_bytes());
        Ok(self.check_bits(h1, h2))
    }

    /// Tests and inserts in one pass, returning the prior presence verdict.
    pub fn contains_and_insert(&mut self, key: &FlowKey) -> Result<bool, Error> {
        self.check_key(key)?;
        let (h1, h2) = self.hasher.hash_pair(key.as_bytes());
        let was_present = self.check_bits(h1, h2);
        self.set_bits(h1, h2);
        Ok(was_present)
    }

    /// Clears all bits while keeping capacity and configuration.
    pub fn reset(&mut self) {
        for word in &mut self.bit_array {
            *word = 0;
        }
        self.num_bits_set = 0;
    }

    /// Merges another filter into this one via bitwise OR.
    ///
    /// This is the sharding merge: after it, this filter recognizes keys
    /// inserted into either instance.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) if the
    /// filters differ in size, hash count, key width or seed.
    pub fn merge(&mut self, other: &BloomFilter) -> Result<(), Error> {
        if !self.is_compatible(other) {
            return Err(Error::config_invalid(
                "cannot merge bloom filters with different configurations",
            ));
        }
        for (word, other_word) in self.bit_array.iter_mut().zip(&other.bit_array) {
            *word |= *other_word;
        }
        self.recount_bits_set();
        Ok(())
    }

    /// Whether no key has been inserted yet.
    pub fn is_filter_empty(&self) -> bool {
        self.num_bits_set == 0
    }

    /// Number of bits currently set; a saturation signal.
    pub fn bits_used(&self) -> u64 {
        self.num_bits_set
    }

    /// Total bit capacity.
    pub fn capacity(&self) -> u64 {
        self.capacity_bits
    }

    /// Number of hash functions probed per key.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Fraction of bits set. Values above 0.5 mean degraded accuracy.
    pub fn load_factor(&self) -> f64 {
        self.num_bits_set as f64 / self.capacity_bits as f64
    }

    /// Estimated false positive probability at the current load.
    ///
    /// A lookup misfires when all `k` probed bits are set, so with a
    /// uniform bit distribution the rate is `load_factor^k`.
    pub fn estimated_fpp(&self) -> f64 {
        self.load_factor().powf(f64::from(self.num_hashes))
    }

    fn is_compatible(&self, other: &BloomFilter) -> bool {
        self.capacity_bits == other.capacity_bits
            && self.num_hashes == other.num_hashes
            && self.key_len == other.key_len
            && self.hasher == other.hasher
    }

    fn check_bits(&self, h1: u64, h2: u64) -> bool {
        (0..self.num_hashes).all(|i| self.get_bit(self.bit_index(h1, h2, i)))
    }

    fn set_bits(&mut self, h1: u64, h2: u64) {
        for i in 0..self.num_hashes {
            self.set_bit(self.bit_index(h1, h2, i));
        }
    }

    /// Double hashing (Kirsch-Mitzenmacher): `(h1 + i * h2) mod m`.
    fn bit_index(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add(u64::from(i).wrapping_mul(h2)) % self.capacity_bits
    }

    fn get_bit(&self, bit_index: u64) -> bool {
        let mask = 1u64 << (bit_index % 64);
        (self.bit_array[(bit_index / 64) as usize] & mask) != 0
    }

    fn set_bit(&mut self, bit_index: u64) {
        let word_index = (bit_index / 64) as usize;
        let mask = 1u64 << (bit_index % 64);
        if (self.bit_array[word_index] & mask) == 0 {
            self.bit_array[word_index] |= mask;
            self.num_bits_set += 1;
        }
    }

    fn recount_bits_set(&mut self) {
        self.num_bits_set = self
            .bit_array
            .iter()
            .map(|word| u64::from(word.count_ones()))
            .sum();
    }
}

impl Sketch for BloomFilter {
    fn key_len(&self) -> usize {
        self.key_len
    }

    /// Presence registration; the weight is irrelevant to membership.
    fn update(&mut self, key: &FlowKey, _weight: u64) -> Result<(), Error> {
        self.insert(key)
    }

    /// 1 if possibly present, 0 if definitely absent.
    fn query(&self, key: &FlowKey) -> Result<u64, Error> {
        Ok(u64::from(self.contains(key)?))
    }

    fn size_bytes(&self) -> usize {
        self.bit_array.len() * 8
    }
}
