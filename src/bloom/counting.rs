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
use crate::hierarchy::PackedArray;
use crate::sketch::Sketch;

/// A counting Bloom filter: the Bloom bit positions become narrow
/// saturating counters.
///
/// `query` returns the minimum of the `d` probed counters, usable either
/// as a presence test (`> 0`) or as a rough count. The presence test
/// inherits the Bloom false positive risk; the count inherits Count-Min's
/// one-sided overestimation until a counter saturates, after which it is a
/// lower bound.
#[derive(Debug, Clone)]
pub struct CountingBloomFilter {
    hasher: FlowHash,
    key_len: usize,
    num_hashes: u32,
    counters: PackedArray,
}

impl CountingBloomFilter {
    /// Creates a filter of `num_counters` saturating counters of
    /// `counter_bits` bits, probed by `num_hashes` hash functions.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) for a
    /// zero counter count, a counter width outside `1..=64`, a zero hash
    /// count, or a zero key length.
    pub fn new(
        num_counters: usize,
        counter_bits: u32,
        num_hashes: u32,
        key_len: usize,
        seed: u32,
    ) -> Result<Self, Error> {
        if num_counters == 0 {
            return Err(Error::config_invalid("counter count must be positive"));
        }
        if !(1..=64).contains(&counter_bits) {
            return Err(Error::config_invalid("counter width must be 1..=64 bits")
                .with_context("counter_bits", counter_bits));
        }
        if num_hashes == 0 {
            return Err(Error::config_invalid("hash count must be positive"));
        }
        if key_len == 0 {
            return Err(Error::config_invalid("key length must be positive"));
        }
        Ok(Self {
            hasher: FlowHash::with_seed(seed),
            key_len,
            num_hashes,
            counters: PackedArray::new(num_counters, counter_bits),
        })
    }

    /// Adds `weight` to every probed counter, saturating at the counter
    /// maximum instead of wrapping.
    pub fn insert(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error> {
        self.check_key(key)?;
        let (h1, h2) = self.hasher.hash_pair(key.as_bytes());
        let max = self.counters.max_value();
        for i in 0..self.num_hashes {
            let idx = self.counter_index(h1, h2, i);
            let cell = self.counters.get(idx);
            let room = max - cell;
            self.counters.set(idx, cell + weight.min(room));
        }
        Ok(())
    }

    /// Minimum of the probed counters.
    pub fn estimate(&self, key: &FlowKey) -> Result<u64, Error> {
        self.check_key(key)?;
        let (h1, h2) = self.hasher.hash_pair(key.as_bytes());
        Ok((0..self.num_hashes)
            .map(|i| self.counters.get(self.counter_index(h1, h2, i)))
            .min()
            .unwrap_or(0))
    }

    /// Presence test: whether every probed counter is non-zero.
    pub fn contains(&self, key: &FlowKey) -> Result<bool, Error> {
        Ok(self.estimate(key)? > 0)
    }

    /// Merges another filter counter-wise with saturating addition.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) if the
    /// filters differ in dimensions or seed.
    pub fn merge(&mut self, other: &CountingBloomFilter) -> Result<(), Error> {
        if self.counters.len() != other.counters.len()
            || self.counters.bits() != other.counters.bits()
            || self.num_hashes != other.num_hashes
            || self.key_len != other.key_len
            || self.hasher != other.hasher
        {
            return Err(Error::config_invalid(
                "cannot merge counting bloom filters with different configurations",
            ));
        }
        let max = self.counters.max_value();
        for idx in 0..self.counters.len() {
            let sum = self.counters.get(idx).saturating_add(other.counters.get(idx));
            self.counters.set(idx, sum.min(max));
        }
        Ok(())
    }

    /// Zeroes every counter.
    pub fn clear(&mut self) {
        self.counters.clear();
    }

    fn counter_index(&self, h1: u64, h2: u64, i: u32) -> usize {
        let hash = h1.wrapping_add(u64::from(i).wrapping_mul(h2));
        (hash % self.counters.len() as u64) as usize
    }
}

impl Sketch for CountingBloomFilter {
    fn key_len(&self) -> usize {
        self.key_len
    }

    fn update(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error> {
        self.insert(key, weight)
    }

    fn query(&self, key: &FlowKey) -> Result<u64, Error> {
        self.estimate(key)
    }

    fn size_bytes(&self) -> usize {
        self.counters.size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn key(id: u64) -> FlowKey {
        FlowKey::from_5_tuple(id as u32, 0x7f000001, 443, id as u16, 6)
    }

    #[test]
    fn rejects_bad_config() {
        assert_eq!(
            CountingBloomFilter::new(0, 4, 3, 13, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            CountingBloomFilter::new(128, 0, 3, 13, 1)
                .unwrap_err()
                .kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            CountingBloomFilter::new(128, 4, 0, 13, 1)
                .unwrap_err()
                .kind(),
            ErrorKind::ConfigInvalid
        );
    }

    #[test]
    fn estimate_never_underestimates_before_saturation() {
        let mut cbf = CountingBloomFilter::new(4096, 16, 3, 13, 1).unwrap();
        for _ in 0..10 {
            cbf.insert(&key(1), 1).unwrap();
        }
        assert!(cbf.estimate(&key(1)).unwrap() >= 10);
        assert!(cbf.contains(&key(1)).unwrap());
    }

    #[test]
    fn counters_saturate_instead_of_wrapping() {
        let mut cbf = CountingBloomFilter::new(64, 4, 2, 13, 1).unwrap();
        for _ in 0..100 {
            cbf.insert(&key(2), 1).unwrap();
        }
        // 4-bit counters cap at 15 and stay there.
        assert_eq!(cbf.estimate(&key(2)).unwrap(), 15);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = CountingBloomFilter::new(4096, 16, 3, 13, 9).unwrap();
        let mut b = CountingBloomFilter::new(4096, 16, 3, 13, 9).unwrap();
        a.insert(&key(5), 4).unwrap();
        b.insert(&key(5), 6).unwrap();
        a.merge(&b).unwrap();
        assert!(a.estimate(&key(5)).unwrap() >= 10);
    }

    #[test]
    fn merge_rejects_different_shapes() {
        let mut a = CountingBloomFilter::new(4096, 16, 3, 13, 9).unwrap();
        let b = CountingBloomFilter::new(2048, 16, 3, 13, 9).unwrap();
        assert_eq!(a.merge(&b).unwrap_err().kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn size_reflects_packed_counters() {
        let cbf = CountingBloomFilter::new(1000, 4, 3, 13, 1).unwrap();
        // 4000 bits -> 63 words.
        assert_eq!(cbf.size_bytes(), 4000usize.div_ceil(64) * 8);
    }
}
