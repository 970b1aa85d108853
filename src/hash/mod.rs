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

//! Seeded hashing over flow keys, byte buffers and counter indices.
//!
//! Every sketch in this crate draws its hash functions from [`FlowHash`],
//! a thin seeded wrapper around MurmurHash3 x64/128. Two instances with
//! different seeds behave as statistically independent functions; the same
//! seed always reproduces the same outputs, which the insert/query symmetry
//! of every sketch relies on.

use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::flowkey::FlowKey;

/// Default hash seed shared by sketches that do not pick their own.
pub const DEFAULT_UPDATE_SEED: u32 = 9001;

/// A single seeded hash function of the family.
///
/// Pure and deterministic; no failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowHash {
    seed: u32,
}

impl FlowHash {
    /// Creates a hash function with the given seed.
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }

    /// Returns the seed this function was created with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Hashes an arbitrary byte buffer to 64 bits.
    pub fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        mur3::murmurhash3_x64_128(bytes, self.seed).0
    }

    /// Hashes a byte buffer to both 64-bit halves of the 128-bit digest.
    ///
    /// Sketches that need two channels per key (double hashing, sign
    /// functions) take them from one digest instead of hashing twice.
    pub fn hash_pair(&self, bytes: &[u8]) -> (u64, u64) {
        mur3::murmurhash3_x64_128(bytes, self.seed)
    }

    /// Hashes a flow key directly.
    pub fn hash_key(&self, key: &FlowKey) -> u64 {
        self.hash_bytes(key.as_bytes())
    }

    /// Hashes a plain integer, used when a sketch rehashes its own counter
    /// indices (e.g. hierarchy layer promotion).
    pub fn hash_u64(&self, value: u64) -> u64 {
        self.hash_bytes(&value.to_le_bytes())
    }

    /// Maps a byte buffer to +1 or -1 with equal probability.
    pub fn sign(&self, bytes: &[u8]) -> i64 {
        if self.hash_pair(bytes).1 & 1 == 0 { 1 } else { -1 }
    }
}

/// Derives `count` independently seeded hash functions from one master seed.
///
/// The fan-out runs through [`XorShift64`] so a single configuration seed
/// reproduces the whole family.
pub fn hash_family(count: usize, master_seed: u32) -> Vec<FlowHash> {
    let mut rng = XorShift64::seeded(u64::from(master_seed) << 1 | 1);
    (0..count)
        .map(|_| FlowHash::with_seed(rng.next_u64() as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_per_seed() {
        let h = FlowHash::with_seed(7);
        assert_eq!(h.hash_bytes(b"flow"), h.hash_bytes(b"flow"));
        assert_eq!(h.hash_u64(1234), h.hash_u64(1234));
    }

    #[test]
    fn seeds_decorrelate() {
        let a = FlowHash::with_seed(1);
        let b = FlowHash::with_seed(2);
        assert_ne!(a.hash_bytes(b"flow"), b.hash_bytes(b"flow"));
    }

    #[test]
    fn known_murmur_vector() {
        // Reference vector for murmurhash3_x64_128 with seed 0.
        let h = FlowHash::with_seed(0);
        let key = "The quick brown fox jumps over the lazy dog";
        let (h1, h2) = h.hash_pair(key.as_bytes());
        assert_eq!(h1, 0xe34bbc7bbc071b6c);
        assert_eq!(h2, 0x7a433ca9c49a9347);
    }

    #[test]
    fn family_seeds_are_distinct_and_reproducible() {
        let fam1 = hash_family(8, 99);
        let fam2 = hash_family(8, 99);
        assert_eq!(fam1, fam2);
        for i in 0..fam1.len() {
            for j in i + 1..fam1.len() {
                assert_ne!(fam1[i].seed(), fam1[j].seed());
            }
        }
    }

    #[test]
    fn sign_is_balanced_enough() {
        let h = FlowHash::with_seed(11);
        let total: i64 = (0u64..4096)
            .map(|v| h.sign(&v.to_le_bytes()))
            .sum();
        // A fair coin over 4096 draws stays well inside +/- 512.
        assert!(total.abs() < 512, "sign bias too large: {total}");
    }
}
