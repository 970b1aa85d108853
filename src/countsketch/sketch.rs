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
use crate::hash::hash_family;
use crate::sketch::Sketch;

/// Count sketch: signed counters with a per-row random sign function.
///
/// Each row hashes a key to one counter and to a ±1 sign; `update` adds
/// `sign * weight`, `query` takes the median of `sign * counter` across
/// rows. Unlike Count-Min the estimator is unbiased, at the price of
/// two-sided error: the raw median can be negative, and the user-facing
/// estimate clamps at zero.
#[derive(Debug, Clone)]
pub struct CountSketch {
    depth: usize,
    width: usize,
    key_len: usize,
    seed: u32,
    hash_fns: Vec<FlowHash>,
    rows: Vec<Vec<i64>>,
}

impl CountSketch {
    /// Creates a sketch of `depth` signed rows of `width` counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) for a
    /// zero width or key length, or an even (median-ambiguous) or zero
    /// depth.
    pub fn new(depth: usize, width: usize, key_len: usize, seed: u32) -> Result<Self, Error> {
        if depth == 0 || depth % 2 == 0 {
            return Err(
                Error::config_invalid("depth must be positive and odd for a unique median")
                    .with_context("depth", depth),
            );
        }
        if width == 0 {
            return Err(Error::config_invalid("width must be positive"));
        }
        if key_len == 0 {
            return Err(Error::config_invalid("key length must be positive"));
        }
        Ok(Self {
            depth,
            width,
            key_len,
            seed,
            hash_fns: hash_family(depth, seed),
            rows: vec![vec![0i64; width]; depth],
        })
    }

    /// Number of hash rows.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Counters per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Median of the sign-corrected row counters. May be negative; an
    /// unbiased estimator of the true count.
    pub fn raw_estimate(&self, key: &FlowKey) -> Result<i64, Error> {
        self.check_key(key)?;
        let mut votes: Vec<i64> = (0..self.depth)
            .map(|row| {
                let (col, sign) = self.slot(row, key);
                sign * self.rows[row][col]
            })
            .collect();
        votes.sort_unstable();
        Ok(votes[self.depth / 2])
    }

    /// Zero-clamped estimate for callers expecting a non-negative count.
    pub fn estimate(&self, key: &FlowKey) -> Result<u64, Error> {
        Ok(self.raw_estimate(key)?.max(0) as u64)
    }

    /// Merges another sketch row-wise; valid because the update rule is
    /// linear in the counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind) on
    /// configuration mismatch.
    pub fn merge(&mut self, other: &CountSketch) -> Result<(), Error> {
        if self.depth != other.depth
            || self.width != other.width
            || self.key_len != other.key_len
            || self.seed != other.seed
        {
            return Err(Error::config_invalid(
                "cannot merge count sketches with different configurations",
            ));
        }
        for (row, other_row) in self.rows.iter_mut().zip(&other.rows) {
            for (cell, other_cell) in row.iter_mut().zip(other_row) {
                *cell += *other_cell;
            }
        }
        Ok(())
    }

    /// Zeroes every counter.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.fill(0);
        }
    }

    /// Column and sign the key draws in `row`, both taken from one digest.
    fn slot(&self, row: usize, key: &FlowKey) -> (usize, i64) {
        let (h1, h2) = self.hash_fns[row].hash_pair(key.as_bytes());
        let col = (h1 % self.width as u64) as usize;
        let sign = if h2 & 1 == 0 { 1 } else { -1 };
        (col, sign)
    }
}

impl Sketch for CountSketch {
    fn key_len(&self) -> usize {
        self.key_len
    }

    fn update(&mut self, key: &FlowKey, weight: u64) -> Result<(), Error> {
        self.check_key(key)?;
        for row in 0..self.depth {
            let (col, sign) = self.slot(row, key);
            self.rows[row][col] += sign * weight as i64;
        }
        Ok(())
    }

    fn query(&self, key: &FlowKey) -> Result<u64, Error> {
        self.estimate(key)
    }

    fn size_bytes(&self) -> usize {
        self.depth * self.width * std::mem::size_of::<i64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn key(id: u32) -> FlowKey {
        FlowKey::from_5_tuple(id, 0x08080808, 443, id as u16, 6)
    }

    #[test]
    fn rejects_even_or_zero_depth() {
        assert_eq!(
            CountSketch::new(0, 128, 13, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            CountSketch::new(4, 128, 13, 1).unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert!(CountSketch::new(5, 128, 13, 1).is_ok());
    }

    #[test]
    fn exact_when_collision_free() {
        let mut cs = CountSketch::new(5, 4096, 13, 1).unwrap();
        cs.update(&key(1), 42).unwrap();
        assert_eq!(cs.raw_estimate(&key(1)).unwrap(), 42);
        assert_eq!(cs.estimate(&key(2)).unwrap(), 0);
    }

    #[test]
    fn estimate_clamps_negative_medians() {
        let mut cs = CountSketch::new(3, 4, 13, 1).unwrap();
        // Heavy cross-traffic in a tiny sketch drives some medians negative.
        for id in 0..200u32 {
            cs.update(&key(id), 5).unwrap();
        }
        for id in 0..200u32 {
            let raw = cs.raw_estimate(&key(id)).unwrap();
            let clamped = cs.estimate(&key(id)).unwrap();
            if raw < 0 {
                assert_eq!(clamped, 0);
            } else {
                assert_eq!(clamped, raw as u64);
            }
        }
    }

    #[test]
    fn heavy_flow_dominates_noise() {
        let mut cs = CountSketch::new(5, 1024, 13, 7).unwrap();
        cs.update(&key(0), 10_000).unwrap();
        for id in 1..500u32 {
            cs.update(&key(id), 1).unwrap();
        }
        let est = cs.raw_estimate(&key(0)).unwrap();
        assert!((9_500..=10_500).contains(&est), "estimate {est} off");
    }

    #[test]
    fn merge_is_row_wise_sum() {
        let mut a = CountSketch::new(5, 512, 13, 3).unwrap();
        let mut b = CountSketch::new(5, 512, 13, 3).unwrap();
        a.update(&key(9), 11).unwrap();
        b.update(&key(9), 31).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.raw_estimate(&key(9)).unwrap(), 42);
    }

    #[test]
    fn merge_rejects_mismatch() {
        let mut a = CountSketch::new(5, 512, 13, 3).unwrap();
        let b = CountSketch::new(5, 256, 13, 3).unwrap();
        assert_eq!(a.merge(&b).unwrap_err().kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn size_matches_configuration() {
        let cs = CountSketch::new(5, 1024, 13, 1).unwrap();
        assert_eq!(cs.size_bytes(), 5 * 1024 * 8);
    }
}
